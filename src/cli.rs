//! `gsnip` command line.

use crate::config::Settings;
use crate::error::{GsnipError, GsnipResult};
use crate::{server, workflows};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use gsnip_cdn::{media, read_key_file, signed};
use gsnip_gcp::{ClientConfig, GcpClient};
use gsnip_sessions::app as sessions_app;
use gsnip_sessions::store::DEFAULT_COLLECTION;
use gsnip_sessions::visits::{self, LazyRedisCounter};
use gsnip_sessions::FirestoreSessionStore;
use gsnip_speech::config::BYTES_PER_SECOND;
use gsnip_speech::{
    GoogleSpeechTransport, ReaderSource, StreamConfig, StreamingRecognizer, Transcript,
    TranscriptSink, SPEECH_ENDPOINT,
};
use gsnip_tasks::{handler, pull, CloudTasksQueue};
use log::{info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;

#[derive(Parser, Debug)]
#[command(name = "gsnip", version, about = "Google Cloud samples")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Cloud Tasks pull queues and the App Engine push handler.
    #[command(subcommand)]
    Tasks(TasksCommand),
    /// Run a workflow and print its result.
    Workflows(WorkflowsArgs),
    /// Cloud CDN signed URLs and cookies (HMAC-SHA1).
    #[command(subcommand)]
    Cdn(SignCommand),
    /// Media CDN signed URLs and cookies (Ed25519).
    #[command(subcommand)]
    MediaCdn(SignCommand),
    /// Firestore-backed session views.
    #[command(subcommand)]
    Sessions(ServeCommand),
    /// Redis visit counter.
    #[command(subcommand)]
    Visits(ServeCommand),
    /// Endless streaming transcription of raw LINEAR16 audio.
    Speech(SpeechArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct QueueArgs {
    pub project: String,
    pub location: String,
    pub queue: String,
}

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    /// Create a pull task.
    Create(QueueArgs),
    /// Lease one task and acknowledge it.
    Pull(QueueArgs),
    /// Serve the push-queue handler on $PORT.
    Serve,
}

#[derive(Args, Debug)]
pub struct WorkflowsArgs {
    pub project: String,
    pub location: String,
    #[arg(default_value = workflows::DEFAULT_WORKFLOW)]
    pub workflow: String,
    /// Deploy the sample definition first if it is not already active.
    #[arg(long)]
    pub deploy: bool,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// URL, or URL prefix for `sign-prefix` and `sign-cookie`.
    pub url: String,
    #[arg(long)]
    pub key_name: String,
    /// File holding the base64url-encoded key.
    #[arg(long)]
    pub key_file: PathBuf,
    /// How long the signature stays valid, e.g. 1h or 30m.
    #[arg(long, default_value = "1h")]
    pub expires_in: String,
}

#[derive(Subcommand, Debug)]
pub enum SignCommand {
    SignUrl(SignArgs),
    SignPrefix(SignArgs),
    SignCookie(SignArgs),
}

impl SignCommand {
    fn args(&self) -> &SignArgs {
        match self {
            Self::SignUrl(args) | Self::SignPrefix(args) | Self::SignCookie(args) => args,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ServeCommand {
    /// Listen on $PORT.
    Serve,
}

#[derive(Args, Debug)]
pub struct SpeechArgs {
    /// Mono 16-bit PCM at 44.1 kHz, or `-` for stdin.
    pub input: String,
}

fn client_for(project: &str) -> GsnipResult<Arc<GcpClient>> {
    let config = ClientConfig::from_env().with_project(project);
    Ok(Arc::new(GcpClient::new(config)?))
}

/// Prints each final transcript as it arrives.
pub struct TranscriptPrinter<W> {
    out: W,
}

impl<W: Write + Send> TranscriptPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> TranscriptSink for TranscriptPrinter<W> {
    fn deliver(&mut self, transcript: Transcript) {
        if let Err(e) = writeln!(self.out, "Transcript: {}", transcript.text) {
            warn!("could not print transcript: {}", e);
        }
    }
}

async fn open_audio(input: &str) -> GsnipResult<Box<dyn AsyncRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    Ok(Box::new(tokio::fs::File::open(input).await?))
}

fn expiration(args: &SignArgs, now: DateTime<Utc>) -> GsnipResult<DateTime<Utc>> {
    let d = humantime::parse_duration(&args.expires_in)?;
    let d = chrono::Duration::from_std(d)
        .map_err(|e| GsnipError::Config(format!("--expires-in out of range: {}", e)))?;
    Ok(now + d)
}

/// HMAC-SHA1 signing for Cloud CDN.
pub fn sign_cdn(command: &SignCommand, now: DateTime<Utc>) -> GsnipResult<String> {
    let args = command.args();
    let expires = expiration(args, now)?;
    let key = read_key_file(&args.key_file)?;
    let (url, key_name) = (&args.url, &args.key_name);
    let signed = match command {
        SignCommand::SignUrl(_) => signed::sign_url(url, key_name, &key, expires)?,
        SignCommand::SignPrefix(_) => signed::sign_url_with_prefix(url, key_name, &key, expires)?,
        SignCommand::SignCookie(_) => signed::sign_cookie(url, key_name, &key, expires)?,
    };
    Ok(signed)
}

/// Ed25519 signing for Media CDN.
pub fn sign_media_cdn(command: &SignCommand, now: DateTime<Utc>) -> GsnipResult<String> {
    let args = command.args();
    let expires = expiration(args, now)?;
    let key = read_key_file(&args.key_file)?;
    let (url, key_name) = (&args.url, &args.key_name);
    let signed = match command {
        SignCommand::SignUrl(_) => media::sign_url(url, key_name, &key, expires)?,
        SignCommand::SignPrefix(_) => media::sign_url_prefix(url, key_name, &key, expires)?,
        SignCommand::SignCookie(_) => media::sign_cookie(url, key_name, &key, expires)?,
    };
    Ok(signed)
}

pub async fn run(cli: Cli) -> GsnipResult<()> {
    let mut stdout = std::io::stdout();
    match cli.command {
        Command::Tasks(TasksCommand::Create(q)) => {
            let queue = CloudTasksQueue::new(client_for(&q.project)?);
            pull::task_create(&queue, &q.project, &q.location, &q.queue, &mut stdout).await?;
        }
        Command::Tasks(TasksCommand::Pull(q)) => {
            let queue = CloudTasksQueue::new(client_for(&q.project)?);
            pull::lease_and_ack(&queue, &q.project, &q.location, &q.queue, &mut stdout).await?;
        }
        Command::Tasks(TasksCommand::Serve) => {
            let settings = Settings::from_env()?;
            server::serve(handler::router(), settings.port).await?;
        }
        Command::Workflows(args) => {
            let client = client_for(&args.project)?;
            if args.deploy {
                workflows::deploy_workflow(&client, &args.project, &args.location, &args.workflow)
                    .await?;
            }
            workflows::execute_workflow(
                &client,
                &args.project,
                &args.location,
                &args.workflow,
                &mut stdout,
            )
            .await?;
        }
        Command::Cdn(command) => {
            writeln!(stdout, "{}", sign_cdn(&command, Utc::now())?)?;
        }
        Command::MediaCdn(command) => {
            writeln!(stdout, "{}", sign_media_cdn(&command, Utc::now())?)?;
        }
        Command::Sessions(ServeCommand::Serve) => {
            let settings = Settings::from_env()?;
            let client = Arc::new(GcpClient::new(ClientConfig::from_env())?);
            // The service account key names a project when the environment does not.
            let project = match client.project_id() {
                Some(project) => project.to_string(),
                None => settings.require_project()?.to_string(),
            };
            let store = FirestoreSessionStore::new(client, project, DEFAULT_COLLECTION);
            server::serve(sessions_app::router(Arc::new(store)), settings.port).await?;
        }
        Command::Visits(ServeCommand::Serve) => {
            let settings = Settings::from_env()?;
            let counter = LazyRedisCounter::new(settings.redis()?);
            server::serve(visits::router(Arc::new(counter)), settings.port).await?;
        }
        Command::Speech(args) => {
            let client = Arc::new(GcpClient::new(ClientConfig::from_env())?);
            let transport = GoogleSpeechTransport::connect(client, SPEECH_ENDPOINT).await?;
            let source = ReaderSource::new(open_audio(&args.input).await?, BYTES_PER_SECOND);
            let mut printer = TranscriptPrinter::new(stdout);
            let reason = StreamingRecognizer::new(transport, StreamConfig::default())
                .run(source, &mut printer)
                .await?;
            info!("transcription stopped: {:?}", reason);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write as _;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_queue_commands() {
        let cli = parse(&["gsnip", "tasks", "pull", "my-project", "us-central1", "pull-q"]);
        match cli.command {
            Command::Tasks(TasksCommand::Pull(q)) => assert_eq!(
                q,
                QueueArgs {
                    project: "my-project".into(),
                    location: "us-central1".into(),
                    queue: "pull-q".into()
                }
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["gsnip", "tasks", "create", "p"]).is_err());
    }

    #[test]
    fn workflow_defaults_to_sample() {
        let cli = parse(&["gsnip", "workflows", "p", "us-central1"]);
        match cli.command {
            Command::Workflows(args) => {
                assert_eq!(args.workflow, "myFirstWorkflow");
                assert!(!args.deploy);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn signs_cdn_url_from_key_file() {
        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(key_file, "nZtRohdNF9m3cKM24IcK4w==").unwrap();
        let cli = parse(&[
            "gsnip",
            "cdn",
            "sign-url",
            "http://35.186.234.33/index.html",
            "--key-name",
            "my-key",
            "--key-file",
            key_file.path().to_str().unwrap(),
            "--expires-in",
            "10s",
        ]);
        let Command::Cdn(command) = cli.command else {
            panic!("expected cdn command");
        };
        let now = Utc.timestamp_opt(1_558_131_340, 0).unwrap();
        assert_eq!(
            sign_cdn(&command, now).unwrap(),
            concat!(
                "http://35.186.234.33/index.html?Expires=1558131350&KeyName=my-key",
                "&Signature=fm6JZSmKNsB5sys8VGr-JE4LiiE="
            )
        );
    }

    #[test]
    fn speech_reads_a_file_or_stdin() {
        let Command::Speech(args) = parse(&["gsnip", "speech", "-"]).command else {
            panic!("expected speech command");
        };
        assert_eq!(args.input, "-");
        assert!(Cli::try_parse_from(["gsnip", "speech"]).is_err());
    }

    #[test]
    fn printer_labels_each_transcript() {
        let mut printer = TranscriptPrinter::new(Vec::new());
        for (text, stream) in [("hello there", 1), ("goodbye", 2)] {
            printer.deliver(Transcript {
                text: text.into(),
                result_end_ms: 0,
                stream,
            });
        }
        assert_eq!(
            String::from_utf8(printer.out).unwrap(),
            "Transcript: hello there\nTranscript: goodbye\n"
        );
    }

    #[tokio::test]
    async fn missing_audio_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.raw");
        let result = open_audio(missing.to_str().unwrap()).await;
        assert!(matches!(result, Err(GsnipError::Io(_))));
    }

    #[test]
    fn bad_expiry_is_reported() {
        let key_file = tempfile::NamedTempFile::new().unwrap();
        let cli = parse(&[
            "gsnip",
            "media-cdn",
            "sign-cookie",
            "https://media.example.com/videos/",
            "--key-name",
            "k",
            "--key-file",
            key_file.path().to_str().unwrap(),
            "--expires-in",
            "soon",
        ]);
        let Command::MediaCdn(command) = cli.command else {
            panic!("expected media-cdn command");
        };
        assert!(matches!(
            sign_media_cdn(&command, Utc::now()),
            Err(GsnipError::Duration(_))
        ));
    }
}
