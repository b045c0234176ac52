//! Command line surface shared by `gimmeproj` and `gimme-acc`.

use crate::datastore::DatastorePoolStore;
use crate::error::{LeaseError, LeaseResult};
use crate::pool::{Pool, PoolKind, Resource};
use crate::store::PoolStore;
use chrono::Utc;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use gsnip_gcp::{ClientConfig, GcpClient};
use log::info;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const VERSION: &str = match option_env!("GSNIP_VERSION") {
    Some(v) => v,
    None => "dev",
};
const BUILD_DATE: &str = match option_env!("GSNIP_BUILD_DATE") {
    Some(d) => d,
    None => "unknown",
};

#[derive(Parser, Debug)]
#[command(about = "Lease resources from a pool managed in a meta project")]
pub struct LeaseCli {
    /// Meta project that manages the pool.
    #[arg(long)]
    pub project: Option<String>,
    /// Output format for `status`: empty for a table, or `list`.
    #[arg(long, default_value = "")]
    pub output: String,
    #[command(subcommand)]
    pub command: Option<LeaseCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LeaseCommand {
    /// Lease a resource for a duration (e.g. 10m, 1h30m). Prints its id to stdout.
    Lease { duration: Option<String> },
    /// Return a resource to the pool.
    Done { id: Option<String> },
    /// Add a resource to the pool.
    PoolAdd { id: Option<String> },
    /// Remove a resource from the pool.
    PoolRm { id: Option<String> },
    /// Show every resource and its remaining lease. Respects --output.
    Status,
    /// Print the version.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    List,
}

impl OutputFormat {
    fn parse(s: &str) -> LeaseResult<Self> {
        match s {
            "" => Ok(Self::Table),
            "list" => Ok(Self::List),
            _ => Err(LeaseError::Usage("output may be '', 'list'".to_string())),
        }
    }
}

impl LeaseCli {
    /// Parse `std::env::args` under the binary name for `kind`.
    pub fn parse_for(kind: PoolKind) -> Self {
        let matches = Self::command().name(kind.binary()).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }
}

pub fn version_line(kind: PoolKind) -> String {
    format!("{} {}; built at {}", kind.binary(), VERSION, BUILD_DATE)
}

fn usage(kind: PoolKind) -> String {
    LeaseCli::command().name(kind.binary()).render_help().to_string()
}

/// `10m`, `1h30m`, `59s`: humantime output without the spaces.
fn compact(d: Duration) -> String {
    humantime::format_duration(d).to_string().replace(' ', "")
}

fn required(arg: &Option<String>, what: &str) -> LeaseResult<String> {
    match arg {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => Err(LeaseError::Usage(format!("must provide {}", what))),
    }
}

/// Entry point for the binaries: resolve the store from flags and the
/// environment, then run the command against Datastore.
pub async fn run(kind: PoolKind, cli: LeaseCli) -> LeaseResult<()> {
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    if cli.command == Some(LeaseCommand::Version) {
        writeln!(stdout, "{}", version_line(kind))?;
        return Ok(());
    }

    let project = match cli.project {
        Some(ref p) if !p.is_empty() => p.clone(),
        _ => {
            return Err(LeaseError::Usage(format!(
                "--project flag is required.\n{}",
                usage(kind)
            )))
        }
    };
    let command = cli
        .command
        .clone()
        .ok_or_else(|| LeaseError::Usage(format!("Missing command.\n{}", usage(kind))))?;

    let client = GcpClient::new(ClientConfig::from_env().with_project(project.clone()))?;
    let store = DatastorePoolStore::new(Arc::new(client), project, kind);
    execute(&command, &cli.output, &store, &mut stdout, &mut stderr).await
}

/// Run one command against `store`, writing results the way the shell
/// scripts that call these tools expect: ids on stdout, chatter on stderr.
pub async fn execute<O, E>(
    command: &LeaseCommand,
    output: &str,
    store: &dyn PoolStore,
    stdout: &mut O,
    stderr: &mut E,
) -> LeaseResult<()>
where
    O: Write + Send,
    E: Write + Send,
{
    let kind = store.kind();
    match command {
        LeaseCommand::Version => {
            writeln!(stdout, "{}", version_line(kind))?;
        }
        LeaseCommand::Lease { duration } => {
            let raw = required(duration, "a duration (e.g. 10m)")?;
            let d = humantime::parse_duration(&raw)?;
            let mut leased: Option<Resource> = None;
            store
                .with_pool(&mut |pool: &mut Pool| {
                    leased = Some(pool.lease(d, Utc::now())?);
                    Ok(())
                })
                .await?;
            let resource = leased.ok_or(LeaseError::Exhausted(kind.noun()))?;
            info!("leased {} until {}", resource.id, resource.lease_expiry);
            writeln!(stderr, "Leased! {} is yours for {}.", resource.id, compact(d))?;
            write!(stdout, "{}", resource.id)?;
        }
        LeaseCommand::Done { id } => {
            let id = required(id, kind.id_noun())?;
            store
                .with_pool(&mut |pool: &mut Pool| pool.done(&id, Utc::now()))
                .await?;
            writeln!(stderr, "Returned {} to the pool.", id)?;
        }
        LeaseCommand::PoolAdd { id } => {
            let id = required(id, kind.id_noun())?;
            store.with_pool(&mut |pool: &mut Pool| pool.add(&id)).await?;
        }
        LeaseCommand::PoolRm { id } => {
            let id = required(id, kind.id_noun())?;
            store.with_pool(&mut |pool: &mut Pool| pool.remove(&id)).await?;
        }
        LeaseCommand::Status => {
            let format = OutputFormat::parse(output)?;
            let mut snapshot: Option<Pool> = None;
            store
                .with_pool(&mut |pool: &mut Pool| {
                    snapshot = Some(pool.clone());
                    Ok(())
                })
                .await?;
            let pool = snapshot.unwrap_or_else(|| Pool::new(kind));

            if format == OutputFormat::Table {
                writeln!(stdout, "{:<8} {}", "LEASE", kind.status_column())?;
            }
            for entry in pool.status(Utc::now()) {
                match format {
                    OutputFormat::Table => {
                        let lease = entry.remaining.map(compact).unwrap_or_default();
                        writeln!(stdout, "{:<8} {}", lease, entry.id)?;
                    }
                    OutputFormat::List => writeln!(stdout, "{}", entry.id)?,
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPoolStore;

    async fn run_cmd(
        store: &MemoryPoolStore,
        command: LeaseCommand,
        output: &str,
    ) -> (LeaseResult<()>, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = execute(&command, output, store, &mut out, &mut err).await;
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[tokio::test]
    async fn lease_prints_id_without_newline() {
        let store = MemoryPoolStore::new(PoolKind::Projects);
        run_cmd(&store, LeaseCommand::PoolAdd { id: Some("proj-a".into()) }, "")
            .await
            .0
            .unwrap();

        let (res, out, err) =
            run_cmd(&store, LeaseCommand::Lease { duration: Some("10m".into()) }, "").await;
        res.unwrap();
        assert_eq!(out, "proj-a");
        assert_eq!(err, "Leased! proj-a is yours for 10m.\n");

        let (res, _, _) =
            run_cmd(&store, LeaseCommand::Lease { duration: Some("10m".into()) }, "").await;
        assert_eq!(
            res.unwrap_err().to_string(),
            "Could not find a free project. Try again soon."
        );
    }

    #[tokio::test]
    async fn done_then_status() {
        let store = MemoryPoolStore::new(PoolKind::Projects);
        for id in ["p1", "p2"] {
            run_cmd(&store, LeaseCommand::PoolAdd { id: Some(id.into()) }, "")
                .await
                .0
                .unwrap();
        }
        run_cmd(&store, LeaseCommand::Lease { duration: Some("1h".into()) }, "")
            .await
            .0
            .unwrap();

        let (_, out, _) = run_cmd(&store, LeaseCommand::Status, "").await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "LEASE    PROJECT");
        assert!(lines[1].starts_with("59m59s") || lines[1].starts_with("1h "), "{}", lines[1]);
        assert!(lines[1].ends_with(" p1"));
        assert_eq!(lines[2], "         p2");

        let (res, _, err) = run_cmd(&store, LeaseCommand::Done { id: Some("p1".into()) }, "").await;
        res.unwrap();
        assert_eq!(err, "Returned p1 to the pool.\n");

        let (_, out, _) = run_cmd(&store, LeaseCommand::Status, "list").await;
        assert_eq!(out, "p1\np2\n");
    }

    #[tokio::test]
    async fn usage_errors() {
        let store = MemoryPoolStore::new(PoolKind::ServiceAccounts);
        let (res, _, _) = run_cmd(&store, LeaseCommand::Done { id: None }, "").await;
        assert_eq!(res.unwrap_err().to_string(), "must provide service account email");

        let (res, _, _) = run_cmd(&store, LeaseCommand::Status, "json").await;
        assert_eq!(res.unwrap_err().to_string(), "output may be '', 'list'");

        let (res, _, _) =
            run_cmd(&store, LeaseCommand::Lease { duration: Some("ten minutes".into()) }, "").await;
        assert!(matches!(res, Err(LeaseError::Duration(_))));

        let (res, _, _) = run_cmd(&store, LeaseCommand::PoolRm { id: Some("x".into()) }, "").await;
        assert_eq!(res.unwrap_err().to_string(), "x not in pool");
    }

    #[tokio::test]
    async fn service_account_status_header() {
        let store = MemoryPoolStore::new(PoolKind::ServiceAccounts);
        let (_, out, _) = run_cmd(&store, LeaseCommand::Status, "").await;
        assert_eq!(out, "LEASE    SERVICE ACCOUNT\n");
    }

    #[test]
    fn version_and_durations() {
        assert!(version_line(PoolKind::Projects).starts_with("gimmeproj "));
        assert!(version_line(PoolKind::ServiceAccounts).contains("; built at "));
        assert_eq!(compact(Duration::from_secs(5400)), "1h30m");
        assert_eq!(compact(Duration::from_secs(59)), "59s");
    }

    #[test]
    fn parses_kebab_case_commands() {
        let cli =
            LeaseCli::try_parse_from(["gimmeproj", "--project", "meta", "pool-add", "p1"]).unwrap();
        assert_eq!(cli.project.as_deref(), Some("meta"));
        assert_eq!(cli.command, Some(LeaseCommand::PoolAdd { id: Some("p1".into()) }));

        let cli = LeaseCli::try_parse_from(["gimmeproj", "--output", "list", "status"]).unwrap();
        assert_eq!(cli.output, "list");
        assert_eq!(cli.command, Some(LeaseCommand::Status));
    }
}
