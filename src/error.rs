use gsnip_cdn::CdnError;
use gsnip_gcp::GcpError;
use gsnip_sessions::SessionError;
use gsnip_speech::SpeechError;
use gsnip_tasks::TasksError;
use thiserror::Error;

/// Everything the `gsnip` binary can fail with.
#[derive(Debug, Error)]
pub enum GsnipError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Gcp(#[from] GcpError),

    #[error(transparent)]
    Tasks(#[from] TasksError),

    #[error(transparent)]
    Cdn(#[from] CdnError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error("could not parse duration: {0}")]
    Duration(#[from] humantime::DurationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type GsnipResult<T> = Result<T, GsnipError>;
