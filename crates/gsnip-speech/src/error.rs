use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The service reported an error inside a response.
    #[error("could not recognize: {0}")]
    Recognition(String),

    #[error("cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("no credentials for the speech service: {0}")]
    Credentials(#[from] gsnip_gcp::GcpError),

    #[error("could not read audio: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpeechResult<T> = Result<T, SpeechError>;
