use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdnError {
    #[error("cannot read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("key file is not valid base64url: {0}")]
    KeyEncoding(#[from] base64::DecodeError),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

pub type CdnResult<T> = Result<T, CdnError>;
