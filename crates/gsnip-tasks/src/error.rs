use gsnip_gcp::GcpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TasksError {
    #[error("{context}: {source}")]
    Api {
        context: &'static str,
        #[source]
        source: GcpError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TasksError {
    pub(crate) fn api(context: &'static str) -> impl FnOnce(GcpError) -> Self {
        move |source| Self::Api { context, source }
    }
}

pub type TasksResult<T> = Result<T, TasksError>;
