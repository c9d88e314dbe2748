use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unable to locate target text '{label}' in page at {url}")]
    TargetNotFound { label: String, url: String },

    #[error("target slice (offset {offset}, length {length}) out of range for page at {url}")]
    TargetOutOfRange {
        url: String,
        offset: i64,
        length: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("notification send failed: {0}")]
    Notify(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl From<tokio_cron_scheduler::JobSchedulerError> for AppError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        AppError::Scheduler(err.to_string())
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
