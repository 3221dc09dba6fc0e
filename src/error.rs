use thiserror::Error;

/// Errors that stop a scan before any task is started.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("concurrency must be between 1 and {max} (got {0})", max = crate::scanner::MAX_CONCURRENCY)]
    InvalidConcurrency(usize),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
