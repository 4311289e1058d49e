use thiserror::Error;

/// Fatal failures of the sweep pipeline. Nothing here is recoverable: every
/// variant propagates to `main` and terminates the run before any CSV is
/// written.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("invalid argument for model: {0}")]
    InvalidModelVariant(String),

    #[error("malformed dataset file {path}: {reason}")]
    MalformedDataset { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}
