use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("font error: {0}")]
    Font(String),
    #[error("asset error: {0}")]
    Asset(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("cannot render report: {0}")]
    Render(String),
    #[error("invalid request: {0}")]
    Request(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
