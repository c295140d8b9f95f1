use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    // Storage-facing errors. None of these are retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transient storage error: {0}")]
    TransientStorage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl AppError {
    /// Short machine-friendly label used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::UrlParse(_) => "url",
            AppError::SerdeJson(_) => "json",
            AppError::Auth(_) => "auth",
            AppError::TransientStorage(_) => "transient",
            AppError::NotFound(_) => "not_found",
            AppError::Storage(_) => "storage",
            AppError::Generic(_) => "generic",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
