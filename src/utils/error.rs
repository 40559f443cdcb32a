use thiserror::Error;

/// Failures while loading a page in the headless browser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("Could not read page content: {0}")]
    Content(String),

    #[error("Browser task aborted: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Refresh failed: {0}")]
    Refresh(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Generated match id {id} was already issued")]
    IdCollision { id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Failures a refresh cycle can produce. Readers see them as the pending
    /// placeholder, never as a fault.
    pub fn is_cycle_failure(&self) -> bool {
        matches!(
            self,
            AppError::Fetch(_) | AppError::Extraction(_) | AppError::Refresh(_)
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
