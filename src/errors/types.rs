use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Form interaction failed: {0}")]
    FormFailed(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    BrowserError(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;

// headless_chrome surfaces anyhow errors
impl From<anyhow::Error> for ScraperError {
    fn from(err: anyhow::Error) -> Self {
        ScraperError::BrowserError(err.to_string())
    }
}
