use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryboardError {
    /// Missing or empty user input. Raised before any request is sent.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Missing credentials or relay configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("No usable result: {0}")]
    EmptyResult(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoryboardError>;
