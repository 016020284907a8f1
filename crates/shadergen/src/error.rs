use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("invalid generation endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Service(String),
    #[error("malformed generation response: {0}")]
    Schema(String),
}
