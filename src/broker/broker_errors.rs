use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Session expired or invalid")]
    SessionExpired,

    #[error("Market data unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid broker response: {0}")]
    InvalidResponse(String),
}
