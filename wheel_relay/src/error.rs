use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed JSON payload: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("relay hub has shut down")]
    HubClosed,
}
