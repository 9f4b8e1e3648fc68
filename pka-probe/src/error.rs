use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid target URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unable to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}
