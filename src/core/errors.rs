use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: status code {status_code}, message: {message}")]
    ServerError {
        status_code: u16,
        message: String,
    },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Transfer was superseded by a newer one")]
    Superseded,

    #[error("Client closed")]
    Closed,

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status_code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for the outcome of a pending transfer replaced by a newer call.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

/// Error alias
pub type Result<T, E = TransferError> = std::result::Result<T, E>;
