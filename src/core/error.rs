use crate::mapping::MappingError;
use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaplError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown entity namespace alias '{0}'")]
    UnknownNamespace(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 4xx response. Carries the status so callers can tell "not found" apart.
    #[error("Client error {status} for '{uri}'")]
    ClientError {
        status: StatusCode,
        uri: String,
        body: String,
    },

    #[error("Server error {status} for '{uri}'")]
    ServerError {
        status: StatusCode,
        uri: String,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported wire format '{0}'")]
    UnsupportedFormat(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl RaplError {
    /// Status code of an HTTP error response, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::ClientError { status, .. } | Self::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ClientError { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub type Result<T> = std::result::Result<T, RaplError>;

impl<T> From<std::sync::PoisonError<T>> for RaplError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for RaplError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<std::io::Error> for RaplError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for RaplError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
