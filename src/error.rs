use thiserror::Error;

/// Failure of a single backend lookup. Never fatal to the process.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("backend rejected query: {0}")]
    Rejected(String),

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("reply delivery failed: {0}")]
    DeliveryFailed(String),
}

impl From<rusqlite::Error> for BackendError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => {
                BackendError::MalformedResponse(e.to_string())
            }
            other => BackendError::Unreachable(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::MalformedResponse(e.to_string())
        } else {
            BackendError::Unreachable(e.to_string())
        }
    }
}
