use thiserror::Error;
use uuid::Uuid;

/// Every failure a board action can report to its caller. None are fatal.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Rejected before any network call; the user can correct the input.
    #[error("{0}")]
    Validation(String),

    /// Secret word did not match; the post is kept.
    #[error("{0}")]
    Auth(String),

    /// The post is no longer in the store.
    #[error("post {0} not found")]
    NotFound(Uuid),

    /// The board store could not be reached or refused the request.
    #[error("posts unavailable: {0}")]
    Network(String),

    /// A prayer-time or geocoding provider failed.
    #[error("{0} unavailable")]
    Unavailable(String),

    /// Local profile storage could not be read or written.
    #[error("profile storage: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, BoardError>;

impl BoardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<std::io::Error> for BoardError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
