//! Error taxonomy shared by the store, the provider client and the use cases.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Absent locally and remotely, or the id could not be parsed.
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness checks (email, watchlist entry) that failed before a write.
    #[error("{0} already exists")]
    Conflict(String),

    /// The metadata provider failed or answered with a non-2xx status.
    #[error("provider error{}: {message}", status_suffix(.status))]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("store error: {0}")]
    Store(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Self::Store(format!("connection pool: {e}"))
    }
}

/// The request URL carries the API key, so it never reaches the message.
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        let message = if e.is_timeout() {
            "request timed out".to_string()
        } else {
            e.without_url().to_string()
        };
        Self::Provider { status, message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
