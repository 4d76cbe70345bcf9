use thiserror::Error;

/// Errors surfaced by a [`crate::CatalogBackend`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("Store rejected request ({status}): {message}")]
    Status { status: u16, message: String },

    /// A row still references (or would reference) a missing parent row.
    #[error("Foreign key violation on {table}.{column}: {message}")]
    ForeignKey {
        table: String,
        column: String,
        message: String,
    },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Failure injected by [`crate::MemoryBackend::fail_next`].
    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Whether repeating the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Injected(_) => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::ForeignKey { .. }
            | StoreError::UnknownTable(_)
            | StoreError::Decode(_)
            | StoreError::InvalidConfig(_) => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = StoreError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
        assert!(StoreError::Transport("reset".to_string()).is_transient());
    }

    #[test]
    fn client_errors_are_terminal() {
        let err = StoreError::Status {
            status: 400,
            message: "bad filter".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!StoreError::UnknownTable("nope".to_string()).is_transient());
    }
}
