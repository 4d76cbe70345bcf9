use shopfront_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Catalog store error: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed product data: {0}")]
    Decode(String),

    #[error("Invalid query: {0}")]
    InvalidRequest(String),

    /// Every retry failed with a transient error.
    #[error("Gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

impl QueryError {
    /// Text for the results area. Distinct from an empty result set.
    pub fn user_message(&self) -> String {
        match self {
            QueryError::InvalidRequest(message) => message.clone(),
            QueryError::Store(_) | QueryError::Decode(_) | QueryError::Exhausted { .. } => {
                "Could not load products. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
