use shopfront_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Catalog store error: {0}")]
    Store(#[from] StoreError),

    /// Rejected before reaching the store; `field` names the offending form field.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Malformed {table} row: {message}")]
    Decode {
        table: &'static str,
        message: String,
    },
}

impl TaxonomyError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        TaxonomyError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Form field to attach this error to, if it is field-scoped.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            TaxonomyError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaxonomyError>;
