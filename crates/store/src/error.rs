use tallyback_core::{DataError, WorkflowError};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A guarded command was refused; safe to show to the actor.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("database error: {0}")]
    Sqlite(#[source] rusqlite::Error),
    #[error("stored record is malformed: {0}")]
    Data(#[from] DataError),
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("migration {name} failed: {source}")]
    Migration {
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("token generation failed: {0}")]
    Token(String),
}

impl StoreError {
    pub fn as_workflow(&self) -> Option<&WorkflowError> {
        match self {
            Self::Workflow(e) => Some(e),
            _ => None,
        }
    }
}

/// Row mappers smuggle [`DataError`] through rusqlite as a conversion
/// failure; unwrap it so a malformed row surfaces as `Data`.
impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::FromSqlConversionFailure(idx, ty, inner) => {
                match inner.downcast::<DataError>() {
                    Ok(data) => Self::Data(*data),
                    Err(inner) => {
                        Self::Sqlite(rusqlite::Error::FromSqlConversionFailure(idx, ty, inner))
                    }
                }
            }
            other => Self::Sqlite(other),
        }
    }
}

impl From<tallyback_core::validate::ValidationError> for StoreError {
    fn from(e: tallyback_core::validate::ValidationError) -> Self {
        Self::Workflow(e.into())
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
