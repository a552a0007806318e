use crate::model::ModelId;
use thiserror::Error;

// Postgres SQLSTATE codes.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Domain failures raised by the repositories and the order extractor.
///
/// Variants propagate to the HTTP boundary untranslated; the boundary owns the
/// mapping to status codes (see `executable_utils`).
#[derive(Error, Debug)]
pub enum OrderError {
    /// Required creation fields are missing or structurally wrong.
    #[error("Properties not set: {0}")]
    InvalidArgument(String),

    #[error("Incorrect order parameters: {0}")]
    IncorrectOrderParameters(String),

    /// The restaurant has no free capacity for the requested visit time.
    #[error("No place: {0}")]
    NoPlace(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: ModelId },

    /// A stored visit time does not follow the `(start,end)` range encoding.
    #[error("Malformed visit time: {0}")]
    MalformedVisitTime(String),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return OrderError::AlreadyExists(db_err.message().to_string());
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return OrderError::IncorrectOrderParameters(db_err.message().to_string());
                }
                _ => {}
            }
        }
        OrderError::Database(e)
    }
}

impl OrderError {
    pub fn not_found(entity: &'static str, id: ModelId) -> Self {
        OrderError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OrderError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
