use std::fmt::{self, Display};

use crate::error::{Error, HtmlError};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("{entity} already exists")]
    AlreadyExists { entity: &'static str },

    #[error("{entity} {id} disappeared mid-operation")]
    Vanished { entity: &'static str, id: i32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl QueryError {
    /// Maps unique-constraint violations onto `AlreadyExists`, everything else
    /// stays a database error.
    pub fn unique(entity: &'static str) -> impl Fn(sqlx::Error) -> QueryError {
        move |e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                QueryError::AlreadyExists { entity }
            }
            other => QueryError::Database(other),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::AlreadyExists { entity } => {
                HtmlError::InvalidRequest.new(format!("{entity} already exists."))
            }
            other => {
                log::error!("Storage failure: {other}");
                HtmlError::InternalServerError.default()
            }
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(value.info)
    }
}
