//! Repository error taxonomy.
//!
//! # Invariants
//! - Storage errors surface unchanged except constraint failures, which map
//!   to `ConstraintViolation`, and keyed lookups, which map to `NotFound`.

use crate::db::DbError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for repository, criteria and bulk operations.
#[derive(Debug)]
pub enum RepoError {
    /// Keyed single-record fetch matched nothing.
    NotFound { table: String, key: String },
    /// Malformed or empty caller input; no SQL was executed.
    InvalidArgument(String),
    /// Uniqueness/foreign-key failure not absorbed by ignore/upsert semantics.
    ConstraintViolation(String),
    /// Entity descriptor cannot be resolved against the schema.
    Configuration(String),
    Db(DbError),
    /// Fetched row cannot be hydrated into the entity type.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { table, key } => write!(f, "record not found in `{table}`: {key}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::ConstraintViolation(message) => {
                write!(f, "constraint violation: {message}")
            }
            Self::Configuration(message) => write!(f, "repository configuration error: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidArgument(_) => None,
            Self::ConstraintViolation(_) => None,
            Self::Configuration(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(
                    message
                        .clone()
                        .unwrap_or_else(|| failure.to_string()),
                )
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RepoError;
    use rusqlite::Connection;

    #[test]
    fn unique_failure_maps_to_constraint_violation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, code TEXT UNIQUE);
             INSERT INTO t (code) VALUES ('a');",
        )
        .unwrap();

        let err: RepoError = conn
            .execute("INSERT INTO t (code) VALUES ('a');", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepoError::ConstraintViolation(ref message) if message.contains("UNIQUE")));
    }

    #[test]
    fn other_sqlite_failures_stay_db_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err: RepoError = conn
            .execute("INSERT INTO missing (x) VALUES (1);", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepoError::Db(_)));
    }
}
