//! Entity descriptor passed to repositories at construction.
//!
//! # Responsibility
//! - Name the table, key column and creation timestamp column of one entity.
//! - Hold the column whitelist every SQL identifier is checked against.
//!
//! # Invariants
//! - After resolution, `columns` is non-empty and contains `primary_key`.
//! - Identifiers in a descriptor always match `[A-Za-z_][A-Za-z0-9_]*`.

use crate::query::sql::is_valid_identifier;
use crate::repo::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRIMARY_KEY: &str = "id";
pub const DEFAULT_CREATED_AT: &str = "created_at";

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

fn default_created_at() -> String {
    DEFAULT_CREATED_AT.to_string()
}

/// Static description of the entity type a repository is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Backing table name.
    pub table: String,
    /// Primary identifier column used by `find` and as the default target.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Creation timestamp column ranked by grouped reads.
    #[serde(default = "default_created_at")]
    pub created_at: String,
    /// Allowed columns. Empty means "every column of the table".
    #[serde(default)]
    pub columns: Vec<String>,
}

impl EntityDescriptor {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: default_primary_key(),
            created_at: default_created_at(),
            columns: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn with_created_at(mut self, column: impl Into<String>) -> Self {
        self.created_at = column.into();
        self
    }

    /// Restricts the repository to the listed columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|known| known == column)
    }

    /// Checks identifier syntax before the descriptor touches SQL.
    ///
    /// # Errors
    /// - `Configuration` for any malformed table or column name.
    pub fn validate(&self) -> RepoResult<()> {
        let named = [
            ("table", self.table.as_str()),
            ("primary key", self.primary_key.as_str()),
            ("created_at", self.created_at.as_str()),
        ];
        for (role, name) in named {
            if !is_valid_identifier(name) {
                return Err(RepoError::Configuration(format!(
                    "invalid {role} identifier `{name}`"
                )));
            }
        }
        for column in &self.columns {
            if !is_valid_identifier(column) {
                return Err(RepoError::Configuration(format!(
                    "invalid column identifier `{column}`"
                )));
            }
        }
        Ok(())
    }
}
