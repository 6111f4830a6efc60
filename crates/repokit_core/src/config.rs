//! Repository configuration documents.
//!
//! # Responsibility
//! - Hold per-repository defaults (projection, page size, targeting column).
//! - Load entity descriptor + defaults from JSON.
//!
//! # Invariants
//! - Missing fields fall back to `columns=["*"]`, `per_page=15` and the
//!   primary key as targeting column.

use crate::model::descriptor::EntityDescriptor;
use crate::query::scope::Columns;
use crate::repo::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default page size for `paginate`.
pub const DEFAULT_PER_PAGE: i64 = 15;

/// Call defaults applied when an operation argument is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryOptions {
    /// Projection used by callers that do not pick columns.
    pub columns: Columns,
    pub per_page: i64,
    /// Targeting column for `update`/`delete`. `None` means the primary key.
    pub by_attribute: Option<String>,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            columns: Columns::All,
            per_page: DEFAULT_PER_PAGE,
            by_attribute: None,
        }
    }
}

/// Entity binding plus call defaults for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub entity: EntityDescriptor,
    #[serde(default)]
    pub options: RepositoryOptions,
}

impl RepositoryConfig {
    pub fn new(entity: EntityDescriptor) -> Self {
        Self {
            entity,
            options: RepositoryOptions::default(),
        }
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    /// - `Configuration` when the document is malformed or names invalid
    ///   identifiers.
    pub fn from_json_str(text: &str) -> RepoResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|err| RepoError::Configuration(format!("invalid repository config: {err}")))?;
        config.entity.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            RepoError::Configuration(format!(
                "failed to read repository config `{}`: {err}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::{RepositoryConfig, RepositoryOptions, DEFAULT_PER_PAGE};
    use crate::query::scope::Columns;
    use crate::repo::error::RepoError;

    #[test]
    fn options_default_to_all_columns_and_fifteen_per_page() {
        let options = RepositoryOptions::default();
        assert_eq!(options.columns, Columns::All);
        assert_eq!(options.per_page, DEFAULT_PER_PAGE);
        assert_eq!(options.by_attribute, None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RepositoryConfig::from_json_str(
            r#"{"entity":{"table":"posts","primary_key":"post_id"},"options":{"per_page":50}}"#,
        )
        .unwrap();
        assert_eq!(config.entity.primary_key, "post_id");
        assert_eq!(config.options.per_page, 50);
        assert_eq!(config.options.columns, Columns::All);
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = RepositoryConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, RepoError::Configuration(_)));
    }
}
