//! Generic repository and criteria engine over SQLite.
//! Callers bind a repository to one entity table, push criteria, then read.

pub mod config;
pub mod criteria;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use config::{RepositoryConfig, RepositoryOptions, DEFAULT_PER_PAGE};
pub use criteria::{
    Criterion, FnCriterion, Limit, OrderBy, RepositoryView, WhereCompare, WhereEquals, WhereIn,
    WhereNull,
};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
};
pub use model::descriptor::EntityDescriptor;
pub use model::record::{Attributes, Entity, Record};
pub use model::value::Value;
pub use query::scope::{Columns, Direction, Filter, Operator, Scope};
pub use repo::bulk::{AttributeSets, GroupedWhere};
pub use repo::error::{RepoError, RepoResult};
pub use repo::page::Page;
pub use repo::repository::{CriteriaRepository, CrudRepository, SqliteRepository, Target};

/// Builds an attribute map from `(column, value)` pairs.
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(column, value)| (column.into(), value.into()))
        .collect()
}

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{attributes, core_version, ping, Value};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn attributes_collects_pairs() {
        let attrs = attributes([("name", Value::from("x")), ("age", Value::from(3))]);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["age"], Value::Integer(3));
    }
}
