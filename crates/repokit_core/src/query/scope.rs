//! Query scope: accumulated filter/ordering/pagination state.
//!
//! # Responsibility
//! - Record filter and ordering intent without touching storage.
//! - Provide by-value chaining so criteria fold as `scope -> scope`.
//!
//! # Invariants
//! - Filters combine with AND in insertion order.
//! - A default scope is unfiltered, unordered and unbounded.

use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Comparison operator of a single-value filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Lte),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Gte),
            "like" => Ok(Self::Like),
            "not like" => Ok(Self::NotLike),
            other => Err(format!(
                "unsupported operator `{other}`; expected =|!=|<>|<|<=|>|>=|like|not like"
            )),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One predicate in a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: String,
        operator: Operator,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    NotIn {
        column: String,
        values: Vec<Value>,
    },
    Null {
        column: String,
    },
    NotNull {
        column: String,
    },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Self::Compare { column, .. }
            | Self::In { column, .. }
            | Self::NotIn { column, .. }
            | Self::Null { column }
            | Self::NotNull { column } => column.as_str(),
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub direction: Direction,
}

/// Projection list for reads.
///
/// Serialized as a list of names; `["*"]` (or an empty list) means every column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum Columns {
    #[default]
    All,
    Only(Vec<String>),
}

impl Columns {
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from(columns.into_iter().map(Into::into).collect::<Vec<String>>())
    }
}

impl From<Vec<String>> for Columns {
    fn from(columns: Vec<String>) -> Self {
        if columns.is_empty() || columns.iter().any(|column| column == "*") {
            Self::All
        } else {
            Self::Only(columns)
        }
    }
}

impl From<Columns> for Vec<String> {
    fn from(columns: Columns) -> Self {
        match columns {
            Columns::All => vec!["*".to_string()],
            Columns::Only(columns) => columns,
        }
    }
}

/// Query-builder handle for one logical query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    filters: Vec<Filter>,
    orderings: Vec<Ordering>,
    limit: Option<u32>,
    offset: u32,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    pub fn where_op(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.filter(Filter::Compare {
            column: column.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(Filter::NotIn {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.filter(Filter::Null {
            column: column.into(),
        })
    }

    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.filter(Filter::NotNull {
            column: column.into(),
        })
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.orderings.push(Ordering {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    pub fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    pub fn offset_value(&self) -> u32 {
        self.offset
    }

    /// Drops ordering and pagination, keeping only filters.
    ///
    /// Aggregates (`count`, `sum`, `exists`) run over the filtered set.
    pub fn filters_only(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            ..Self::default()
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }

    /// Every column identifier the scope references.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(Filter::column)
            .chain(self.orderings.iter().map(|ordering| ordering.column.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Columns, Direction, Filter, Operator, Scope};
    use crate::model::value::Value;

    #[test]
    fn operator_parses_common_spellings() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!(" LIKE ".parse::<Operator>().unwrap(), Operator::Like);
        assert!("; drop".parse::<Operator>().is_err());
    }

    #[test]
    fn chaining_keeps_insertion_order() {
        let scope = Scope::new()
            .where_eq("title", "admin")
            .where_in("id", [1, 2])
            .order_by("id", Direction::Desc)
            .limit(5);

        assert_eq!(
            scope.filters()[0],
            Filter::Compare {
                column: "title".to_string(),
                operator: Operator::Eq,
                value: Value::from("admin"),
            }
        );
        assert_eq!(scope.filters()[1].column(), "id");
        assert_eq!(scope.limit_value(), Some(5));
        assert_eq!(
            scope.referenced_columns().collect::<Vec<_>>(),
            vec!["title", "id", "id"]
        );
    }

    #[test]
    fn filters_only_strips_ordering_and_pagination() {
        let scope = Scope::new()
            .where_null("deleted_at")
            .order_by("id", Direction::Asc)
            .limit(1)
            .offset(3);
        let stripped = scope.filters_only();
        assert_eq!(stripped.filters(), scope.filters());
        assert!(stripped.orderings().is_empty());
        assert_eq!(stripped.limit_value(), None);
        assert_eq!(stripped.offset_value(), 0);
    }

    #[test]
    fn star_means_all_columns() {
        let columns: Columns = serde_json::from_str(r#"["*"]"#).unwrap();
        assert_eq!(columns, Columns::All);
        assert_eq!(
            Columns::only(["id", "name"]),
            Columns::Only(vec!["id".to_string(), "name".to_string()])
        );
    }
}
