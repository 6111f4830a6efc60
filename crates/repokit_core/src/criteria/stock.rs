//! Stock criteria for common filters and orderings.

use super::{Criterion, RepositoryView};
use crate::model::value::Value;
use crate::query::scope::{Direction, Operator, Scope};

/// `column = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereEquals {
    column: String,
    value: Value,
}

impl WhereEquals {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

impl Criterion for WhereEquals {
    fn apply(&self, scope: Scope, _repository: &dyn RepositoryView) -> Scope {
        scope.where_eq(self.column.clone(), self.value.clone())
    }
}

/// `column <op> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereCompare {
    column: String,
    operator: Operator,
    value: Value,
}

impl WhereCompare {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

impl Criterion for WhereCompare {
    fn apply(&self, scope: Scope, _repository: &dyn RepositoryView) -> Scope {
        scope.where_op(self.column.clone(), self.operator, self.value.clone())
    }
}

/// `column IN (values)`; an empty set matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereIn {
    column: String,
    values: Vec<Value>,
}

impl WhereIn {
    pub fn new<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Criterion for WhereIn {
    fn apply(&self, scope: Scope, _repository: &dyn RepositoryView) -> Scope {
        scope.where_in(self.column.clone(), self.values.iter().cloned())
    }
}

/// `column IS NULL` (or `IS NOT NULL` when negated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereNull {
    column: String,
    negated: bool,
}

impl WhereNull {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            negated: false,
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            negated: true,
        }
    }
}

impl Criterion for WhereNull {
    fn apply(&self, scope: Scope, _repository: &dyn RepositoryView) -> Scope {
        if self.negated {
            scope.where_not_null(self.column.clone())
        } else {
            scope.where_null(self.column.clone())
        }
    }
}

/// Appends one ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    column: String,
    direction: Direction,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

impl Criterion for OrderBy {
    fn apply(&self, scope: Scope, _repository: &dyn RepositoryView) -> Scope {
        scope.order_by(self.column.clone(), self.direction)
    }
}

/// Caps the row count of list reads. Ignored by aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub u32);

impl Criterion for Limit {
    fn apply(&self, scope: Scope, _repository: &dyn RepositoryView) -> Scope {
        scope.limit(self.0)
    }
}
