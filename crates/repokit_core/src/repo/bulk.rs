//! Bulk writes and grouped reads that bypass the scope abstraction.
//!
//! # Responsibility
//! - Multi-row insert-if-absent and multi-row upsert in one statement each.
//! - Top-N-per-group reads ranked by the creation timestamp.
//!
//! # Invariants
//! - Table/column names come from the resolved descriptor; values are bound.
//! - Empty inputs fail with `InvalidArgument` before any SQL is built.
//! - Every write here is a single statement, so it applies fully or not at all.

use crate::model::record::{Attributes, Entity, Record};
use crate::model::value::Value;
use crate::query::scope::{Operator, Scope};
use crate::query::sql::{self, quote_identifier, quote_list, CompiledSql};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::repository::SqliteRepository;
use log::info;
use rusqlite::params_from_iter;
use std::collections::BTreeSet;
use std::time::Instant;

const RANK_COLUMN: &str = "__group_rank";

/// One or many attribute sets for insert-if-absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSets(Vec<Attributes>);

impl AttributeSets {
    pub fn as_slice(&self) -> &[Attributes] {
        &self.0
    }
}

impl From<Attributes> for AttributeSets {
    fn from(set: Attributes) -> Self {
        Self(vec![set])
    }
}

impl From<Vec<Attributes>> for AttributeSets {
    fn from(sets: Vec<Attributes>) -> Self {
        Self(sets)
    }
}

/// Optional post-ranking filter for [`SqliteRepository::last_grouped`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedWhere {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl GroupedWhere {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Builds a filter from an operator string such as `"="` or `">="`.
    ///
    /// # Errors
    /// - `InvalidArgument` for unsupported operators.
    pub fn parse(
        column: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> RepoResult<Self> {
        let operator = operator.parse::<Operator>().map_err(RepoError::InvalidArgument)?;
        Ok(Self::new(column, operator, value))
    }
}

impl<E: Entity> SqliteRepository<'_, E> {
    /// Inserts each set unless it collides with a uniqueness constraint.
    ///
    /// At least one inserted column must be covered by a PRIMARY KEY or UNIQUE
    /// constraint; otherwise every row is inserted. Returns rows actually
    /// inserted.
    ///
    /// # Errors
    /// - `InvalidArgument` for no sets, empty sets, mismatched column sets or
    ///   unknown columns.
    pub fn insert_where_not_exist(&self, sets: impl Into<AttributeSets>) -> RepoResult<usize> {
        let started_at = Instant::now();
        let sets = sets.into();
        let inserted = self.insert_rows("INSERT OR IGNORE", sets.as_slice())?;
        log_bulk(
            "insert_where_not_exist",
            &self.descriptor().table,
            sets.as_slice().len(),
            inserted,
            started_at,
        );
        Ok(inserted)
    }

    /// Upserts `rows` aligned to `(id_column, columns...)` in one statement.
    ///
    /// Existing ids get every listed column overwritten; new ids are inserted.
    /// `id_column` must carry a PRIMARY KEY or UNIQUE constraint.
    ///
    /// # Errors
    /// - `InvalidArgument` for empty `columns`/`rows`, duplicate or unknown
    ///   columns, or rows whose width is not `columns.len() + 1`.
    pub fn update_many<S: AsRef<str>>(
        &self,
        id_column: &str,
        columns: &[S],
        rows: &[Vec<Value>],
    ) -> RepoResult<usize> {
        let started_at = Instant::now();
        if columns.is_empty() {
            return Err(RepoError::InvalidArgument(
                "update_many requires at least one column to update".to_string(),
            ));
        }
        if rows.is_empty() {
            return Err(RepoError::InvalidArgument(
                "update_many requires at least one row".to_string(),
            ));
        }

        let mut all_columns = Vec::with_capacity(columns.len() + 1);
        all_columns.push(id_column.to_string());
        all_columns.extend(columns.iter().map(|column| column.as_ref().to_string()));
        let mut seen = BTreeSet::new();
        for column in &all_columns {
            self.ensure_column(column)?;
            if !seen.insert(column.as_str()) {
                return Err(RepoError::InvalidArgument(format!(
                    "column `{column}` is listed more than once"
                )));
            }
        }

        let width = all_columns.len();
        let mut params = Vec::with_capacity(width * rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(RepoError::InvalidArgument(format!(
                    "row {index} has {} values, expected {width}",
                    row.len()
                )));
            }
            params.extend(row.iter().cloned());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT({}) DO UPDATE SET {}",
            quote_identifier(&self.descriptor().table),
            quote_list(&all_columns),
            sql::values_rows(rows.len(), width),
            quote_identifier(id_column),
            sql::excluded_assignments(&all_columns[1..])
        );
        let changed = self
            .connection()
            .execute(&sql, params_from_iter(params.iter()))?;
        log_bulk(
            "update_many",
            &self.descriptor().table,
            rows.len(),
            changed,
            started_at,
        );
        Ok(changed)
    }

    /// Latest `count` rows per distinct `group_by` value.
    ///
    /// Rows rank by the creation timestamp descending; equal timestamps keep
    /// insertion (rowid) order, or primary-key order for `WITHOUT ROWID` tables. `filter` applies to ranked rows, so it narrows
    /// the result without promoting lower-ranked rows. Pending criteria are not
    /// applied. Results are ordered by group, then rank.
    ///
    /// # Errors
    /// - `InvalidArgument` for `count == 0`, unknown columns, or an entity
    ///   without its creation timestamp column.
    pub fn last_grouped(
        &self,
        count: u32,
        group_by: &str,
        filter: Option<GroupedWhere>,
    ) -> RepoResult<Vec<E>> {
        let started_at = Instant::now();
        if count == 0 {
            return Err(RepoError::InvalidArgument(
                "last_grouped count must be positive".to_string(),
            ));
        }
        self.ensure_column(group_by)?;
        let created_at = self.created_at_column()?;

        let mut outer = Scope::new().where_op(RANK_COLUMN, Operator::Lte, count);
        if let Some(filter) = filter {
            self.ensure_column(&filter.column)?;
            outer = outer.where_op(filter.column, filter.operator, filter.value);
        }

        let group = quote_identifier(group_by);
        let rank = quote_identifier(RANK_COLUMN);
        let mut params = Vec::new();
        let where_clause = sql::render_where(&outer, &mut params);
        let compiled = CompiledSql {
            sql: format!(
                "SELECT * FROM (
                    SELECT *, ROW_NUMBER() OVER (
                        PARTITION BY {group}
                        ORDER BY {} DESC, {} ASC
                    ) AS {rank}
                    FROM {}
                ){where_clause}
                ORDER BY {group} ASC, {rank} ASC",
                quote_identifier(&created_at),
                self.insertion_order(),
                quote_identifier(&self.descriptor().table),
            ),
            params,
        };

        let records = self
            .fetch(&compiled)?
            .into_iter()
            .map(|record| {
                let mut attributes = record.into_attributes();
                attributes.remove(RANK_COLUMN);
                Record::new(attributes)
            })
            .collect::<Vec<_>>();
        log_bulk(
            "last_grouped",
            &self.descriptor().table,
            records.len(),
            records.len(),
            started_at,
        );
        self.hydrate(records)
    }

    fn created_at_column(&self) -> RepoResult<String> {
        let descriptor = self.descriptor();
        if descriptor.has_column(&descriptor.created_at) {
            return Ok(descriptor.created_at.clone());
        }
        Err(RepoError::InvalidArgument(format!(
            "table `{}` has no creation timestamp column `{}`",
            descriptor.table, descriptor.created_at
        )))
    }
}

fn log_bulk(op: &str, table: &str, input_rows: usize, affected: usize, started_at: Instant) {
    info!(
        "event=repo_bulk module=repo status=ok op={op} table={table} input_rows={input_rows} affected={affected} duration_ms={}",
        started_at.elapsed().as_millis()
    );
}
