//! Repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD/aggregate APIs over one entity table.
//! - Accumulate pushed criteria and fold them into the scope before reads.
//!
//! # Invariants
//! - Reads and aggregates apply pending criteria first; writes never do.
//! - Each pending criterion is folded into the scope exactly once until
//!   `clear_scope` resets the repository.
//! - Per-call lookup filters are added to a copy of the scope, never to the
//!   repository scope itself.
//! - Every identifier written into SQL is one of the descriptor columns.

use crate::config::{RepositoryConfig, RepositoryOptions};
use crate::criteria::{fold_criteria, Criterion, RepositoryView};
use crate::model::descriptor::{EntityDescriptor, DEFAULT_PRIMARY_KEY};
use crate::model::record::{Attributes, Entity, Record};
use crate::model::value::Value;
use crate::query::scope::{Columns, Scope};
use crate::query::sql::{self, quote_identifier, quote_list, CompiledSql};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::page::Page;
use log::{debug, info};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Instant;

/// Row targeting for `update`/`delete`: one key or a set of keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    One(Value),
    Many(Vec<Value>),
}

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        Self::One(value)
    }
}

impl From<i64> for Target {
    fn from(value: i64) -> Self {
        Self::One(Value::Integer(value))
    }
}

impl From<i32> for Target {
    fn from(value: i32) -> Self {
        Self::One(Value::from(value))
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Self::One(Value::from(value))
    }
}

impl From<Vec<Value>> for Target {
    fn from(values: Vec<Value>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<i64>> for Target {
    fn from(values: Vec<i64>) -> Self {
        Self::Many(values.into_iter().map(Value::Integer).collect())
    }
}

/// CRUD contract exposed to callers.
pub trait CrudRepository<E: Entity> {
    /// Every matching record, projected to `columns`. No pagination.
    ///
    /// `None` projection uses the configured default columns here and below.
    fn all(&mut self, columns: Option<&Columns>) -> RepoResult<Vec<E>>;
    /// First page of matching records. `None` uses the configured page size.
    fn paginate(
        &mut self,
        per_page: Option<i64>,
        columns: Option<&Columns>,
    ) -> RepoResult<Page<E>>;
    /// Inserts one record and returns it re-read from storage.
    fn create(&self, attributes: Attributes) -> RepoResult<E>;
    /// Inserts many records in one statement; returns the inserted row count.
    fn create_many(&self, attribute_sets: &[Attributes]) -> RepoResult<usize>;
    /// Updates rows whose `by_attribute` matches `target`; returns affected rows.
    fn update(
        &self,
        target: impl Into<Target>,
        attributes: &Attributes,
        by_attribute: Option<&str>,
    ) -> RepoResult<usize>;
    /// Deletes rows whose `by_attribute` matches `target`; returns affected rows.
    fn delete(&self, target: impl Into<Target>, by_attribute: Option<&str>) -> RepoResult<usize>;
    /// Fetches one record by primary key or fails with `NotFound`.
    fn find(&mut self, id: impl Into<Value>, columns: Option<&Columns>) -> RepoResult<E>;
    /// First record whose `field` equals `value`, if any.
    fn find_by(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        columns: Option<&Columns>,
    ) -> RepoResult<Option<E>>;
    /// Every record whose `field` is in `values`.
    fn find_by_in(
        &mut self,
        field: &str,
        values: Vec<Value>,
        columns: Option<&Columns>,
    ) -> RepoResult<Vec<E>>;
}

/// Criteria engine contract.
pub trait CriteriaRepository {
    /// Pending criteria in push order.
    fn criteria(&self) -> &[Box<dyn Criterion>];
    fn push_criteria(&mut self, criterion: impl Criterion + 'static) -> &mut Self;
    /// Folds not-yet-applied criteria into the scope. Safe to call repeatedly.
    fn apply_criteria(&mut self) -> &mut Self;
    /// Drops all criteria and resets the scope to a fresh unfiltered one.
    fn clear_scope(&mut self) -> &mut Self;
}

/// SQLite-backed repository bound to one entity descriptor.
pub struct SqliteRepository<'conn, E = Record> {
    conn: &'conn Connection,
    descriptor: EntityDescriptor,
    options: RepositoryOptions,
    has_rowid: bool,
    scope: Scope,
    criteria: Vec<Box<dyn Criterion>>,
    applied: usize,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> SqliteRepository<'conn, E> {
    /// Binds a repository to `descriptor`, resolving its columns from the schema.
    ///
    /// # Errors
    /// - `Configuration` when identifiers are malformed, the table does not
    ///   exist, a declared column is missing, or the primary key is unknown.
    pub fn try_new(conn: &'conn Connection, descriptor: EntityDescriptor) -> RepoResult<Self> {
        let ResolvedTable {
            descriptor,
            has_rowid,
        } = resolve_descriptor(conn, descriptor)?;
        debug!(
            "event=repo_bind module=repo status=ok table={} columns={}",
            descriptor.table,
            descriptor.columns.len()
        );
        Ok(Self {
            conn,
            descriptor,
            has_rowid,
            options: RepositoryOptions::default(),
            scope: Scope::new(),
            criteria: Vec::new(),
            applied: 0,
            _entity: PhantomData,
        })
    }

    /// Builds a repository from a loaded configuration document.
    pub fn from_config(conn: &'conn Connection, config: &RepositoryConfig) -> RepoResult<Self> {
        Ok(Self::try_new(conn, config.entity.clone())?.with_options(config.options.clone()))
    }

    pub fn with_options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolved descriptor of the bound entity.
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Current scope (query-builder handle).
    pub fn builder(&self) -> &Scope {
        &self.scope
    }

    /// Mutable scope for escape-hatch narrowing outside the criteria list.
    pub fn builder_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// Number of rows in the criteria-applied scope.
    pub fn count(&mut self) -> RepoResult<u64> {
        let scope = self.read_scope()?;
        self.count_scope(&scope)
    }

    /// Sum of `column` over the criteria-applied scope.
    ///
    /// Integer columns sum exactly to `Value::Integer`; any real operand makes
    /// the result `Value::Real`. An empty scope sums to `Integer(0)`.
    pub fn sum(&mut self, column: &str) -> RepoResult<Value> {
        self.ensure_column(column)?;
        let scope = self.read_scope()?;
        let expression = format!("COALESCE(SUM({}), 0)", quote_identifier(column));
        let compiled = sql::aggregate(&self.descriptor.table, &expression, &scope.filters_only());
        let total = self.conn.query_row(
            &compiled.sql,
            params_from_iter(compiled.params.iter()),
            |row| row.get::<_, Value>(0),
        )?;
        self.log_read("sum", 1);
        Ok(total)
    }

    /// Values of `column` in scope order.
    pub fn pluck(&mut self, column: &str) -> RepoResult<Vec<Value>> {
        self.ensure_column(column)?;
        let scope = self.read_scope()?;
        let compiled = sql::select(
            &self.descriptor.table,
            &Columns::Only(vec![column.to_string()]),
            &scope,
        );
        let mut stmt = self.conn.prepare(&compiled.sql)?;
        let mut rows = stmt.query(params_from_iter(compiled.params.iter()))?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(row.get::<_, Value>(0)?);
        }
        self.log_read("pluck", values.len());
        Ok(values)
    }

    /// Mapping `key` -> `column` over the scope.
    ///
    /// Keys use their text form. On duplicate keys the last row in scope order
    /// wins.
    pub fn pluck_keyed(&mut self, column: &str, key: &str) -> RepoResult<BTreeMap<String, Value>> {
        self.ensure_column(column)?;
        self.ensure_column(key)?;
        let scope = self.read_scope()?;
        let compiled = sql::select(
            &self.descriptor.table,
            &Columns::Only(vec![key.to_string(), column.to_string()]),
            &scope,
        );
        let mut stmt = self.conn.prepare(&compiled.sql)?;
        let mut rows = stmt.query(params_from_iter(compiled.params.iter()))?;
        let mut mapping = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let key_value = row.get::<_, Value>(0)?;
            mapping.insert(key_value.to_key(), row.get::<_, Value>(1)?);
        }
        self.log_read("pluck_keyed", mapping.len());
        Ok(mapping)
    }

    /// Whether a row in scope has `column == value`. `None` means the primary key.
    pub fn exists(&mut self, value: impl Into<Value>, column: Option<&str>) -> RepoResult<bool> {
        let column = column
            .unwrap_or(self.descriptor.primary_key.as_str())
            .to_string();
        self.ensure_column(&column)?;
        let scope = self.read_scope()?.filters_only().where_eq(column, value);
        let inner = sql::aggregate(&self.descriptor.table, "1", &scope);
        let found = self.conn.query_row(
            &format!("SELECT EXISTS({})", inner.sql),
            params_from_iter(inner.params.iter()),
            |row| row.get::<_, bool>(0),
        )?;
        self.log_read("exists", usize::from(found));
        Ok(found)
    }

    /// Page `page` (1-based) of matching records.
    ///
    /// # Errors
    /// - `InvalidArgument` when `per_page <= 0` or `page == 0`.
    pub fn paginate_at(
        &mut self,
        per_page: Option<i64>,
        page: u32,
        columns: Option<&Columns>,
    ) -> RepoResult<Page<E>> {
        let per_page = per_page.unwrap_or(self.options.per_page);
        if per_page <= 0 {
            return Err(RepoError::InvalidArgument(format!(
                "per_page must be positive, got {per_page}"
            )));
        }
        let per_page = u32::try_from(per_page).map_err(|_| {
            RepoError::InvalidArgument(format!("per_page {per_page} is too large"))
        })?;
        if page == 0 {
            return Err(RepoError::InvalidArgument(
                "page numbers start at 1".to_string(),
            ));
        }
        let offset = (page - 1).checked_mul(per_page).ok_or_else(|| {
            RepoError::InvalidArgument(format!("page {page} is out of range"))
        })?;

        let columns = self.projection(columns)?;
        let scope = self.read_scope()?;
        let total = self.count_scope(&scope)?;
        let compiled = sql::select(
            &self.descriptor.table,
            &columns,
            &scope.limit(per_page).offset(offset),
        );
        let items = self.hydrate(self.fetch(&compiled)?)?;
        self.log_read("paginate", items.len());
        Ok(Page::new(items, total, per_page, page))
    }

    /// Runs a caller-written `SELECT` and returns raw records.
    ///
    /// Values must be passed through `params`; never format them into `sql`.
    pub fn select_raw(&self, sql: &str, params: &[Value]) -> RepoResult<Vec<Record>> {
        self.fetch(&CompiledSql {
            sql: sql.to_string(),
            params: params.to_vec(),
        })
    }

    /// Runs a caller-written write statement and returns affected rows.
    pub fn execute_raw(&self, sql: &str, params: &[Value]) -> RepoResult<usize> {
        Ok(self.conn.execute(sql, params_from_iter(params.iter()))?)
    }

    pub(crate) fn fetch(&self, compiled: &CompiledSql) -> RepoResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(&compiled.sql)?;
        let mut rows = stmt.query(params_from_iter(compiled.params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(Record::from_row(row)?);
        }
        Ok(records)
    }

    /// Column expression giving stable insertion order: `rowid`, or the
    /// primary key for `WITHOUT ROWID` tables.
    pub(crate) fn insertion_order(&self) -> String {
        if self.has_rowid {
            "rowid".to_string()
        } else {
            quote_identifier(&self.descriptor.primary_key)
        }
    }

    pub(crate) fn hydrate(&self, records: Vec<Record>) -> RepoResult<Vec<E>> {
        records.into_iter().map(E::from_record).collect()
    }

    /// Fails with `InvalidArgument` unless `column` is a descriptor column.
    pub(crate) fn ensure_column(&self, column: &str) -> RepoResult<()> {
        if sql::is_valid_identifier(column) && self.descriptor.has_column(column) {
            return Ok(());
        }
        Err(RepoError::InvalidArgument(format!(
            "unknown column `{column}` for table `{}`",
            self.descriptor.table
        )))
    }

    pub(crate) fn ensure_attribute_columns(&self, attributes: &Attributes) -> RepoResult<()> {
        attributes
            .keys()
            .try_for_each(|column| self.ensure_column(column))
    }

    /// Resolves an optional projection against the configured default and
    /// checks its columns.
    fn projection(&self, columns: Option<&Columns>) -> RepoResult<Columns> {
        let columns = columns.unwrap_or(&self.options.columns);
        if let Columns::Only(names) = columns {
            names
                .iter()
                .try_for_each(|column| self.ensure_column(column))?;
        }
        Ok(columns.clone())
    }

    fn ensure_scope(&self, scope: &Scope) -> RepoResult<()> {
        scope
            .referenced_columns()
            .try_for_each(|column| self.ensure_column(column))
    }

    /// Applies pending criteria and returns a validated copy of the scope.
    fn read_scope(&mut self) -> RepoResult<Scope> {
        self.apply_criteria();
        self.ensure_scope(&self.scope)?;
        Ok(self.scope.clone())
    }

    fn count_scope(&self, scope: &Scope) -> RepoResult<u64> {
        let compiled = sql::aggregate(&self.descriptor.table, "COUNT(*)", &scope.filters_only());
        let count = self.conn.query_row(
            &compiled.sql,
            params_from_iter(compiled.params.iter()),
            |row| row.get::<_, i64>(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn select_first(&self, scope: Scope, columns: &Columns) -> RepoResult<Option<E>> {
        let compiled = sql::select(&self.descriptor.table, columns, &scope.limit(1));
        let record = self.fetch(&compiled)?.into_iter().next();
        record.map(E::from_record).transpose()
    }

    /// Fresh scope targeting `by_attribute` with one key or a key set.
    fn target_scope(&self, target: Target, by_attribute: Option<&str>) -> RepoResult<Scope> {
        let column = by_attribute
            .or(self.options.by_attribute.as_deref())
            .unwrap_or(self.descriptor.primary_key.as_str());
        self.ensure_column(column)?;
        Ok(match target {
            Target::One(value) => Scope::new().where_eq(column, value),
            Target::Many(values) => Scope::new().where_in(column, values),
        })
    }

    fn log_read(&self, op: &str, rows: usize) {
        debug!(
            "event=repo_read module=repo status=ok op={op} table={} rows={rows} criteria={}",
            self.descriptor.table,
            self.criteria.len()
        );
    }

    pub(crate) fn log_write(&self, op: &str, rows: usize, started_at: Instant) {
        info!(
            "event=repo_write module=repo status=ok op={op} table={} rows={rows} duration_ms={}",
            self.descriptor.table,
            started_at.elapsed().as_millis()
        );
    }

    /// Shared multi-row insert used by `create_many` and bulk helpers.
    ///
    /// `verb` is a fixed statement prefix such as `INSERT` or `INSERT OR IGNORE`.
    pub(crate) fn insert_rows(&self, verb: &str, attribute_sets: &[Attributes]) -> RepoResult<usize> {
        let Some(first) = attribute_sets.first() else {
            return Err(RepoError::InvalidArgument(
                "at least one attribute set is required".to_string(),
            ));
        };
        if first.is_empty() {
            return Err(RepoError::InvalidArgument(
                "attribute sets must name at least one column".to_string(),
            ));
        }
        self.ensure_attribute_columns(first)?;

        let columns = first.keys().cloned().collect::<Vec<_>>();
        let mut params = Vec::with_capacity(columns.len() * attribute_sets.len());
        for (index, set) in attribute_sets.iter().enumerate() {
            if !set.keys().eq(first.keys()) {
                return Err(RepoError::InvalidArgument(format!(
                    "attribute set {index} does not match the columns of the first set"
                )));
            }
            params.extend(set.values().cloned());
        }

        let sql = format!(
            "{verb} INTO {} ({}) VALUES {}",
            quote_identifier(&self.descriptor.table),
            quote_list(&columns),
            sql::values_rows(attribute_sets.len(), columns.len())
        );
        Ok(self.conn.execute(&sql, params_from_iter(params.iter()))?)
    }
}

impl<E: Entity> CrudRepository<E> for SqliteRepository<'_, E> {
    fn all(&mut self, columns: Option<&Columns>) -> RepoResult<Vec<E>> {
        let columns = self.projection(columns)?;
        let scope = self.read_scope()?;
        let compiled = sql::select(&self.descriptor.table, &columns, &scope);
        let entities = self.hydrate(self.fetch(&compiled)?)?;
        self.log_read("all", entities.len());
        Ok(entities)
    }

    fn paginate(
        &mut self,
        per_page: Option<i64>,
        columns: Option<&Columns>,
    ) -> RepoResult<Page<E>> {
        self.paginate_at(per_page, 1, columns)
    }

    fn create(&self, attributes: Attributes) -> RepoResult<E> {
        let started_at = Instant::now();
        self.ensure_attribute_columns(&attributes)?;
        let primary_key = self.descriptor.primary_key.as_str();
        let keyed = attributes.get(primary_key).is_some_and(|id| !id.is_null());
        if !self.has_rowid && !keyed {
            return Err(RepoError::InvalidArgument(format!(
                "table `{}` has no rowid; `{primary_key}` must be provided",
                self.descriptor.table
            )));
        }
        let table = quote_identifier(&self.descriptor.table);

        if attributes.is_empty() {
            self.conn
                .execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])?;
        } else {
            let columns = attributes.keys().cloned().collect::<Vec<_>>();
            let sql = format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                quote_list(&columns),
                sql::placeholders(columns.len())
            );
            self.conn
                .execute(&sql, params_from_iter(attributes.values()))?;
        }

        let reread = match attributes.get(primary_key) {
            Some(id) if !id.is_null() => CompiledSql {
                sql: format!(
                    "SELECT * FROM {table} WHERE {} = ?",
                    quote_identifier(primary_key)
                ),
                params: vec![id.clone()],
            },
            _ => CompiledSql {
                sql: format!("SELECT * FROM {table} WHERE rowid = ?"),
                params: vec![Value::Integer(self.conn.last_insert_rowid())],
            },
        };
        let record = self.fetch(&reread)?.into_iter().next().ok_or_else(|| {
            RepoError::InvalidData(format!(
                "created row in `{}` could not be read back",
                self.descriptor.table
            ))
        })?;
        self.log_write("create", 1, started_at);
        E::from_record(record)
    }

    fn create_many(&self, attribute_sets: &[Attributes]) -> RepoResult<usize> {
        if attribute_sets.is_empty() {
            return Ok(0);
        }
        let started_at = Instant::now();
        let inserted = self.insert_rows("INSERT", attribute_sets)?;
        self.log_write("create_many", inserted, started_at);
        Ok(inserted)
    }

    fn update(
        &self,
        target: impl Into<Target>,
        attributes: &Attributes,
        by_attribute: Option<&str>,
    ) -> RepoResult<usize> {
        let started_at = Instant::now();
        if attributes.is_empty() {
            return Err(RepoError::InvalidArgument(
                "update requires at least one attribute".to_string(),
            ));
        }
        self.ensure_attribute_columns(attributes)?;
        let target = target.into();
        if matches!(&target, Target::Many(values) if values.is_empty()) {
            return Ok(0);
        }
        let scope = self.target_scope(target, by_attribute)?;

        let assignments = attributes
            .keys()
            .map(|column| format!("{} = ?", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut params = attributes.values().cloned().collect::<Vec<_>>();
        let sql = format!(
            "UPDATE {} SET {assignments}{}",
            quote_identifier(&self.descriptor.table),
            sql::render_where(&scope, &mut params)
        );
        let changed = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        self.log_write("update", changed, started_at);
        Ok(changed)
    }

    fn delete(&self, target: impl Into<Target>, by_attribute: Option<&str>) -> RepoResult<usize> {
        let started_at = Instant::now();
        let target = target.into();
        if matches!(&target, Target::Many(values) if values.is_empty()) {
            return Ok(0);
        }
        let scope = self.target_scope(target, by_attribute)?;

        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {}{}",
            quote_identifier(&self.descriptor.table),
            sql::render_where(&scope, &mut params)
        );
        let changed = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        self.log_write("delete", changed, started_at);
        Ok(changed)
    }

    fn find(&mut self, id: impl Into<Value>, columns: Option<&Columns>) -> RepoResult<E> {
        let id = id.into();
        let columns = self.projection(columns)?;
        let scope = self
            .read_scope()?
            .where_eq(self.descriptor.primary_key.clone(), id.clone());
        let found = self.select_first(scope, &columns)?;
        self.log_read("find", usize::from(found.is_some()));
        found.ok_or_else(|| RepoError::NotFound {
            table: self.descriptor.table.clone(),
            key: id.to_string(),
        })
    }

    fn find_by(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        columns: Option<&Columns>,
    ) -> RepoResult<Option<E>> {
        self.ensure_column(field)?;
        let columns = self.projection(columns)?;
        let scope = self.read_scope()?.where_eq(field, value);
        let found = self.select_first(scope, &columns)?;
        self.log_read("find_by", usize::from(found.is_some()));
        Ok(found)
    }

    fn find_by_in(
        &mut self,
        field: &str,
        values: Vec<Value>,
        columns: Option<&Columns>,
    ) -> RepoResult<Vec<E>> {
        self.ensure_column(field)?;
        let columns = self.projection(columns)?;
        let scope = self.read_scope()?.where_in(field, values);
        let compiled = sql::select(&self.descriptor.table, &columns, &scope);
        let entities = self.hydrate(self.fetch(&compiled)?)?;
        self.log_read("find_by_in", entities.len());
        Ok(entities)
    }
}

impl<E: Entity> CriteriaRepository for SqliteRepository<'_, E> {
    fn criteria(&self) -> &[Box<dyn Criterion>] {
        &self.criteria
    }

    fn push_criteria(&mut self, criterion: impl Criterion + 'static) -> &mut Self {
        self.criteria.push(Box::new(criterion));
        self
    }

    fn apply_criteria(&mut self) -> &mut Self {
        if self.applied == self.criteria.len() {
            return self;
        }

        let scope = std::mem::take(&mut self.scope);
        let pending = &self.criteria[self.applied..];
        let view: &dyn RepositoryView = &*self;
        let scope = fold_criteria(pending, scope, view);
        self.scope = scope;
        self.applied = self.criteria.len();
        self
    }

    fn clear_scope(&mut self) -> &mut Self {
        self.criteria.clear();
        self.scope = Scope::new();
        self.applied = 0;
        self
    }
}

impl<E> RepositoryView for SqliteRepository<'_, E> {
    fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    fn pending_criteria(&self) -> &[Box<dyn Criterion>] {
        &self.criteria
    }
}

/// Schema facts resolved once at bind time.
struct ResolvedTable {
    descriptor: EntityDescriptor,
    has_rowid: bool,
}

/// Checks the descriptor against live schema and fills in its columns.
///
/// A descriptor still carrying the default `id` key adopts the table's
/// single-column primary key when the table has no `id` column.
fn resolve_descriptor(
    conn: &Connection,
    mut descriptor: EntityDescriptor,
) -> RepoResult<ResolvedTable> {
    descriptor.validate()?;

    let mut stmt = conn.prepare("SELECT name, pk FROM pragma_table_info(?1) ORDER BY cid;")?;
    let table_columns = stmt
        .query_map([descriptor.table.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    if table_columns.is_empty() {
        return Err(RepoError::Configuration(format!(
            "table `{}` does not exist",
            descriptor.table
        )));
    }

    let names = table_columns
        .iter()
        .map(|(name, _)| name.clone())
        .collect::<Vec<_>>();
    if descriptor.primary_key == DEFAULT_PRIMARY_KEY
        && !names.contains(&descriptor.primary_key)
    {
        let key_columns = table_columns
            .iter()
            .filter(|(_, pk)| *pk > 0)
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        if let [key] = key_columns.as_slice() {
            descriptor.primary_key = (*key).clone();
        }
    }

    if descriptor.columns.is_empty() {
        descriptor.columns = names;
    } else if let Some(missing) = descriptor
        .columns
        .iter()
        .find(|column| !names.contains(column))
    {
        return Err(RepoError::Configuration(format!(
            "column `{missing}` does not exist in table `{}`",
            descriptor.table
        )));
    }

    if !descriptor.has_column(&descriptor.primary_key) {
        return Err(RepoError::Configuration(format!(
            "primary key `{}` is not a column of `{}`",
            descriptor.primary_key, descriptor.table
        )));
    }

    let without_rowid = conn
        .query_row(
            "SELECT wr FROM pragma_table_list(?1) LIMIT 1;",
            [descriptor.table.as_str()],
            |row| row.get::<_, bool>(0),
        )
        .optional()?
        .unwrap_or(false);

    Ok(ResolvedTable {
        descriptor,
        has_rowid: !without_rowid,
    })
}
