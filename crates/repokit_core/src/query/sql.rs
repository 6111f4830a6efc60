//! SQL fragment rendering for scopes and bulk statements.
//!
//! # Responsibility
//! - Render scopes into parameterized SQLite `WHERE`/`ORDER BY`/`LIMIT` text.
//! - Provide pure helpers for identifier quoting and placeholder lists.
//!
//! # Invariants
//! - Only identifiers are written into SQL text; values go to `params`.
//! - Callers pass identifiers already checked against schema metadata.

use crate::model::value::Value;
use crate::query::scope::{Columns, Filter, Operator, Scope};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSql {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Returns whether `name` is a plain SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Double-quotes one identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated quoted identifier list.
pub fn quote_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| quote_identifier(name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?, ?, ?` with `count` placeholders.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `(?, ?), (?, ?)` for a multi-row `VALUES` list.
pub fn values_rows(row_count: usize, width: usize) -> String {
    let row = format!("({})", placeholders(width));
    vec![row; row_count].join(", ")
}

/// `"a" = excluded."a", ...` assignments for an upsert.
pub fn excluded_assignments<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|column| {
            let quoted = quote_identifier(column.as_ref());
            format!("{quoted} = excluded.{quoted}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Projection list for `SELECT`.
pub fn projection(columns: &Columns) -> String {
    match columns {
        Columns::All => "*".to_string(),
        Columns::Only(columns) => quote_list(columns),
    }
}

/// Renders the scope filters as ` WHERE ...` (or nothing) and pushes params.
pub fn render_where(scope: &Scope, params: &mut Vec<Value>) -> String {
    if scope.is_unfiltered() {
        return String::new();
    }

    let clauses = scope
        .filters()
        .iter()
        .map(|filter| render_filter(filter, params))
        .collect::<Vec<_>>();
    format!(" WHERE {}", clauses.join(" AND "))
}

fn render_filter(filter: &Filter, params: &mut Vec<Value>) -> String {
    match filter {
        Filter::Compare {
            column,
            operator,
            value,
        } => {
            let column = quote_identifier(column);
            match (operator, value) {
                (Operator::Eq, Value::Null) => format!("{column} IS NULL"),
                (Operator::NotEq, Value::Null) => format!("{column} IS NOT NULL"),
                _ => {
                    params.push(value.clone());
                    format!("{column} {} ?", operator.as_sql())
                }
            }
        }
        Filter::In { column, values } => {
            if values.is_empty() {
                return "0 = 1".to_string();
            }
            params.extend(values.iter().cloned());
            format!(
                "{} IN ({})",
                quote_identifier(column),
                placeholders(values.len())
            )
        }
        Filter::NotIn { column, values } => {
            if values.is_empty() {
                return "1 = 1".to_string();
            }
            params.extend(values.iter().cloned());
            format!(
                "{} NOT IN ({})",
                quote_identifier(column),
                placeholders(values.len())
            )
        }
        Filter::Null { column } => format!("{} IS NULL", quote_identifier(column)),
        Filter::NotNull { column } => format!("{} IS NOT NULL", quote_identifier(column)),
    }
}

/// Renders ` ORDER BY ...` (or nothing).
pub fn render_order(scope: &Scope) -> String {
    if scope.orderings().is_empty() {
        return String::new();
    }

    let terms = scope
        .orderings()
        .iter()
        .map(|ordering| {
            format!(
                "{} {}",
                quote_identifier(&ordering.column),
                ordering.direction.as_sql()
            )
        })
        .collect::<Vec<_>>();
    format!(" ORDER BY {}", terms.join(", "))
}

/// Renders ` LIMIT ? OFFSET ?` (or nothing) and pushes params.
pub fn render_limit(scope: &Scope, params: &mut Vec<Value>) -> String {
    let offset = scope.offset_value();
    match scope.limit_value() {
        Some(limit) => {
            params.push(Value::from(limit));
            if offset > 0 {
                params.push(Value::from(offset));
                " LIMIT ? OFFSET ?".to_string()
            } else {
                " LIMIT ?".to_string()
            }
        }
        None if offset > 0 => {
            params.push(Value::from(offset));
            " LIMIT -1 OFFSET ?".to_string()
        }
        None => String::new(),
    }
}

/// Full `SELECT <columns> FROM <table> <scope>` statement.
pub fn select(table: &str, columns: &Columns, scope: &Scope) -> CompiledSql {
    let mut params = Vec::new();
    let mut sql = format!(
        "SELECT {} FROM {}",
        projection(columns),
        quote_identifier(table)
    );
    sql.push_str(&render_where(scope, &mut params));
    sql.push_str(&render_order(scope));
    sql.push_str(&render_limit(scope, &mut params));
    CompiledSql { sql, params }
}

/// `SELECT <expression> FROM <table> <filters>` for aggregates.
pub fn aggregate(table: &str, expression: &str, scope: &Scope) -> CompiledSql {
    let mut params = Vec::new();
    let mut sql = format!("SELECT {expression} FROM {}", quote_identifier(table));
    sql.push_str(&render_where(scope, &mut params));
    CompiledSql { sql, params }
}

#[cfg(test)]
mod tests {
    use super::{
        excluded_assignments, is_valid_identifier, quote_identifier, select, values_rows,
    };
    use crate::model::value::Value;
    use crate::query::scope::{Columns, Direction, Operator, Scope};

    #[test]
    fn identifier_check_rejects_sql_fragments() {
        assert!(is_valid_identifier("created_at"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier("1col"));
        assert!(!is_valid_identifier("name; --"));
        assert!(!is_valid_identifier(""));
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn values_rows_builds_one_group_per_row() {
        assert_eq!(values_rows(2, 3), "(?, ?, ?), (?, ?, ?)");
        assert_eq!(
            excluded_assignments(&["name", "age"]),
            "\"name\" = excluded.\"name\", \"age\" = excluded.\"age\""
        );
    }

    #[test]
    fn select_binds_values_instead_of_inlining() {
        let scope = Scope::new()
            .where_eq("title", "x' OR 1=1 --")
            .where_op("age", Operator::Gte, 18)
            .where_in("id", [1, 2])
            .order_by("id", Direction::Desc)
            .limit(10)
            .offset(20);

        let compiled = select("users", &Columns::only(["id", "title"]), &scope);
        assert_eq!(
            compiled.sql,
            "SELECT \"id\", \"title\" FROM \"users\" WHERE \"title\" = ? AND \"age\" >= ? \
             AND \"id\" IN (?, ?) ORDER BY \"id\" DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            compiled.params,
            vec![
                Value::from("x' OR 1=1 --"),
                Value::Integer(18),
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(10),
                Value::Integer(20),
            ]
        );
    }

    #[test]
    fn null_equality_renders_is_null() {
        let scope = Scope::new()
            .where_eq("parent_id", Value::Null)
            .where_in("id", Vec::<i64>::new());
        let compiled = select("nodes", &Columns::All, &scope);
        assert_eq!(
            compiled.sql,
            "SELECT * FROM \"nodes\" WHERE \"parent_id\" IS NULL AND 0 = 1"
        );
        assert!(compiled.params.is_empty());
    }
}
