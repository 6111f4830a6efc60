//! Query state and SQL rendering.
//!
//! # Responsibility
//! - Model the query-builder handle (`Scope`) criteria fold over.
//! - Turn scopes into parameterized SQLite statements.

pub mod scope;
pub mod sql;
