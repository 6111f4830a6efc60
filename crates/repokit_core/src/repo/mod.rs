//! Repository engine: CRUD, criteria folding and bulk statements.
//!
//! # Responsibility
//! - Define the caller-facing repository and criteria contracts.
//! - Keep SQL assembly inside the repository boundary.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidArgument`,
//!   `ConstraintViolation`) in addition to DB transport errors.

pub mod bulk;
pub mod error;
pub mod page;
pub mod repository;
