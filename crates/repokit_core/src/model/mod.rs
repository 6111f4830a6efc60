//! Entity model shared by repositories and criteria.
//!
//! # Responsibility
//! - Define dynamic values, records and the hydration contract.
//! - Describe which table/columns an entity maps onto.
//!
//! # Invariants
//! - A repository is bound to exactly one `EntityDescriptor` for its lifetime.

pub mod descriptor;
pub mod record;
pub mod value;
