//! Composable query criteria.
//!
//! # Responsibility
//! - Define the single capability every criterion implements: `scope -> scope`.
//! - Provide stock filter/ordering criteria and a closure adapter.
//!
//! # Invariants
//! - `apply` never mutates the criterion itself.
//! - Criteria only see a read-only repository view, so they cannot push
//!   further criteria while being applied.

use crate::model::descriptor::EntityDescriptor;
use crate::query::scope::Scope;
use std::fmt::{Debug, Formatter};

mod stock;

pub use stock::{Limit, OrderBy, WhereCompare, WhereEquals, WhereIn, WhereNull};

/// Read-only repository state visible to criteria.
pub trait RepositoryView {
    /// Descriptor of the bound entity.
    fn descriptor(&self) -> &EntityDescriptor;
    /// Pending criteria in push order.
    fn pending_criteria(&self) -> &[Box<dyn Criterion>];
}

/// One composable narrowing step over a scope.
pub trait Criterion {
    fn apply(&self, scope: Scope, repository: &dyn RepositoryView) -> Scope;
}

/// Criterion backed by a closure.
pub struct FnCriterion<F> {
    apply: F,
}

impl<F> FnCriterion<F>
where
    F: Fn(Scope, &dyn RepositoryView) -> Scope,
{
    pub fn new(apply: F) -> Self {
        Self { apply }
    }
}

impl<F> Criterion for FnCriterion<F>
where
    F: Fn(Scope, &dyn RepositoryView) -> Scope,
{
    fn apply(&self, scope: Scope, repository: &dyn RepositoryView) -> Scope {
        (self.apply)(scope, repository)
    }
}

impl<F> Debug for FnCriterion<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnCriterion")
    }
}

/// Folds `criteria` over `scope` in order.
pub fn fold_criteria(
    criteria: &[Box<dyn Criterion>],
    scope: Scope,
    repository: &dyn RepositoryView,
) -> Scope {
    criteria
        .iter()
        .fold(scope, |scope, criterion| criterion.apply(scope, repository))
}

#[cfg(test)]
mod tests {
    use super::{fold_criteria, Criterion, FnCriterion, RepositoryView, WhereEquals};
    use crate::model::descriptor::EntityDescriptor;
    use crate::query::scope::Scope;

    struct StubView {
        descriptor: EntityDescriptor,
        criteria: Vec<Box<dyn Criterion>>,
    }

    impl RepositoryView for StubView {
        fn descriptor(&self) -> &EntityDescriptor {
            &self.descriptor
        }

        fn pending_criteria(&self) -> &[Box<dyn Criterion>] {
            &self.criteria
        }
    }

    #[test]
    fn fold_applies_in_push_order() {
        let view = StubView {
            descriptor: EntityDescriptor::new("users"),
            criteria: Vec::new(),
        };
        let criteria: Vec<Box<dyn Criterion>> = vec![
            Box::new(WhereEquals::new("role", "admin")),
            Box::new(FnCriterion::new(|scope: Scope, _: &dyn RepositoryView| {
                scope.where_null("deleted_at")
            })),
        ];

        let folded = fold_criteria(&criteria, Scope::new(), &view);
        let manual = Scope::new().where_eq("role", "admin").where_null("deleted_at");
        assert_eq!(folded, manual);
    }

    #[test]
    fn closure_criterion_can_branch_on_entity() {
        let view = StubView {
            descriptor: EntityDescriptor::new("posts"),
            criteria: Vec::new(),
        };
        let only_posts = FnCriterion::new(|scope: Scope, repo: &dyn RepositoryView| {
            if repo.descriptor().table == "posts" {
                scope.where_eq("published", 1)
            } else {
                scope
            }
        });

        let scope = only_posts.apply(Scope::new(), &view);
        assert_eq!(scope.filters().len(), 1);
    }
}
