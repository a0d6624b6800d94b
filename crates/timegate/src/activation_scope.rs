//! The activation default scope
//!
//! Filters an entity's queries down to rows that are observably active:
//!
//! ```text
//! is_active = true
//!   AND (start_at IS NULL OR start_at <= now)
//!   AND (end_at IS NULL OR end_at >= now)
//! ```
//!
//! `now` is captured once per query and bound as a parameter.

use crate::activatable::Activatable;
use crate::clock::Clock;
use crate::errors::Result;
use crate::scope::{Extension, Extensions, Scope, ScopeId, ScopedSelect};
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, Value};
use std::sync::Arc;

/// Registered name of the activation scope
pub const ACTIVATION_SCOPE: &str = "activation";

#[derive(Debug, Clone)]
pub struct ActivationScope {
    id: ScopeId,
    clock: Arc<dyn Clock>,
}

impl ActivationScope {
    /// Extensions installed on every entity carrying this scope
    const EXTENSIONS: &'static [Extension] = &[Extension::WithInactive];

    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            id: ScopeId::new(),
            clock,
        }
    }

    /// The activation predicate for `E` evaluated at `now`
    pub fn condition<E: Activatable>(now: Value) -> Result<Condition> {
        let is_active = E::qualified_is_active_column()?;
        let start_at = E::qualified_start_at_column()?;
        let end_at = E::qualified_end_at_column()?;

        Ok(Condition::all()
            .add(Expr::col(is_active).eq(true))
            .add(
                Condition::any()
                    .add(Expr::col(start_at.clone()).is_null())
                    .add(Expr::col(start_at).lte(now.clone())),
            )
            .add(
                Condition::any()
                    .add(Expr::col(end_at.clone()).is_null())
                    .add(Expr::col(end_at).gte(now)),
            ))
    }

    fn add_with_inactive<E: Activatable>(&self, extensions: &mut Extensions<E>) {
        let id = self.id;
        extensions.install(
            Extension::WithInactive,
            Arc::new(move |query: ScopedSelect<E>| query.without_scope(id)),
        );
    }
}

impl<E: Activatable> Scope<E> for ActivationScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn name(&self) -> &'static str {
        ACTIVATION_SCOPE
    }

    fn apply(&self, query: &mut ScopedSelect<E>) -> Result<()> {
        let now = E::fresh_timestamp(self.clock.now());
        query.remove_scope(self.id);
        query.add_condition(Self::condition::<E>(now)?);
        Ok(())
    }

    fn extend(&self, extensions: &mut Extensions<E>) {
        for extension in Self::EXTENSIONS {
            match extension {
                Extension::WithInactive => self.add_with_inactive(extensions),
            }
        }
    }
}

/// Escape hatch: query an activatable entity including inactive and
/// out-of-window rows
pub trait WithInactive {
    fn with_inactive(self) -> Self;
}

impl<E: Activatable> WithInactive for ScopedSelect<E> {
    fn with_inactive(self) -> Self {
        self.extension(Extension::WithInactive)
    }
}
