//! Default scopes and the scoped query builder
//!
//! A [`ScopedSelect`] wraps a SeaORM [`Select`] together with the default
//! scopes registered for its entity. Scopes are applied when the query is
//! materialised, except the ones removed from that particular query. Every
//! builder owns its own exclusion set, so removing a scope never affects
//! another query.

use crate::errors::Result;
use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QueryTrait,
    Select, Statement,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Identity of one registered scope instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(Uuid);

impl ScopeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Named query operations a scope can install on the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// Drop the activation filter for one query
    WithInactive,
}

pub type ExtensionFn<E> = Arc<dyn Fn(ScopedSelect<E>) -> ScopedSelect<E> + Send + Sync>;

/// Extension table for one entity type.
///
/// Installing the same [`Extension`] twice replaces the earlier installer.
pub struct Extensions<E: EntityTrait> {
    table: HashMap<Extension, ExtensionFn<E>>,
}

impl<E: EntityTrait> Extensions<E> {
    pub fn new() -> Self {
        Self { table: HashMap::new() }
    }

    pub fn install(&mut self, extension: Extension, installer: ExtensionFn<E>) {
        self.table.insert(extension, installer);
    }

    pub fn get(&self, extension: Extension) -> Option<&ExtensionFn<E>> {
        self.table.get(&extension)
    }

    pub fn contains(&self, extension: Extension) -> bool {
        self.table.contains_key(&extension)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<E: EntityTrait> Default for Extensions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> Clone for Extensions<E> {
    fn clone(&self) -> Self {
        Self { table: self.table.clone() }
    }
}

/// A filter applied to every query against an entity unless removed
pub trait Scope<E: EntityTrait>: Send + Sync {
    /// Identity used to remove this instance from a query
    fn id(&self) -> ScopeId;

    /// Human-readable name for logs and lookups
    fn name(&self) -> &'static str;

    /// Add this scope's constraints to the query
    fn apply(&self, query: &mut ScopedSelect<E>) -> Result<()>;

    /// Install named operations on the entity's builder
    fn extend(&self, _extensions: &mut Extensions<E>) {}
}

/// SeaORM select carrying the entity's default scopes
pub struct ScopedSelect<E: EntityTrait> {
    select: Select<E>,
    pending: VecDeque<Arc<dyn Scope<E>>>,
    removed: HashSet<ScopeId>,
    extensions: Arc<Extensions<E>>,
}

impl<E: EntityTrait> ScopedSelect<E> {
    pub fn new<I>(select: Select<E>, scopes: I, extensions: Arc<Extensions<E>>) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Scope<E>>>,
    {
        Self {
            select,
            pending: scopes.into_iter().collect(),
            removed: HashSet::new(),
            extensions,
        }
    }

    /// Wrap a select that has no default scopes
    pub fn unscoped(select: Select<E>) -> Self {
        Self::new(select, Vec::new(), Arc::new(Extensions::new()))
    }

    /// Add a condition to the underlying select in place
    pub fn add_condition<F: IntoCondition>(&mut self, condition: F) {
        QueryFilter::query(&mut self.select).cond_where(condition.into_condition());
    }

    pub fn filter<F: IntoCondition>(mut self, condition: F) -> Self {
        self.add_condition(condition);
        self
    }

    pub fn order_by_asc(self, column: E::Column) -> Self {
        self.map_select(|select| select.order_by_asc(column))
    }

    pub fn order_by_desc(self, column: E::Column) -> Self {
        self.map_select(|select| select.order_by_desc(column))
    }

    /// Run any host builder operation on the wrapped select
    pub fn map_select<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Select<E>) -> Select<E>,
    {
        self.select = f(self.select);
        self
    }

    /// Remove one default scope from this query in place
    pub fn remove_scope(&mut self, id: ScopeId) {
        self.pending.retain(|scope| scope.id() != id);
        self.removed.insert(id);
    }

    pub fn without_scope(mut self, id: ScopeId) -> Self {
        self.remove_scope(id);
        self
    }

    /// Remove every default scope from this query
    pub fn without_scopes(mut self) -> Self {
        let ids: Vec<ScopeId> = self.pending.iter().map(|scope| scope.id()).collect();
        for id in ids {
            self.remove_scope(id);
        }
        self
    }

    /// Run a named extension. Unknown extensions leave the query unchanged.
    pub fn extension(self, extension: Extension) -> Self {
        let installer = self.extensions.get(extension).cloned();
        match installer {
            Some(installer) => installer(self),
            None => {
                trace!(
                    entity = E::default().table_name(),
                    extension = ?extension,
                    "Extension not installed"
                );
                self
            }
        }
    }

    pub fn removed_scopes(&self) -> &HashSet<ScopeId> {
        &self.removed
    }

    /// Whether `id` would still be applied when the query is materialised
    pub fn has_scope(&self, id: ScopeId) -> bool {
        self.pending.iter().any(|scope| scope.id() == id)
    }

    fn next_scope(&mut self) -> Option<Arc<dyn Scope<E>>> {
        while let Some(scope) = self.pending.pop_front() {
            if !self.removed.contains(&scope.id()) {
                return Some(scope);
            }
        }
        None
    }

    /// Apply every remaining default scope and return the plain select
    pub fn into_select(mut self) -> Result<Select<E>> {
        let mut applied = Vec::new();
        while let Some(scope) = self.next_scope() {
            scope.apply(&mut self)?;
            applied.push(scope.name());
        }

        debug!(
            entity = E::default().table_name(),
            scopes = ?applied,
            "Applied default scopes"
        );

        Ok(self.select)
    }

    pub fn build(self, backend: DbBackend) -> Result<Statement> {
        Ok(self.into_select()?.build(backend))
    }

    pub async fn all<C>(self, db: &C) -> Result<Vec<E::Model>>
    where
        C: ConnectionTrait,
    {
        let select = self.into_select()?;
        Ok(select.all(db).await?)
    }

    pub async fn one<C>(self, db: &C) -> Result<Option<E::Model>>
    where
        C: ConnectionTrait,
    {
        let select = self.into_select()?;
        Ok(select.one(db).await?)
    }

    pub async fn count<C>(self, db: &C) -> Result<u64>
    where
        C: ConnectionTrait,
        E::Model: Sync,
    {
        let select = self.into_select()?;
        Ok(select.count(db).await?)
    }
}

impl<E: EntityTrait> fmt::Debug for ScopedSelect<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending: Vec<&'static str> = self.pending.iter().map(|scope| scope.name()).collect();
        f.debug_struct("ScopedSelect")
            .field("entity", &E::default().table_name())
            .field("pending", &pending)
            .field("removed", &self.removed.len())
            .finish()
    }
}
