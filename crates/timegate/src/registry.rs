//! Per-entity registration of default scopes and lifecycle listeners
//!
//! The composition root builds one [`EntityRegistry`] at startup, registers
//! each entity type on it, then shares it immutably (`&EntityRegistry` or
//! `Arc<EntityRegistry>`) with the code that queries and mutates records.

use crate::clock::{Clock, SystemClock};
use crate::config::ActivationConfig;
use crate::errors::Result;
use crate::events::{ActivationEvent, EventDispatcher, ModelEvent};
use crate::scope::{Extensions, Scope, ScopeId, ScopedSelect};
use sea_orm::{EntityTrait, Select};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

struct EntityEntry<E: EntityTrait> {
    scopes: Vec<Arc<dyn Scope<E>>>,
    extensions: Arc<Extensions<E>>,
}

impl<E: EntityTrait> Default for EntityEntry<E> {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            extensions: Arc::new(Extensions::new()),
        }
    }
}

/// Registry of default scopes, query extensions and listeners
pub struct EntityRegistry {
    clock: Arc<dyn Clock>,
    entities: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    events: EventDispatcher,
}

impl EntityRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entities: HashMap::new(),
            events: EventDispatcher::default(),
        }
    }

    pub fn from_config(config: &ActivationConfig) -> Self {
        Self::new(config.clock())
    }

    /// Registry using the clock from [`ActivationConfig::load`]
    pub fn from_env() -> Result<Self> {
        let config = ActivationConfig::load()?;
        Ok(Self::from_config(&config))
    }

    /// Clock handed to scopes created through this registry
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn entry<E: EntityTrait>(&self) -> Option<&EntityEntry<E>> {
        self.entities
            .get(&TypeId::of::<E>())
            .and_then(|entry| entry.downcast_ref::<EntityEntry<E>>())
    }

    fn entry_mut<E: EntityTrait>(&mut self) -> &mut EntityEntry<E> {
        self.entities
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(EntityEntry::<E>::default()))
            .downcast_mut::<EntityEntry<E>>()
            .expect("entity entry is keyed by its own TypeId")
    }

    /// Attach `scope` to every query built for `E`
    pub fn add_global_scope<E, S>(&mut self, scope: S) -> ScopeId
    where
        E: EntityTrait,
        S: Scope<E> + 'static,
    {
        let id = scope.id();
        let entry = self.entry_mut::<E>();
        scope.extend(Arc::make_mut(&mut entry.extensions));
        entry.scopes.push(Arc::new(scope));

        debug!(
            entity = E::default().table_name(),
            scope = %id,
            extensions = entry.extensions.len(),
            "Added global scope"
        );

        id
    }

    pub fn has_global_scope<E: EntityTrait>(&self, id: ScopeId) -> bool {
        self.entry::<E>()
            .is_some_and(|entry| entry.scopes.iter().any(|scope| scope.id() == id))
    }

    /// Id of the first scope on `E` registered under `name`
    pub fn global_scope_named<E: EntityTrait>(&self, name: &str) -> Option<ScopeId> {
        self.entry::<E>().and_then(|entry| {
            entry
                .scopes
                .iter()
                .find(|scope| scope.name() == name)
                .map(|scope| scope.id())
        })
    }

    pub fn global_scope_count<E: EntityTrait>(&self) -> usize {
        self.entry::<E>().map_or(0, |entry| entry.scopes.len())
    }

    /// `E::find()` with `E`'s default scopes
    pub fn find<E: EntityTrait>(&self) -> ScopedSelect<E> {
        self.scoped(E::find())
    }

    /// Wrap any select for `E` (e.g. `find_by_id`) with `E`'s default scopes
    pub fn scoped<E: EntityTrait>(&self, select: Select<E>) -> ScopedSelect<E> {
        match self.entry::<E>() {
            Some(entry) => {
                ScopedSelect::new(select, entry.scopes.clone(), entry.extensions.clone())
            }
            None => ScopedSelect::unscoped(select),
        }
    }

    pub fn listen<E, F>(&mut self, event: ModelEvent, callback: F)
    where
        E: EntityTrait,
        F: Fn(&ActivationEvent) + Send + Sync + 'static,
    {
        self.events.listen(TypeId::of::<E>(), event, Arc::new(callback));
    }

    /// Notify `E`'s listeners for `event.kind`; returns how many ran
    pub fn dispatch<E: EntityTrait>(&self, event: &ActivationEvent) -> usize {
        let ran = self.events.dispatch(TypeId::of::<E>(), event);
        debug!(
            entity = E::default().table_name(),
            event = %event.kind,
            listeners = ran,
            "Dispatched model event"
        );
        ran
    }

    pub fn listener_count<E: EntityTrait>(&self, event: ModelEvent) -> usize {
        self.events.listener_count(TypeId::of::<E>(), event)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("clock", &self.clock)
            .field("entities", &self.entities.len())
            .field("events", &self.events)
            .finish()
    }
}
