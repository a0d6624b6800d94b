//! Lifecycle notifications for activation changes
//!
//! Listeners are registered per entity type and accumulate; there is no
//! de-registration.

use sea_orm::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    Activated,
    Deactivated,
}

impl ModelEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelEvent::Activated => "activated",
            ModelEvent::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to listeners
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationEvent {
    pub kind: ModelEvent,
    /// Table name of the entity
    pub entity: String,
    /// Primary key values in key-column order
    pub primary_key: Vec<Value>,
}

/// Whether an instance operation notifies listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Emit {
    Fire,
    Suppressed,
}

pub type Listener = Arc<dyn Fn(&ActivationEvent) + Send + Sync>;

/// Per-entity listener table
#[derive(Default)]
pub struct EventDispatcher {
    listeners: HashMap<(TypeId, ModelEvent), Vec<Listener>>,
}

impl EventDispatcher {
    pub fn listen(&mut self, entity: TypeId, event: ModelEvent, listener: Listener) {
        self.listeners.entry((entity, event)).or_default().push(listener);
    }

    /// Run every listener for `(entity, event.kind)` in registration order.
    /// Returns how many ran.
    pub fn dispatch(&self, entity: TypeId, event: &ActivationEvent) -> usize {
        match self.listeners.get(&(entity, event.kind)) {
            Some(listeners) => {
                for listener in listeners {
                    listener(event);
                }
                listeners.len()
            }
            None => 0,
        }
    }

    pub fn listener_count(&self, entity: TypeId, event: ModelEvent) -> usize {
        self.listeners.get(&(entity, event)).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
