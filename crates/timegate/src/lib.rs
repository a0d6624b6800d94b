//! Timegate
//!
//! Time-windowed soft activation for SeaORM entities:
//! - An activation flag combined with an optional `[start_at, end_at]`
//!   validity window
//! - A default scope filtering every query down to observably active rows
//! - A per-query escape hatch (`with_inactive`) that removes only that scope
//! - Instance operations (`activate`, `deactivate`, quiet variants) with
//!   `activated` / `deactivated` lifecycle hooks

pub mod activatable;
pub mod activation_scope;
pub mod clock;
pub mod config;
pub mod errors;
pub mod events;
pub mod registry;
pub mod scope;
pub mod telemetry;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use activatable::{
    Activatable, ActivatableModel, ActiveModelOf, DEFAULT_END_AT_COLUMN, DEFAULT_IS_ACTIVE_COLUMN,
    DEFAULT_START_AT_COLUMN,
};
pub use activation_scope::{ActivationScope, WithInactive, ACTIVATION_SCOPE};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ActivationConfig;
pub use errors::{ActivationError, Result};
pub use events::{ActivationEvent, ModelEvent};
pub use registry::EntityRegistry;
pub use scope::{Extension, Extensions, Scope, ScopeId, ScopedSelect};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
