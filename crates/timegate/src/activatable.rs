//! Activation capability for SeaORM entities
//!
//! An entity implements [`Activatable`] to gain:
//! - an activation default scope (see [`ActivationScope`])
//! - column-name resolution with per-entity overrides
//! - `activated` / `deactivated` lifecycle hooks
//!
//! Its model gains the instance operations of [`ActivatableModel`].
//!
//! ```rust,ignore
//! impl Activatable for promotion::Entity {
//!     type ActiveModel = promotion::ActiveModel;
//!     const IS_ACTIVE: &'static str = "enabled";
//! }
//!
//! let mut registry = EntityRegistry::default();
//! promotion::Entity::register(&mut registry)?;
//!
//! let live = registry.find::<promotion::Entity>().all(&db).await?;
//! let every = registry.find::<promotion::Entity>().with_inactive().all(&db).await?;
//! ```

use crate::activation_scope::{ActivationScope, ACTIVATION_SCOPE};
use crate::errors::{ActivationError, Result};
use crate::events::{ActivationEvent, Emit, ModelEvent};
use crate::registry::EntityRegistry;
use crate::scope::ScopeId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{ColumnRef, Expr, IntoColumnRef};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    ColumnTrait, IdenStatic, IntoActiveModel, Iterable, ModelTrait, PrimaryKeyToColumn, QueryFilter, Value,
};
use tracing::{debug, info, warn};

/// Default name of the activation flag column
pub const DEFAULT_IS_ACTIVE_COLUMN: &str = "is_active";

/// Default name of the window start column
pub const DEFAULT_START_AT_COLUMN: &str = "start_at";

/// Default name of the window end column
pub const DEFAULT_END_AT_COLUMN: &str = "end_at";

/// The active model type an activatable entity saves through
pub type ActiveModelOf<E> = <E as Activatable>::ActiveModel;

pub trait Activatable: EntityTrait {
    /// Active model used for full saves
    type ActiveModel: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send + Sync;

    const IS_ACTIVE: &'static str = DEFAULT_IS_ACTIVE_COLUMN;
    const START_AT: &'static str = DEFAULT_START_AT_COLUMN;
    const END_AT: &'static str = DEFAULT_END_AT_COLUMN;

    /// Convert the captured instant into the window columns' value type.
    ///
    /// Entities storing `NaiveDateTime` or `DateTime<FixedOffset>` override
    /// this so the bound value compares like the stored one.
    fn fresh_timestamp(now: DateTime<Utc>) -> Value {
        Value::from(now)
    }

    fn is_active_column() -> Result<Self::Column> {
        resolve_column::<Self>(Self::IS_ACTIVE)
    }

    fn start_at_column() -> Result<Self::Column> {
        resolve_column::<Self>(Self::START_AT)
    }

    fn end_at_column() -> Result<Self::Column> {
        resolve_column::<Self>(Self::END_AT)
    }

    fn qualified_is_active_column() -> Result<ColumnRef> {
        Ok(qualify::<Self>(Self::is_active_column()?))
    }

    fn qualified_start_at_column() -> Result<ColumnRef> {
        Ok(qualify::<Self>(Self::start_at_column()?))
    }

    fn qualified_end_at_column() -> Result<ColumnRef> {
        Ok(qualify::<Self>(Self::end_at_column()?))
    }

    /// `table.column`, for logs and diagnostics
    fn qualify_column(column: &str) -> String {
        format!("{}.{}", Self::default().table_name(), column)
    }

    /// Attach the activation scope to this entity type.
    ///
    /// Called once per entity by the composition root. Registering again
    /// returns the scope already attached.
    fn register(registry: &mut EntityRegistry) -> Result<ScopeId> {
        Self::is_active_column()?;
        Self::start_at_column()?;
        Self::end_at_column()?;

        if let Some(id) = registry.global_scope_named::<Self>(ACTIVATION_SCOPE) {
            debug!(
                entity = Self::default().table_name(),
                scope = %id,
                "Activation scope already registered"
            );
            return Ok(id);
        }

        let scope = ActivationScope::new(registry.clock());
        let id = registry.add_global_scope::<Self, _>(scope);

        info!(
            entity = Self::default().table_name(),
            is_active = %Self::qualify_column(Self::IS_ACTIVE),
            start_at = %Self::qualify_column(Self::START_AT),
            end_at = %Self::qualify_column(Self::END_AT),
            scope = %id,
            "Registered activation scope"
        );

        Ok(id)
    }

    /// Run `callback` whenever an instance of this entity is activated
    fn activated<F>(registry: &mut EntityRegistry, callback: F)
    where
        F: Fn(&ActivationEvent) + Send + Sync + 'static,
    {
        registry.listen::<Self, _>(ModelEvent::Activated, callback);
    }

    /// Run `callback` whenever an instance of this entity is deactivated
    fn deactivated<F>(registry: &mut EntityRegistry, callback: F)
    where
        F: Fn(&ActivationEvent) + Send + Sync + 'static,
    {
        registry.listen::<Self, _>(ModelEvent::Deactivated, callback);
    }
}

fn resolve_column<E: EntityTrait>(name: &str) -> Result<E::Column> {
    E::Column::iter()
        .find(|column| IdenStatic::as_str(column) == name)
        .ok_or_else(|| ActivationError::UnknownColumn {
            entity: E::default().table_name().to_owned(),
            column: name.to_owned(),
        })
}

fn qualify<E: EntityTrait>(column: E::Column) -> ColumnRef {
    (E::default(), column).into_column_ref()
}

fn primary_key<E: EntityTrait>(model: &E::Model) -> Vec<(E::Column, Value)> {
    E::PrimaryKey::iter()
        .map(|key| {
            let column = key.into_column();
            (column, model.get(column))
        })
        .collect()
}

fn event<E: EntityTrait>(kind: ModelEvent, key: &[(E::Column, Value)]) -> ActivationEvent {
    ActivationEvent {
        kind,
        entity: E::default().table_name().to_owned(),
        primary_key: key.iter().map(|(_, value)| value.clone()).collect(),
    }
}

fn is_active<E: Activatable>(model: &E::Model) -> Result<bool> {
    let column = E::is_active_column()?;
    Ok(matches!(model.get(column), Value::Bool(Some(true))))
}

/// Targeted `UPDATE ... SET is_active = true WHERE <primary key>`.
///
/// Skips `ActiveModelBehavior` hooks and writes no other column.
async fn activate<E, C>(
    model: &mut E::Model,
    db: &C,
    registry: &EntityRegistry,
    emit: Emit,
) -> Result<()>
where
    E: Activatable,
    C: ConnectionTrait,
{
    let column = E::is_active_column()?;
    let key = primary_key::<E>(model);

    let condition = key
        .iter()
        .fold(Condition::all(), |condition, (column, value)| {
            condition.add(column.eq(value.clone()))
        });

    let result = E::update_many()
        .col_expr(column, Expr::value(true))
        .filter(condition)
        .exec(db)
        .await?;

    model.set(column, Value::from(true));

    debug!(
        entity = E::default().table_name(),
        rows_affected = result.rows_affected,
        quiet = emit == Emit::Suppressed,
        "Activated record"
    );

    if emit == Emit::Fire {
        registry.dispatch::<E>(&event::<E>(ModelEvent::Activated, &key));
    }

    Ok(())
}

/// Full save through the entity's active model with the flag cleared.
async fn deactivate<E, C>(
    model: &mut E::Model,
    db: &C,
    registry: &EntityRegistry,
    emit: Emit,
) -> Result<bool>
where
    E: Activatable,
    E::Model: Clone + IntoActiveModel<ActiveModelOf<E>>,
    C: ConnectionTrait,
{
    let column = E::is_active_column()?;
    let key = primary_key::<E>(model);

    model.set(column, Value::from(false));

    // Unchanged primary key: saved as an existing row, never inserted
    let mut active: ActiveModelOf<E> = model.clone().into_active_model();
    active.set(column, Value::from(false));

    let saved = match active.update(db).await {
        Ok(saved) => {
            *model = saved;
            true
        }
        Err(DbErr::RecordNotUpdated) => {
            warn!(
                entity = E::default().table_name(),
                primary_key = ?key.iter().map(|(_, value)| value).collect::<Vec<_>>(),
                "Deactivation save updated no rows"
            );
            false
        }
        Err(err) => return Err(err.into()),
    };

    debug!(
        entity = E::default().table_name(),
        saved,
        quiet = emit == Emit::Suppressed,
        "Deactivated record"
    );

    // Fires whether or not the save reported success
    if emit == Emit::Fire {
        registry.dispatch::<E>(&event::<E>(ModelEvent::Deactivated, &key));
    }

    Ok(saved)
}

/// Instance operations for models of an [`Activatable`] entity
#[async_trait]
pub trait ActivatableModel: Sized {
    /// The in-memory flag only; the validity window is not consulted
    fn is_active(&self) -> Result<bool>;

    /// Set the flag with a targeted update and emit `activated`
    async fn activate<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<()>
    where
        C: ConnectionTrait;

    /// Clear the flag with a full save and emit `deactivated`
    async fn deactivate<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<bool>
    where
        C: ConnectionTrait;

    /// [`activate`](Self::activate) without notifying listeners
    async fn activate_quietly<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<()>
    where
        C: ConnectionTrait;

    /// [`deactivate`](Self::deactivate) without notifying listeners
    async fn deactivate_quietly<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<bool>
    where
        C: ConnectionTrait;
}

#[async_trait]
impl<M> ActivatableModel for M
where
    M: ModelTrait + Clone + Send + Sync + IntoActiveModel<ActiveModelOf<<M as ModelTrait>::Entity>>,
    <M as ModelTrait>::Entity: Activatable<Model = M>,
{
    fn is_active(&self) -> Result<bool> {
        is_active::<<M as ModelTrait>::Entity>(self)
    }

    async fn activate<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<()>
    where
        C: ConnectionTrait,
    {
        activate::<<M as ModelTrait>::Entity, C>(self, db, registry, Emit::Fire).await
    }

    async fn deactivate<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        deactivate::<<M as ModelTrait>::Entity, C>(self, db, registry, Emit::Fire).await
    }

    async fn activate_quietly<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<()>
    where
        C: ConnectionTrait,
    {
        activate::<<M as ModelTrait>::Entity, C>(self, db, registry, Emit::Suppressed).await
    }

    async fn deactivate_quietly<C>(&mut self, db: &C, registry: &EntityRegistry) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        deactivate::<<M as ModelTrait>::Entity, C>(self, db, registry, Emit::Suppressed).await
    }
}
