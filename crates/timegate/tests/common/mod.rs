//! Shared fixtures for the SQLite-backed integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    Schema, Set,
};
use std::sync::Arc;
use timegate::{EntityRegistry, FixedClock};

pub mod article {
    use sea_orm::entity::prelude::*;
    use sea_orm::Set;
    use timegate::Activatable;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "articles")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub title: String,
        pub is_active: bool,
        pub start_at: Option<DateTimeUtc>,
        pub end_at: Option<DateTimeUtc>,
        /// Bumped by every full save
        pub revision: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    #[async_trait::async_trait]
    impl ActiveModelBehavior for ActiveModel {
        async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
        where
            C: ConnectionTrait,
        {
            if !insert {
                let revision = self.revision.clone().unwrap();
                self.revision = Set(revision + 1);
            }
            Ok(self)
        }
    }

    impl Activatable for Entity {
        type ActiveModel = ActiveModel;
    }
}

pub mod promotion {
    use sea_orm::entity::prelude::*;
    use timegate::Activatable;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "promotions")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub code: String,
        pub enabled: bool,
        pub valid_from: Option<DateTimeUtc>,
        pub valid_until: Option<DateTimeUtc>,
        /// Same name as the default flag column, never read by the scope
        pub is_active: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Activatable for Entity {
        type ActiveModel = ActiveModel;

        const IS_ACTIVE: &'static str = "enabled";
        const START_AT: &'static str = "valid_from";
        const END_AT: &'static str = "valid_until";
    }
}

/// Moment every registry in these tests treats as "now"
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn past() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

pub fn future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

/// One side of a validity window relative to [`now`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Open,
    Past,
    Future,
}

impl Bound {
    pub const ALL: [Bound; 3] = [Bound::Open, Bound::Past, Bound::Future];

    pub fn at(self) -> Option<DateTime<Utc>> {
        match self {
            Bound::Open => None,
            Bound::Past => Some(past()),
            Bound::Future => Some(future()),
        }
    }
}

pub async fn connect() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();

    db.execute(backend.build(&schema.create_table_from_entity(article::Entity)))
        .await?;
    db.execute(backend.build(&schema.create_table_from_entity(promotion::Entity)))
        .await?;

    Ok(db)
}

pub fn registry() -> EntityRegistry {
    EntityRegistry::new(Arc::new(FixedClock::new(now())))
}

pub async fn insert_article(
    db: &DatabaseConnection,
    id: i32,
    is_active: bool,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
) -> anyhow::Result<article::Model> {
    let model = article::ActiveModel {
        id: Set(id),
        title: Set(format!("article-{id}")),
        is_active: Set(is_active),
        start_at: Set(start_at),
        end_at: Set(end_at),
        revision: Set(0),
    }
    .insert(db)
    .await?;

    Ok(model)
}

pub async fn insert_promotion(
    db: &DatabaseConnection,
    id: i32,
    enabled: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
) -> anyhow::Result<promotion::Model> {
    let model = promotion::ActiveModel {
        id: Set(id),
        code: Set(format!("PROMO-{id}")),
        enabled: Set(enabled),
        valid_from: Set(valid_from),
        valid_until: Set(valid_until),
        is_active: Set(true),
    }
    .insert(db)
    .await?;

    Ok(model)
}

/// Sorted ids of `models`
pub fn ids<M, F>(models: &[M], id: F) -> Vec<i32>
where
    F: Fn(&M) -> i32,
{
    let mut ids: Vec<i32> = models.iter().map(id).collect();
    ids.sort_unstable();
    ids
}
