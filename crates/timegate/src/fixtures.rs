//! Entities shared by unit tests

use chrono::{DateTime, TimeZone, Utc};

pub fn frozen_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn past() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

pub fn future() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

pub mod article {
    use crate::activatable::Activatable;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "articles")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub title: String,
        pub is_active: bool,
        pub start_at: Option<DateTimeUtc>,
        pub end_at: Option<DateTimeUtc>,
        pub revision: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Activatable for Entity {
        type ActiveModel = ActiveModel;
    }
}

pub mod promotion {
    use crate::activatable::Activatable;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "promotions")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub code: String,
        pub enabled: bool,
        pub valid_from: Option<DateTimeUtc>,
        pub valid_until: Option<DateTimeUtc>,
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

pub mod broken {
    use crate::activatable::Activatable;
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "broken_flags")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub is_active: bool,
        pub start_at: Option<DateTimeUtc>,
        pub end_at: Option<DateTimeUtc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl Activatable for Entity {
        type ActiveModel = ActiveModel;

        const IS_ACTIVE: &'static str = "active_flag";
    }
}
