use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Message stored in `DbErr::Custom` when the persistence layer refuses a
/// booking for a slot that is already taken.
pub const SLOT_TAKEN: &str = "Another appointment is already booked for that date and time.";

/// Message stored in `DbErr::Custom` when the persistence layer refuses a
/// booking whose date and time have already passed.
pub const SLOT_IN_PAST: &str = "Appointments cannot be booked in the past.";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PetType {
    #[sea_orm(string_value = "cat")]
    Cat,
    #[sea_orm(string_value = "dog")]
    Dog,
    #[sea_orm(string_value = "bird")]
    Bird,
    #[sea_orm(string_value = "rabbit")]
    Rabbit,
    #[sea_orm(string_value = "hamster")]
    Hamster,
    #[default]
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub pet_name: String,
    pub pet_type: PetType,
    pub holder_name: Option<String>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn starts_at(&self) -> chrono::NaiveDateTime {
        self.date.and_time(self.time)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::consultation::Entity")]
    Consultations,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::consultation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consultations.def()
    }
}

fn current<V>(value: &ActiveValue<V>) -> Option<V>
where
    V: Into<sea_orm::Value> + Clone,
{
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v.clone()),
        ActiveValue::NotSet => None,
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Second line of defence for writes that bypass the booking service:
    /// the slot must lie in the future and must not already be taken.
    async fn before_save<C>(self, db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let slot_changed = insert || self.date.is_set() || self.time.is_set();
        if !slot_changed {
            return Ok(self);
        }

        let (Some(date), Some(time)) = (current(&self.date), current(&self.time)) else {
            return Ok(self);
        };

        if date.and_time(time) < Local::now().naive_local() {
            return Err(DbErr::Custom(SLOT_IN_PAST.to_string()));
        }

        let mut clash = Entity::find()
            .filter(Column::Date.eq(date))
            .filter(Column::Time.eq(time));
        if let Some(id) = current(&self.id) {
            clash = clash.filter(Column::Id.ne(id));
        }
        if clash.one(db).await?.is_some() {
            return Err(DbErr::Custom(SLOT_TAKEN.to_string()));
        }

        Ok(self)
    }
}
