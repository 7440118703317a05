use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use super::appointment::PetType;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum PetSex {
    #[sea_orm(string_value = "male")]
    Male,
    #[sea_orm(string_value = "female")]
    Female,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: PetType,
    pub breed: Option<String>,
    pub sex: Option<PetSex>,
    pub age_years: Option<i32>,
    pub color: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))", nullable)]
    pub weight_kg: Option<Decimal>,
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
    /// Inactive pets are hidden from the patient list.
    pub active: bool,
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
    #[sea_orm(has_one = "super::clinical_record::Entity")]
    ClinicalRecord,
    #[sea_orm(has_many = "super::consultation::Entity")]
    Consultations,
    #[sea_orm(has_many = "super::vaccine::Entity")]
    Vaccines,
    #[sea_orm(has_many = "super::treatment::Entity")]
    Treatments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::clinical_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClinicalRecord.def()
    }
}

impl Related<super::consultation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consultations.def()
    }
}

impl Related<super::vaccine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vaccines.def()
    }
}

impl Related<super::treatment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Treatments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
