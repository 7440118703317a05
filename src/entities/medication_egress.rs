use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A withdrawal of medication from stock. `product_id` is set when the
/// medication matched a catalogued product whose stock was decremented.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "medication_egress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub medication: String,
    pub quantity: i32,
    pub dispensed_at: DateTime<Utc>,
    pub vet_id: Option<Uuid>,
    pub reason: Option<String>,
    pub patient: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::consultation::Entity",
        from = "Column::ConsultationId",
        to = "super::consultation::Column::Id",
        on_delete = "SetNull"
    )]
    Consultation,
}

impl ActiveModelBehavior for ActiveModel {}
