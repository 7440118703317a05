use super::non_blank;
use crate::{
    entities::{
        consultation::Entity as Consultation,
        prescription::{self, Entity as Prescription},
        prescription_item::{self, Entity as PrescriptionItem},
    },
    errors::ServiceError,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PrescriptionItemInput {
    #[validate(length(min = 1, max = 200, message = "Medication is required."))]
    pub medication: String,
    #[validate(length(min = 1, max = 100, message = "Dose is required."))]
    pub dose: String,
    #[validate(length(min = 1, max = 100, message = "Frequency is required."))]
    pub frequency: String,
    #[validate(length(min = 1, max = 100, message = "Duration is required."))]
    pub duration: String,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "Quantity must be at least 1."))]
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PrescriptionInput {
    pub instructions: Option<String>,
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    #[validate]
    pub items: Vec<PrescriptionItemInput>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrescriptionWithItems {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub prescription: prescription::Model,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<prescription_item::Model>,
}

fn item_model(prescription_id: Uuid, input: PrescriptionItemInput) -> prescription_item::ActiveModel {
    prescription_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        prescription_id: Set(prescription_id),
        medication: Set(input.medication.trim().to_string()),
        dose: Set(input.dose.trim().to_string()),
        frequency: Set(input.frequency.trim().to_string()),
        duration: Set(input.duration.trim().to_string()),
        quantity: Set(input.quantity),
        notes: Set(non_blank(input.notes)),
    }
}

#[derive(Clone)]
pub struct PrescriptionService {
    db: Arc<DatabaseConnection>,
}

impl PrescriptionService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<PrescriptionWithItems>, ServiceError> {
        Ok(Prescription::find()
            .order_by_desc(prescription::Column::IssuedAt)
            .find_with_related(PrescriptionItem)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(prescription, items)| PrescriptionWithItems { prescription, items })
            .collect())
    }

    pub async fn detail(&self, id: Uuid) -> Result<PrescriptionWithItems, ServiceError> {
        let prescription = Prescription::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Prescription", id))?;
        let items = PrescriptionItem::find()
            .filter(prescription_item::Column::PrescriptionId.eq(id))
            .all(&*self.db)
            .await?;
        Ok(PrescriptionWithItems { prescription, items })
    }

    /// Issues a prescription for a consultation, with its initial items,
    /// in one transaction.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        consultation_id: Uuid,
        vet_id: Uuid,
        input: PrescriptionInput,
    ) -> Result<PrescriptionWithItems, ServiceError> {
        input.validate()?;
        Consultation::find_by_id(consultation_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Consultation", consultation_id))?;

        let txn = self.db.begin().await?;
        let prescription = prescription::ActiveModel {
            id: Set(Uuid::new_v4()),
            consultation_id: Set(consultation_id),
            vet_id: Set(Some(vet_id)),
            instructions: Set(non_blank(input.instructions)),
            valid_until: Set(input.valid_until),
            issued_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            items.push(item_model(prescription.id, item).insert(&txn).await?);
        }
        txn.commit().await?;

        info!(prescription_id = %prescription.id, consultation_id = %consultation_id, items = items.len(), "prescription issued");
        Ok(PrescriptionWithItems { prescription, items })
    }

    #[instrument(skip(self, input))]
    pub async fn add_item(
        &self,
        prescription_id: Uuid,
        input: PrescriptionItemInput,
    ) -> Result<prescription_item::Model, ServiceError> {
        input.validate()?;
        Prescription::find_by_id(prescription_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Prescription", prescription_id))?;

        let item = item_model(prescription_id, input).insert(&*self.db).await?;
        info!(prescription_id = %prescription_id, item_id = %item.id, "prescription item added");
        Ok(item)
    }
}
