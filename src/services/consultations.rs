use super::{non_blank, prescriptions::PrescriptionWithItems};
use crate::{
    entities::{
        appointment::Entity as Appointment,
        consultation::{self, ConsultationStatus, Entity as Consultation},
        pet::{self, Entity as Pet},
        prescription::{self, Entity as Prescription},
        prescription_item::Entity as PrescriptionItem,
    },
    errors::{FormErrors, ServiceError},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_cost(cost: &Decimal) -> Result<(), ValidationError> {
    if cost.is_sign_negative() && !cost.is_zero() {
        let mut err = ValidationError::new("cost");
        err.message = Some("Cost cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

/// Body for opening or editing a consultation. A new consultation names its
/// patient directly or through the appointment it was booked under.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ConsultationInput {
    pub pet_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub consulted_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 500, message = "Reason is required."))]
    pub reason: String,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ConsultationStatus>,
    #[validate(custom = "validate_cost")]
    pub cost: Option<Decimal>,
    pub paid: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConsultationFilter {
    pub pet_id: Option<Uuid>,
    pub status: Option<ConsultationStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsultationDetail {
    #[schema(value_type = Object)]
    pub consultation: consultation::Model,
    #[schema(value_type = Option<Object>)]
    pub pet: Option<pet::Model>,
    pub prescriptions: Vec<PrescriptionWithItems>,
}

#[derive(Clone)]
pub struct ConsultationService {
    db: Arc<DatabaseConnection>,
}

impl ConsultationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> Result<consultation::Model, ServiceError> {
        Consultation::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Consultation", id))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ConsultationFilter,
    ) -> Result<Vec<consultation::Model>, ServiceError> {
        let mut query = Consultation::find();
        if let Some(pet_id) = filter.pet_id {
            query = query.filter(consultation::Column::PetId.eq(pet_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(consultation::Column::Status.eq(status));
        }
        Ok(query
            .order_by_desc(consultation::Column::ConsultedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn detail(&self, id: Uuid) -> Result<ConsultationDetail, ServiceError> {
        let consultation = self.get(id).await?;
        let pet = Pet::find_by_id(consultation.pet_id).one(&*self.db).await?;

        let prescriptions = Prescription::find()
            .filter(prescription::Column::ConsultationId.eq(id))
            .order_by_desc(prescription::Column::IssuedAt)
            .find_with_related(PrescriptionItem)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(prescription, items)| PrescriptionWithItems { prescription, items })
            .collect();

        Ok(ConsultationDetail {
            consultation,
            pet,
            prescriptions,
        })
    }

    /// Resolves the patient from `pet_id`, or from the appointment's pet
    /// name and owner.
    async fn resolve_pet(&self, input: &ConsultationInput) -> Result<pet::Model, ServiceError> {
        if let Some(pet_id) = input.pet_id {
            return Pet::find_by_id(pet_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| FormErrors::field("pet_id", "Unknown patient.").into());
        }

        let Some(appointment_id) = input.appointment_id else {
            return Err(FormErrors::field("pet_id", "A patient or an appointment is required.").into());
        };
        let appointment = Appointment::find_by_id(appointment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Appointment", appointment_id))?;

        Pet::find()
            .filter(pet::Column::Name.eq(appointment.pet_name.as_str()))
            .filter(pet::Column::OwnerId.eq(appointment.owner_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                FormErrors::field(
                    "appointment_id",
                    format!(
                        "No registered patient named '{}' belongs to this appointment's owner.",
                        appointment.pet_name
                    ),
                )
                .into()
            })
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        vet_id: Uuid,
        input: ConsultationInput,
    ) -> Result<consultation::Model, ServiceError> {
        input.validate()?;
        let pet = self.resolve_pet(&input).await?;

        let consultation = consultation::ActiveModel {
            id: Set(Uuid::new_v4()),
            appointment_id: Set(input.appointment_id),
            pet_id: Set(pet.id),
            vet_id: Set(Some(vet_id)),
            consulted_at: Set(input.consulted_at.unwrap_or_else(Utc::now)),
            reason: Set(input.reason.trim().to_string()),
            symptoms: Set(non_blank(input.symptoms)),
            diagnosis: Set(non_blank(input.diagnosis)),
            treatment: Set(non_blank(input.treatment)),
            notes: Set(non_blank(input.notes)),
            status: Set(input.status.unwrap_or_default()),
            cost: Set(input.cost.unwrap_or_default()),
            paid: Set(input.paid.unwrap_or(false)),
        }
        .insert(&*self.db)
        .await?;

        info!(consultation_id = %consultation.id, pet_id = %pet.id, "consultation opened");
        Ok(consultation)
    }

    /// Rewrites the clinical fields; the editing veterinarian becomes the
    /// consultation's veterinarian.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        vet_id: Uuid,
        input: ConsultationInput,
    ) -> Result<consultation::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;

        let mut active = existing.into_active_model();
        active.vet_id = Set(Some(vet_id));
        if let Some(consulted_at) = input.consulted_at {
            active.consulted_at = Set(consulted_at);
        }
        active.reason = Set(input.reason.trim().to_string());
        active.symptoms = Set(non_blank(input.symptoms));
        active.diagnosis = Set(non_blank(input.diagnosis));
        active.treatment = Set(non_blank(input.treatment));
        active.notes = Set(non_blank(input.notes));
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(cost) = input.cost {
            active.cost = Set(cost);
        }
        if let Some(paid) = input.paid {
            active.paid = Set(paid);
        }

        let consultation = active.update(&*self.db).await?;
        info!(consultation_id = %consultation.id, "consultation updated");
        Ok(consultation)
    }

    #[instrument(skip(self))]
    pub async fn complete(&self, id: Uuid) -> Result<consultation::Model, ServiceError> {
        let mut active = self.get(id).await?.into_active_model();
        active.status = Set(ConsultationStatus::Completed);
        let consultation = active.update(&*self.db).await?;
        info!(consultation_id = %consultation.id, "consultation completed");
        Ok(consultation)
    }
}
