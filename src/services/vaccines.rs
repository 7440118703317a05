use super::non_blank;
use crate::{
    entities::{
        pet::Entity as Pet,
        vaccine::{self, Entity as Vaccine},
    },
    errors::{FormErrors, ServiceError},
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VaccineInput {
    #[validate(length(min = 1, max = 100, message = "Vaccine name is required."))]
    pub name: String,
    pub applied_on: NaiveDate,
    pub next_due: Option<NaiveDate>,
    #[validate(length(max = 50))]
    pub lot: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct VaccineService {
    db: Arc<DatabaseConnection>,
}

impl VaccineService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Latest applications first, across all patients or for one.
    pub async fn list(&self, pet_id: Option<Uuid>) -> Result<Vec<vaccine::Model>, ServiceError> {
        let mut query = Vaccine::find();
        if let Some(pet_id) = pet_id {
            query = query.filter(vaccine::Column::PetId.eq(pet_id));
        }
        Ok(query
            .order_by_desc(vaccine::Column::AppliedOn)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn register(
        &self,
        pet_id: Uuid,
        vet_id: Uuid,
        input: VaccineInput,
    ) -> Result<vaccine::Model, ServiceError> {
        input.validate()?;
        if matches!(input.next_due, Some(due) if due < input.applied_on) {
            return Err(FormErrors::field(
                "next_due",
                "The next dose cannot be due before the application date.",
            )
            .into());
        }
        Pet::find_by_id(pet_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Patient", pet_id))?;

        let vaccine = vaccine::ActiveModel {
            id: Set(Uuid::new_v4()),
            pet_id: Set(pet_id),
            vet_id: Set(Some(vet_id)),
            name: Set(input.name.trim().to_string()),
            applied_on: Set(input.applied_on),
            next_due: Set(input.next_due),
            lot: Set(non_blank(input.lot)),
            notes: Set(non_blank(input.notes)),
        }
        .insert(&*self.db)
        .await?;

        info!(vaccine_id = %vaccine.id, pet_id = %pet_id, "vaccine registered");
        Ok(vaccine)
    }
}
