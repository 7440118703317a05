use super::non_blank;
use crate::{
    entities::{
        pet::Entity as Pet,
        treatment::{self, Entity as Treatment, TreatmentStatus},
    },
    errors::{FormErrors, ServiceError},
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TreatmentInput {
    #[validate(length(min = 1, max = 200, message = "Treatment name is required."))]
    pub name: String,
    pub description: Option<String>,
    pub started_on: NaiveDate,
    pub ended_on: Option<NaiveDate>,
    pub status: Option<TreatmentStatus>,
    pub consultation_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TreatmentStatusInput {
    pub status: TreatmentStatus,
    pub ended_on: Option<NaiveDate>,
}

fn check_dates(started_on: NaiveDate, ended_on: Option<NaiveDate>) -> Result<(), FormErrors> {
    match ended_on {
        Some(end) if end < started_on => Err(FormErrors::field(
            "ended_on",
            "A treatment cannot end before it starts.",
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct TreatmentService {
    db: Arc<DatabaseConnection>,
}

impl TreatmentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list(&self, pet_id: Option<Uuid>) -> Result<Vec<treatment::Model>, ServiceError> {
        let mut query = Treatment::find();
        if let Some(pet_id) = pet_id {
            query = query.filter(treatment::Column::PetId.eq(pet_id));
        }
        Ok(query
            .order_by_desc(treatment::Column::StartedOn)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn register(
        &self,
        pet_id: Uuid,
        vet_id: Uuid,
        input: TreatmentInput,
    ) -> Result<treatment::Model, ServiceError> {
        input.validate()?;
        check_dates(input.started_on, input.ended_on)?;
        Pet::find_by_id(pet_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Patient", pet_id))?;

        let treatment = treatment::ActiveModel {
            id: Set(Uuid::new_v4()),
            pet_id: Set(pet_id),
            consultation_id: Set(input.consultation_id),
            vet_id: Set(Some(vet_id)),
            name: Set(input.name.trim().to_string()),
            description: Set(non_blank(input.description)),
            started_on: Set(input.started_on),
            ended_on: Set(input.ended_on),
            status: Set(input.status.unwrap_or_default()),
            notes: Set(non_blank(input.notes)),
        }
        .insert(&*self.db)
        .await?;

        info!(treatment_id = %treatment.id, pet_id = %pet_id, "treatment registered");
        Ok(treatment)
    }

    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: Uuid,
        input: TreatmentStatusInput,
    ) -> Result<treatment::Model, ServiceError> {
        let existing = Treatment::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Treatment", id))?;
        check_dates(existing.started_on, input.ended_on)?;

        let mut active = existing.into_active_model();
        active.status = Set(input.status);
        if input.ended_on.is_some() {
            active.ended_on = Set(input.ended_on);
        }
        let treatment = active.update(&*self.db).await?;
        info!(treatment_id = %treatment.id, status = ?treatment.status, "treatment status changed");
        Ok(treatment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_date_cannot_precede_start() {
        let start = NaiveDate::from_ymd_opt(2030, 5, 10).unwrap();
        assert!(check_dates(start, None).is_ok());
        assert!(check_dates(start, Some(start)).is_ok());
        assert!(check_dates(start, start.pred_opt())
            .unwrap_err()
            .has_field("ended_on"));
    }
}
