use super::{icontains, non_blank};
use crate::{
    entities::{
        clinical_record::{self, Entity as ClinicalRecord},
        consultation::{self, Entity as Consultation},
        pet::{self, Entity as Pet},
        treatment::{self, Entity as Treatment},
        vaccine::{self, Entity as Vaccine},
    },
    errors::ServiceError,
};
use chrono::Utc;
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
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ClinicalRecordInput {
    pub history: Option<String>,
    pub allergies: Option<String>,
    pub permanent_medications: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordSummary {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub record: clinical_record::Model,
    pub pet_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CostSummary {
    pub total: Decimal,
    pub paid: Decimal,
    pub pending: Decimal,
}

impl CostSummary {
    pub fn of(consultations: &[consultation::Model]) -> Self {
        let total: Decimal = consultations.iter().map(|c| c.cost).sum();
        let paid: Decimal = consultations
            .iter()
            .filter(|c| c.paid)
            .map(|c| c.cost)
            .sum();
        Self {
            total,
            paid,
            pending: total - paid,
        }
    }
}

/// Full clinical history of one patient.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordDetail {
    #[schema(value_type = Object)]
    pub record: clinical_record::Model,
    #[schema(value_type = Object)]
    pub pet: pet::Model,
    #[schema(value_type = Vec<Object>)]
    pub consultations: Vec<consultation::Model>,
    #[schema(value_type = Vec<Object>)]
    pub vaccines: Vec<vaccine::Model>,
    #[schema(value_type = Vec<Object>)]
    pub treatments: Vec<treatment::Model>,
    pub total_consultations: usize,
    pub costs: CostSummary,
}

#[derive(Clone)]
pub struct ClinicalRecordService {
    db: Arc<DatabaseConnection>,
}

impl ClinicalRecordService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Most recently updated first, optionally filtered by pet name.
    #[instrument(skip(self))]
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<RecordSummary>, ServiceError> {
        let mut query = ClinicalRecord::find().find_also_related(Pet);
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(icontains((pet::Entity, pet::Column::Name), term));
        }

        Ok(query
            .order_by_desc(clinical_record::Column::UpdatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(record, pet)| RecordSummary {
                record,
                pet_name: pet.map(|p| p.name),
            })
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<clinical_record::Model, ServiceError> {
        ClinicalRecord::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Clinical record", id))
    }

    pub async fn find_for_pet(
        &self,
        pet_id: Uuid,
    ) -> Result<Option<clinical_record::Model>, ServiceError> {
        Ok(ClinicalRecord::find()
            .filter(clinical_record::Column::PetId.eq(pet_id))
            .one(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn detail(&self, id: Uuid) -> Result<RecordDetail, ServiceError> {
        let record = self.get(id).await?;
        self.expand(record).await
    }

    pub async fn detail_for_pet(&self, pet_id: Uuid) -> Result<RecordDetail, ServiceError> {
        let record = self
            .find_for_pet(pet_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Clinical record for patient", pet_id))?;
        self.expand(record).await
    }

    async fn expand(&self, record: clinical_record::Model) -> Result<RecordDetail, ServiceError> {
        let db = &*self.db;
        let pet = Pet::find_by_id(record.pet_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Patient", record.pet_id))?;

        let consultations = Consultation::find()
            .filter(consultation::Column::PetId.eq(pet.id))
            .order_by_desc(consultation::Column::ConsultedAt)
            .all(db)
            .await?;
        let vaccines = Vaccine::find()
            .filter(vaccine::Column::PetId.eq(pet.id))
            .order_by_desc(vaccine::Column::AppliedOn)
            .all(db)
            .await?;
        let treatments = Treatment::find()
            .filter(treatment::Column::PetId.eq(pet.id))
            .order_by_desc(treatment::Column::StartedOn)
            .all(db)
            .await?;

        Ok(RecordDetail {
            costs: CostSummary::of(&consultations),
            total_consultations: consultations.len(),
            record,
            pet,
            consultations,
            vaccines,
            treatments,
        })
    }

    /// Opens the patient's record. A patient has at most one record; when it
    /// already exists it is returned untouched with `created = false`.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        pet_id: Uuid,
        vet_id: Uuid,
        input: ClinicalRecordInput,
    ) -> Result<(clinical_record::Model, bool), ServiceError> {
        input.validate()?;
        Pet::find_by_id(pet_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Patient", pet_id))?;

        if let Some(existing) = self.find_for_pet(pet_id).await? {
            return Ok((existing, false));
        }

        let now = Utc::now();
        let record = clinical_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            pet_id: Set(pet_id),
            vet_id: Set(Some(vet_id)),
            history: Set(non_blank(input.history)),
            allergies: Set(non_blank(input.allergies)),
            permanent_medications: Set(non_blank(input.permanent_medications)),
            notes: Set(non_blank(input.notes)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(record_id = %record.id, pet_id = %pet_id, "clinical record opened");
        Ok((record, true))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        vet_id: Uuid,
        input: ClinicalRecordInput,
    ) -> Result<clinical_record::Model, ServiceError> {
        input.validate()?;
        let mut active = self.get(id).await?.into_active_model();
        active.vet_id = Set(Some(vet_id));
        active.history = Set(non_blank(input.history));
        active.allergies = Set(non_blank(input.allergies));
        active.permanent_medications = Set(non_blank(input.permanent_medications));
        active.notes = Set(non_blank(input.notes));
        active.updated_at = Set(Utc::now());

        let record = active.update(&*self.db).await?;
        info!(record_id = %record.id, "clinical record updated");
        Ok(record)
    }
}
