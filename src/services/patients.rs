use super::{icontains, non_blank, users::UserService};
use crate::{
    auth::AuthUser,
    config::ClinicConfig,
    entities::{
        clinical_record::{self, Entity as ClinicalRecord},
        consultation::{self, Entity as Consultation},
        pet::{self, Entity as Pet, PetSex, PetType},
        treatment::{self, Entity as Treatment},
        user::{self, Entity as User},
        vaccine::{self, Entity as Vaccine},
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_weight(weight: &Decimal) -> Result<(), ValidationError> {
    if weight.is_sign_positive() && !weight.is_zero() {
        Ok(())
    } else {
        let mut err = ValidationError::new("weight_kg");
        err.message = Some("Weight must be greater than zero.".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PatientInput {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters."))]
    pub name: String,
    pub species: PetType,
    #[validate(length(max = 100))]
    pub breed: Option<String>,
    pub sex: Option<PetSex>,
    #[validate(range(min = 0, max = 60, message = "Age must be between 0 and 60 years."))]
    pub age_years: Option<i32>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[validate(custom = "validate_weight")]
    pub weight_kg: Option<Decimal>,
    pub notes: Option<String>,
    /// Login of the owner. When absent the registering veterinarian is
    /// recorded as owner; unknown logins get a password-less account.
    #[validate(length(max = 150))]
    pub owner_username: Option<String>,
}

/// A patient with its owner's login, as shown in listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PatientSummary {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub pet: pet::Model,
    pub owner_username: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PatientDetail {
    #[schema(value_type = Object)]
    pub pet: pet::Model,
    pub owner_username: Option<String>,
    pub owner_name: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub record: Option<clinical_record::Model>,
    #[schema(value_type = Vec<Object>)]
    pub consultations: Vec<consultation::Model>,
    #[schema(value_type = Vec<Object>)]
    pub vaccines: Vec<vaccine::Model>,
    #[schema(value_type = Vec<Object>)]
    pub treatments: Vec<treatment::Model>,
}

/// Patient (pet) registry used by the clinic.
#[derive(Clone)]
pub struct PatientService {
    db: Arc<DatabaseConnection>,
    users: UserService,
    clinic: ClinicConfig,
}

impl PatientService {
    pub fn new(db: Arc<DatabaseConnection>, users: UserService, clinic: ClinicConfig) -> Self {
        Self { db, users, clinic }
    }

    pub async fn get(&self, id: Uuid) -> Result<pet::Model, ServiceError> {
        Pet::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Patient", id))
    }

    /// Active patients, newest first, optionally matching `search` against
    /// the pet's name, its breed or the owner's login.
    #[instrument(skip(self))]
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<PatientSummary>, ServiceError> {
        let mut query = Pet::find()
            .find_also_related(User)
            .filter(pet::Column::Active.eq(true));

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains((pet::Entity, pet::Column::Name), term))
                    .add(icontains((pet::Entity, pet::Column::Breed), term))
                    .add(icontains((user::Entity, user::Column::Username), term)),
            );
        }

        let rows = query
            .order_by_desc(pet::Column::RegisteredAt)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(pet, owner)| PatientSummary {
                pet,
                owner_username: owner.map(|o| o.username),
            })
            .collect())
    }

    /// The patient with its record and the latest clinical history.
    #[instrument(skip(self))]
    pub async fn detail(&self, id: Uuid) -> Result<PatientDetail, ServiceError> {
        let db = &*self.db;
        let (pet, owner) = Pet::find_by_id(id)
            .find_also_related(User)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Patient", id))?;
        let limit = self.clinic.patient_history_limit;

        let record = ClinicalRecord::find()
            .filter(clinical_record::Column::PetId.eq(id))
            .one(db)
            .await?;
        let consultations = Consultation::find()
            .filter(consultation::Column::PetId.eq(id))
            .order_by_desc(consultation::Column::ConsultedAt)
            .limit(limit)
            .all(db)
            .await?;
        let vaccines = Vaccine::find()
            .filter(vaccine::Column::PetId.eq(id))
            .order_by_desc(vaccine::Column::AppliedOn)
            .limit(limit)
            .all(db)
            .await?;
        let treatments = Treatment::find()
            .filter(treatment::Column::PetId.eq(id))
            .order_by_desc(treatment::Column::StartedOn)
            .limit(limit)
            .all(db)
            .await?;

        Ok(PatientDetail {
            pet,
            owner_username: owner.as_ref().map(|o| o.username.clone()),
            owner_name: owner.as_ref().map(|o| o.display_name()),
            record,
            consultations,
            vaccines,
            treatments,
        })
    }

    #[instrument(skip(self, vet, input), fields(name = %input.name))]
    pub async fn create(&self, vet: &AuthUser, input: PatientInput) -> Result<pet::Model, ServiceError> {
        input.validate()?;
        let owner_id = self.resolve_owner(vet, input.owner_username.as_deref()).await?;

        let model = pet::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            name: Set(input.name.trim().to_string()),
            species: Set(input.species),
            breed: Set(non_blank(input.breed)),
            sex: Set(input.sex),
            age_years: Set(input.age_years),
            color: Set(non_blank(input.color)),
            weight_kg: Set(input.weight_kg),
            notes: Set(non_blank(input.notes)),
            registered_at: Set(Utc::now()),
            active: Set(true),
        };

        let pet = model.insert(&*self.db).await?;
        info!(pet_id = %pet.id, owner_id = %owner_id, "patient registered");
        Ok(pet)
    }

    #[instrument(skip(self, vet, input))]
    pub async fn update(
        &self,
        vet: &AuthUser,
        id: Uuid,
        input: PatientInput,
    ) -> Result<pet::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;
        let owner_id = match non_blank(input.owner_username.clone()) {
            Some(username) => self.resolve_owner(vet, Some(&username)).await?,
            None => existing.owner_id,
        };

        let mut active = existing.into_active_model();
        active.owner_id = Set(owner_id);
        active.name = Set(input.name.trim().to_string());
        active.species = Set(input.species);
        active.breed = Set(non_blank(input.breed));
        active.sex = Set(input.sex);
        active.age_years = Set(input.age_years);
        active.color = Set(non_blank(input.color));
        active.weight_kg = Set(input.weight_kg);
        active.notes = Set(non_blank(input.notes));

        let pet = active.update(&*self.db).await?;
        info!(pet_id = %pet.id, "patient updated");
        Ok(pet)
    }

    /// Hides the patient from listings; history is kept.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<pet::Model, ServiceError> {
        let mut active = self.get(id).await?.into_active_model();
        active.active = Set(false);
        let pet = active.update(&*self.db).await?;
        info!(pet_id = %pet.id, "patient deactivated");
        Ok(pet)
    }

    /// Finds the pet an appointment was booked for: same name, same owner.
    pub async fn find_for_appointment(
        &self,
        pet_name: &str,
        owner_id: Uuid,
    ) -> Result<Option<pet::Model>, ServiceError> {
        Ok(Pet::find()
            .filter(pet::Column::Name.eq(pet_name))
            .filter(pet::Column::OwnerId.eq(owner_id))
            .one(&*self.db)
            .await?)
    }

    async fn resolve_owner(
        &self,
        vet: &AuthUser,
        owner_username: Option<&str>,
    ) -> Result<Uuid, ServiceError> {
        match owner_username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(username) => Ok(self.users.find_or_create_owner(username).await?.id),
            None => Ok(vet.id()),
        }
    }
}
