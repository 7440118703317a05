use crate::{
    auth::{hash_password, verify_password, Role, UNUSABLE_PASSWORD},
    entities::{
        user::{self, Entity as User},
        vet_profile::{self, Entity as VetProfile},
    },
    errors::{is_unique_violation, FormErrors, ServiceError},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap_or_else(|_| unreachable!()));

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupInput {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters."),
        regex(
            path = "USERNAME_RE",
            message = "Letters, digits and @/./+/-/_ only."
        )
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "The two password fields didn't match."))]
    pub password_confirm: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

/// Account created from the admin panel with an explicit role.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserInput {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters."),
        regex(
            path = "USERNAME_RE",
            message = "Letters, digits and @/./+/-/_ only."
        )
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters."))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserInput {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
    pub is_vet: Option<bool>,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters."))]
    pub password: Option<String>,
}

fn validate_schedule(schedule: &serde_json::Value) -> Result<(), ValidationError> {
    let Some(map) = schedule.as_object() else {
        return Err(ValidationError::new("schedule_not_object"));
    };
    let known = map
        .iter()
        .all(|(day, hours)| vet_profile::WEEKDAYS.contains(&day.as_str()) && hours.is_string());
    if known {
        Ok(())
    } else {
        let mut err = ValidationError::new("schedule_weekday");
        err.message = Some("Schedule keys must be weekday names with string values.".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateVetProfileInput {
    #[validate(length(max = 50))]
    pub license_number: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub specialties: Option<String>,
    /// Partial weekday map; days not mentioned keep their hours.
    #[validate(custom = "validate_schedule")]
    #[schema(value_type = Object)]
    pub schedule: Option<serde_json::Value>,
}

/// A user as listed in the admin panel.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub is_vet: bool,
    pub role: Role,
}

impl UserSummary {
    pub fn new(user: &user::Model, profile: Option<&vet_profile::Model>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_active: user.is_active,
            is_vet: profile.map_or(false, |p| p.is_vet),
            role: Role::of(user, profile),
        }
    }
}

/// Accounts, credentials and veterinarian profiles.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn signup(&self, input: SignupInput) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let user = self
            .insert_user(
                input.username,
                input.email,
                input.first_name,
                input.last_name,
                Some(input.password),
                false,
            )
            .await?;
        info!(user_id = %user.id, "user signed up");
        Ok(user)
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn authenticate(&self, input: LoginInput) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let user = User::find()
            .filter(user::Column::Username.eq(input.username.as_str()))
            .one(&*self.db)
            .await?;

        let Some(user) = user.filter(|u| u.is_active) else {
            return Err(FormErrors::form(BAD_CREDENTIALS).into());
        };

        if !verify_password(input.password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "failed login attempt");
            return Err(FormErrors::form(BAD_CREDENTIALS).into());
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub async fn find_with_profile(
        &self,
        id: Uuid,
    ) -> Result<Option<(user::Model, Option<vet_profile::Model>)>, ServiceError> {
        Ok(User::find_by_id(id)
            .find_also_related(VetProfile)
            .one(&*self.db)
            .await?)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(User::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?)
    }

    /// Lists accounts, optionally narrowed to one role.
    #[instrument(skip(self))]
    pub async fn list(&self, role: Option<Role>) -> Result<Vec<UserSummary>, ServiceError> {
        let rows = User::find()
            .find_also_related(VetProfile)
            .order_by_asc(user::Column::Username)
            .all(&*self.db)
            .await?;

        Ok(rows
            .iter()
            .map(|(user, profile)| UserSummary::new(user, profile.as_ref()))
            .filter(|summary| role.map_or(true, |r| summary.role == r))
            .collect())
    }

    #[instrument(skip(self, input), fields(username = %input.username, role = ?input.role))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<UserSummary, ServiceError> {
        input.validate()?;
        let user = self
            .insert_user(
                input.username,
                input.email,
                input.first_name,
                input.last_name,
                Some(input.password),
                input.role == Role::Admin,
            )
            .await?;

        let profile = if input.role == Role::Vet {
            Some(self.set_vet_flag(user.id, true).await?)
        } else {
            None
        };

        info!(user_id = %user.id, "user created by admin");
        Ok(UserSummary::new(&user, profile.as_ref()))
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        id: Uuid,
        input: UpdateUserInput,
    ) -> Result<UserSummary, ServiceError> {
        input.validate()?;
        let user = User::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;

        let mut active = user.into_active_model();
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(is_staff) = input.is_staff {
            active.is_staff = Set(is_staff);
        }
        if let Some(is_superuser) = input.is_superuser {
            active.is_superuser = Set(is_superuser);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(password) = input.password {
            active.password_hash = Set(hash_password(password).await?);
        }
        let user = active.update(&*self.db).await?;

        if let Some(is_vet) = input.is_vet {
            self.set_vet_flag(user.id, is_vet).await?;
        }

        let profile = VetProfile::find()
            .filter(vet_profile::Column::UserId.eq(user.id))
            .one(&*self.db)
            .await?;

        info!(user_id = %user.id, "user updated");
        Ok(UserSummary::new(&user, profile.as_ref()))
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = User::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("User", id));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Finds a login by username or creates a password-less account for it.
    /// Used when a patient is registered on behalf of an owner.
    #[instrument(skip(self))]
    pub async fn find_or_create_owner(&self, username: &str) -> Result<user::Model, ServiceError> {
        let username = username.trim();
        if let Some(existing) = self.find_by_username(username).await? {
            return Ok(existing);
        }

        let email = format!("{}@example.com", username.to_lowercase().replace(' ', "."));
        let first_name = username
            .split_whitespace()
            .next()
            .unwrap_or(username)
            .to_string();
        let user = self
            .insert_user(
                username.to_string(),
                email,
                first_name,
                String::new(),
                None,
                false,
            )
            .await?;
        info!(user_id = %user.id, "owner account created from patient intake");
        Ok(user)
    }

    /// Creates or updates the profile so that its veterinarian flag equals
    /// `is_vet`.
    #[instrument(skip(self))]
    pub async fn set_vet_flag(
        &self,
        user_id: Uuid,
        is_vet: bool,
    ) -> Result<vet_profile::Model, ServiceError> {
        let now = Utc::now();
        let existing = VetProfile::find()
            .filter(vet_profile::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?;

        let profile = match existing {
            Some(profile) => {
                let mut active = profile.into_active_model();
                active.is_vet = Set(is_vet);
                active.updated_at = Set(now);
                active.update(&*self.db).await?
            }
            None => {
                vet_profile::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    is_vet: Set(is_vet),
                    license_number: Set(None),
                    phone: Set(None),
                    address: Set(None),
                    specialties: Set(None),
                    schedule: Set(vet_profile::default_schedule()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&*self.db)
                .await?
            }
        };

        info!(user_id = %user_id, is_vet, "veterinarian flag set");
        Ok(profile)
    }

    /// Sets the veterinarian flag for the named login.
    pub async fn grant_vet(&self, username: &str) -> Result<vet_profile::Model, ServiceError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", username))?;
        self.set_vet_flag(user.id, true).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_vet_profile(
        &self,
        profile: vet_profile::Model,
        input: UpdateVetProfileInput,
    ) -> Result<vet_profile::Model, ServiceError> {
        input.validate()?;

        let mut schedule = profile.schedule.clone();
        let mut active = profile.into_active_model();
        if let Some(license_number) = input.license_number {
            active.license_number = Set(Some(license_number));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(specialties) = input.specialties {
            active.specialties = Set(Some(specialties));
        }
        if let (Some(updates), Some(current)) = (
            input.schedule.as_ref().and_then(|s| s.as_object()),
            schedule.as_object_mut(),
        ) {
            for (day, hours) in updates {
                current.insert(day.clone(), hours.clone());
            }
            active.schedule = Set(schedule);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    async fn insert_user(
        &self,
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        password: Option<String>,
        is_staff: bool,
    ) -> Result<user::Model, ServiceError> {
        if self.find_by_username(&username).await?.is_some() {
            return Err(FormErrors::field("username", USERNAME_TAKEN).into());
        }

        let password_hash = match password {
            Some(password) => hash_password(password).await?,
            None => UNUSABLE_PASSWORD.to_string(),
        };

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            email: Set(email),
            first_name: Set(first_name),
            last_name: Set(last_name),
            password_hash: Set(password_hash),
            is_superuser: Set(false),
            is_staff: Set(is_staff),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };

        model.insert(&*self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                FormErrors::field("username", USERNAME_TAKEN).into()
            } else {
                ServiceError::from(err)
            }
        })
    }
}
