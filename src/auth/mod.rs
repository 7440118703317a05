//! Session-backed authentication.
//!
//! Handlers ask for the caller's identity through extractors:
//!
//! - [`AuthUser`]: any logged-in, active user (401 otherwise)
//! - [`VetUser`]: a user whose profile carries the veterinarian flag (403 otherwise)
//! - [`StaffUser`]: a staff member or superuser (403 otherwise)

pub mod password;

use crate::entities::{user, vet_profile};
use crate::errors::ApiError;
use crate::session::Session;
use crate::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use utoipa::ToSchema;
use uuid::Uuid;

pub use password::{hash_password, verify_password, UNUSABLE_PASSWORD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Vet,
    Client,
}

impl Role {
    /// Superuser/staff take precedence over the veterinarian flag.
    pub fn of(user: &user::Model, profile: Option<&vet_profile::Model>) -> Self {
        if user.is_admin() {
            Role::Admin
        } else if profile.map_or(false, |p| p.is_vet) {
            Role::Vet
        } else {
            Role::Client
        }
    }

    /// Where the client should go after logging in.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Vet => "/vet/dashboard",
            Role::Client => "/store",
        }
    }
}

/// The logged-in user together with their (optional) veterinarian profile.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: user::Model,
    pub profile: Option<vet_profile::Model>,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn is_vet(&self) -> bool {
        self.profile.as_ref().map_or(false, |p| p.is_vet)
    }

    pub fn is_staff(&self) -> bool {
        self.user.is_admin()
    }

    pub fn role(&self) -> Role {
        Role::of(&self.user, self.profile.as_ref())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<AuthUser>() {
            return Ok(cached.clone());
        }

        let session = Session::from_request_parts(parts, state).await?;
        let user_id = session.user_id().ok_or(ApiError::Unauthorized)?;

        let found = state.services.users.find_with_profile(user_id).await?;
        let Some((user, profile)) = found.filter(|(user, _)| user.is_active) else {
            // Account was removed or disabled since login.
            session.logout();
            return Err(ApiError::Unauthorized);
        };

        let auth = AuthUser { user, profile };
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}

/// Caller with the veterinarian flag set.
#[derive(Debug, Clone)]
pub struct VetUser(pub AuthUser);

impl Deref for VetUser {
    type Target = AuthUser;

    fn deref(&self) -> &AuthUser {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for VetUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_vet() {
            return Err(ApiError::Forbidden(
                "Veterinarian access required".to_string(),
            ));
        }
        Ok(VetUser(user))
    }
}

/// Caller with staff or superuser rights.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthUser);

impl Deref for StaffUser {
    type Target = AuthUser;

    fn deref(&self) -> &AuthUser {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff() {
            return Err(ApiError::Forbidden("Staff access required".to_string()));
        }
        Ok(StaffUser(user))
    }
}
