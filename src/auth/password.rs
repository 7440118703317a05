use crate::errors::ServiceError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;

/// Stored in place of a hash for accounts that cannot log in with a
/// password (owners created from a patient intake form).
pub const UNUSABLE_PASSWORD: &str = "!";

fn hash_blocking(password: &str) -> Result<String, ServiceError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| ServiceError::HashError(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

fn verify_blocking(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hashes on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| ServiceError::InternalError(format!("Hashing task failed: {}", e)))?
}

pub async fn verify_password(password: String, stored: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || verify_blocking(&password, &stored))
        .await
        .map_err(|e| ServiceError::InternalError(format!("Verification task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("vet123".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("vet123".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("vet124".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn unusable_hash_never_verifies() {
        assert!(!verify_password("".into(), UNUSABLE_PASSWORD.into())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn salts_differ_between_hashes() {
        let a = hash_password("same".into()).await.unwrap();
        let b = hash_password("same".into()).await.unwrap();
        assert_ne!(a, b);
    }
}
