// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argon2 credential hashing, run on the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{ServiceError, ServiceResult};

/// PHC-format argon2id hash of `password`.
pub async fn hash_password(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::internal(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| ServiceError::internal(format!("password hashing task failed: {e}")))?
}

/// Whether `password` matches the stored PHC `hash`.
pub async fn verify_password(password: String, hash: String) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ServiceError::internal(format!("stored hash is unreadable: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ServiceError::internal(format!("password verification task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_verifies_only_the_original_password() {
        let hash = hash_password("secret1".into()).await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("secret1"));

        assert!(verify_password("secret1".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("secret2".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let a = hash_password("secret1".into()).await.unwrap();
        let b = hash_password("secret1".into()).await.unwrap();
        assert_ne!(a, b);
    }
}
