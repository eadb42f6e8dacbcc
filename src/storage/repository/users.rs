// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! User account repository.
//!
//! Accounts are created by the enrollment submit flow. E-mail uniqueness is
//! enforced at creation time. Passwords are stored as salted HMAC-SHA-256
//! digests, never in clear.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::models::Address;

use super::super::{JsonStorage, StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

/// Persisted user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    /// Unique user identifier.
    pub user_id: String,
    /// Normalized (lowercased) e-mail; unique across accounts.
    pub email: String,
    pub full_name: String,
    /// CPF, masked `000.000.000-00`.
    pub cpf: String,
    /// Phone, masked `(00) 00000-0000`.
    pub phone: String,
    /// Birth date, `YYYY-MM-DD`.
    pub birth_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    pub address: Address,
    /// `{salt}${hex digest}`.
    pub password_digest: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Compute the stored digest for a password with a fresh salt.
pub fn digest_password(password: &str, salt: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(password.as_bytes());
    let digest = mac.finalize().into_bytes();

    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{salt}${hex}")
}

/// Check a password against a stored `{salt}${hex}` digest.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, _)) = stored.split_once('$') else {
        return false;
    };
    digest_password(password, salt) == stored
}

/// Repository for user account storage.
pub struct UserRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> UserRepository<'a> {
    /// Create repository.
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    /// Check if a user exists.
    pub fn exists(&self, user_id: &str) -> bool {
        self.storage.exists(self.storage.paths().user(user_id))
    }

    /// Get a user by ID.
    pub fn get(&self, user_id: &str) -> StorageResult<StoredUser> {
        let path = self.storage.paths().user(user_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("User {user_id}")));
        }
        self.storage.read_json(path)
    }

    /// Find a user by normalized e-mail.
    pub fn find_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let needle = email.trim().to_lowercase();
        let ids = self
            .storage
            .list_files(self.storage.paths().users_dir(), "json")?;

        for id in ids {
            if let Ok(user) = self.get(&id) {
                if user.email == needle {
                    return Ok(Some(user));
                }
            }
        }
        Ok(None)
    }

    /// Persist a new account, enforcing e-mail uniqueness.
    pub fn create(&self, user: &StoredUser) -> StorageResult<()> {
        if self.exists(&user.user_id) {
            return Err(StorageError::AlreadyExists(format!(
                "User {}",
                user.user_id
            )));
        }
        if self.find_by_email(&user.email)?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "E-mail {}",
                user.email
            )));
        }
        self.storage
            .write_json(self.storage.paths().user(&user.user_id), user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, JsonStorage) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = JsonStorage::new(paths);
        storage.initialize().expect("initialize test storage");
        (temp, storage)
    }

    fn sample_user(id: &str, email: &str) -> StoredUser {
        StoredUser {
            user_id: id.to_string(),
            email: email.to_string(),
            full_name: "Ana Silva".to_string(),
            cpf: "529.982.247-25".to_string(),
            phone: "(47) 99988-7766".to_string(),
            birth_date: "1994-03-12".to_string(),
            gender: None,
            address: Address::default(),
            password_digest: digest_password("segredo1", "salt-1"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_digest_round_trips() {
        let stored = digest_password("segredo1", "salt-abc");
        assert!(stored.starts_with("salt-abc$"));
        assert!(verify_password("segredo1", &stored));
        assert!(!verify_password("errada", &stored));
    }

    #[test]
    fn different_salts_produce_different_digests() {
        assert_ne!(
            digest_password("segredo1", "salt-a"),
            digest_password("segredo1", "salt-b")
        );
    }

    #[test]
    fn create_and_find_by_email() {
        let (_temp, storage) = test_storage();
        let repo = UserRepository::new(&storage);

        repo.create(&sample_user("u1", "ana@endurance.app"))
            .expect("create user");

        let found = repo.find_by_email("ana@endurance.app").expect("lookup");
        assert_eq!(found.map(|u| u.user_id), Some("u1".to_string()));

        let missing = repo.find_by_email("ninguem@endurance.app").expect("lookup");
        assert!(missing.is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_temp, storage) = test_storage();
        let repo = UserRepository::new(&storage);

        repo.create(&sample_user("u1", "ana@endurance.app"))
            .expect("create first");
        let err = repo
            .create(&sample_user("u2", "ana@endurance.app"))
            .expect_err("duplicate email must fail");
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }
}
