// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Coupon repository.
//!
//! Codes are stored uppercased and matched case-insensitively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{JsonStorage, StorageError, StorageResult};

/// Persisted coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCoupon {
    /// Unique coupon identifier.
    pub coupon_id: String,
    /// Uppercased redemption code.
    pub code: String,
    /// Discount in percent, 1..=100.
    pub percent_off: u8,
    /// Inactive coupons are rejected without being deleted.
    pub active: bool,
    /// Optional expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl StoredCoupon {
    /// Construct an active coupon with a normalized code.
    pub fn new(code: impl Into<String>, percent_off: u8) -> Self {
        Self {
            coupon_id: uuid::Uuid::new_v4().to_string(),
            code: code.into().trim().to_ascii_uppercase(),
            percent_off,
            active: true,
            expires_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Repository for coupon storage.
pub struct CouponRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> CouponRepository<'a> {
    /// Create repository.
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    /// Get a coupon by ID.
    pub fn get(&self, coupon_id: &str) -> StorageResult<StoredCoupon> {
        let path = self.storage.paths().coupon(coupon_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Coupon {coupon_id}")));
        }
        self.storage.read_json(path)
    }

    /// Find a coupon by code, case-insensitively.
    pub fn find_by_code(&self, code: &str) -> StorageResult<Option<StoredCoupon>> {
        let needle = code.trim().to_ascii_uppercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let ids = self
            .storage
            .list_files(self.storage.paths().coupons_dir(), "json")?;
        for id in ids {
            if let Ok(coupon) = self.get(&id) {
                if coupon.code == needle {
                    return Ok(Some(coupon));
                }
            }
        }
        Ok(None)
    }

    /// Persist a new coupon, refusing duplicate codes.
    pub fn create(&self, coupon: &StoredCoupon) -> StorageResult<()> {
        if self.find_by_code(&coupon.code)?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "Coupon code {}",
                coupon.code
            )));
        }
        self.storage
            .write_json(self.storage.paths().coupon(&coupon.coupon_id), coupon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, JsonStorage) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = JsonStorage::new(paths);
        storage.initialize().expect("initialize test storage");
        (temp, storage)
    }

    #[test]
    fn codes_are_normalized_and_matched_case_insensitively() {
        let (_temp, storage) = test_storage();
        let repo = CouponRepository::new(&storage);

        repo.create(&StoredCoupon::new("treino10", 10))
            .expect("create coupon");

        let found = repo.find_by_code("Treino10").expect("lookup");
        assert_eq!(found.map(|c| c.code), Some("TREINO10".to_string()));
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let (_temp, storage) = test_storage();
        let repo = CouponRepository::new(&storage);

        repo.create(&StoredCoupon::new("BEMVINDO", 15)).expect("create");
        assert!(matches!(
            repo.create(&StoredCoupon::new("bemvindo", 20)),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn expiry_field_round_trips() {
        let (_temp, storage) = test_storage();
        let repo = CouponRepository::new(&storage);

        let mut coupon = StoredCoupon::new("EXPIRA", 5);
        coupon.expires_at = Some(Utc::now() + Duration::days(7));
        repo.create(&coupon).expect("create");

        let loaded = repo.find_by_code("EXPIRA").expect("lookup").unwrap();
        assert!(loaded.expires_at.is_some());
    }

    #[test]
    fn blank_code_finds_nothing() {
        let (_temp, storage) = test_storage();
        let repo = CouponRepository::new(&storage);
        assert!(repo.find_by_code("   ").expect("lookup").is_none());
    }
}
