// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Path constants and utilities for the storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for persistent storage.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persistent data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Enrollment Paths ==========

    /// Directory containing all enrollment namespaces.
    pub fn enrollments_dir(&self) -> PathBuf {
        self.root.join("enrollments")
    }

    /// Directory for one wizard namespace (`registration`, `plan_purchase`).
    pub fn enrollment_namespace_dir(&self, namespace: &str) -> PathBuf {
        self.enrollments_dir().join(namespace)
    }

    /// Path to a specific enrollment session file.
    pub fn enrollment(&self, namespace: &str, enrollment_id: &str) -> PathBuf {
        self.enrollment_namespace_dir(namespace)
            .join(format!("{enrollment_id}.json"))
    }

    // ========== User Paths ==========

    /// Directory containing all user accounts.
    pub fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    /// Path to a specific user account file.
    pub fn user(&self, user_id: &str) -> PathBuf {
        self.users_dir().join(format!("{user_id}.json"))
    }

    // ========== Coupon Paths ==========

    /// Directory containing all coupons.
    pub fn coupons_dir(&self) -> PathBuf {
        self.root.join("coupons")
    }

    /// Path to a specific coupon file.
    pub fn coupon(&self, coupon_id: &str) -> PathBuf {
        self.coupons_dir().join(format!("{coupon_id}.json"))
    }

    // ========== Payment Paths ==========

    /// Directory containing all payments.
    pub fn payments_dir(&self) -> PathBuf {
        self.root.join("payments")
    }

    /// Path to a specific payment file.
    pub fn payment(&self, payment_id: &str) -> PathBuf {
        self.payments_dir().join(format!("{payment_id}.json"))
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
