// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Enrollment session repository.
//!
//! One file per in-progress wizard session, under the namespace of its
//! wizard kind. The record carries the draft, the current step, the cached
//! address validation, and the two-phase submit bookkeeping
//! (`registered_user_id`, `payment_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::enrollment::{EnrollmentDraft, EnrollmentKind, Step};
use crate::geo::AddressValidation;

use super::super::{JsonStorage, StorageError, StorageResult};

/// Enrollment session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Session open, wizard in progress.
    InProgress,
    /// Account registered; checkout not yet completed. Resumable.
    PendingCheckout,
    /// Charge created, waiting for an out-of-band payment (PIX/boleto).
    AwaitingPayment,
    /// Submission fully completed. The record is removed right after.
    Completed,
}

/// Persisted enrollment session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredEnrollment {
    /// Unique session identifier.
    pub enrollment_id: String,
    /// Wizard kind; determines the step sequence and storage namespace.
    pub kind: EnrollmentKind,
    /// Plan being purchased (purchase flow only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Current wizard step.
    pub step: Step,
    /// The in-progress form.
    pub draft: EnrollmentDraft,
    /// Cached result of the last address validation; dropped when any
    /// address field changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_validation: Option<AddressValidation>,
    /// Lifecycle status.
    pub status: EnrollmentStatus,
    /// Set once account registration succeeds; a resubmit skips phase one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_user_id: Option<String>,
    /// Last payment created for this session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl StoredEnrollment {
    /// Construct a fresh session at the wizard's initial step.
    pub fn new(enrollment_id: String, kind: EnrollmentKind, plan_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            enrollment_id,
            kind,
            plan_id,
            step: Step::first(kind),
            draft: EnrollmentDraft::default(),
            address_validation: None,
            status: EnrollmentStatus::InProgress,
            registered_user_id: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp the record as updated now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Repository for enrollment session storage.
pub struct EnrollmentRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> EnrollmentRepository<'a> {
    /// Create repository.
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    fn path_for(&self, kind: EnrollmentKind, enrollment_id: &str) -> std::path::PathBuf {
        self.storage
            .paths()
            .enrollment(kind.namespace(), enrollment_id)
    }

    /// Check if a session exists in any namespace.
    pub fn exists(&self, enrollment_id: &str) -> bool {
        self.find_path(enrollment_id).is_some()
    }

    fn find_path(&self, enrollment_id: &str) -> Option<std::path::PathBuf> {
        [
            EnrollmentKind::SelfRegistration,
            EnrollmentKind::PlanPurchase,
        ]
        .into_iter()
        .map(|kind| self.path_for(kind, enrollment_id))
        .find(|path| self.storage.exists(path))
    }

    /// Get a session by ID, looking in both namespaces.
    pub fn get(&self, enrollment_id: &str) -> StorageResult<StoredEnrollment> {
        let path = self
            .find_path(enrollment_id)
            .ok_or_else(|| StorageError::NotFound(format!("Enrollment {enrollment_id}")))?;
        self.storage.read_json(path)
    }

    /// Persist a new session.
    pub fn create(&self, record: &StoredEnrollment) -> StorageResult<()> {
        if self.exists(&record.enrollment_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Enrollment {}",
                record.enrollment_id
            )));
        }
        self.storage
            .write_json(self.path_for(record.kind, &record.enrollment_id), record)
    }

    /// Update an existing session.
    pub fn update(&self, record: &StoredEnrollment) -> StorageResult<()> {
        let path = self.path_for(record.kind, &record.enrollment_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Enrollment {}",
                record.enrollment_id
            )));
        }
        self.storage.write_json(path, record)
    }

    /// Delete a session (clears the persisted draft).
    pub fn delete(&self, enrollment_id: &str) -> StorageResult<()> {
        let path = self
            .find_path(enrollment_id)
            .ok_or_else(|| StorageError::NotFound(format!("Enrollment {enrollment_id}")))?;
        self.storage.delete(path)
    }
}
