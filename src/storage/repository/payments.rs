// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Payment record repository.
//!
//! A record is created per checkout attempt and keeps the method-specific
//! payload (PIX charge, boleto slip, card outcome) plus the expiry deadline
//! for the time-boxed rails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{BillingPeriod, PaymentMethod, PaymentOption};
use crate::providers::gateway::{BoletoCharge, CardOutcome, PixCharge};

use super::super::{JsonStorage, StorageError, StorageResult};

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Charge created, waiting for the payer (PIX/boleto).
    Pending,
    /// Settled (credit card approval is immediate).
    Approved,
    /// Card charge refused by the issuer.
    Declined,
    /// Deadline elapsed before the payer completed the charge.
    Expired,
}

/// Persisted payment record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredPayment {
    /// Unique payment identifier.
    pub payment_id: String,
    /// Enrollment session that produced this payment.
    pub enrollment_id: String,
    /// Account charged.
    pub user_id: String,
    /// Plan being purchased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    /// Selected coach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<String>,
    pub method: PaymentMethod,
    pub billing_period: BillingPeriod,
    pub payment_option: PaymentOption,
    /// 0 when paying up front.
    pub installments: u32,
    /// Charged amount, decimal string normalized to two places.
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix: Option<PixCharge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boleto: Option<BoletoCharge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardOutcome>,
    /// Deadline for the payer on the time-boxed rails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl StoredPayment {
    /// Seconds until the deadline, never negative. `None` when the payment
    /// has no deadline (credit card).
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at
            .map(|deadline| (deadline - now).num_seconds().max(0))
    }

    /// Whether the deadline has passed for a still-pending payment.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Pending
            && self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Repository for payment storage.
pub struct PaymentRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> PaymentRepository<'a> {
    /// Create repository.
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    /// Check if a payment exists.
    pub fn exists(&self, payment_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().payment(payment_id))
    }

    /// Get a payment by ID.
    pub fn get(&self, payment_id: &str) -> StorageResult<StoredPayment> {
        let path = self.storage.paths().payment(payment_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Payment {payment_id}")));
        }
        self.storage.read_json(path)
    }

    /// Persist a new payment.
    pub fn create(&self, payment: &StoredPayment) -> StorageResult<()> {
        if self.exists(&payment.payment_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Payment {}",
                payment.payment_id
            )));
        }
        self.storage
            .write_json(self.storage.paths().payment(&payment.payment_id), payment)
    }

    /// Update an existing payment.
    pub fn update(&self, payment: &StoredPayment) -> StorageResult<()> {
        if !self.exists(&payment.payment_id) {
            return Err(StorageError::NotFound(format!(
                "Payment {}",
                payment.payment_id
            )));
        }
        self.storage
            .write_json(self.storage.paths().payment(&payment.payment_id), payment)
    }

    /// List all payments still waiting on the payer, oldest first.
    pub fn list_pending(&self) -> StorageResult<Vec<StoredPayment>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().payments_dir(), "json")?;

        let mut pending = Vec::new();
        for id in ids {
            if let Ok(payment) = self.get(&id) {
                if payment.status == PaymentStatus::Pending {
                    pending.push(payment);
                }
            }
        }

        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}
