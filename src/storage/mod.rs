// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! # Persistent Storage
//!
//! JSON-on-disk storage for enrollment sessions, user accounts, coupons and
//! payments, plus a JSONL audit log.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   enrollments/
//!     registration/{enrollment_id}.json    # self-registration drafts
//!     plan_purchase/{enrollment_id}.json   # plan-purchase drafts
//!   users/
//!     {user_id}.json
//!   coupons/
//!     {coupon_id}.json
//!   payments/
//!     {payment_id}.json
//!   audit/
//!     {date}/events.jsonl                  # daily audit logs
//! ```
//!
//! The two enrollment namespaces are deliberately separate so the
//! self-registration and plan-purchase wizards can never collide on a
//! session id. The root directory is injected (never hardcoded at call
//! sites), so tests run against temp dirs.

pub mod audit;
pub mod json_store;
pub mod paths;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use json_store::{JsonStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    CouponRepository, EnrollmentRepository, EnrollmentStatus, PaymentRepository, PaymentStatus,
    StoredCoupon, StoredEnrollment, StoredPayment, StoredUser, UserRepository,
};
