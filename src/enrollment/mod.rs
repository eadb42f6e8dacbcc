// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! # Enrollment Sessions
//!
//! The enrollment wizard as a server-held state machine: a draft record that
//! advances through validated steps up to submission. Two wizard kinds exist,
//! self-registration (account only) and plan purchase (account + checkout),
//! each with its own step sequence and its own storage namespace.

pub mod draft;
pub mod installments;
pub mod steps;

pub use draft::{DraftPatch, EnrollmentDraft};
pub use steps::{validate_step, EnrollmentKind, Step};
