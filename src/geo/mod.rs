// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! # Address Resolution
//!
//! Two lookups back the address step of the enrollment wizard:
//!
//! - [`viacep`] - street/neighborhood/city/state pre-fill from an 8-digit
//!   CEP, against a ViaCEP-compatible service.
//! - [`geocode`] - full-address validation. Delegates to the configured
//!   geocoding provider when `GEOCODING_API_KEY` is set; otherwise a
//!   deterministic offline approximation keeps the flow usable, with every
//!   result explicitly flagged as best-effort.
//!
//! Neither lookup surfaces transport errors to callers: failures become
//! `valid: false` results with a retry message.

pub mod geocode;
pub mod viacep;

pub use geocode::Geocoder;
pub use viacep::{PostalAddress, PostalLookup, ViaCepClient};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Geographic coordinates (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Which path produced an address validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeoProvider {
    /// The configured external geocoding service.
    Geocoding,
    /// The deterministic offline approximation (no API key configured).
    Offline,
}

/// Result of validating a full address.
///
/// Cached on the enrollment record to gate advancement past the address
/// step, so it is persisted alongside the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddressValidation {
    pub valid: bool,
    /// Human-readable outcome, in the platform's locale.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    pub provider: GeoProvider,
    /// True when the offline approximation produced this result; such a
    /// verdict is a plausibility check, not a verified geocode.
    pub approximate: bool,
}

impl AddressValidation {
    pub(crate) fn rejected(message: impl Into<String>, provider: GeoProvider) -> Self {
        Self {
            valid: false,
            message: message.into(),
            coordinates: None,
            formatted_address: None,
            provider,
            approximate: provider == GeoProvider::Offline,
        }
    }
}
