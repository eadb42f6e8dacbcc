// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! # Field Validation
//!
//! Pure validation and progressive masking for the enrollment form fields:
//! CPF (mod-11 check digits), e-mail (structural), phone and CEP (mask only).
//!
//! None of these functions perform I/O or panic; partial input is reported
//! as "not yet valid" without an error message, so callers can validate on
//! every keystroke without flashing errors at the user.

pub mod cpf;
pub mod email;
pub mod masks;

/// Outcome of checking a single form field.
///
/// `valid == false` with `error == None` means the input is incomplete
/// rather than wrong (e.g. a CPF with fewer than 11 digits typed so far).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCheck {
    pub valid: bool,
    /// Masked/normalized display value for the field.
    pub formatted: String,
    pub error: Option<String>,
}

impl FieldCheck {
    pub(crate) fn incomplete(formatted: impl Into<String>) -> Self {
        Self {
            valid: false,
            formatted: formatted.into(),
            error: None,
        }
    }

    pub(crate) fn ok(formatted: impl Into<String>) -> Self {
        Self {
            valid: true,
            formatted: formatted.into(),
            error: None,
        }
    }

    pub(crate) fn invalid(formatted: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            formatted: formatted.into(),
            error: Some(error.into()),
        }
    }
}

/// Strip everything but ASCII digits.
pub fn digits_of(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}
