// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! # Shared Domain Models
//!
//! Types used across the API, the enrollment state machine, and storage:
//! addresses, billing periods, payment methods and card details. All types
//! derive `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON
//! handling and OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A Brazilian street address as collected by the enrollment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    /// Street name (logradouro).
    pub street: String,
    /// House/building number.
    pub number: String,
    /// Optional complement (apartment, block, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    /// Neighborhood (bairro).
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code (UF).
    pub state: String,
    /// CEP, masked `00000-000` or bare 8 digits.
    pub postal_code: String,
}

/// Payment rails supported at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Boleto,
    CreditCard,
}

/// Plan billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Semiannual,
    Yearly,
}

/// Whether the charge is paid up front or financed in installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOption {
    UpFront,
    Installments,
}

impl Default for PaymentOption {
    fn default() -> Self {
        Self::UpFront
    }
}

/// Card data accepted at submit time only.
///
/// Never persisted: the stored payment record keeps only the outcome and the
/// last four digits.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CardDetails {
    /// Full card number (digits, separators tolerated).
    pub number: String,
    /// Name as printed on the card.
    pub holder_name: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub cvc: String,
}

impl CardDetails {
    /// Last four digits of the card number, for receipts and storage.
    pub fn last_four(&self) -> String {
        let digits: String = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        let start = digits.len().saturating_sub(4);
        digits[start..].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_last_four_ignores_separators() {
        let card = CardDetails {
            number: "4111 1111 1111 1234".to_string(),
            holder_name: "ANA SILVA".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvc: "123".to_string(),
        };
        assert_eq!(card.last_four(), "1234");
    }

    #[test]
    fn payment_method_serializes_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::CreditCard).unwrap();
        assert_eq!(json, r#""credit_card""#);
    }

    #[test]
    fn billing_period_round_trips() {
        let period: BillingPeriod = serde_json::from_str(r#""biweekly""#).unwrap();
        assert_eq!(period, BillingPeriod::Biweekly);
    }
}
