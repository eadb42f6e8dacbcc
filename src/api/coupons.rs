// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Coupon validation API.
//!
//! A side operation of the checkout step: validating a code never blocks
//! step advancement, and the verdict is returned with 200 either way.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    error::ApiError,
    state::AppState,
    storage::{AuditEventType, CouponRepository},
};

/// Request body for coupon validation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
}

/// Coupon verdict.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponValidationResponse {
    pub valid: bool,
    /// Normalized (uppercased) code.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_off: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Validate a coupon code.
#[utoipa::path(
    post,
    path = "/v1/coupons/validate",
    tag = "Coupons",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon verdict", body = CouponValidationResponse)
    )
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<CouponValidationResponse>, ApiError> {
    let code = request.code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Ok(Json(CouponValidationResponse {
            valid: false,
            code,
            percent_off: None,
            message: Some("Informe um cupom".to_string()),
        }));
    }

    let repo = CouponRepository::new(&state.storage);
    let coupon = repo
        .find_by_code(&code)
        .map_err(|e| ApiError::internal(format!("Failed to check coupon: {e}")))?;

    audit_log!(
        &state.storage,
        AuditEventType::CouponValidated,
        "coupon",
        &code
    );

    let response = match coupon {
        Some(coupon) if !coupon.active => CouponValidationResponse {
            valid: false,
            code,
            percent_off: None,
            message: Some("Cupom inativo".to_string()),
        },
        Some(coupon)
            if coupon
                .expires_at
                .is_some_and(|deadline| deadline <= Utc::now()) =>
        {
            CouponValidationResponse {
                valid: false,
                code,
                percent_off: None,
                message: Some("Cupom expirado".to_string()),
            }
        }
        Some(coupon) => CouponValidationResponse {
            valid: true,
            code: coupon.code,
            percent_off: Some(coupon.percent_off),
            message: None,
        },
        None => CouponValidationResponse {
            valid: false,
            code,
            percent_off: None,
            message: Some("Cupom inválido".to_string()),
        },
    };

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Geocoder, ViaCepClient};
    use crate::providers::PaymentGateway;
    use crate::storage::{JsonStorage, StoragePaths, StoredCoupon};
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_state() -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = JsonStorage::new(paths);
        storage.initialize().expect("initialize test storage");

        let state = AppState::new(
            storage,
            ViaCepClient::new("http://viacep.invalid"),
            Geocoder::offline(),
            PaymentGateway::sandbox(),
        );
        (temp, state)
    }

    async fn validate(state: &AppState, code: &str) -> CouponValidationResponse {
        let Json(response) = validate_coupon(
            State(state.clone()),
            Json(ValidateCouponRequest {
                code: code.to_string(),
            }),
        )
        .await
        .expect("validate coupon");
        response
    }

    #[tokio::test]
    async fn known_code_is_valid_with_discount() {
        let (_temp, state) = test_state();
        CouponRepository::new(&state.storage)
            .create(&StoredCoupon::new("TREINO10", 10))
            .expect("seed coupon");

        let response = validate(&state, "treino10").await;
        assert!(response.valid);
        assert_eq!(response.code, "TREINO10");
        assert_eq!(response.percent_off, Some(10));
    }

    #[tokio::test]
    async fn unknown_code_is_invalid() {
        let (_temp, state) = test_state();
        let response = validate(&state, "NAOEXISTE").await;
        assert!(!response.valid);
        assert_eq!(response.message.as_deref(), Some("Cupom inválido"));
    }

    #[tokio::test]
    async fn inactive_and_expired_codes_are_refused() {
        let (_temp, state) = test_state();
        let repo = CouponRepository::new(&state.storage);

        let mut inactive = StoredCoupon::new("PAUSADO", 10);
        inactive.active = false;
        repo.create(&inactive).expect("seed inactive");

        let mut expired = StoredCoupon::new("VENCIDO", 10);
        expired.expires_at = Some(Utc::now() - Duration::days(1));
        repo.create(&expired).expect("seed expired");

        assert_eq!(
            validate(&state, "PAUSADO").await.message.as_deref(),
            Some("Cupom inativo")
        );
        assert_eq!(
            validate(&state, "VENCIDO").await.message.as_deref(),
            Some("Cupom expirado")
        );
    }

    #[tokio::test]
    async fn blank_code_asks_for_input() {
        let (_temp, state) = test_state();
        let response = validate(&state, "   ").await;
        assert!(!response.valid);
        assert_eq!(response.message.as_deref(), Some("Informe um cupom"));
    }
}
