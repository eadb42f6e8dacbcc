// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Address lookup and validation API.
//!
//! Both endpoints answer 200 with a verdict body even when the external
//! service fails; transport errors become `valid: false` with a retry
//! message instead of an error status.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    geo::{AddressValidation, PostalAddress, PostalLookup},
    models::Address,
    state::AppState,
    storage::EnrollmentRepository,
};

/// Query for the postal-code lookup.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PostalLookupQuery {
    /// CEP, masked or bare digits.
    pub postal_code: String,
}

/// Lookup outcome with pre-fill fields on success.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostalLookupResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,
}

/// Request body for full-address validation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateAddressRequest {
    /// When present, the verdict is cached on this session to gate the
    /// address step.
    pub enrollment_id: Option<String>,
    pub address: Address,
}

/// Look up a CEP for form pre-fill.
#[utoipa::path(
    get,
    path = "/v1/address/lookup",
    tag = "Address",
    params(PostalLookupQuery),
    responses(
        (status = 200, description = "Lookup outcome", body = PostalLookupResponse)
    )
)]
pub async fn lookup_postal_code(
    State(state): State<AppState>,
    Query(query): Query<PostalLookupQuery>,
) -> Json<PostalLookupResponse> {
    let response = match state.viacep.lookup(&query.postal_code).await {
        PostalLookup::Found(address) => PostalLookupResponse {
            valid: true,
            message: None,
            address: Some(address),
        },
        PostalLookup::NotFound => PostalLookupResponse {
            valid: false,
            message: Some("CEP não encontrado".to_string()),
            address: None,
        },
        PostalLookup::InvalidCode => PostalLookupResponse {
            valid: false,
            message: Some("CEP deve ter 8 dígitos".to_string()),
            address: None,
        },
        PostalLookup::Unavailable => PostalLookupResponse {
            valid: false,
            message: Some("Erro ao consultar CEP. Tente novamente.".to_string()),
            address: None,
        },
    };
    Json(response)
}

/// Validate a full address, optionally caching the verdict on a session.
#[utoipa::path(
    post,
    path = "/v1/address/validate",
    tag = "Address",
    request_body = ValidateAddressRequest,
    responses(
        (status = 200, description = "Validation verdict", body = AddressValidation),
        (status = 404, description = "Session not found")
    )
)]
pub async fn validate_address(
    State(state): State<AppState>,
    Json(request): Json<ValidateAddressRequest>,
) -> Result<Json<AddressValidation>, ApiError> {
    let validation = state.geocoder.validate(&request.address).await;

    if let Some(enrollment_id) = &request.enrollment_id {
        let repo = EnrollmentRepository::new(&state.storage);
        let mut record = repo
            .get(enrollment_id)
            .map_err(|_| ApiError::not_found("Sessão de inscrição não encontrada"))?;

        record.draft.address = request.address;
        record.address_validation = Some(validation.clone());
        record.touch();
        if let Err(e) = repo.update(&record) {
            warn!(
                enrollment_id = %enrollment_id,
                error = %e,
                "failed to cache address validation on session"
            );
        }
    }

    Ok(Json(validation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::EnrollmentKind;
    use crate::geo::{Geocoder, ViaCepClient};
    use crate::providers::PaymentGateway;
    use crate::storage::{JsonStorage, StoragePaths, StoredEnrollment};
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

    fn sample_address() -> Address {
        Address {
            street: "Rua Lauro Linhares".to_string(),
            number: "1000".to_string(),
            complement: None,
            neighborhood: "Trindade".to_string(),
            city: "Florianópolis".to_string(),
            state: "SC".to_string(),
            postal_code: "88036-002".to_string(),
        }
    }

    #[tokio::test]
    async fn malformed_postal_code_is_rejected_without_remote_call() {
        let (_temp, state) = test_state();

        let Json(response) = lookup_postal_code(
            State(state.clone()),
            Query(PostalLookupQuery {
                postal_code: "1234".to_string(),
            }),
        )
        .await;

        assert!(!response.valid);
        assert_eq!(
            response.message.as_deref(),
            Some("CEP deve ter 8 dígitos")
        );
    }

    #[tokio::test]
    async fn unreachable_service_maps_to_retry_message() {
        let (_temp, state) = test_state();

        // Well-formed code against an unresolvable host.
        let Json(response) = lookup_postal_code(
            State(state.clone()),
            Query(PostalLookupQuery {
                postal_code: "01001-000".to_string(),
            }),
        )
        .await;

        assert!(!response.valid);
        assert!(response.message.unwrap().contains("Tente novamente"));
    }

    #[tokio::test]
    async fn validation_verdict_is_cached_on_the_session() {
        let (_temp, state) = test_state();

        let repo = EnrollmentRepository::new(&state.storage);
        let record = StoredEnrollment::new(
            "enr-1".to_string(),
            EnrollmentKind::PlanPurchase,
            Some("plan-basic".to_string()),
        );
        repo.create(&record).expect("create session");

        let Json(validation) = validate_address(
            State(state.clone()),
            Json(ValidateAddressRequest {
                enrollment_id: Some("enr-1".to_string()),
                address: sample_address(),
            }),
        )
        .await
        .expect("validate");

        assert!(validation.valid);
        assert!(validation.approximate);

        let stored = repo.get("enr-1").expect("reload session");
        assert_eq!(stored.address_validation, Some(validation));
        assert_eq!(stored.draft.address.city, "Florianópolis");
    }

    #[tokio::test]
    async fn validation_for_unknown_session_is_not_found() {
        let (_temp, state) = test_state();

        let err = validate_address(
            State(state.clone()),
            Json(ValidateAddressRequest {
                enrollment_id: Some("ghost".to_string()),
                address: sample_address(),
            }),
        )
        .await
        .expect_err("unknown session");
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn standalone_validation_needs_no_session() {
        let (_temp, state) = test_state();

        let Json(validation) = validate_address(
            State(state.clone()),
            Json(ValidateAddressRequest {
                enrollment_id: None,
                address: sample_address(),
            }),
        )
        .await
        .expect("validate");

        assert!(validation.valid);
    }
}
