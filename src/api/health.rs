// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Storage availability.
    pub storage: String,
    /// Payment gateway configuration ("ok" or "unconfigured"). Checkout
    /// returns 503 while unconfigured.
    pub gateway: String,
    /// Address validation mode ("geocoding" or "offline").
    pub geocoder: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if storage is unavailable. An
/// unconfigured gateway or offline geocoder degrades the status without
/// failing the probe; the enrollment wizard itself still works.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let storage_ok = state.storage.health_check().is_ok();
    let gateway_ok = state.gateway.is_configured();

    let response = ReadyResponse {
        status: if storage_ok && gateway_ok {
            "ok"
        } else {
            "degraded"
        }
        .to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            storage: if storage_ok { "ok" } else { "unavailable" }.to_string(),
            gateway: if gateway_ok { "ok" } else { "unconfigured" }.to_string(),
            geocoder: if state.geocoder.is_online() {
                "geocoding"
            } else {
                "offline"
            }
            .to_string(),
        },
    };

    let status = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
/// Does not check dependencies - use readiness for that.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if storage is available.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Geocoder, ViaCepClient};
    use crate::providers::PaymentGateway;
    use crate::storage::{JsonStorage, StoragePaths};
    use tempfile::TempDir;

    #[tokio::test]
    async fn healthy_storage_with_sandbox_gateway_reports_ok() {
        let temp = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();

        let state = AppState::new(
            storage,
            ViaCepClient::new("http://viacep.invalid"),
            Geocoder::offline(),
            PaymentGateway::sandbox(),
        );

        let (status, Json(response)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.checks.storage, "ok");
        assert_eq!(response.checks.gateway, "ok");
        assert_eq!(response.checks.geocoder, "offline");
    }

    #[tokio::test]
    async fn uninitialized_storage_fails_readiness() {
        let state = AppState::new(
            JsonStorage::new(StoragePaths::new("/tmp/never-initialized")),
            ViaCepClient::new("http://viacep.invalid"),
            Geocoder::offline(),
            PaymentGateway::sandbox(),
        );

        let (status, Json(response)) = readiness(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.checks.storage, "unavailable");
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let Json(response) = liveness().await;
        assert_eq!(response.status, "ok");
    }
}
