// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    enrollment::draft::{
        AccessPatch, AddressPatch, CheckoutPatch, DraftPatch, EnrollmentDraft, PersonalPatch,
    },
    enrollment::{EnrollmentKind, Step},
    geo::{AddressValidation, Coordinates, GeoProvider, PostalAddress},
    models::{Address, BillingPeriod, CardDetails, PaymentMethod, PaymentOption},
    providers::gateway::{BoletoCharge, CardOutcome, PixCharge},
    state::AppState,
    storage::{EnrollmentStatus, PaymentStatus},
};

pub mod address;
pub mod coupons;
pub mod enrollments;
pub mod health;
pub mod payments;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/enrollments",
            post(enrollments::create_enrollment),
        )
        .route(
            "/enrollments/{enrollment_id}",
            get(enrollments::get_enrollment).delete(enrollments::delete_enrollment),
        )
        .route(
            "/enrollments/{enrollment_id}/draft",
            put(enrollments::update_draft),
        )
        .route(
            "/enrollments/{enrollment_id}/advance",
            post(enrollments::advance_enrollment),
        )
        .route(
            "/enrollments/{enrollment_id}/back",
            post(enrollments::back_enrollment),
        )
        .route(
            "/enrollments/{enrollment_id}/submit",
            post(enrollments::submit_enrollment),
        )
        .route("/address/lookup", get(address::lookup_postal_code))
        .route("/address/validate", post(address::validate_address))
        .route("/coupons/validate", post(coupons::validate_coupon))
        .route("/payments/{payment_id}", get(payments::get_payment))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        enrollments::create_enrollment,
        enrollments::get_enrollment,
        enrollments::update_draft,
        enrollments::advance_enrollment,
        enrollments::back_enrollment,
        enrollments::submit_enrollment,
        enrollments::delete_enrollment,
        address::lookup_postal_code,
        address::validate_address,
        coupons::validate_coupon,
        payments::get_payment,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Address,
            AddressValidation,
            BillingPeriod,
            BoletoCharge,
            CardDetails,
            CardOutcome,
            Coordinates,
            EnrollmentDraft,
            EnrollmentKind,
            EnrollmentStatus,
            GeoProvider,
            PaymentMethod,
            PaymentOption,
            PaymentStatus,
            PixCharge,
            PostalAddress,
            Step,
            AccessPatch,
            AddressPatch,
            CheckoutPatch,
            DraftPatch,
            PersonalPatch,
            enrollments::CreateEnrollmentRequest,
            enrollments::EnrollmentResponse,
            enrollments::SubmitRequest,
            enrollments::SubmitResponse,
            address::PostalLookupResponse,
            address::ValidateAddressRequest,
            coupons::ValidateCouponRequest,
            coupons::CouponValidationResponse,
            payments::PaymentResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Enrollments", description = "Enrollment wizard sessions"),
        (name = "Address", description = "CEP lookup and address validation"),
        (name = "Coupons", description = "Coupon validation"),
        (name = "Payments", description = "Payment status and countdown"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;
