// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Enrollment session API: the wizard state machine over HTTP.
//!
//! Sessions are created per wizard kind, patched field-by-field (each patch
//! is persisted before the response, so a reload never loses input), and
//! advanced through validated steps. Submit runs the two-phase completion:
//! account registration, then checkout against the payment gateway. A failed
//! checkout leaves the session resumable in `PendingCheckout`; resubmitting
//! reuses the already-registered account.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    audit_log,
    countdown::Countdown,
    enrollment::{installments, validate_step, DraftPatch, EnrollmentKind, Step},
    error::ApiError,
    geo::AddressValidation,
    models::{CardDetails, PaymentMethod},
    providers::gateway::{ChargeRequest, GatewayError},
    state::AppState,
    storage::{
        AuditEventType, CouponRepository, EnrollmentRepository, EnrollmentStatus,
        PaymentRepository, PaymentStatus, StorageError, StoredEnrollment, StoredPayment,
        StoredUser, UserRepository,
    },
};

use super::payments::{to_response as payment_response, PaymentResponse};

/// Deadline for PIX/boleto completion, after which the charge expires.
const PAYMENT_DEADLINE_SECS: i64 = 180;

/// Request body for creating an enrollment session.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEnrollmentRequest {
    pub kind: EnrollmentKind,
    /// Required for the plan-purchase wizard.
    pub plan_id: Option<String>,
}

/// Enrollment session state returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnrollmentResponse {
    pub enrollment_id: String,
    pub kind: EnrollmentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    pub step: Step,
    /// Display index: the intro (plan summary) is -1.
    pub step_index: i8,
    pub status: EnrollmentStatus,
    pub draft: crate::enrollment::EnrollmentDraft,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_validation: Option<AddressValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for submit. Card details are accepted here only and are
/// never persisted with the draft.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubmitRequest {
    pub card: Option<CardDetails>,
}

/// Outcome of a submit.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub enrollment_id: String,
    pub status: EnrollmentStatus,
    /// The registered account.
    pub user_id: String,
    /// Present for the purchase flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentResponse>,
}

fn to_response(record: &StoredEnrollment) -> EnrollmentResponse {
    EnrollmentResponse {
        enrollment_id: record.enrollment_id.clone(),
        kind: record.kind,
        plan_id: record.plan_id.clone(),
        step: record.step,
        step_index: record.step.index(),
        status: record.status,
        draft: record.draft.clone(),
        address_validation: record.address_validation.clone(),
        registered_user_id: record.registered_user_id.clone(),
        payment_id: record.payment_id.clone(),
        created_at: record.created_at.to_rfc3339(),
        updated_at: record.updated_at.to_rfc3339(),
    }
}

fn load(state: &AppState, enrollment_id: &str) -> Result<StoredEnrollment, ApiError> {
    EnrollmentRepository::new(&state.storage)
        .get(enrollment_id)
        .map_err(|_| ApiError::not_found("Sessão de inscrição não encontrada"))
}

/// Persist a draft change, best-effort: a failed save is logged and the
/// request still succeeds against the in-memory copy the response carries.
fn save_best_effort(state: &AppState, record: &StoredEnrollment) {
    if let Err(e) = EnrollmentRepository::new(&state.storage).update(record) {
        warn!(
            enrollment_id = %record.enrollment_id,
            error = %e,
            "failed to persist draft; continuing with in-memory state"
        );
    }
}

/// Persist a state-machine change (step, status). Unlike draft saves these
/// must land, or the client and the store disagree about the session.
fn save_required(state: &AppState, record: &StoredEnrollment) -> Result<(), ApiError> {
    EnrollmentRepository::new(&state.storage)
        .update(record)
        .map_err(|e| ApiError::internal(format!("Failed to persist enrollment: {e}")))
}

fn map_gateway_error(error: GatewayError) -> ApiError {
    match error {
        GatewayError::MissingConfig(message) => ApiError::service_unavailable(format!(
            "Pagamentos indisponíveis no momento: {message}"
        )),
        GatewayError::Request(message) | GatewayError::InvalidResponse(message) => {
            ApiError::new(StatusCode::BAD_GATEWAY, message)
        }
    }
}

/// Parse a decimal amount string into `(normalized, minor_units)`.
fn parse_amount_to_minor(amount: &str) -> Result<(String, u64), ApiError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Valor do plano inválido"));
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 2 {
        return Err(ApiError::bad_request("Valor do plano inválido"));
    }

    let whole_part = parts[0];
    if whole_part.is_empty() || !whole_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request("Valor do plano inválido"));
    }

    let whole = whole_part
        .parse::<u64>()
        .map_err(|_| ApiError::bad_request("Valor do plano muito alto"))?;

    let fraction_part = if parts.len() == 2 { parts[1] } else { "" };
    if !fraction_part.chars().all(|c| c.is_ascii_digit()) || fraction_part.len() > 2 {
        return Err(ApiError::bad_request(
            "Valor do plano deve ter no máximo 2 casas decimais",
        ));
    }

    let fraction = if fraction_part.is_empty() {
        0
    } else if fraction_part.len() == 1 {
        fraction_part
            .parse::<u64>()
            .map_err(|_| ApiError::bad_request("Valor do plano inválido"))?
            * 10
    } else {
        fraction_part
            .parse::<u64>()
            .map_err(|_| ApiError::bad_request("Valor do plano inválido"))?
    };

    let minor = whole
        .checked_mul(100)
        .and_then(|base| base.checked_add(fraction))
        .ok_or_else(|| ApiError::bad_request("Valor do plano muito alto"))?;

    if minor == 0 {
        return Err(ApiError::bad_request("Valor do plano inválido"));
    }

    let normalized = format!("{whole}.{fraction:02}");
    Ok((normalized, minor))
}

/// Create an enrollment session.
#[utoipa::path(
    post,
    path = "/v1/enrollments",
    tag = "Enrollments",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Session created", body = EnrollmentResponse),
        (status = 400, description = "Bad request")
    )
)]
pub async fn create_enrollment(
    State(state): State<AppState>,
    Json(request): Json<CreateEnrollmentRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    let plan_id = request
        .plan_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    if request.kind == EnrollmentKind::PlanPurchase && plan_id.is_none() {
        return Err(ApiError::bad_request(
            "plan_id é obrigatório para compra de plano",
        ));
    }

    let record = StoredEnrollment::new(
        uuid::Uuid::new_v4().to_string(),
        request.kind,
        plan_id,
    );

    EnrollmentRepository::new(&state.storage)
        .create(&record)
        .map_err(|e| ApiError::internal(format!("Failed to create enrollment: {e}")))?;

    audit_log!(
        &state.storage,
        AuditEventType::EnrollmentCreated,
        "enrollment",
        &record.enrollment_id
    );

    Ok((StatusCode::CREATED, Json(to_response(&record))))
}

/// Get session state.
#[utoipa::path(
    get,
    path = "/v1/enrollments/{enrollment_id}",
    tag = "Enrollments",
    params(("enrollment_id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session state", body = EnrollmentResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let record = load(&state, &enrollment_id)?;
    Ok(Json(to_response(&record)))
}

/// Apply a draft patch. Persisted write-through before responding.
#[utoipa::path(
    put,
    path = "/v1/enrollments/{enrollment_id}/draft",
    tag = "Enrollments",
    params(("enrollment_id" = String, Path, description = "Session ID")),
    request_body = DraftPatch,
    responses(
        (status = 200, description = "Updated session state", body = EnrollmentResponse),
        (status = 404, description = "Not found"),
        (status = 422, description = "Session not editable")
    )
)]
pub async fn update_draft(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
    Json(patch): Json<DraftPatch>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let mut record = load(&state, &enrollment_id)?;

    if record.status == EnrollmentStatus::AwaitingPayment {
        return Err(ApiError::unprocessable(
            "Sessão aguardando pagamento; o formulário não pode mais ser alterado",
        ));
    }

    let address_changed = record.draft.apply(patch);
    if address_changed {
        // Any address edit invalidates the cached geocode verdict.
        record.address_validation = None;
    }
    record.touch();

    save_best_effort(&state, &record);
    Ok(Json(to_response(&record)))
}

/// Advance to the next step, gated by the current step's validation.
#[utoipa::path(
    post,
    path = "/v1/enrollments/{enrollment_id}/advance",
    tag = "Enrollments",
    params(("enrollment_id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Advanced session state", body = EnrollmentResponse),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed; step unchanged")
    )
)]
pub async fn advance_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let mut record = load(&state, &enrollment_id)?;

    // The address step needs a validation verdict; compute one when absent
    // or when the last attempt failed (a retry may be transient).
    if record.step == Step::Address
        && !record
            .address_validation
            .as_ref()
            .is_some_and(|validation| validation.valid)
    {
        let validation = state.geocoder.validate(&record.draft.address).await;
        record.address_validation = Some(validation);
        record.touch();
        save_best_effort(&state, &record);
    }

    let errors = validate_step(record.step, &record.draft, record.address_validation.as_ref());
    if !errors.is_empty() {
        return Err(ApiError::unprocessable(errors.join("; ")));
    }

    let Some(next) = record.step.next(record.kind) else {
        return Err(ApiError::unprocessable(
            "Sessão já está no último passo; use submit",
        ));
    };

    record.step = next;
    record.touch();
    save_required(&state, &record)?;

    Ok(Json(to_response(&record)))
}

/// Go back one step. From step 0 of the purchase flow this returns to the
/// intro; the initial step stays put.
#[utoipa::path(
    post,
    path = "/v1/enrollments/{enrollment_id}/back",
    tag = "Enrollments",
    params(("enrollment_id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session state", body = EnrollmentResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn back_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let mut record = load(&state, &enrollment_id)?;

    if let Some(previous) = record.step.back(record.kind) {
        record.step = previous;
        record.touch();
        save_required(&state, &record)?;
    }

    Ok(Json(to_response(&record)))
}

/// Discard a session and its persisted draft.
#[utoipa::path(
    delete,
    path = "/v1/enrollments/{enrollment_id}",
    tag = "Enrollments",
    params(("enrollment_id" = String, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let record = load(&state, &enrollment_id)?;

    if let Some(payment_id) = &record.payment_id {
        state.release_countdown(payment_id);
    }

    EnrollmentRepository::new(&state.storage)
        .delete(&enrollment_id)
        .map_err(|e| ApiError::internal(format!("Failed to delete enrollment: {e}")))?;

    audit_log!(
        &state.storage,
        AuditEventType::EnrollmentReset,
        "enrollment",
        &enrollment_id
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Submit from the final step: register the account, then (purchase flow)
/// create the charge.
#[utoipa::path(
    post,
    path = "/v1/enrollments/{enrollment_id}/submit",
    tag = "Enrollments",
    params(("enrollment_id" = String, Path, description = "Session ID")),
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Submission outcome", body = SubmitResponse),
        (status = 404, description = "Not found"),
        (status = 409, description = "E-mail already registered"),
        (status = 422, description = "Validation failed or payment declined"),
        (status = 502, description = "Payment gateway failure"),
        (status = 503, description = "Payment gateway unavailable")
    )
)]
pub async fn submit_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut record = load(&state, &enrollment_id)?;

    if record.status == EnrollmentStatus::AwaitingPayment {
        return Err(ApiError::unprocessable(
            "Já existe um pagamento aguardando confirmação",
        ));
    }
    if record.step != Step::last(record.kind) {
        return Err(ApiError::unprocessable(
            "Finalize as etapas anteriores antes de enviar",
        ));
    }

    // The address verdict may be missing (self-registration submits from the
    // address step) or stale from a transient failure; compute it here too.
    if !record
        .address_validation
        .as_ref()
        .is_some_and(|validation| validation.valid)
    {
        let validation = state.geocoder.validate(&record.draft.address).await;
        record.address_validation = Some(validation);
        record.touch();
        save_best_effort(&state, &record);
    }

    // Re-validate every step; the draft may have been edited after advancing.
    let mut step = Step::first(record.kind);
    loop {
        let errors = validate_step(step, &record.draft, record.address_validation.as_ref());
        if !errors.is_empty() {
            return Err(ApiError::unprocessable(errors.join("; ")));
        }
        match step.next(record.kind) {
            Some(next) => step = next,
            None => break,
        }
    }

    let user_id = register_account_once(&state, &mut record)?;

    if record.kind == EnrollmentKind::SelfRegistration {
        finish_enrollment(&state, &record);
        return Ok(Json(SubmitResponse {
            enrollment_id: record.enrollment_id.clone(),
            status: EnrollmentStatus::Completed,
            user_id,
            payment: None,
        }));
    }

    let payment = checkout(&state, &mut record, &user_id, request.card.as_ref()).await?;
    let status = record.status;

    Ok(Json(SubmitResponse {
        enrollment_id: record.enrollment_id.clone(),
        status,
        user_id,
        payment: Some(payment_response(&payment)),
    }))
}

/// Phase one: create the account unless a previous submit already did.
fn register_account_once(
    state: &AppState,
    record: &mut StoredEnrollment,
) -> Result<String, ApiError> {
    if let Some(user_id) = &record.registered_user_id {
        return Ok(user_id.clone());
    }

    let users = UserRepository::new(&state.storage);
    if users
        .find_by_email(&record.draft.access.email)
        .map_err(|e| ApiError::internal(format!("Failed to check e-mail: {e}")))?
        .is_some()
    {
        return Err(ApiError::conflict("E-mail já cadastrado"));
    }

    let user_id = uuid::Uuid::new_v4().to_string();
    let salt = uuid::Uuid::new_v4().to_string();
    let user = StoredUser {
        user_id: user_id.clone(),
        email: record.draft.access.email.clone(),
        full_name: record.draft.personal.full_name.trim().to_string(),
        cpf: record.draft.personal.cpf.clone(),
        phone: record.draft.personal.phone.clone(),
        birth_date: record.draft.personal.birth_date.clone(),
        gender: record.draft.personal.gender.clone(),
        address: record.draft.address.clone(),
        password_digest: crate::storage::repository::users::digest_password(
            &record.draft.access.password,
            &salt,
        ),
        created_at: Utc::now(),
    };

    users.create(&user).map_err(|e| match e {
        StorageError::AlreadyExists(_) => ApiError::conflict("E-mail já cadastrado"),
        other => ApiError::internal(format!("Failed to register account: {other}")),
    })?;

    // Two-phase bookkeeping: the account exists from here on, so the session
    // must remember it before any charge is attempted.
    record.registered_user_id = Some(user_id.clone());
    record.status = EnrollmentStatus::PendingCheckout;
    record.touch();
    save_best_effort(state, record);

    audit_log!(
        &state.storage,
        AuditEventType::AccountRegistered,
        "enrollment",
        &record.enrollment_id,
        &user_id
    );

    Ok(user_id)
}

/// Phase two: create the charge for the selected payment method.
async fn checkout(
    state: &AppState,
    record: &mut StoredEnrollment,
    user_id: &str,
    card: Option<&CardDetails>,
) -> Result<StoredPayment, ApiError> {
    let draft_checkout = record.draft.checkout.clone();
    let billing_period = draft_checkout
        .billing_period
        .ok_or_else(|| ApiError::unprocessable("Selecione o período de cobrança"))?;
    let method = draft_checkout
        .payment_method
        .ok_or_else(|| ApiError::unprocessable("Selecione a forma de pagamento"))?;

    let (normalized_amount, amount_in_minor) =
        parse_amount_to_minor(draft_checkout.amount.as_deref().unwrap_or_default())?;

    // Installment selections for ineligible periods are silently coerced
    // back to a single up-front payment.
    let (payment_option, installment_count) = installments::normalize(
        billing_period,
        draft_checkout.payment_option,
        draft_checkout.installments,
    );

    let coupon_code = match &draft_checkout.coupon_code {
        Some(code) => {
            let coupon = CouponRepository::new(&state.storage)
                .find_by_code(code)
                .map_err(|e| ApiError::internal(format!("Failed to check coupon: {e}")))?;
            match coupon {
                Some(coupon) if coupon.active
                    && coupon.expires_at.is_none_or(|deadline| deadline > Utc::now()) =>
                {
                    Some(coupon.code)
                }
                _ => return Err(ApiError::unprocessable("Cupom inválido")),
            }
        }
        None => None,
    };

    let plan_id = record.plan_id.clone().unwrap_or_default();
    let payment_id = uuid::Uuid::new_v4().to_string();
    let charge = ChargeRequest {
        payment_id: &payment_id,
        user_id,
        plan_id: &plan_id,
        billing_period,
        installments: installment_count,
        amount_in_minor,
        coupon_code: coupon_code.as_deref(),
    };

    let now = Utc::now();
    let mut payment = StoredPayment {
        payment_id: payment_id.clone(),
        enrollment_id: record.enrollment_id.clone(),
        user_id: user_id.to_string(),
        plan_id: record.plan_id.clone(),
        coach_id: record.draft.coach_id.clone(),
        method,
        billing_period,
        payment_option,
        installments: installment_count,
        amount: normalized_amount,
        coupon_code: coupon_code.clone(),
        status: PaymentStatus::Pending,
        pix: None,
        boleto: None,
        card: None,
        expires_at: None,
        created_at: now,
        updated_at: now,
    };

    match method {
        PaymentMethod::Pix => {
            let pix = state
                .gateway
                .create_pix_charge(&charge)
                .await
                .map_err(|e| fail_checkout(state, record, e))?;
            payment.pix = Some(pix);
            payment.expires_at = Some(now + chrono::Duration::seconds(PAYMENT_DEADLINE_SECS));
        }
        PaymentMethod::Boleto => {
            let boleto = state
                .gateway
                .create_boleto_charge(&charge)
                .await
                .map_err(|e| fail_checkout(state, record, e))?;
            payment.boleto = Some(boleto);
            payment.expires_at = Some(now + chrono::Duration::seconds(PAYMENT_DEADLINE_SECS));
        }
        PaymentMethod::CreditCard => {
            let card = card.ok_or_else(|| {
                ApiError::bad_request("Dados do cartão são obrigatórios para pagamento em cartão")
            })?;
            let outcome = state
                .gateway
                .charge_card(&charge, card)
                .await
                .map_err(|e| fail_checkout(state, record, e))?;

            let approved = outcome.approved;
            payment.status = if approved {
                PaymentStatus::Approved
            } else {
                PaymentStatus::Declined
            };
            payment.card = Some(outcome);

            if !approved {
                let payments = PaymentRepository::new(&state.storage);
                if let Err(e) = payments.create(&payment) {
                    warn!(payment_id = %payment.payment_id, error = %e, "failed to store declined payment");
                }
                audit_log!(
                    &state.storage,
                    AuditEventType::CheckoutFailed,
                    "payment",
                    &payment.payment_id,
                    user_id
                );
                return Err(ApiError::unprocessable("Pagamento recusado pela operadora"));
            }
        }
    }

    PaymentRepository::new(&state.storage)
        .create(&payment)
        .map_err(|e| ApiError::internal(format!("Failed to store payment: {e}")))?;

    record.payment_id = Some(payment_id.clone());

    if payment.status == PaymentStatus::Approved {
        audit_log!(
            &state.storage,
            AuditEventType::CheckoutCompleted,
            "payment",
            &payment.payment_id,
            user_id
        );
        finish_enrollment(state, record);
        record.status = EnrollmentStatus::Completed;
    } else {
        record.status = EnrollmentStatus::AwaitingPayment;
        record.touch();
        save_required(state, record)?;
        start_payment_countdown(state, &payment_id);
        audit_log!(
            &state.storage,
            AuditEventType::EnrollmentSubmitted,
            "enrollment",
            &record.enrollment_id,
            user_id
        );
    }

    Ok(payment)
}

/// Record a gateway failure and keep the session resumable.
fn fail_checkout(
    state: &AppState,
    record: &StoredEnrollment,
    error: GatewayError,
) -> ApiError {
    audit_log!(
        &state.storage,
        AuditEventType::CheckoutFailed,
        "enrollment",
        &record.enrollment_id
    );
    map_gateway_error(error)
}

/// Successful completion: clear the persisted draft and log it.
fn finish_enrollment(state: &AppState, record: &StoredEnrollment) {
    if let Err(e) = EnrollmentRepository::new(&state.storage).delete(&record.enrollment_id) {
        warn!(
            enrollment_id = %record.enrollment_id,
            error = %e,
            "failed to clear completed enrollment"
        );
    }
    audit_log!(
        &state.storage,
        AuditEventType::EnrollmentSubmitted,
        "enrollment",
        &record.enrollment_id
    );
}

/// Time-box a PIX/boleto payment with an in-process countdown; the
/// background watcher remains the restart-safe backstop.
fn start_payment_countdown(state: &AppState, payment_id: &str) {
    let storage = state.storage.clone();
    let countdown_state = state.clone();
    let countdown_payment_id = payment_id.to_string();

    let countdown = Countdown::start(
        Duration::from_secs(PAYMENT_DEADLINE_SECS as u64),
        move || async move {
            match super::payments::expire_if_overdue(&storage, &countdown_payment_id) {
                Ok(Some(_)) => {}
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        payment_id = %countdown_payment_id,
                        error = %e,
                        "countdown failed to expire payment"
                    );
                }
            }
            countdown_state.release_countdown(&countdown_payment_id);
        },
    );

    state.track_countdown(payment_id, countdown);
}
