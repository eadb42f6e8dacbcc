// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Payment status API.
//!
//! Clients poll here to render the PIX/boleto countdown. Overdue pending
//! payments are expired on read, so a stale record is corrected even before
//! the background sweep reaches it.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    audit_log,
    error::ApiError,
    providers::gateway::{BoletoCharge, CardOutcome, PixCharge},
    state::AppState,
    storage::{
        AuditEventType, EnrollmentRepository, JsonStorage, PaymentRepository, PaymentStatus,
        StorageResult, StoredPayment,
    },
};
use crate::models::{BillingPeriod, PaymentMethod, PaymentOption};

/// Payment details returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub payment_id: String,
    pub enrollment_id: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub billing_period: BillingPeriod,
    pub payment_option: PaymentOption,
    pub installments: u32,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix: Option<PixCharge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boleto: Option<BoletoCharge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardOutcome>,
    /// Deadline for the payer, when the rail is time-boxed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Seconds left on the countdown; 0 once the deadline passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) fn to_response(record: &StoredPayment) -> PaymentResponse {
    let now = Utc::now();
    PaymentResponse {
        payment_id: record.payment_id.clone(),
        enrollment_id: record.enrollment_id.clone(),
        method: record.method,
        status: record.status,
        billing_period: record.billing_period,
        payment_option: record.payment_option,
        installments: record.installments,
        amount: record.amount.clone(),
        coupon_code: record.coupon_code.clone(),
        pix: record.pix.clone(),
        boleto: record.boleto.clone(),
        card: record.card.clone(),
        expires_at: record.expires_at.map(|deadline| deadline.to_rfc3339()),
        remaining_seconds: record.remaining_seconds(now),
        created_at: record.created_at.to_rfc3339(),
        updated_at: record.updated_at.to_rfc3339(),
    }
}

/// Expire a pending payment whose deadline has passed.
///
/// Marks the record `Expired`, clears the enrollment session tied to it
/// (the wizard is over; the account survives), and logs the event. Returns
/// the updated record, or `None` when nothing was overdue.
pub fn expire_if_overdue(
    storage: &JsonStorage,
    payment_id: &str,
) -> StorageResult<Option<StoredPayment>> {
    let repo = PaymentRepository::new(storage);
    let mut payment = repo.get(payment_id)?;

    if !payment.is_overdue(Utc::now()) {
        return Ok(None);
    }

    payment.status = PaymentStatus::Expired;
    payment.updated_at = Utc::now();
    repo.update(&payment)?;

    let enrollments = EnrollmentRepository::new(storage);
    if enrollments.exists(&payment.enrollment_id) {
        let _ = enrollments.delete(&payment.enrollment_id);
    }

    audit_log!(
        storage,
        AuditEventType::PaymentExpired,
        "payment",
        &payment.payment_id,
        &payment.user_id
    );

    Ok(Some(payment))
}

/// Get payment status by ID.
#[utoipa::path(
    get,
    path = "/v1/payments/{payment_id}",
    tag = "Payments",
    params(
        ("payment_id" = String, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment details", body = PaymentResponse),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let repo = PaymentRepository::new(&state.storage);
    let mut record = repo
        .get(&payment_id)
        .map_err(|_| ApiError::not_found("Pagamento não encontrado"))?;

    if let Ok(Some(expired)) = expire_if_overdue(&state.storage, &payment_id) {
        state.release_countdown(&payment_id);
        record = expired;
    }

    Ok(Json(to_response(&record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrollment::EnrollmentKind;
    use crate::storage::{EnrollmentStatus, StoragePaths, StorageError, StoredEnrollment};
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, JsonStorage) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = JsonStorage::new(paths);
        storage.initialize().expect("initialize test storage");
        (temp, storage)
    }

    fn pending_payment(id: &str, enrollment_id: &str, overdue: bool) -> StoredPayment {
        let now = Utc::now();
        let deadline = if overdue {
            now - Duration::seconds(5)
        } else {
            now + Duration::seconds(180)
        };
        StoredPayment {
            payment_id: id.to_string(),
            enrollment_id: enrollment_id.to_string(),
            user_id: "user-1".to_string(),
            plan_id: Some("plan-basic".to_string()),
            coach_id: None,
            method: PaymentMethod::Pix,
            billing_period: BillingPeriod::Monthly,
            payment_option: PaymentOption::UpFront,
            installments: 0,
            amount: "149.90".to_string(),
            coupon_code: None,
            status: PaymentStatus::Pending,
            pix: Some(PixCharge {
                qr_code: "data:image/png;base64,QR".to_string(),
                copy_paste: "00020126pix".to_string(),
            }),
            boleto: None,
            card: None,
            expires_at: Some(deadline),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overdue_payment_is_expired_and_session_cleared() {
        let (_temp, storage) = test_storage();

        let enrollments = EnrollmentRepository::new(&storage);
        let mut session = StoredEnrollment::new(
            "enr-1".to_string(),
            EnrollmentKind::PlanPurchase,
            Some("plan-basic".to_string()),
        );
        session.status = EnrollmentStatus::AwaitingPayment;
        enrollments.create(&session).expect("create session");

        let payments = PaymentRepository::new(&storage);
        payments
            .create(&pending_payment("pay-1", "enr-1", true))
            .expect("create payment");

        let expired = expire_if_overdue(&storage, "pay-1")
            .expect("expire")
            .expect("was overdue");
        assert_eq!(expired.status, PaymentStatus::Expired);

        // Session storage cleared, payment record kept.
        assert!(matches!(
            enrollments.get("enr-1"),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(
            payments.get("pay-1").unwrap().status,
            PaymentStatus::Expired
        );
    }

    #[test]
    fn payment_within_deadline_is_untouched() {
        let (_temp, storage) = test_storage();

        let payments = PaymentRepository::new(&storage);
        payments
            .create(&pending_payment("pay-1", "enr-1", false))
            .expect("create payment");

        let outcome = expire_if_overdue(&storage, "pay-1").expect("check");
        assert!(outcome.is_none());
        assert_eq!(
            payments.get("pay-1").unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[test]
    fn response_reports_remaining_seconds() {
        let payment = pending_payment("pay-1", "enr-1", false);
        let response = to_response(&payment);
        let remaining = response.remaining_seconds.unwrap();
        assert!((0..=180).contains(&remaining));

        let overdue = pending_payment("pay-2", "enr-1", true);
        assert_eq!(to_response(&overdue).remaining_seconds, Some(0));
    }
}
