// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! # Payment Expiry Watcher
//!
//! Background task that periodically sweeps pending payments and expires the
//! ones whose deadline has passed. The in-process [`Countdown`] fired at
//! submit time handles the common case with second-level precision; this
//! sweep is the restart-safe backstop for deadlines lost to a crash or
//! redeploy.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.
//!
//! [`Countdown`]: crate::countdown::Countdown

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::storage::{JsonStorage, PaymentRepository};

/// Default interval between sweeps.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Background watcher expiring overdue pending payments.
pub struct PaymentExpiryWatcher {
    storage: Arc<JsonStorage>,
    poll_interval: Duration,
}

impl PaymentExpiryWatcher {
    /// Create a new watcher for the given storage.
    pub fn new(storage: Arc<JsonStorage>) -> Self {
        Self {
            storage,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Run the watcher loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(watcher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Payment expiry watcher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Payment expiry watcher shutting down");
                return;
            }

            self.sweep();

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Payment expiry watcher shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep: find pending payments and expire the overdue ones.
    fn sweep(&self) {
        let repo = PaymentRepository::new(&self.storage);
        let pending = match repo.list_pending() {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Payment watcher: failed to list pending payments");
                return;
            }
        };

        if pending.is_empty() {
            return;
        }

        for payment in &pending {
            match crate::api::payments::expire_if_overdue(&self.storage, &payment.payment_id) {
                Ok(Some(expired)) => {
                    info!(
                        payment_id = %expired.payment_id,
                        enrollment_id = %expired.enrollment_id,
                        "Payment watcher: expired overdue payment"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        payment_id = %payment.payment_id,
                        error = %e,
                        "Payment watcher: failed to expire payment"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingPeriod, PaymentMethod, PaymentOption};
    use crate::providers::gateway::PixCharge;
    use crate::storage::{PaymentStatus, StoragePaths, StoredPayment};
    use chrono::{Duration as ChronoDuration, Utc};
    use tempfile::TempDir;

    fn test_storage() -> (TempDir, Arc<JsonStorage>) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = JsonStorage::new(paths);
        storage.initialize().expect("initialize test storage");
        (temp, Arc::new(storage))
    }

    fn pending_payment(id: &str, overdue: bool) -> StoredPayment {
        let now = Utc::now();
        let deadline = if overdue {
            now - ChronoDuration::seconds(10)
        } else {
            now + ChronoDuration::seconds(180)
        };
        StoredPayment {
            payment_id: id.to_string(),
            enrollment_id: format!("enr-{id}"),
            user_id: "user-1".to_string(),
            plan_id: None,
            coach_id: None,
            method: PaymentMethod::Pix,
            billing_period: BillingPeriod::Monthly,
            payment_option: PaymentOption::UpFront,
            installments: 0,
            amount: "99.90".to_string(),
            coupon_code: None,
            status: PaymentStatus::Pending,
            pix: Some(PixCharge {
                qr_code: "qr".to_string(),
                copy_paste: "copy".to_string(),
            }),
            boleto: None,
            card: None,
            expires_at: Some(deadline),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sweep_expires_only_overdue_payments() {
        let (_temp, storage) = test_storage();
        let repo = PaymentRepository::new(&storage);
        repo.create(&pending_payment("late", true)).unwrap();
        repo.create(&pending_payment("fresh", false)).unwrap();

        let watcher = PaymentExpiryWatcher::new(storage.clone());
        watcher.sweep();

        assert_eq!(repo.get("late").unwrap().status, PaymentStatus::Expired);
        assert_eq!(repo.get("fresh").unwrap().status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (_temp, storage) = test_storage();
        let watcher = PaymentExpiryWatcher::new(storage);

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        // Completes immediately instead of sleeping for the interval.
        watcher.run(shutdown).await;
    }
}
