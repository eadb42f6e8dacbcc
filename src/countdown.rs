// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! One-shot cancellable countdown.
//!
//! Runs an expiry action exactly once after a fixed duration, unless
//! cancelled first. Dropping the handle cancels the timer, so an expiry can
//! never fire after its owner is gone. Used to time-box PIX and boleto
//! payments; the [`PaymentExpiryWatcher`](crate::payment_watcher) remains
//! the restart-safe backstop.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Handle to a running countdown.
pub struct Countdown {
    token: CancellationToken,
}

impl Countdown {
    /// Start a countdown that runs `on_expiry` after `duration`.
    pub fn start<F, Fut>(duration: Duration, on_expiry: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let guard = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => on_expiry().await,
                _ = guard.cancelled() => {}
            }
        });

        Self { token }
    }

    /// Cancel the countdown. Idempotent; a no-op after expiry.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
