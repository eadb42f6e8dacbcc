// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::countdown::Countdown;
use crate::geo::{Geocoder, ViaCepClient};
use crate::providers::PaymentGateway;
use crate::storage::JsonStorage;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<JsonStorage>,
    pub viacep: Arc<ViaCepClient>,
    pub geocoder: Arc<Geocoder>,
    pub gateway: Arc<PaymentGateway>,
    /// Live payment countdowns keyed by payment id. Holding the handles
    /// here keeps the timers alive across requests; removing one cancels it.
    countdowns: Arc<Mutex<HashMap<String, Countdown>>>,
}

impl AppState {
    pub fn new(
        storage: JsonStorage,
        viacep: ViaCepClient,
        geocoder: Geocoder,
        gateway: PaymentGateway,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            viacep: Arc::new(viacep),
            geocoder: Arc::new(geocoder),
            gateway: Arc::new(gateway),
            countdowns: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Keep a payment countdown alive. Replacing an existing entry drops
    /// (and thereby cancels) the previous timer.
    pub fn track_countdown(&self, payment_id: impl Into<String>, countdown: Countdown) {
        if let Ok(mut countdowns) = self.countdowns.lock() {
            countdowns.insert(payment_id.into(), countdown);
        }
    }

    /// Drop a payment countdown, cancelling it if still running.
    pub fn release_countdown(&self, payment_id: &str) {
        if let Ok(mut countdowns) = self.countdowns.lock() {
            countdowns.remove(payment_id);
        }
    }
}
