// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! External service providers.

pub mod gateway;

pub use gateway::{GatewayError, PaymentGateway};
