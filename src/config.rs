// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for persistent storage | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `VIACEP_BASE_URL` | Postal-code lookup service base URL | `https://viacep.com.br/ws` |
//! | `GEOCODING_API_KEY` | Geocoding provider key; offline fallback when unset | Optional |
//! | `GEOCODING_BASE_URL` | Geocoding provider base URL | `https://maps.googleapis.com/maps/api/geocode` |
//! | `GATEWAY_BASE_URL` | Payment gateway base URL | `https://api.pagamentos-sandbox.com.br` |
//! | `GATEWAY_API_KEY` | Payment gateway key; submit fails closed when unset | Required for checkout |
//! | `GATEWAY_MERCHANT_ID` | Merchant account at the payment gateway | Required for checkout |
//! | `SEED_COUPON_CODE` | Coupon code seeded at startup (dev/sandbox) | Optional |
//! | `SEED_COUPON_PERCENT` | Discount percent for the seeded coupon | `10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the persistent data directory path.
///
/// All enrollment drafts, user accounts, coupons, payments, and audit logs
/// are stored here.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the ViaCEP-compatible lookup base URL.
pub const VIACEP_BASE_URL_ENV: &str = "VIACEP_BASE_URL";

/// Environment variable name for the geocoding provider API key.
///
/// When unset, full-address validation falls back to the deterministic
/// offline approximation and results are flagged `approximate`.
pub const GEOCODING_API_KEY_ENV: &str = "GEOCODING_API_KEY";

/// Environment variable name for the geocoding provider base URL.
pub const GEOCODING_BASE_URL_ENV: &str = "GEOCODING_BASE_URL";

/// Environment variable names for the payment gateway. All three must be set
/// for checkout to be available; submit returns 503 otherwise.
pub const GATEWAY_BASE_URL_ENV: &str = "GATEWAY_BASE_URL";
pub const GATEWAY_API_KEY_ENV: &str = "GATEWAY_API_KEY";
pub const GATEWAY_MERCHANT_ID_ENV: &str = "GATEWAY_MERCHANT_ID";
