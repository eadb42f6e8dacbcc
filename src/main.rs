// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

use std::{env, net::SocketAddr, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use endurance_enrollment_server::{
    api::router,
    config::DATA_DIR_ENV,
    geo::{Geocoder, ViaCepClient},
    payment_watcher::PaymentExpiryWatcher,
    providers::PaymentGateway,
    state::AppState,
    storage::{CouponRepository, JsonStorage, StoragePaths, StoredCoupon},
};

#[tokio::main]
async fn main() {
    init_tracing();

    // Initialize storage (panics if the data dir cannot be created - the
    // service cannot run without it)
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string());
    let mut storage = JsonStorage::new(StoragePaths::new(&data_dir));
    storage
        .initialize()
        .expect("Failed to initialize storage directory");
    info!(data_dir = %data_dir, "Storage initialized");

    seed_coupon(&storage);

    let geocoder = Geocoder::from_env();
    info!(
        online = geocoder.is_online(),
        "Address validation {}",
        if geocoder.is_online() {
            "using geocoding provider"
        } else {
            "running offline (best-effort)"
        }
    );

    let gateway = PaymentGateway::from_env();
    if !gateway.is_configured() {
        info!("Payment gateway not configured; checkout will return 503");
    }

    let state = AppState::new(storage, ViaCepClient::from_env(), geocoder, gateway);

    // Background payment expiry sweep with graceful shutdown
    let shutdown = CancellationToken::new();
    let watcher = PaymentExpiryWatcher::new(Arc::clone(&state.storage));
    let watcher_handle = tokio::spawn(watcher.run(shutdown.clone()));

    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");

    info!("Endurance enrollment server listening on http://{addr} (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    let _ = watcher_handle.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Seed a coupon from the environment (dev/sandbox convenience).
fn seed_coupon(storage: &JsonStorage) {
    let Ok(code) = env::var("SEED_COUPON_CODE") else {
        return;
    };
    let code = code.trim().to_string();
    if code.is_empty() {
        return;
    }

    let percent = env::var("SEED_COUPON_PERCENT")
        .ok()
        .and_then(|value| value.parse::<u8>().ok())
        .filter(|&value| (1..=100).contains(&value))
        .unwrap_or(10);

    let repo = CouponRepository::new(storage);
    match repo.create(&StoredCoupon::new(&code, percent)) {
        Ok(()) => info!(code = %code, percent, "Seeded coupon"),
        // Already present from a previous run
        Err(_) => {}
    }
}
