// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Full-address validation.
//!
//! With `GEOCODING_API_KEY` set, validation delegates to the configured
//! Google-style geocoding API: `OK` with at least one result is valid, and
//! the first result's coordinates and formatted address are returned.
//!
//! Without a key, a deterministic offline approximation runs instead: state
//! against the 27 UF codes, CEP against `00000-000`/`00000000`, minimum
//! lengths for city/street/number, and synthesized coordinates from a
//! capital-city table (small jitter), the state table (larger jitter), or a
//! jittered Brazil centroid. Offline results are always flagged
//! `approximate`: they are a plausibility check, not a verified geocode.
//!
//! Jitter is derived from a SHA-256 hash of the normalized address, so the
//! same address always resolves to the same synthetic point.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::{GEOCODING_API_KEY_ENV, GEOCODING_BASE_URL_ENV};
use crate::models::Address;
use crate::validation::digits_of;

use super::{AddressValidation, Coordinates, GeoProvider};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode";

/// The 27 Brazilian state codes.
const STATE_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// Approximate state centroids, same order as [`STATE_CODES`].
const STATE_COORDS: [(f64, f64); 27] = [
    (-8.77, -70.55),
    (-9.62, -36.82),
    (1.41, -51.77),
    (-3.47, -65.10),
    (-13.29, -41.71),
    (-5.20, -39.53),
    (-15.83, -47.86),
    (-19.19, -40.34),
    (-15.98, -49.86),
    (-5.42, -45.44),
    (-12.64, -55.42),
    (-20.51, -54.54),
    (-18.10, -44.38),
    (-3.79, -52.48),
    (-7.28, -36.72),
    (-24.89, -51.55),
    (-8.38, -37.86),
    (-6.60, -42.28),
    (-22.25, -42.66),
    (-5.81, -36.59),
    (-30.17, -53.50),
    (-10.83, -63.34),
    (1.99, -61.33),
    (-27.45, -50.95),
    (-22.19, -48.79),
    (-10.57, -37.45),
    (-9.46, -48.26),
];

const BRAZIL_CENTROID: (f64, f64) = (-14.2350, -51.9253);

const CITY_JITTER_DEG: f64 = 0.02;
const STATE_JITTER_DEG: f64 = 0.5;
const COUNTRY_JITTER_DEG: f64 = 1.0;

/// Address validator, online when a geocoding key is configured.
pub struct Geocoder {
    provider: Option<ProviderConfig>,
}

struct ProviderConfig {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeBody {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

impl Geocoder {
    /// Build from the environment; offline when no API key is set.
    pub fn from_env() -> Self {
        let api_key = std::env::var(GEOCODING_API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let provider = api_key.map(|api_key| {
            let base_url = std::env::var(GEOCODING_BASE_URL_ENV)
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
            ProviderConfig {
                http: Client::builder()
                    .timeout(Duration::from_secs(15))
                    .build()
                    .unwrap_or_default(),
                base_url,
                api_key,
            }
        });

        Self { provider }
    }

    /// Offline validator, regardless of environment. Used by tests and by
    /// deployments that deliberately run without a geocoding key.
    pub fn offline() -> Self {
        Self { provider: None }
    }

    /// Whether a real geocoding provider backs this validator.
    pub fn is_online(&self) -> bool {
        self.provider.is_some()
    }

    /// Validate a full address. Never fails outward: transport and provider
    /// errors become `valid: false` results with a retry message.
    pub async fn validate(&self, address: &Address) -> AddressValidation {
        match &self.provider {
            Some(provider) => provider.validate(address).await,
            None => validate_offline(address),
        }
    }
}

impl ProviderConfig {
    async fn validate(&self, address: &Address) -> AddressValidation {
        let query = format_query(address);
        let url = format!("{}/json", self.base_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .query(&[("address", query.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "geocoding request failed");
                return AddressValidation::rejected(
                    "Erro ao validar endereço. Tente novamente.",
                    GeoProvider::Geocoding,
                );
            }
        };

        let body: GeocodeBody = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "geocoding returned invalid body");
                return AddressValidation::rejected(
                    "Erro ao validar endereço. Tente novamente.",
                    GeoProvider::Geocoding,
                );
            }
        };

        match (body.status.as_str(), body.results.into_iter().next()) {
            ("OK", Some(result)) => AddressValidation {
                valid: true,
                message: "Endereço validado".to_string(),
                coordinates: Some(Coordinates {
                    lat: result.geometry.location.lat,
                    lng: result.geometry.location.lng,
                }),
                formatted_address: result.formatted_address,
                provider: GeoProvider::Geocoding,
                approximate: false,
            },
            ("ZERO_RESULTS", _) | ("OK", None) => AddressValidation::rejected(
                "Endereço não encontrado",
                GeoProvider::Geocoding,
            ),
            (status, _) => {
                warn!(status = %status, "geocoding returned non-OK status");
                AddressValidation::rejected(
                    "Erro ao validar endereço. Tente novamente.",
                    GeoProvider::Geocoding,
                )
            }
        }
    }
}

fn format_query(address: &Address) -> String {
    format!(
        "{}, {} - {}, {} - {}, {}, Brasil",
        address.street,
        address.number,
        address.neighborhood,
        address.city,
        address.state,
        address.postal_code
    )
}

/// Deterministic offline plausibility check.
fn validate_offline(address: &Address) -> AddressValidation {
    let state = address.state.trim().to_ascii_uppercase();
    if !STATE_CODES.contains(&state.as_str()) {
        return AddressValidation::rejected("UF inválida", GeoProvider::Offline);
    }
    if !cep_format_ok(&address.postal_code) {
        return AddressValidation::rejected("CEP inválido", GeoProvider::Offline);
    }
    if address.city.trim().chars().count() < 2 {
        return AddressValidation::rejected("Cidade inválida", GeoProvider::Offline);
    }
    if address.street.trim().chars().count() < 3 {
        return AddressValidation::rejected("Logradouro muito curto", GeoProvider::Offline);
    }
    if address.number.trim().is_empty() {
        return AddressValidation::rejected("Número obrigatório", GeoProvider::Offline);
    }

    let (jx, jy) = jitter_for(address);
    let city = address.city.trim().to_lowercase();

    let coords = if let Some((lat, lng)) = capital_coords(&city) {
        Coordinates {
            lat: lat + jx * CITY_JITTER_DEG,
            lng: lng + jy * CITY_JITTER_DEG,
        }
    } else if let Some((lat, lng)) = state_coords(&state) {
        Coordinates {
            lat: lat + jx * STATE_JITTER_DEG,
            lng: lng + jy * STATE_JITTER_DEG,
        }
    } else {
        Coordinates {
            lat: BRAZIL_CENTROID.0 + jx * COUNTRY_JITTER_DEG,
            lng: BRAZIL_CENTROID.1 + jy * COUNTRY_JITTER_DEG,
        }
    };

    AddressValidation {
        valid: true,
        message: "Endereço verificado de forma aproximada (sem chave de geocodificação)"
            .to_string(),
        coordinates: Some(coords),
        formatted_address: Some(format!(
            "{}, {} - {}, {} - {}, {}",
            address.street.trim(),
            address.number.trim(),
            address.neighborhood.trim(),
            address.city.trim(),
            state,
            address.postal_code.trim()
        )),
        provider: GeoProvider::Offline,
        approximate: true,
    }
}

/// `00000-000` or bare 8 digits.
fn cep_format_ok(cep: &str) -> bool {
    let cep = cep.trim();
    let digits = digits_of(cep);
    if digits.len() != 8 {
        return false;
    }
    cep.len() == 8 || (cep.len() == 9 && cep.as_bytes()[5] == b'-')
}

fn state_coords(state: &str) -> Option<(f64, f64)> {
    STATE_CODES
        .iter()
        .position(|&code| code == state)
        .map(|i| STATE_COORDS[i])
}

fn capital_coords(city: &str) -> Option<(f64, f64)> {
    let coords = match city {
        "são paulo" => (-23.5505, -46.6333),
        "rio de janeiro" => (-22.9068, -43.1729),
        "belo horizonte" => (-19.9167, -43.9345),
        "brasília" => (-15.7939, -47.8828),
        "salvador" => (-12.9777, -38.5016),
        "fortaleza" => (-3.7319, -38.5267),
        "curitiba" => (-25.4284, -49.2733),
        "manaus" => (-3.1190, -60.0217),
        "recife" => (-8.0476, -34.8770),
        "porto alegre" => (-30.0346, -51.2177),
        "goiânia" => (-16.6869, -49.2648),
        "belém" => (-1.4558, -48.4902),
        "florianópolis" => (-27.5954, -48.5480),
        "vitória" => (-20.3155, -40.3128),
        "natal" => (-5.7945, -35.2110),
        _ => return None,
    };
    Some(coords)
}

/// Two values in [-1, 1] derived from a hash of the normalized address.
fn jitter_for(address: &Address) -> (f64, f64) {
    let key = format!(
        "{}|{}|{}|{}|{}",
        address.street.trim().to_lowercase(),
        address.number.trim().to_lowercase(),
        address.city.trim().to_lowercase(),
        address.state.trim().to_uppercase(),
        digits_of(&address.postal_code)
    );
    let digest = Sha256::digest(key.as_bytes());

    let a = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let b = u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]);

    let unit = |v: u32| (v as f64 / u32::MAX as f64) * 2.0 - 1.0;
    (unit(a), unit(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address() -> Address {
        Address {
            street: "Rua Lauro Linhares".to_string(),
            number: "1000".to_string(),
            complement: None,
            neighborhood: "Trindade".to_string(),
            city: "Florianópolis".to_string(),
            state: "SC".to_string(),
            postal_code: "88036-002".to_string(),
        }
    }

    #[test]
    fn offline_accepts_plausible_address_and_flags_it() {
        let result = validate_offline(&sample_address());
        assert!(result.valid);
        assert!(result.approximate);
        assert_eq!(result.provider, GeoProvider::Offline);
        assert!(result.coordinates.is_some());
        assert!(result.message.contains("aproximada"));
    }

    #[test]
    fn offline_rejects_unknown_state() {
        let mut address = sample_address();
        address.state = "XX".to_string();
        let result = validate_offline(&address);
        assert!(!result.valid);
        assert_eq!(result.message, "UF inválida");
    }

    #[test]
    fn offline_rejects_bad_cep() {
        let mut address = sample_address();
        address.postal_code = "880360".to_string();
        assert!(!validate_offline(&address).valid);

        address.postal_code = "8803-6002".to_string();
        assert!(!validate_offline(&address).valid);
    }

    #[test]
    fn offline_rejects_missing_number_and_short_street() {
        let mut address = sample_address();
        address.number = "  ".to_string();
        assert_eq!(validate_offline(&address).message, "Número obrigatório");

        let mut address = sample_address();
        address.street = "Ru".to_string();
        assert_eq!(validate_offline(&address).message, "Logradouro muito curto");
    }

    #[test]
    fn offline_coordinates_are_deterministic() {
        let first = validate_offline(&sample_address());
        let second = validate_offline(&sample_address());
        assert_eq!(first.coordinates, second.coordinates);
    }

    #[test]
    fn capital_city_coordinates_stay_near_the_capital() {
        let result = validate_offline(&sample_address());
        let coords = result.coordinates.unwrap();
        assert!((coords.lat - -27.5954).abs() <= CITY_JITTER_DEG + 1e-9);
        assert!((coords.lng - -48.5480).abs() <= CITY_JITTER_DEG + 1e-9);
    }

    #[test]
    fn unknown_city_falls_back_to_state_centroid() {
        let mut address = sample_address();
        address.city = "Tubarão".to_string();
        let coords = validate_offline(&address).coordinates.unwrap();
        assert!((coords.lat - -27.45).abs() <= STATE_JITTER_DEG + 1e-9);
        assert!((coords.lng - -50.95).abs() <= STATE_JITTER_DEG + 1e-9);
    }

    #[test]
    fn cep_format_rules() {
        assert!(cep_format_ok("88036002"));
        assert!(cep_format_ok("88036-002"));
        assert!(!cep_format_ok("88036 002"));
        assert!(!cep_format_ok("8803-6002"));
        assert!(!cep_format_ok("880360021"));
    }
}
