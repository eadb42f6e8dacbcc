// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! ViaCEP postal-code lookup client.
//!
//! Used to pre-fill the address step from a CEP. Codes that are not exactly
//! 8 digits after cleaning are rejected locally without touching the remote
//! service. Successful lookups are kept in a small in-process LRU since the
//! same CEP is typically looked up several times while a form is edited.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::config::VIACEP_BASE_URL_ENV;
use crate::validation::{digits_of, masks};

const DEFAULT_BASE_URL: &str = "https://viacep.com.br/ws";
const CACHE_CAPACITY: usize = 256;

/// Address fields returned by the lookup, ready to pre-fill the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PostalAddress {
    /// CEP, masked `00000-000`.
    pub postal_code: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state code (UF).
    pub state: String,
}

/// Outcome of a postal-code lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostalLookup {
    Found(PostalAddress),
    /// The service explicitly reported the code as unknown.
    NotFound,
    /// Input was not 8 digits; the remote service was not called.
    InvalidCode,
    /// Transport or service failure; the caller should retry.
    Unavailable,
}

/// ViaCEP-compatible lookup client.
pub struct ViaCepClient {
    http: Client,
    base_url: String,
    cache: Mutex<LruCache<String, PostalAddress>>,
}

#[derive(Debug, Deserialize)]
struct ViaCepBody {
    #[serde(default)]
    erro: bool,
    logradouro: Option<String>,
    bairro: Option<String>,
    localidade: Option<String>,
    uf: Option<String>,
}

impl ViaCepClient {
    pub fn from_env() -> Self {
        let base_url = std::env::var(VIACEP_BASE_URL_ENV)
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.into(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Look up a CEP. Never returns an error; failures map to
    /// [`PostalLookup::Unavailable`].
    pub async fn lookup(&self, postal_code: &str) -> PostalLookup {
        let digits = digits_of(postal_code);
        if digits.len() != 8 {
            return PostalLookup::InvalidCode;
        }

        if let Some(cached) = self.cached(&digits) {
            return PostalLookup::Found(cached);
        }

        let url = format!("{}/{digits}/json/", self.base_url.trim_end_matches('/'));
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(postal_code = %digits, error = %e, "CEP lookup request failed");
                return PostalLookup::Unavailable;
            }
        };

        if !response.status().is_success() {
            warn!(postal_code = %digits, status = %response.status(), "CEP lookup returned error status");
            return PostalLookup::Unavailable;
        }

        let body: ViaCepBody = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(postal_code = %digits, error = %e, "CEP lookup returned invalid body");
                return PostalLookup::Unavailable;
            }
        };

        let outcome = parse_body(&digits, body);
        if let PostalLookup::Found(address) = &outcome {
            self.store(&digits, address.clone());
        }
        outcome
    }

    fn cached(&self, digits: &str) -> Option<PostalAddress> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(digits).cloned()
    }

    fn store(&self, digits: &str, address: PostalAddress) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(digits.to_string(), address);
        }
    }
}

/// Map a service body to a lookup outcome. Pure, for testability.
fn parse_body(digits: &str, body: ViaCepBody) -> PostalLookup {
    if body.erro {
        return PostalLookup::NotFound;
    }

    // A well-formed success carries at least city and state.
    let (Some(city), Some(state)) = (body.localidade, body.uf) else {
        return PostalLookup::Unavailable;
    };

    PostalLookup::Found(PostalAddress {
        postal_code: masks::cep_mask(digits),
        street: body.logradouro.unwrap_or_default(),
        neighborhood: body.bairro.unwrap_or_default(),
        city,
        state,
    })
}
