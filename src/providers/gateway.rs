// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Payment gateway integration for PIX, boleto and credit-card charges.
//!
//! The gateway is configured from `GATEWAY_*` environment variables. When
//! unconfigured, every charge attempt fails with
//! [`GatewayError::MissingConfig`] and checkout surfaces 503; there is no
//! offline stand-in for payments.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use url::Url;
use utoipa::ToSchema;

use crate::config::{GATEWAY_API_KEY_ENV, GATEWAY_BASE_URL_ENV, GATEWAY_MERCHANT_ID_ENV};
use crate::models::{BillingPeriod, CardDetails};

const DEFAULT_BASE_URL: &str = "https://api.pagamentos-sandbox.com.br";
const CURRENCY: &str = "BRL";

/// Inputs common to every charge.
pub struct ChargeRequest<'a> {
    pub payment_id: &'a str,
    pub user_id: &'a str,
    pub plan_id: &'a str,
    pub billing_period: BillingPeriod,
    /// 0 when paying up front.
    pub installments: u32,
    pub amount_in_minor: u64,
    pub coupon_code: Option<&'a str>,
}

/// A PIX charge: QR code image plus copy-paste code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PixCharge {
    /// Base64 `data:` URI with the QR code image.
    pub qr_code: String,
    /// EMV copy-paste payload.
    pub copy_paste: String,
}

/// A boleto slip: download URL and due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoletoCharge {
    pub url: String,
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// Outcome of a credit-card charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CardOutcome {
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_id: Option<String>,
    /// Last four digits of the charged card.
    pub last_four: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway configuration missing: {0}")]
    MissingConfig(String),

    #[error("payment gateway request failed: {0}")]
    Request(String),

    #[error("payment gateway response was invalid: {0}")]
    InvalidResponse(String),
}

/// Payment gateway client.
pub struct PaymentGateway {
    backend: Backend,
}

enum Backend {
    Http(HttpGateway),
    Unconfigured,
    #[cfg(test)]
    Sandbox,
}

struct HttpGateway {
    http: Client,
    base_url: String,
    api_key: String,
    merchant_id: String,
}

impl PaymentGateway {
    /// Whether the `GATEWAY_*` environment is fully configured.
    pub fn is_env_configured() -> bool {
        env_present(GATEWAY_API_KEY_ENV) && env_present(GATEWAY_MERCHANT_ID_ENV)
    }

    /// Build from the environment; unconfigured when keys are missing.
    pub fn from_env() -> Self {
        if !Self::is_env_configured() {
            return Self {
                backend: Backend::Unconfigured,
            };
        }

        let base_url = std::env::var(GATEWAY_BASE_URL_ENV)
            .ok()
            .filter(|value| Url::parse(value).is_ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // is_env_configured() checked presence above
        let api_key = std::env::var(GATEWAY_API_KEY_ENV).unwrap_or_default();
        let merchant_id = std::env::var(GATEWAY_MERCHANT_ID_ENV).unwrap_or_default();

        Self {
            backend: Backend::Http(HttpGateway {
                http: Client::builder()
                    .timeout(Duration::from_secs(15))
                    .build()
                    .unwrap_or_default(),
                base_url,
                api_key,
                merchant_id,
            }),
        }
    }

    /// Deterministic in-process gateway for tests.
    #[cfg(test)]
    pub fn sandbox() -> Self {
        Self {
            backend: Backend::Sandbox,
        }
    }

    /// Whether charges can actually be created.
    pub fn is_configured(&self) -> bool {
        !matches!(self.backend, Backend::Unconfigured)
    }

    /// Create a PIX charge.
    pub async fn create_pix_charge(
        &self,
        request: &ChargeRequest<'_>,
    ) -> Result<PixCharge, GatewayError> {
        match &self.backend {
            Backend::Http(gateway) => gateway.create_pix_charge(request).await,
            Backend::Unconfigured => Err(unconfigured()),
            #[cfg(test)]
            Backend::Sandbox => Ok(PixCharge {
                qr_code: format!("data:image/png;base64,QR-{}", request.payment_id),
                copy_paste: format!(
                    "00020126580014br.gov.bcb.pix{}5204000053039865802BR",
                    request.payment_id
                ),
            }),
        }
    }

    /// Create a boleto charge.
    pub async fn create_boleto_charge(
        &self,
        request: &ChargeRequest<'_>,
    ) -> Result<BoletoCharge, GatewayError> {
        match &self.backend {
            Backend::Http(gateway) => gateway.create_boleto_charge(request).await,
            Backend::Unconfigured => Err(unconfigured()),
            #[cfg(test)]
            Backend::Sandbox => Ok(BoletoCharge {
                url: format!("https://boletos.test/{}.pdf", request.payment_id),
                due_date: Utc::now() + chrono::Duration::days(2),
                barcode: Some(format!("34191.79001 {}", request.amount_in_minor)),
            }),
        }
    }

    /// Charge a credit card. A decline is an `Ok` outcome, not an error.
    pub async fn charge_card(
        &self,
        request: &ChargeRequest<'_>,
        card: &CardDetails,
    ) -> Result<CardOutcome, GatewayError> {
        match &self.backend {
            Backend::Http(gateway) => gateway.charge_card(request, card).await,
            Backend::Unconfigured => Err(unconfigured()),
            #[cfg(test)]
            Backend::Sandbox => {
                // Test-card convention: numbers ending 0002 are declined.
                let last_four = card.last_four();
                Ok(CardOutcome {
                    approved: last_four != "0002",
                    authorization_id: (last_four != "0002")
                        .then(|| format!("auth-{}", request.payment_id)),
                    last_four,
                })
            }
        }
    }
}

fn unconfigured() -> GatewayError {
    GatewayError::MissingConfig(format!(
        "set {GATEWAY_API_KEY_ENV} and {GATEWAY_MERCHANT_ID_ENV}"
    ))
}

fn env_present(name: &str) -> bool {
    std::env::var(name)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}

impl HttpGateway {
    async fn create_pix_charge(
        &self,
        request: &ChargeRequest<'_>,
    ) -> Result<PixCharge, GatewayError> {
        let payload = self.charge_payload(request, "pix", None);
        let response = self.post_json("/v1/charges", &payload).await?;

        let pix = response
            .get("pix")
            .cloned()
            .ok_or_else(|| GatewayError::InvalidResponse("missing pix payload".to_string()))?;
        serde_json::from_value(pix)
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid pix payload: {e}")))
    }

    async fn create_boleto_charge(
        &self,
        request: &ChargeRequest<'_>,
    ) -> Result<BoletoCharge, GatewayError> {
        let payload = self.charge_payload(request, "boleto", None);
        let response = self.post_json("/v1/charges", &payload).await?;

        let boleto = response
            .get("boleto")
            .cloned()
            .ok_or_else(|| GatewayError::InvalidResponse("missing boleto payload".to_string()))?;
        serde_json::from_value(boleto)
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid boleto payload: {e}")))
    }

    async fn charge_card(
        &self,
        request: &ChargeRequest<'_>,
        card: &CardDetails,
    ) -> Result<CardOutcome, GatewayError> {
        let card_payload = json!({
            "number": card.number,
            "holder_name": card.holder_name,
            "expiry_month": card.expiry_month,
            "expiry_year": card.expiry_year,
            "cvc": card.cvc,
        });
        let payload = self.charge_payload(request, "credit_card", Some(card_payload));
        let response = self.post_json("/v1/charges", &payload).await?;

        let status = response
            .pointer("/card/status")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("missing card status in response".to_string())
            })?;

        Ok(CardOutcome {
            approved: status == "approved",
            authorization_id: response
                .pointer("/card/authorization_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            last_four: card.last_four(),
        })
    }

    fn charge_payload(
        &self,
        request: &ChargeRequest<'_>,
        method: &str,
        card: Option<Value>,
    ) -> Value {
        let mut payload = json!({
            "merchant_id": self.merchant_id,
            "reference": request.payment_id,
            "amount_in_minor": request.amount_in_minor,
            "currency": CURRENCY,
            "method": method,
            "customer": { "user_id": request.user_id },
            "plan": {
                "plan_id": request.plan_id,
                "billing_period": request.billing_period,
                "installments": request.installments,
            },
        });
        if let Some(coupon) = request.coupon_code {
            payload["coupon_code"] = Value::String(coupon.to_string());
        }
        if let Some(card) = card {
            payload["card"] = card;
        }
        payload
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, GatewayError> {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));

        info!(url = %url, "payment gateway: sending charge request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("charge request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or(body);
            return Err(GatewayError::Request(format!(
                "gateway returned {status}: {message}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("invalid response body: {e}")))
    }
}

/// Pull the gateway's own error message out of a failure body, if any.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request<'a>(payment_id: &'a str) -> ChargeRequest<'a> {
        ChargeRequest {
            payment_id,
            user_id: "user-1",
            plan_id: "plan-basic",
            billing_period: BillingPeriod::Monthly,
            installments: 0,
            amount_in_minor: 14990,
            coupon_code: None,
        }
    }

    fn sample_card(number: &str) -> CardDetails {
        CardDetails {
            number: number.to_string(),
            holder_name: "ANA SILVA".to_string(),
            expiry_month: 12,
            expiry_year: 2030,
            cvc: "123".to_string(),
        }
    }

    #[tokio::test]
    async fn unconfigured_gateway_refuses_charges() {
        let gateway = PaymentGateway {
            backend: Backend::Unconfigured,
        };
        assert!(!gateway.is_configured());

        let err = gateway
            .create_pix_charge(&sample_request("pay-1"))
            .await
            .expect_err("must refuse");
        assert!(matches!(err, GatewayError::MissingConfig(_)));
    }

    #[tokio::test]
    async fn sandbox_pix_charge_is_deterministic() {
        let gateway = PaymentGateway::sandbox();
        let first = gateway
            .create_pix_charge(&sample_request("pay-1"))
            .await
            .unwrap();
        let second = gateway
            .create_pix_charge(&sample_request("pay-1"))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(first.copy_paste.contains("pay-1"));
    }

    #[tokio::test]
    async fn sandbox_card_declines_test_number() {
        let gateway = PaymentGateway::sandbox();

        let approved = gateway
            .charge_card(&sample_request("pay-1"), &sample_card("4111111111111111"))
            .await
            .unwrap();
        assert!(approved.approved);
        assert_eq!(approved.last_four, "1111");

        let declined = gateway
            .charge_card(&sample_request("pay-2"), &sample_card("4000000000000002"))
            .await
            .unwrap();
        assert!(!declined.approved);
        assert!(declined.authorization_id.is_none());
    }

    #[test]
    fn error_message_extraction_prefers_gateway_message() {
        assert_eq!(
            extract_error_message(r#"{"error":"cartão recusado"}"#),
            Some("cartão recusado".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"message":"limite excedido"}"#),
            Some("limite excedido".to_string())
        );
        assert_eq!(extract_error_message("not json"), None);
    }

    #[test]
    fn charge_payload_includes_coupon_and_card_when_present() {
        let gateway = HttpGateway {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: "key".to_string(),
            merchant_id: "merchant-1".to_string(),
        };

        let mut request = sample_request("pay-9");
        request.coupon_code = Some("TREINO10");
        let payload = gateway.charge_payload(&request, "pix", None);

        assert_eq!(payload["coupon_code"], "TREINO10");
        assert_eq!(payload["method"], "pix");
        assert_eq!(payload["plan"]["installments"], 0);
        assert!(payload.get("card").is_none());
    }
}
