// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Enrollment draft record and typed field patches.
//!
//! The draft mirrors the wizard form: access credentials, personal data,
//! address, coach selection and checkout choices. Updates arrive as
//! per-group patch structs and are merged field-wise, so every mutable field
//! is spelled out here instead of being addressed by string path. Masked
//! fields (CPF, phone, CEP) and the e-mail are normalized as they are
//! applied, which keeps the stored draft equal to what the form displays.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Address, BillingPeriod, PaymentMethod, PaymentOption};
use crate::validation::{email, masks, cpf};

/// Account credentials collected on the access step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccessFields {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Personal data collected on the personal step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PersonalFields {
    pub full_name: String,
    /// CPF, masked `000.000.000-00`.
    pub cpf: String,
    /// Phone, masked `(00) 00000-0000`.
    pub phone: String,
    /// Birth date, `YYYY-MM-DD`.
    pub birth_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Checkout choices collected on the final step of the purchase flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<BillingPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_option: PaymentOption,
    /// Number of installments; 0 when paying up front.
    #[serde(default)]
    pub installments: u32,
    /// Plan price as a decimal string (e.g. `"149.90"`), echoed from the
    /// plan summary shown on the intro step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// The whole in-progress form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentDraft {
    pub access: AccessFields,
    pub personal: PersonalFields,
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<String>,
    pub checkout: CheckoutFields,
}

/// Partial update for [`AccessFields`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AccessPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// Partial update for [`PersonalFields`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PersonalPatch {
    pub full_name: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
}

/// Partial update for [`Address`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AddressPatch {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

/// Partial update for [`CheckoutFields`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CheckoutPatch {
    pub billing_period: Option<BillingPeriod>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_option: Option<PaymentOption>,
    pub installments: Option<u32>,
    pub amount: Option<String>,
    pub coupon_code: Option<String>,
}

/// A draft update: any subset of field groups.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DraftPatch {
    pub access: Option<AccessPatch>,
    pub personal: Option<PersonalPatch>,
    pub address: Option<AddressPatch>,
    pub coach_id: Option<String>,
    pub checkout: Option<CheckoutPatch>,
}

impl EnrollmentDraft {
    /// Merge a patch into the draft. Returns `true` when any address field
    /// changed, so the caller can drop a cached address validation.
    pub fn apply(&mut self, patch: DraftPatch) -> bool {
        if let Some(access) = patch.access {
            if let Some(email) = access.email {
                self.access.email = email::normalize(&email);
            }
            if let Some(password) = access.password {
                self.access.password = password;
            }
            if let Some(confirmation) = access.password_confirmation {
                self.access.password_confirmation = confirmation;
            }
        }

        if let Some(personal) = patch.personal {
            if let Some(full_name) = personal.full_name {
                self.personal.full_name = full_name;
            }
            if let Some(value) = personal.cpf {
                self.personal.cpf = cpf::apply_mask(&value);
            }
            if let Some(value) = personal.phone {
                self.personal.phone = masks::phone_mask(&value);
            }
            if let Some(birth_date) = personal.birth_date {
                self.personal.birth_date = birth_date;
            }
            if let Some(gender) = personal.gender {
                self.personal.gender = if gender.trim().is_empty() {
                    None
                } else {
                    Some(gender)
                };
            }
        }

        let mut address_changed = false;
        if let Some(address) = patch.address {
            let before = self.address.clone();
            if let Some(street) = address.street {
                self.address.street = street;
            }
            if let Some(number) = address.number {
                self.address.number = number;
            }
            if let Some(complement) = address.complement {
                self.address.complement = if complement.trim().is_empty() {
                    None
                } else {
                    Some(complement)
                };
            }
            if let Some(neighborhood) = address.neighborhood {
                self.address.neighborhood = neighborhood;
            }
            if let Some(city) = address.city {
                self.address.city = city;
            }
            if let Some(state) = address.state {
                self.address.state = state.trim().to_ascii_uppercase();
            }
            if let Some(value) = address.postal_code {
                self.address.postal_code = masks::cep_mask(&value);
            }
            address_changed = self.address != before;
        }

        if let Some(coach_id) = patch.coach_id {
            self.coach_id = if coach_id.trim().is_empty() {
                None
            } else {
                Some(coach_id)
            };
        }

        if let Some(checkout) = patch.checkout {
            if let Some(billing_period) = checkout.billing_period {
                self.checkout.billing_period = Some(billing_period);
            }
            if let Some(payment_method) = checkout.payment_method {
                self.checkout.payment_method = Some(payment_method);
            }
            if let Some(payment_option) = checkout.payment_option {
                self.checkout.payment_option = payment_option;
            }
            if let Some(installments) = checkout.installments {
                self.checkout.installments = installments;
            }
            if let Some(amount) = checkout.amount {
                self.checkout.amount = Some(amount);
            }
            if let Some(coupon_code) = checkout.coupon_code {
                self.checkout.coupon_code = if coupon_code.trim().is_empty() {
                    None
                } else {
                    Some(coupon_code.trim().to_ascii_uppercase())
                };
            }
        }

        address_changed
    }
}
