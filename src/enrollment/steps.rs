// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Wizard step sequence and per-step validation gates.
//!
//! Advancement is only possible when the current step's validation returns
//! no messages; validation never blocks editing, only the transition.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geo::AddressValidation;
use crate::validation::{cpf, digits_of, email};

use super::draft::EnrollmentDraft;

const MIN_PASSWORD_LEN: usize = 6;

/// Which wizard a session belongs to. Each kind has its own step sequence
/// and its own storage namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentKind {
    /// Account creation only: Access → Personal → Address.
    SelfRegistration,
    /// Plan purchase: Intro → Access → Personal → Address → CoachSelection
    /// → Checkout.
    PlanPurchase,
}

impl EnrollmentKind {
    /// Storage namespace for this wizard kind.
    pub fn namespace(self) -> &'static str {
        match self {
            EnrollmentKind::SelfRegistration => "registration",
            EnrollmentKind::PlanPurchase => "plan_purchase",
        }
    }
}

/// A wizard step. The intro (plan summary) sits before step 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Intro,
    Access,
    Personal,
    Address,
    CoachSelection,
    Checkout,
}

impl Step {
    /// Display index: Intro is -1, Access is 0, and so on.
    pub fn index(self) -> i8 {
        match self {
            Step::Intro => -1,
            Step::Access => 0,
            Step::Personal => 1,
            Step::Address => 2,
            Step::CoachSelection => 3,
            Step::Checkout => 4,
        }
    }

    /// Initial step for a wizard kind.
    pub fn first(kind: EnrollmentKind) -> Self {
        match kind {
            EnrollmentKind::SelfRegistration => Step::Access,
            EnrollmentKind::PlanPurchase => Step::Intro,
        }
    }

    /// Final step, from which submit is allowed.
    pub fn last(kind: EnrollmentKind) -> Self {
        match kind {
            EnrollmentKind::SelfRegistration => Step::Address,
            EnrollmentKind::PlanPurchase => Step::Checkout,
        }
    }

    /// Next step in the sequence, or `None` from the final step.
    pub fn next(self, kind: EnrollmentKind) -> Option<Self> {
        let sequence = Self::sequence(kind);
        let position = sequence.iter().position(|&step| step == self)?;
        sequence.get(position + 1).copied()
    }

    /// Previous step, or `None` from the initial step.
    pub fn back(self, kind: EnrollmentKind) -> Option<Self> {
        let sequence = Self::sequence(kind);
        let position = sequence.iter().position(|&step| step == self)?;
        position.checked_sub(1).map(|i| sequence[i])
    }

    fn sequence(kind: EnrollmentKind) -> &'static [Step] {
        match kind {
            EnrollmentKind::SelfRegistration => &[Step::Access, Step::Personal, Step::Address],
            EnrollmentKind::PlanPurchase => &[
                Step::Intro,
                Step::Access,
                Step::Personal,
                Step::Address,
                Step::CoachSelection,
                Step::Checkout,
            ],
        }
    }
}

/// Validate a step's fields. An empty vec means the step may be left.
///
/// The address step additionally requires a successful address validation,
/// which the caller passes in (cached on the session or freshly computed).
pub fn validate_step(
    step: Step,
    draft: &EnrollmentDraft,
    address_validation: Option<&AddressValidation>,
) -> Vec<String> {
    let mut errors = Vec::new();

    match step {
        Step::Intro => {}

        Step::Access => {
            let checked = email::check(&draft.access.email);
            if !checked.valid {
                errors.push(
                    checked
                        .error
                        .unwrap_or_else(|| "Informe um e-mail válido".to_string()),
                );
            }
            if draft.access.password.chars().count() < MIN_PASSWORD_LEN {
                errors.push(format!(
                    "Senha deve ter pelo menos {MIN_PASSWORD_LEN} caracteres"
                ));
            }
            if draft.access.password != draft.access.password_confirmation {
                errors.push("As senhas não conferem".to_string());
            }
        }

        Step::Personal => {
            if draft.personal.full_name.trim().is_empty() {
                errors.push("Informe o nome completo".to_string());
            }
            let checked = cpf::check(&draft.personal.cpf);
            if !checked.valid {
                errors.push(
                    checked
                        .error
                        .unwrap_or_else(|| "Informe um CPF válido".to_string()),
                );
            }
            if digits_of(&draft.personal.phone).len() < 10 {
                errors.push("Informe um telefone válido".to_string());
            }
            if draft.personal.birth_date.trim().is_empty() {
                errors.push("Informe a data de nascimento".to_string());
            }
        }

        Step::Address => {
            let address = &draft.address;
            let required = [
                (&address.street, "Informe o logradouro"),
                (&address.number, "Informe o número"),
                (&address.neighborhood, "Informe o bairro"),
                (&address.city, "Informe a cidade"),
                (&address.state, "Informe a UF"),
                (&address.postal_code, "Informe o CEP"),
            ];
            for (value, message) in required {
                if value.trim().is_empty() {
                    errors.push(message.to_string());
                }
            }
            match address_validation {
                Some(validation) if validation.valid => {}
                Some(validation) => errors.push(validation.message.clone()),
                None if errors.is_empty() => {
                    errors.push("Endereço ainda não validado".to_string());
                }
                None => {}
            }
        }

        Step::CoachSelection => {
            if draft
                .coach_id
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
            {
                errors.push("Selecione um treinador".to_string());
            }
        }

        Step::Checkout => {
            if draft.checkout.billing_period.is_none() {
                errors.push("Selecione o período de cobrança".to_string());
            }
            if draft.checkout.payment_method.is_none() {
                errors.push("Selecione a forma de pagamento".to_string());
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoProvider;

    fn valid_access(draft: &mut EnrollmentDraft) {
        draft.access.email = "ana@endurance.app".to_string();
        draft.access.password = "segredo1".to_string();
        draft.access.password_confirmation = "segredo1".to_string();
    }

    fn valid_personal(draft: &mut EnrollmentDraft) {
        draft.personal.full_name = "Ana Silva".to_string();
        draft.personal.cpf = "529.982.247-25".to_string();
        draft.personal.phone = "(47) 99988-7766".to_string();
        draft.personal.birth_date = "1994-03-12".to_string();
    }

    fn approved_validation() -> AddressValidation {
        AddressValidation {
            valid: true,
            message: "Endereço validado".to_string(),
            coordinates: None,
            formatted_address: None,
            provider: GeoProvider::Geocoding,
            approximate: false,
        }
    }

    #[test]
    fn sequences_start_and_end_where_expected() {
        assert_eq!(Step::first(EnrollmentKind::SelfRegistration), Step::Access);
        assert_eq!(Step::first(EnrollmentKind::PlanPurchase), Step::Intro);
        assert_eq!(Step::last(EnrollmentKind::SelfRegistration), Step::Address);
        assert_eq!(Step::last(EnrollmentKind::PlanPurchase), Step::Checkout);
    }

    #[test]
    fn purchase_flow_walks_all_steps() {
        let kind = EnrollmentKind::PlanPurchase;
        let mut step = Step::first(kind);
        let mut visited = vec![step];
        while let Some(next) = step.next(kind) {
            step = next;
            visited.push(step);
        }
        assert_eq!(visited.len(), 6);
        assert_eq!(step, Step::Checkout);
        assert_eq!(step.next(kind), None);
    }

    #[test]
    fn back_from_step_zero_returns_to_intro_in_purchase_flow() {
        assert_eq!(
            Step::Access.back(EnrollmentKind::PlanPurchase),
            Some(Step::Intro)
        );
        assert_eq!(Step::Access.back(EnrollmentKind::SelfRegistration), None);
        assert_eq!(Step::Intro.back(EnrollmentKind::PlanPurchase), None);
    }

    #[test]
    fn indices_match_the_wizard_display() {
        assert_eq!(Step::Intro.index(), -1);
        assert_eq!(Step::Access.index(), 0);
        assert_eq!(Step::Checkout.index(), 4);
    }

    #[test]
    fn empty_access_step_blocks_with_errors() {
        let draft = EnrollmentDraft::default();
        let errors = validate_step(Step::Access, &draft, None);
        assert!(!errors.is_empty());
    }

    #[test]
    fn complete_access_step_passes() {
        let mut draft = EnrollmentDraft::default();
        valid_access(&mut draft);
        assert!(validate_step(Step::Access, &draft, None).is_empty());
    }

    #[test]
    fn short_or_mismatched_passwords_block() {
        let mut draft = EnrollmentDraft::default();
        valid_access(&mut draft);
        draft.access.password = "curta".to_string();
        draft.access.password_confirmation = "curta".to_string();
        let errors = validate_step(Step::Access, &draft, None);
        assert!(errors.iter().any(|e| e.contains("pelo menos")));

        valid_access(&mut draft);
        draft.access.password_confirmation = "diferente1".to_string();
        let errors = validate_step(Step::Access, &draft, None);
        assert!(errors.iter().any(|e| e.contains("não conferem")));
    }

    #[test]
    fn personal_step_requires_valid_cpf_and_phone() {
        let mut draft = EnrollmentDraft::default();
        valid_personal(&mut draft);
        assert!(validate_step(Step::Personal, &draft, None).is_empty());

        draft.personal.cpf = "111.111.111-11".to_string();
        assert!(!validate_step(Step::Personal, &draft, None).is_empty());

        valid_personal(&mut draft);
        draft.personal.phone = "(47) 9998".to_string();
        assert!(!validate_step(Step::Personal, &draft, None).is_empty());
    }

    #[test]
    fn address_step_requires_cached_validation() {
        let mut draft = EnrollmentDraft::default();
        draft.address.street = "Rua Lauro Linhares".to_string();
        draft.address.number = "1000".to_string();
        draft.address.neighborhood = "Trindade".to_string();
        draft.address.city = "Florianópolis".to_string();
        draft.address.state = "SC".to_string();
        draft.address.postal_code = "88036-002".to_string();

        let errors = validate_step(Step::Address, &draft, None);
        assert_eq!(errors, vec!["Endereço ainda não validado".to_string()]);

        let ok = approved_validation();
        assert!(validate_step(Step::Address, &draft, Some(&ok)).is_empty());

        let mut failed = approved_validation();
        failed.valid = false;
        failed.message = "Endereço não encontrado".to_string();
        let errors = validate_step(Step::Address, &draft, Some(&failed));
        assert_eq!(errors, vec!["Endereço não encontrado".to_string()]);
    }

    #[test]
    fn checkout_step_requires_period_and_method() {
        let draft = EnrollmentDraft::default();
        let errors = validate_step(Step::Checkout, &draft, None);
        assert_eq!(errors.len(), 2);
    }
}
