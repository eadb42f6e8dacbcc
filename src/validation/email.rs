// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Structural e-mail validation.
//!
//! Input is NFKC-normalized, trimmed and lowercased before checking, and the
//! normalized form is what flows back into the enrollment draft. Errors are
//! reported incrementally (missing `@`, missing domain, missing dot, short
//! extension) so the user sees the most specific problem first, before the
//! full structural check runs.

use unicode_normalization::UnicodeNormalization;

use super::FieldCheck;

/// Normalize an e-mail for storage and comparison: NFKC, trim, lowercase.
pub fn normalize(input: &str) -> String {
    input.trim().nfkc().collect::<String>().to_lowercase()
}

/// Validate an e-mail address, returning the normalized value.
///
/// Empty input is incomplete, not an error.
pub fn check(input: &str) -> FieldCheck {
    let normalized = normalize(input);

    if normalized.is_empty() {
        return FieldCheck::incomplete(normalized);
    }

    let Some(at) = normalized.find('@') else {
        return FieldCheck::invalid(normalized, "E-mail deve conter @");
    };

    let (local, domain) = normalized.split_at(at);
    let domain = &domain[1..];

    if domain.is_empty() {
        return FieldCheck::invalid(normalized.clone(), "E-mail sem domínio após o @");
    }

    let Some(dot) = domain.rfind('.') else {
        return FieldCheck::invalid(normalized.clone(), "Domínio do e-mail deve conter um ponto");
    };

    let extension = &domain[dot + 1..];
    if extension.len() < 2 {
        return FieldCheck::invalid(normalized.clone(), "Extensão do domínio muito curta");
    }

    if !local_part_ok(local) || !domain_ok(domain) || !extension_ok(extension) {
        return FieldCheck::invalid(normalized.clone(), "E-mail inválido");
    }

    FieldCheck::ok(normalized)
}

/// Whether the input is a complete, structurally valid e-mail.
pub fn is_valid(input: &str) -> bool {
    check(input).valid
}

fn local_part_ok(local: &str) -> bool {
    !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
}

fn domain_ok(domain: &str) -> bool {
    domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
}

fn extension_ok(extension: &str) -> bool {
    extension.len() >= 2 && extension.chars().all(|c| c.is_ascii_alphabetic())
}
