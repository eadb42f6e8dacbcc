// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Progressive display masks for phone and CEP fields.
//!
//! Masking only; no checksum exists for either field.

use super::digits_of;

/// Progressive Brazilian phone mask, `(00) 00000-0000`.
///
/// Caps at 11 digits (two-digit area code + 9-digit mobile). Fewer than
/// three digits are left unmasked while the area code is still being typed.
pub fn phone_mask(input: &str) -> String {
    let mut digits = digits_of(input);
    digits.truncate(11);

    if digits.len() < 3 {
        return digits;
    }

    let (area, subscriber) = digits.split_at(2);
    if subscriber.len() <= 5 {
        return format!("({area}) {subscriber}");
    }
    let (prefix, suffix) = subscriber.split_at(5);
    format!("({area}) {prefix}-{suffix}")
}

/// Progressive CEP mask, `00000-000`.
pub fn cep_mask(input: &str) -> String {
    let mut digits = digits_of(input);
    digits.truncate(8);

    if digits.len() <= 5 {
        return digits;
    }
    let (prefix, suffix) = digits.split_at(5);
    format!("{prefix}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_mask_is_progressive() {
        assert_eq!(phone_mask(""), "");
        assert_eq!(phone_mask("4"), "4");
        assert_eq!(phone_mask("47"), "47");
        assert_eq!(phone_mask("479"), "(47) 9");
        assert_eq!(phone_mask("4799988"), "(47) 99988");
        assert_eq!(phone_mask("47999887766"), "(47) 99988-7766");
    }

    #[test]
    fn phone_mask_caps_at_eleven_digits() {
        assert_eq!(phone_mask("479998877665544"), "(47) 99988-7766");
    }

    #[test]
    fn phone_mask_is_idempotent() {
        let once = phone_mask("47999887766");
        assert_eq!(phone_mask(&once), once);
    }

    #[test]
    fn cep_mask_is_progressive() {
        assert_eq!(cep_mask(""), "");
        assert_eq!(cep_mask("8803"), "8803");
        assert_eq!(cep_mask("88035"), "88035");
        assert_eq!(cep_mask("880351"), "88035-1");
        assert_eq!(cep_mask("88035100"), "88035-100");
    }

    #[test]
    fn cep_mask_is_idempotent_and_strips_noise() {
        assert_eq!(cep_mask("88035-100"), "88035-100");
        assert_eq!(cep_mask("cep 88035100!"), "88035-100");
    }
}
