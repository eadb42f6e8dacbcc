// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Endurance Sports

//! Installment eligibility by billing period.
//!
//! Short periods cannot be financed; longer ones allow up to one installment
//! per billing month. An installment selection for an ineligible period is
//! silently coerced back to a single up-front payment.

use crate::models::{BillingPeriod, PaymentOption};

/// Maximum number of installments for a billing period. 1 means the period
/// cannot be financed.
pub fn max_installments(period: BillingPeriod) -> u32 {
    match period {
        BillingPeriod::Weekly | BillingPeriod::Monthly => 1,
        BillingPeriod::Biweekly => 2,
        BillingPeriod::Quarterly => 3,
        BillingPeriod::Semiannual => 6,
        BillingPeriod::Yearly => 12,
    }
}

/// Coerce a payment option and installment count into the period's allowed
/// range. Up-front always carries 0 installments; a financed selection is
/// clamped to `2..=max`, or coerced to up-front when the period cannot be
/// financed at all.
pub fn normalize(
    period: BillingPeriod,
    option: PaymentOption,
    installments: u32,
) -> (PaymentOption, u32) {
    match option {
        PaymentOption::UpFront => (PaymentOption::UpFront, 0),
        PaymentOption::Installments => {
            let max = max_installments(period);
            if max <= 1 {
                (PaymentOption::UpFront, 0)
            } else {
                (PaymentOption::Installments, installments.clamp(2, max))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_cannot_be_financed() {
        let (option, count) =
            normalize(BillingPeriod::Monthly, PaymentOption::Installments, 4);
        assert_eq!(option, PaymentOption::UpFront);
        assert_eq!(count, 0);
    }

    #[test]
    fn weekly_cannot_be_financed() {
        let (option, count) = normalize(BillingPeriod::Weekly, PaymentOption::Installments, 2);
        assert_eq!(option, PaymentOption::UpFront);
        assert_eq!(count, 0);
    }

    #[test]
    fn yearly_allows_two_to_twelve() {
        for requested in 2..=12 {
            let (option, count) =
                normalize(BillingPeriod::Yearly, PaymentOption::Installments, requested);
            assert_eq!(option, PaymentOption::Installments);
            assert_eq!(count, requested);
        }
    }

    #[test]
    fn installment_count_is_clamped_to_the_period_maximum() {
        let (_, count) = normalize(BillingPeriod::Quarterly, PaymentOption::Installments, 9);
        assert_eq!(count, 3);

        let (_, count) = normalize(BillingPeriod::Yearly, PaymentOption::Installments, 40);
        assert_eq!(count, 12);

        let (_, count) = normalize(BillingPeriod::Biweekly, PaymentOption::Installments, 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn up_front_always_zeroes_the_count() {
        let (option, count) = normalize(BillingPeriod::Yearly, PaymentOption::UpFront, 7);
        assert_eq!(option, PaymentOption::UpFront);
        assert_eq!(count, 0);
    }
}
