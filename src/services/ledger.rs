//! Payment ledger: the authoritative derivation of how much of a receipt's
//! due amount has been satisfied.
//!
//! Every projection of a receipt's paid amount goes through this module so
//! that no two call sites can disagree. Status is always derived live from
//! `(amount_due, amount_paid, payments)`; it is never persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Derived payment sub-state of an active receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    PaidInFull,
    PendingPayment,
    /// Stored totals exceed the due amount. Unreachable while write-time
    /// validation holds; surfaced as a data-integrity signal if it occurs.
    OverpaymentError,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::PaidInFull => "paid_in_full",
            PaymentStatus::PendingPayment => "pending_payment",
            PaymentStatus::OverpaymentError => "overpayment_error",
        }
    }
}

/// Rejection reasons for a proposed installment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerViolation {
    #[error("payment amount must be greater than zero")]
    NonPositiveAmount,
    #[error("payment exceeds the amount due; {remaining} remaining")]
    Overpayment { remaining: Decimal },
}

/// Uncapped sum of the initial payment and all recorded installments.
pub fn raw_total_paid(amount_paid: Decimal, installments: &[Decimal]) -> Decimal {
    amount_paid + installments.iter().copied().sum::<Decimal>()
}

/// Effective total paid, capped at the due amount.
///
/// The cap is a display defense for data that predates write-time
/// validation; it must never be the mechanism that enforces the invariant.
pub fn total_paid(amount_due: Decimal, amount_paid: Decimal, installments: &[Decimal]) -> Decimal {
    raw_total_paid(amount_paid, installments).min(amount_due)
}

/// Outstanding balance, never negative.
pub fn remaining_balance(
    amount_due: Decimal,
    amount_paid: Decimal,
    installments: &[Decimal],
) -> Decimal {
    (amount_due - total_paid(amount_due, amount_paid, installments)).max(Decimal::ZERO)
}

/// Derive the payment status from the uncapped totals.
pub fn payment_status(amount_due: Decimal, amount_paid: Decimal, installments: &[Decimal]) -> PaymentStatus {
    let raw = raw_total_paid(amount_paid, installments);
    if raw > amount_due {
        PaymentStatus::OverpaymentError
    } else if raw == amount_due {
        PaymentStatus::PaidInFull
    } else {
        PaymentStatus::PendingPayment
    }
}

/// Validate a proposed installment against the receipt's ledger state.
///
/// The overpayment rejection carries the exact additional amount that may
/// still be applied, so callers can present it to the user.
pub fn validate_new_payment(
    amount_due: Decimal,
    amount_paid: Decimal,
    installments: &[Decimal],
    new_amount: Decimal,
) -> Result<(), LedgerViolation> {
    if new_amount <= Decimal::ZERO {
        return Err(LedgerViolation::NonPositiveAmount);
    }
    let existing = raw_total_paid(amount_paid, installments);
    if existing + new_amount > amount_due {
        let remaining = (amount_due - existing).max(Decimal::ZERO);
        return Err(LedgerViolation::Overpayment { remaining });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn partial_initial_payment_is_pending() {
        let due = dec!(50000);
        let paid = dec!(20000);
        assert_eq!(total_paid(due, paid, &[]), dec!(20000));
        assert_eq!(remaining_balance(due, paid, &[]), dec!(30000));
        assert_eq!(payment_status(due, paid, &[]), PaymentStatus::PendingPayment);
    }

    #[test]
    fn exact_installment_flips_to_paid_in_full() {
        let due = dec!(50000);
        let paid = dec!(20000);
        let installments = [dec!(30000)];
        assert_eq!(total_paid(due, paid, &installments), dec!(50000));
        assert_eq!(remaining_balance(due, paid, &installments), dec!(0));
        assert_eq!(
            payment_status(due, paid, &installments),
            PaymentStatus::PaidInFull
        );
    }

    #[test]
    fn payment_against_settled_receipt_reports_zero_remaining() {
        let due = dec!(50000);
        let paid = dec!(20000);
        let installments = [dec!(30000)];
        let err = validate_new_payment(due, paid, &installments, dec!(1)).unwrap_err();
        assert_eq!(err, LedgerViolation::Overpayment { remaining: dec!(0) });
    }

    #[test]
    fn overpayment_reports_exact_remaining_allowance() {
        let due = dec!(1000);
        let paid = dec!(250);
        let installments = [dec!(250)];
        let err = validate_new_payment(due, paid, &installments, dec!(600)).unwrap_err();
        assert_eq!(
            err,
            LedgerViolation::Overpayment {
                remaining: dec!(500)
            }
        );
    }

    #[test]
    fn amount_within_remaining_is_accepted() {
        assert!(validate_new_payment(dec!(1000), dec!(250), &[dec!(250)], dec!(500)).is_ok());
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected_before_the_overpayment_check() {
        assert_eq!(
            validate_new_payment(dec!(100), dec!(0), &[], dec!(0)),
            Err(LedgerViolation::NonPositiveAmount)
        );
        assert_eq!(
            validate_new_payment(dec!(100), dec!(0), &[], dec!(-5)),
            Err(LedgerViolation::NonPositiveAmount)
        );
    }

    #[test]
    fn display_total_is_capped_but_status_flags_the_integrity_breach() {
        // Corrupt pre-validation data: stored totals exceed the due amount.
        let due = dec!(100);
        let paid = dec!(80);
        let installments = [dec!(40)];
        assert_eq!(total_paid(due, paid, &installments), dec!(100));
        assert_eq!(
            payment_status(due, paid, &installments),
            PaymentStatus::OverpaymentError
        );
    }

    #[test]
    fn zero_due_receipt_is_paid_in_full() {
        assert_eq!(
            payment_status(dec!(0), dec!(0), &[]),
            PaymentStatus::PaidInFull
        );
        assert_eq!(remaining_balance(dec!(0), dec!(0), &[]), dec!(0));
    }
}
