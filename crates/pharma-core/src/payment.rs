//! # Payment-Status State Machine
//!
//! Tracks how much of an invoice has been settled and derives the payment
//! status from it.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              payment 0 < p < total        payment reaches total         │
//! │   ┌────────┐ ───────────────────► ┌─────────┐ ─────────────► ┌──────┐  │
//! │   │ Unpaid │                      │ Partial │                │ Paid │  │
//! │   └────────┘ ───────────────────► └────┬────┘                └──┬───┘  │
//! │                payment p >= total      │                        │      │
//! │                (straight to Paid)      │ refund                 │      │
//! │                                        ▼                        │      │
//! │                                  ┌──────────┐ ◄─────────────────┘      │
//! │                                  │ Refunded │   (terminal)             │
//! │                                  └──────────┘                          │
//! │                                                                         │
//! │  OVERDUE is NOT a state: it is a display decoration derived from       │
//! │  (status ∈ {Unpaid, Partial}) AND (today > due_date). Keeping it out   │
//! │  of the machine avoids clock-driven transitions entirely.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failed operations never mutate state: an overpayment or invalid amount
//! leaves `paid` and `status` untouched.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Payment Status
// =============================================================================

/// Settlement status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No payment recorded yet.
    Unpaid,
    /// Some payment recorded, balance outstanding.
    Partial,
    /// Fully settled.
    Paid,
    /// Money returned to the customer. Terminal.
    Refunded,
}

impl PaymentStatus {
    /// Unsettled statuses are the only ones that can become overdue.
    #[inline]
    pub fn is_unsettled(&self) -> bool {
        matches!(self, PaymentStatus::Unpaid | PaymentStatus::Partial)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

// =============================================================================
// Payment State
// =============================================================================

/// The settlement state of one invoice: total, amount paid, and status.
///
/// Invariant: `paid <= total` at all times. Refunds only ever reduce
/// `paid`, so the invariant holds in the `Refunded` state too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentState {
    total: Money,
    paid: Money,
    status: PaymentStatus,
}

impl PaymentState {
    /// Fresh state for a newly issued invoice.
    ///
    /// A zero-total invoice has nothing to settle and starts out Paid.
    pub fn new(total: Money) -> Self {
        let total = total.clamp_non_negative();
        let status = if total.is_zero() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };
        PaymentState {
            total,
            paid: Money::zero(),
            status,
        }
    }

    /// Rehydrates state loaded from storage.
    pub fn from_parts(total: Money, paid: Money, status: PaymentStatus) -> Self {
        PaymentState {
            total,
            paid,
            status,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.total
    }

    #[inline]
    pub fn paid(&self) -> Money {
        self.paid
    }

    #[inline]
    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Remaining balance, floored at zero.
    #[inline]
    pub fn outstanding(&self) -> Money {
        (self.total - self.paid).clamp_non_negative()
    }

    /// Records a payment and advances the status.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidAmount`] for non-positive amounts
    /// - [`CoreError::InvalidStatus`] when the invoice is refunded
    /// - [`CoreError::Overpayment`] when `paid + amount` would exceed
    ///   `total` (state is untouched, caller re-prompts)
    pub fn record_payment(&mut self, amount: Money) -> CoreResult<PaymentStatus> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidAmount {
                reason: format!("payment must be positive, got {} cents", amount.cents()),
            });
        }
        if self.status == PaymentStatus::Refunded {
            return Err(CoreError::InvalidStatus {
                entity: "Invoice".to_string(),
                status: self.status.as_str().to_string(),
            });
        }

        let new_paid = self.paid + amount;
        if new_paid > self.total {
            return Err(CoreError::Overpayment {
                attempted_cents: amount.cents(),
                outstanding_cents: self.outstanding().cents(),
            });
        }

        self.paid = new_paid;
        self.status = if self.paid >= self.total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };
        Ok(self.status)
    }

    /// Issues a refund and moves to the terminal `Refunded` state.
    ///
    /// The refund amount must be positive and no more than what was paid;
    /// it reduces `paid` by that amount. A full refund is simply
    /// `amount == paid`. Only `Paid` and `Partial` invoices can be
    /// refunded.
    pub fn refund(&mut self, amount: Money) -> CoreResult<PaymentStatus> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidAmount {
                reason: format!("refund must be positive, got {} cents", amount.cents()),
            });
        }
        if !matches!(self.status, PaymentStatus::Paid | PaymentStatus::Partial) {
            return Err(CoreError::RefundNotAllowed {
                status: self.status.as_str().to_string(),
            });
        }
        if amount > self.paid {
            return Err(CoreError::RefundTooLarge {
                attempted_cents: amount.cents(),
                paid_cents: self.paid.cents(),
            });
        }

        self.paid = self.paid - amount;
        self.status = PaymentStatus::Refunded;
        Ok(self.status)
    }

    /// Derived display decoration: unsettled and past due.
    pub fn is_overdue(&self, due_date: Option<NaiveDate>, today: NaiveDate) -> bool {
        self.status.is_unsettled() && due_date.map(|d| today > d).unwrap_or(false)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(n: i64) -> Money {
        Money::from_cents(n)
    }

    #[test]
    fn test_partial_then_paid() {
        let mut state = PaymentState::new(cents(10000));
        assert_eq!(state.status(), PaymentStatus::Unpaid);

        let status = state.record_payment(cents(4000)).unwrap();
        assert_eq!(status, PaymentStatus::Partial);
        assert_eq!(state.outstanding().cents(), 6000);

        let status = state.record_payment(cents(6000)).unwrap();
        assert_eq!(status, PaymentStatus::Paid);
        assert_eq!(state.outstanding().cents(), 0);
    }

    #[test]
    fn test_exact_payment_goes_straight_to_paid() {
        // Unpaid invoice of $45.99, pay $45.99 → Paid.
        let mut state = PaymentState::new(cents(4599));
        let status = state.record_payment(cents(4599)).unwrap();
        assert_eq!(status, PaymentStatus::Paid);

        // A past due date on a paid invoice does not make it overdue.
        let due = NaiveDate::from_ymd_opt(2026, 1, 1);
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(!state.is_overdue(due, today));
    }

    #[test]
    fn test_overpayment_rejected_without_mutation() {
        // $125.00 invoice with $25.00 already paid; a $150.00 payment
        // must be rejected and leave paid untouched.
        let mut state =
            PaymentState::from_parts(cents(12500), cents(2500), PaymentStatus::Partial);

        let err = state.record_payment(cents(15000)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Overpayment {
                attempted_cents: 15000,
                outstanding_cents: 10000,
            }
        ));
        assert_eq!(state.paid().cents(), 2500);
        assert_eq!(state.status(), PaymentStatus::Partial);
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        let mut state = PaymentState::new(cents(1000));
        assert!(matches!(
            state.record_payment(cents(0)),
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(matches!(
            state.record_payment(cents(-500)),
            Err(CoreError::InvalidAmount { .. })
        ));
        assert_eq!(state.status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_refund_from_paid_and_partial() {
        let mut paid = PaymentState::from_parts(cents(5000), cents(5000), PaymentStatus::Paid);
        assert_eq!(paid.refund(cents(5000)).unwrap(), PaymentStatus::Refunded);
        assert_eq!(paid.paid().cents(), 0);

        let mut partial =
            PaymentState::from_parts(cents(5000), cents(2000), PaymentStatus::Partial);
        assert_eq!(
            partial.refund(cents(1500)).unwrap(),
            PaymentStatus::Refunded
        );
        assert_eq!(partial.paid().cents(), 500);
    }

    #[test]
    fn test_refund_guards() {
        // Not from Unpaid.
        let mut unpaid = PaymentState::new(cents(5000));
        assert!(matches!(
            unpaid.refund(cents(100)),
            Err(CoreError::RefundNotAllowed { .. })
        ));

        // Not more than was paid.
        let mut partial =
            PaymentState::from_parts(cents(5000), cents(2000), PaymentStatus::Partial);
        assert!(matches!(
            partial.refund(cents(3000)),
            Err(CoreError::RefundTooLarge { .. })
        ));
        assert_eq!(partial.status(), PaymentStatus::Partial);
    }

    #[test]
    fn test_refunded_is_terminal() {
        let mut state = PaymentState::from_parts(cents(5000), cents(5000), PaymentStatus::Paid);
        state.refund(cents(5000)).unwrap();

        assert!(matches!(
            state.record_payment(cents(100)),
            Err(CoreError::InvalidStatus { .. })
        ));
        assert!(matches!(
            state.refund(cents(100)),
            Err(CoreError::RefundNotAllowed { .. })
        ));
    }

    #[test]
    fn test_overdue_only_for_unsettled() {
        let due = NaiveDate::from_ymd_opt(2026, 1, 15);
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();

        let unpaid = PaymentState::new(cents(1000));
        assert!(unpaid.is_overdue(due, today));

        let partial = PaymentState::from_parts(cents(1000), cents(500), PaymentStatus::Partial);
        assert!(partial.is_overdue(due, today));

        let paid = PaymentState::from_parts(cents(1000), cents(1000), PaymentStatus::Paid);
        assert!(!paid.is_overdue(due, today));

        // No due date, never overdue.
        assert!(!unpaid.is_overdue(None, today));

        // Due today is not yet overdue.
        let due_today = NaiveDate::from_ymd_opt(2026, 2, 1);
        assert!(!unpaid.is_overdue(due_today, today));
    }

    #[test]
    fn test_zero_total_invoice_starts_paid() {
        let state = PaymentState::new(cents(0));
        assert_eq!(state.status(), PaymentStatus::Paid);
    }
}
