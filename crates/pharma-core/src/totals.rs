//! # Invoice Totals Calculator
//!
//! Pure derivation of invoice figures from a line collection plus rate
//! parameters. This is the most rule-dense piece of the system; every
//! invoice, cart and POS screen renders the output of [`compute_totals`].
//!
//! ## Fixed Order of Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. subtotal      = Σ qty × unit_price  (all lines)                    │
//! │  2. taxable_base  = Σ qty × unit_price  (non-exempt lines only)        │
//! │  3. discount      = subtotal × discount_rate                           │
//! │  4. tax           = taxable_base × (1 - discount_rate) × tax_rate      │
//! │  5. grand_total   = max(0, subtotal - discount + fee + tax - insurance)│
//! │  6. change (POS)  = cash_received - grand_total                        │
//! │                                                                         │
//! │  The dispensing fee is never taxed and never discounted.               │
//! │  Discount is computed against the FULL subtotal (step 3) but reduces   │
//! │  the taxed amount proportionally (step 4).                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Intermediate math runs in i128 at full precision; each published figure
//! is rounded half-up to whole cents exactly once. Identical inputs give
//! bit-identical outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Rate};
use crate::types::DrugCategory;

// =============================================================================
// Inputs
// =============================================================================

/// One line of input to the calculator.
///
/// Quantity and unit price are clamped to zero on construction rather than
/// rejected, matching the dashboard's "min 0" input behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TotalsLine {
    pub quantity: i64,
    pub unit_price: Money,
    pub category: DrugCategory,
}

impl TotalsLine {
    pub fn new(quantity: i64, unit_price: Money, category: DrugCategory) -> Self {
        TotalsLine {
            quantity: quantity.max(0),
            unit_price: unit_price.clamp_non_negative(),
            category,
        }
    }

    /// quantity × unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Rate and fee parameters for a totals computation.
///
/// Rates arrive pre-clamped by the [`Rate`] constructors; fixed amounts
/// are clamped non-negative here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TotalsParams {
    /// Sales tax applied to the (discounted) taxable base.
    pub tax_rate: Rate,
    /// Percentage discount against the full subtotal.
    pub discount: Rate,
    /// Fixed pharmacy service charge; added after discount, never taxed.
    pub dispensing_fee: Money,
    /// Portion covered by a third-party insurer, subtracted last.
    pub insurance_coverage: Money,
    /// Line categories excluded from the taxable base.
    pub tax_exempt_categories: BTreeSet<DrugCategory>,
}

impl TotalsParams {
    /// Params with the given tax rate and everything else zeroed.
    pub fn with_tax_rate(tax_rate: Rate) -> Self {
        TotalsParams {
            tax_rate,
            ..Default::default()
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// The derived invoice figures.
///
/// A pure value object with value equality; never persisted on its own,
/// always recomputed from inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub taxable_base: Money,
    pub discount_amount: Money,
    pub dispensing_fee: Money,
    pub tax_amount: Money,
    /// Insurance actually applied (never more than the pre-coverage total).
    pub insurance_applied: Money,
    pub grand_total: Money,
}

impl InvoiceTotals {
    /// All-zero totals, the result for an empty cart with no fee.
    pub fn zero() -> Self {
        InvoiceTotals {
            subtotal: Money::zero(),
            taxable_base: Money::zero(),
            discount_amount: Money::zero(),
            dispensing_fee: Money::zero(),
            tax_amount: Money::zero(),
            insurance_applied: Money::zero(),
            grand_total: Money::zero(),
        }
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Computes invoice totals from lines and parameters.
///
/// Pure, deterministic, idempotent: no side effects, and identical inputs
/// yield an identical [`InvoiceTotals`] value (exact equality).
///
/// ## Example
/// ```rust
/// use pharma_core::money::{Money, Rate};
/// use pharma_core::totals::{compute_totals, TotalsLine, TotalsParams};
/// use pharma_core::types::DrugCategory;
///
/// let lines = [
///     TotalsLine::new(2, Money::from_cents(599), DrugCategory::OtcMedicine),
///     TotalsLine::new(1, Money::from_cents(1299), DrugCategory::OtcMedicine),
/// ];
/// let params = TotalsParams::with_tax_rate(Rate::from_percent(7.0));
///
/// let totals = compute_totals(&lines, &params);
/// assert_eq!(totals.subtotal.cents(), 2497);
/// assert_eq!(totals.tax_amount.cents(), 175);
/// assert_eq!(totals.grand_total.cents(), 2672);
/// ```
pub fn compute_totals(lines: &[TotalsLine], params: &TotalsParams) -> InvoiceTotals {
    let dispensing_fee = params.dispensing_fee.clamp_non_negative();
    let insurance = params.insurance_coverage.clamp_non_negative();

    // Steps 1 and 2: subtotal over all lines, taxable base over non-exempt
    // lines. Negative inputs were already clamped by TotalsLine::new, but
    // clamp again so raw struct literals stay safe.
    let mut subtotal_cents: i64 = 0;
    let mut taxable_cents: i64 = 0;
    for line in lines {
        let line_total = line.quantity.max(0) * line.unit_price.clamp_non_negative().cents();
        subtotal_cents += line_total;
        if !params.tax_exempt_categories.contains(&line.category) {
            taxable_cents += line_total;
        }
    }
    let subtotal = Money::from_cents(subtotal_cents);
    let taxable_base = Money::from_cents(taxable_cents);

    // Step 3: percentage discount against the FULL subtotal.
    let discount_amount = subtotal.apply_rate(params.discount);

    // Step 4: tax on the discounted taxable base. Both rates stay in the
    // integer domain; one half-up rounding at the end.
    // tax = taxable × (10000 - discount_bps)/10000 × tax_bps/10000
    let tax_cents = {
        let numerator = taxable_cents as i128
            * params.discount.complement().bps() as i128
            * params.tax_rate.bps() as i128;
        ((numerator + 50_000_000) / 100_000_000) as i64
    };
    let tax_amount = Money::from_cents(tax_cents);

    // Step 5: assemble, subtract insurance, floor at zero. subtotal minus
    // discount cannot go negative (discount <= 100%), so the pre-coverage
    // total is non-negative.
    let pre_coverage = subtotal - discount_amount + dispensing_fee + tax_amount;
    let grand_total = (pre_coverage - insurance).clamp_non_negative();
    let insurance_applied = pre_coverage - grand_total;

    InvoiceTotals {
        subtotal,
        taxable_base,
        discount_amount,
        dispensing_fee,
        tax_amount,
        insurance_applied,
        grand_total,
    }
}

/// Computes change due for a POS cash sale.
///
/// ## Errors
/// Returns [`CoreError::InsufficientFunds`] when `cash_received` does not
/// cover the grand total; the sale cannot complete and the cart must be
/// preserved.
pub fn change_due(grand_total: Money, cash_received: Money) -> CoreResult<Money> {
    if cash_received < grand_total {
        return Err(CoreError::InsufficientFunds {
            received_cents: cash_received.cents(),
            required_cents: grand_total.cents(),
        });
    }
    Ok(cash_received - grand_total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn otc(quantity: i64, unit_price_cents: i64) -> TotalsLine {
        TotalsLine::new(
            quantity,
            Money::from_cents(unit_price_cents),
            DrugCategory::OtcMedicine,
        )
    }

    fn rx(quantity: i64, unit_price_cents: i64) -> TotalsLine {
        TotalsLine::new(
            quantity,
            Money::from_cents(unit_price_cents),
            DrugCategory::Prescription,
        )
    }

    #[test]
    fn test_simple_sale_scenario() {
        // 2 × $5.99 + 1 × $12.99 at 7% tax, nothing else.
        let lines = [otc(2, 599), otc(1, 1299)];
        let params = TotalsParams::with_tax_rate(Rate::from_percent(7.0));

        let totals = compute_totals(&lines, &params);
        assert_eq!(totals.subtotal.cents(), 2497);
        assert_eq!(totals.tax_amount.cents(), 175);
        assert_eq!(totals.grand_total.cents(), 2672);
    }

    #[test]
    fn test_discount_and_dispensing_fee_scenario() {
        // Subtotal $100.00, 10% discount, $3.00 fee, no tax.
        let lines = [otc(1, 10000)];
        let params = TotalsParams {
            discount: Rate::from_percent(10.0),
            dispensing_fee: Money::from_cents(300),
            ..Default::default()
        };

        let totals = compute_totals(&lines, &params);
        assert_eq!(totals.discount_amount.cents(), 1000);
        assert_eq!(totals.grand_total.cents(), 9300);
    }

    #[test]
    fn test_idempotence() {
        let lines = [otc(3, 799), rx(1, 4250), otc(2, 150)];
        let params = TotalsParams {
            tax_rate: Rate::from_percent(8.25),
            discount: Rate::from_percent(5.0),
            dispensing_fee: Money::from_cents(250),
            insurance_coverage: Money::from_cents(1500),
            tax_exempt_categories: BTreeSet::from([DrugCategory::Prescription]),
        };

        let first = compute_totals(&lines, &params);
        let second = compute_totals(&lines, &params);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_floor_when_insurance_exceeds_total() {
        let lines = [otc(1, 1000)];
        let params = TotalsParams {
            insurance_coverage: Money::from_cents(5000),
            ..Default::default()
        };

        let totals = compute_totals(&lines, &params);
        assert_eq!(totals.grand_total.cents(), 0);
        // Only the pre-coverage total was actually applied.
        assert_eq!(totals.insurance_applied.cents(), 1000);
    }

    #[test]
    fn test_monotonic_in_quantity() {
        let params = TotalsParams {
            tax_rate: Rate::from_percent(7.0),
            discount: Rate::from_percent(10.0),
            dispensing_fee: Money::from_cents(300),
            ..Default::default()
        };

        let mut previous = compute_totals(&[otc(0, 999)], &params);
        for qty in 1..20 {
            let current = compute_totals(&[otc(qty, 999)], &params);
            assert!(current.subtotal >= previous.subtotal);
            assert!(current.grand_total >= previous.grand_total);
            previous = current;
        }
    }

    #[test]
    fn test_all_exempt_lines_mean_zero_tax() {
        let lines = [rx(2, 1250), rx(1, 4250)];
        let params = TotalsParams {
            tax_rate: Rate::from_percent(25.0),
            tax_exempt_categories: BTreeSet::from([DrugCategory::Prescription]),
            ..Default::default()
        };

        let totals = compute_totals(&lines, &params);
        assert_eq!(totals.taxable_base.cents(), 0);
        assert_eq!(totals.tax_amount.cents(), 0);
    }

    #[test]
    fn test_mixed_exempt_and_taxable() {
        // Exempt $42.50, taxable $10.00, 10% discount, 7% tax.
        // Tax = 1000 × 0.9 × 0.07 = 63.
        let lines = [rx(1, 4250), otc(1, 1000)];
        let params = TotalsParams {
            tax_rate: Rate::from_percent(7.0),
            discount: Rate::from_percent(10.0),
            tax_exempt_categories: BTreeSet::from([DrugCategory::Prescription]),
            ..Default::default()
        };

        let totals = compute_totals(&lines, &params);
        assert_eq!(totals.subtotal.cents(), 5250);
        assert_eq!(totals.taxable_base.cents(), 1000);
        assert_eq!(totals.discount_amount.cents(), 525);
        assert_eq!(totals.tax_amount.cents(), 63);
        // 5250 - 525 + 0 + 63 = 4788
        assert_eq!(totals.grand_total.cents(), 4788);
    }

    #[test]
    fn test_empty_lines() {
        let totals = compute_totals(&[], &TotalsParams::default());
        assert_eq!(totals, InvoiceTotals::zero());

        // Empty cart with a fee still charges the fee.
        let params = TotalsParams {
            dispensing_fee: Money::from_cents(300),
            ..Default::default()
        };
        let totals = compute_totals(&[], &params);
        assert_eq!(totals.grand_total.cents(), 300);
    }

    #[test]
    fn test_negative_inputs_clamp_to_zero() {
        let line = TotalsLine::new(-3, Money::from_cents(-500), DrugCategory::Other);
        assert_eq!(line.quantity, 0);
        assert_eq!(line.unit_price.cents(), 0);

        let params = TotalsParams {
            dispensing_fee: Money::from_cents(-300),
            insurance_coverage: Money::from_cents(-100),
            ..Default::default()
        };
        let totals = compute_totals(&[line], &params);
        assert_eq!(totals, InvoiceTotals::zero());
    }

    #[test]
    fn test_dispensing_fee_not_taxed_or_discounted() {
        // $10.00 item, 50% discount, $5.00 fee, 10% tax.
        // discount = 500 on the item only; tax = 1000 × 0.5 × 0.10 = 50.
        // total = 1000 - 500 + 500 + 50 = 1050. A taxed or discounted fee
        // would produce a different figure.
        let lines = [otc(1, 1000)];
        let params = TotalsParams {
            tax_rate: Rate::from_percent(10.0),
            discount: Rate::from_percent(50.0),
            dispensing_fee: Money::from_cents(500),
            ..Default::default()
        };

        let totals = compute_totals(&lines, &params);
        assert_eq!(totals.grand_total.cents(), 1050);
    }

    #[test]
    fn test_change_due() {
        let total = Money::from_cents(2672);

        let change = change_due(total, Money::from_cents(3000)).unwrap();
        assert_eq!(change.cents(), 328);

        let exact = change_due(total, Money::from_cents(2672)).unwrap();
        assert_eq!(exact.cents(), 0);

        let err = change_due(total, Money::from_cents(2000)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientFunds {
                received_cents: 2000,
                required_cents: 2672,
            }
        ));
    }
}
