use crate::domain::payment::{ContractTerms, PricingMethod};
use crate::domain::tier::{TierSchedule, TierSlice};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Result of an actual-amount calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingOutcome {
    /// The binding payable amount in VND.
    pub actual_amount_vnd: Decimal,
    /// Total billed in the contract's foreign currency.
    pub total_foreign: Decimal,
    /// Actual hours / standard hours; set under the fixed method only.
    pub man_month_coefficient: Option<Decimal>,
    /// Total foreign / unit price; set under the percentage method only.
    pub effective_coefficient: Option<Decimal>,
    /// Per-band consumption; empty under the fixed method.
    pub slices: Vec<TierSlice>,
}

/// The planned VND amount computed from contractual terms alone, before any
/// hours are reported. Pure and deterministic.
pub fn planned_amount(terms: &ContractTerms) -> Decimal {
    let rate = terms.exchange_rate.value();
    match terms.pricing {
        PricingMethod::Fixed { amount } => amount * rate,
        PricingMethod::Percentage { value } => {
            terms.unit_price.value() * rate * value / dec!(100)
        }
    }
}

/// The binding payable amount for the reported hours.
///
/// Fixed method: hours have no monetary effect; the planned amount is
/// returned unchanged and only the man-month coefficient is derived.
///
/// Percentage method: hours are consumed through the tier schedule at
/// `base_rate = unit_price / standard_hours`, each band billed at its
/// multiplier; hours beyond the last band's lower bound are billed entirely
/// at the final multiplier. Zero hours yields a zero total.
pub fn actual_amount(
    schedule: &TierSchedule,
    terms: &ContractTerms,
    actual_work_hours: u32,
) -> BillingOutcome {
    let rate = terms.exchange_rate.value();
    match terms.pricing {
        PricingMethod::Fixed { .. } => {
            let planned = planned_amount(terms);
            let man_month =
                Decimal::from(actual_work_hours) / terms.standard_hours.as_decimal();
            BillingOutcome {
                actual_amount_vnd: planned,
                total_foreign: terms.unit_price.value(),
                man_month_coefficient: Some(man_month),
                effective_coefficient: None,
                slices: Vec::new(),
            }
        }
        PricingMethod::Percentage { .. } => {
            let base_rate = terms.unit_price.value() / terms.standard_hours.as_decimal();
            let slices = schedule.breakdown(actual_work_hours);
            let total_foreign: Decimal = slices
                .iter()
                .map(|slice| Decimal::from(slice.hours) * base_rate * slice.multiplier)
                .sum();
            let effective = total_foreign / terms.unit_price.value();
            BillingOutcome {
                actual_amount_vnd: total_foreign * rate,
                total_foreign,
                man_month_coefficient: None,
                effective_coefficient: Some(effective),
                slices,
            }
        }
    }
}
