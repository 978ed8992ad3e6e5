use crate::domain::money::{ExchangeRate, StandardHours, UnitPrice};
use crate::domain::period::PaymentPeriod;
use crate::domain::tier::TierSlice;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PaymentId = u32;
pub type ContractId = u32;
pub type TalentId = u32;
pub type PartnerId = u32;

/// Lifecycle state of a partner contract payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    PendingCalculation,
    Verified,
    PendingApproval,
    Approved,
    Rejected,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::PendingCalculation => "pending_calculation",
            PaymentStatus::Verified => "verified",
            PaymentStatus::PendingApproval => "pending_approval",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The contractual pricing method, carrying its own validated payload so a
/// percentage record can never hold a fixed amount and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method", content = "value")]
pub enum PricingMethod {
    /// A flat amount per period; contractually equal to the unit price.
    Fixed { amount: Decimal },
    /// A percentage of the unit price, with tiered overtime on actuals.
    Percentage { value: Decimal },
}

impl PricingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            PricingMethod::Fixed { .. } => "fixed",
            PricingMethod::Percentage { .. } => "percentage",
        }
    }
}

/// Contractual pricing terms established at verification time.
///
/// All invariants (positive price, rate and hours; method payload matching
/// the method) hold by construction; see `application::verification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub unit_price: UnitPrice,
    pub currency: String,
    pub exchange_rate: ExchangeRate,
    pub pricing: PricingMethod,
    pub standard_hours: StandardHours,
}

/// One partner payment for one contract period.
///
/// Created in `PendingCalculation` when the period opens and mutated only
/// through the workflow operations; terminal states are `Paid` and
/// `Cancelled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub contract: ContractId,
    pub period: PaymentPeriod,
    pub talent: TalentId,
    pub partner: PartnerId,
    pub status: PaymentStatus,
    pub terms: Option<ContractTerms>,
    pub planned_amount_vnd: Option<Decimal>,
    pub actual_work_hours: Option<u32>,
    pub ot_hours: Option<u32>,
    pub actual_amount_vnd: Option<Decimal>,
    /// Actual hours over standard hours; audit metric under the fixed method.
    pub man_month_coefficient: Option<Decimal>,
    /// Foreign total over unit price; audit metric under the percentage method.
    pub effective_coefficient: Option<Decimal>,
    /// Per-band hours used by the last percentage calculation.
    pub tier_breakdown: Vec<TierSlice>,
    pub paid_amount: Option<Decimal>,
    pub payment_date: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub notes: Option<String>,
}

impl PaymentRecord {
    /// Opens a fresh record for a contract payment period.
    pub fn open(
        id: PaymentId,
        contract: ContractId,
        period: PaymentPeriod,
        talent: TalentId,
        partner: PartnerId,
    ) -> Self {
        Self {
            id,
            contract,
            period,
            talent,
            partner,
            status: PaymentStatus::PendingCalculation,
            terms: None,
            planned_amount_vnd: None,
            actual_work_hours: None,
            ot_hours: None,
            actual_amount_vnd: None,
            man_month_coefficient: None,
            effective_coefficient: None,
            tier_breakdown: Vec::new(),
            paid_amount: None,
            payment_date: None,
            rejection_reason: None,
            notes: None,
        }
    }
}
