use crate::domain::money::{ExchangeRate, StandardHours, UnitPrice};
use crate::domain::payment::{ContractTerms, PricingMethod};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which pricing method the verifier selected for the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMethod {
    Fixed,
    Percentage,
}

/// Raw verification input as received from the caller. Everything optional;
/// `validate` turns it into `ContractTerms` or reports the offending field.
#[derive(Debug, Clone, Default)]
pub struct VerifyTerms {
    pub unit_price: Option<Decimal>,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub method: Option<CalculationMethod>,
    pub percentage_value: Option<Decimal>,
    pub fixed_amount: Option<Decimal>,
    pub standard_hours: Option<u32>,
    pub notes: Option<String>,
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| PaymentError::validation(format!("{field} is required")))
}

/// Validates raw terms into `ContractTerms`.
///
/// Enforces the method-dependent field rules: a percentage contract carries a
/// positive percentage and no fixed amount; a fixed contract carries a fixed
/// amount equal to the unit price and no percentage.
pub fn validate(terms: &VerifyTerms) -> Result<ContractTerms> {
    let unit_price = UnitPrice::new(require(terms.unit_price, "unit price")?)?;
    let exchange_rate = ExchangeRate::new(require(terms.exchange_rate, "exchange rate")?)?;
    let standard_hours = StandardHours::new(require(terms.standard_hours, "standard hours")?)?;
    let currency = require(terms.currency.clone(), "currency code")?;
    if currency.trim().is_empty() {
        return Err(PaymentError::validation("currency code must not be empty"));
    }

    let pricing = match require(terms.method, "calculation method")? {
        CalculationMethod::Percentage => {
            if terms.fixed_amount.is_some() {
                return Err(PaymentError::validation(
                    "fixed amount is not allowed under the percentage method",
                ));
            }
            let value = require(terms.percentage_value, "percentage value")?;
            if value <= Decimal::ZERO {
                return Err(PaymentError::validation("percentage value must be positive"));
            }
            PricingMethod::Percentage { value }
        }
        CalculationMethod::Fixed => {
            if terms.percentage_value.is_some() {
                return Err(PaymentError::validation(
                    "percentage value is not allowed under the fixed method",
                ));
            }
            let amount = require(terms.fixed_amount, "fixed amount")?;
            if amount <= Decimal::ZERO {
                return Err(PaymentError::validation("fixed amount must be positive"));
            }
            if amount != unit_price.value() {
                return Err(PaymentError::validation(
                    "fixed amount must equal the unit price",
                ));
            }
            PricingMethod::Fixed { amount }
        }
    };

    Ok(ContractTerms {
        unit_price,
        currency,
        exchange_rate,
        pricing,
        standard_hours,
    })
}
