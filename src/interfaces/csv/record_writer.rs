use crate::domain::payment::{PaymentRecord, PricingMethod};
use crate::error::Result;
use rust_decimal::Decimal;
use std::io::Write;

/// Writes the final state of payment records as CSV.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

fn amount(value: Option<Decimal>) -> String {
    value.map(|v| v.normalize().to_string()).unwrap_or_default()
}

impl<W: Write> RecordWriter<W> {
    pub fn new(target: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(target),
        }
    }

    pub fn write_records(&mut self, records: Vec<PaymentRecord>) -> Result<()> {
        self.writer.write_record([
            "payment",
            "contract",
            "period",
            "status",
            "method",
            "planned_vnd",
            "actual_vnd",
            "paid_amount",
            "coefficient",
        ])?;
        for record in records {
            let method = record
                .terms
                .as_ref()
                .map(|terms| terms.pricing.name())
                .unwrap_or_default();
            let coefficient = match record.terms.as_ref().map(|terms| &terms.pricing) {
                Some(PricingMethod::Fixed { .. }) => amount(record.man_month_coefficient),
                Some(PricingMethod::Percentage { .. }) => amount(record.effective_coefficient),
                None => String::new(),
            };
            self.writer.write_record([
                record.id.to_string(),
                record.contract.to_string(),
                record.period.to_string(),
                record.status.to_string(),
                method.to_string(),
                amount(record.planned_amount_vnd),
                amount(record.actual_amount_vnd),
                amount(record.paid_amount),
                coefficient,
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
