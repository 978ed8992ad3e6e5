use crate::application::verification::{CalculationMethod, VerifyTerms};
use crate::application::workflow::{Settlement, WorkReport};
use crate::domain::document::{DocumentCategory, DocumentSource};
use crate::domain::payment::{ContractId, PartnerId, PaymentId, TalentId};
use crate::domain::period::PaymentPeriod;
use crate::error::{PaymentError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One raw CSV row. Every field beyond the operation and payment id is
/// optional; `TryFrom` enforces the per-operation requirements.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRow {
    pub op: String,
    pub payment: PaymentId,
    #[serde(default)]
    pub contract: Option<ContractId>,
    #[serde(default)]
    pub period_year: Option<i32>,
    #[serde(default)]
    pub period_month: Option<u32>,
    #[serde(default)]
    pub talent: Option<TalentId>,
    #[serde(default)]
    pub partner: Option<PartnerId>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub percentage: Option<Decimal>,
    #[serde(default)]
    pub fixed_amount: Option<Decimal>,
    #[serde(default)]
    pub standard_hours: Option<u32>,
    #[serde(default)]
    pub hours: Option<u32>,
    #[serde(default)]
    pub ot_hours: Option<u32>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A parsed workflow command.
#[derive(Debug, Clone)]
pub enum Command {
    Open {
        payment: PaymentId,
        contract: ContractId,
        period: PaymentPeriod,
        talent: TalentId,
        partner: PartnerId,
    },
    Verify {
        payment: PaymentId,
        terms: VerifyTerms,
    },
    Attach {
        payment: PaymentId,
        category: DocumentCategory,
        source: DocumentSource,
        uploaded_by: String,
        file: String,
    },
    CalculateAndSubmit {
        payment: PaymentId,
        report: WorkReport,
    },
    Approve {
        payment: PaymentId,
        notes: Option<String>,
    },
    Reject {
        payment: PaymentId,
        reason: String,
    },
    MarkAsPaid {
        payment: PaymentId,
        settlement: Settlement,
    },
    Cancel {
        payment: PaymentId,
        notes: Option<String>,
    },
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| PaymentError::validation(format!("column '{field}' is required")))
}

fn parse_method(raw: &str) -> Result<CalculationMethod> {
    match raw {
        "fixed" => Ok(CalculationMethod::Fixed),
        "percentage" => Ok(CalculationMethod::Percentage),
        other => Err(PaymentError::validation(format!(
            "unknown calculation method: {other}"
        ))),
    }
}

fn parse_source(raw: &str) -> Result<DocumentSource> {
    match raw {
        "accountant" => Ok(DocumentSource::Accountant),
        "partner" => Ok(DocumentSource::Partner),
        "staff" => Ok(DocumentSource::Staff),
        other => Err(PaymentError::validation(format!(
            "unknown document source: {other}"
        ))),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| PaymentError::validation(format!("invalid date: {raw}")))
}

impl TryFrom<CommandRow> for Command {
    type Error = PaymentError;

    fn try_from(row: CommandRow) -> Result<Self> {
        let payment = row.payment;
        match row.op.as_str() {
            "open" => Ok(Command::Open {
                payment,
                contract: require(row.contract, "contract")?,
                period: PaymentPeriod::new(
                    require(row.period_year, "period_year")?,
                    require(row.period_month, "period_month")?,
                )?,
                talent: require(row.talent, "talent")?,
                partner: require(row.partner, "partner")?,
            }),
            "verify" => {
                let method = row.method.as_deref().map(parse_method).transpose()?;
                Ok(Command::Verify {
                    payment,
                    terms: VerifyTerms {
                        unit_price: row.unit_price,
                        currency: row.currency,
                        exchange_rate: row.exchange_rate,
                        method,
                        percentage_value: row.percentage,
                        fixed_amount: row.fixed_amount,
                        standard_hours: row.standard_hours,
                        notes: row.notes,
                    },
                })
            }
            "attach" => Ok(Command::Attach {
                payment,
                category: DocumentCategory::from_code(&require(row.category, "category")?),
                source: parse_source(&require(row.source, "source")?)?,
                uploaded_by: row.uploaded_by.unwrap_or_else(|| "cli".to_string()),
                file: require(row.file, "file")?,
            }),
            "calculate" => Ok(Command::CalculateAndSubmit {
                payment,
                report: WorkReport {
                    actual_work_hours: require(row.hours, "hours")?,
                    ot_hours: row.ot_hours,
                    notes: row.notes,
                },
            }),
            "approve" => Ok(Command::Approve {
                payment,
                notes: row.notes,
            }),
            "reject" => Ok(Command::Reject {
                payment,
                reason: require(row.reason, "reason")?,
            }),
            "pay" => Ok(Command::MarkAsPaid {
                payment,
                settlement: Settlement {
                    paid_amount: require(row.amount, "amount")?,
                    payment_date: parse_date(&require(row.date, "date")?)?,
                    notes: row.notes,
                },
            }),
            "cancel" => Ok(Command::Cancel {
                payment,
                notes: row.notes,
            }),
            other => Err(PaymentError::validation(format!(
                "unknown operation: {other}"
            ))),
        }
    }
}

/// Streams workflow commands from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding one `Result<Command>` per row so a malformed row does not abort
/// the stream.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(PaymentError::from)
                .and_then(|row: CommandRow| Command::try_from(row))
        })
    }
}
