use crate::domain::payment::PaymentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type DocumentId = u32;

/// Stable category code of an evidence document.
///
/// Matching is always by code; display labels live in the document catalog,
/// outside this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentCategory {
    Acceptance,
    Invoice,
    Receipt,
    Other(String),
}

impl DocumentCategory {
    pub fn code(&self) -> &str {
        match self {
            DocumentCategory::Acceptance => "ACCEPTANCE",
            DocumentCategory::Invoice => "INVOICE",
            DocumentCategory::Receipt => "RECEIPT",
            DocumentCategory::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "ACCEPTANCE" => DocumentCategory::Acceptance,
            "INVOICE" => DocumentCategory::Invoice,
            "RECEIPT" => DocumentCategory::Receipt,
            other => DocumentCategory::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Who produced an evidence document. Accountant uploads are purged when a
/// payment is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    Accountant,
    Partner,
    Staff,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::Accountant => "accountant",
            DocumentSource::Partner => "partner",
            DocumentSource::Staff => "staff",
        }
    }
}

/// A supporting file attached to a payment record.
///
/// The engine stores only the reference returned by the file store, never the
/// bytes themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDocument {
    /// Assigned by the document store on attach; zero until then.
    pub id: DocumentId,
    pub payment: PaymentId,
    pub category: DocumentCategory,
    pub file_url: String,
    pub source: DocumentSource,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}
