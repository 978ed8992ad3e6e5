use crate::domain::document::{DocumentCategory, EvidenceDocument};
use crate::error::{PaymentError, Result};

/// The workflow operations that can require evidence before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOp {
    Verify,
    CalculateAndSubmit,
    Approve,
    Reject,
    MarkAsPaid,
    Cancel,
}

impl WorkflowOp {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowOp::Verify => "verify",
            WorkflowOp::CalculateAndSubmit => "calculate_and_submit",
            WorkflowOp::Approve => "approve",
            WorkflowOp::Reject => "reject",
            WorkflowOp::MarkAsPaid => "mark_as_paid",
            WorkflowOp::Cancel => "cancel",
        }
    }
}

const SUBMIT_REQUIRES: &[DocumentCategory] = &[DocumentCategory::Acceptance];
const PAID_REQUIRES: &[DocumentCategory] =
    &[DocumentCategory::Invoice, DocumentCategory::Receipt];

/// Evidence categories that must be attached before `op` may commit.
pub fn required_categories(op: WorkflowOp) -> &'static [DocumentCategory] {
    match op {
        WorkflowOp::CalculateAndSubmit => SUBMIT_REQUIRES,
        WorkflowOp::MarkAsPaid => PAID_REQUIRES,
        _ => &[],
    }
}

/// Blocks a transition when any required category has no attached document,
/// naming the missing category.
pub fn ensure_required(op: WorkflowOp, attached: &[EvidenceDocument]) -> Result<()> {
    for category in required_categories(op) {
        if !attached.iter().any(|doc| doc.category == *category) {
            return Err(PaymentError::validation(format!(
                "missing required evidence document: {}",
                category.code()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DocumentSource;
    use chrono::Utc;

    fn doc(category: DocumentCategory) -> EvidenceDocument {
        EvidenceDocument {
            id: 1,
            payment: 1,
            category,
            file_url: "mem://evidence".to_string(),
            source: DocumentSource::Staff,
            uploaded_by: "tester".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_submit_requires_acceptance() {
        assert!(ensure_required(WorkflowOp::CalculateAndSubmit, &[]).is_err());
        let attached = vec![doc(DocumentCategory::Acceptance)];
        assert!(ensure_required(WorkflowOp::CalculateAndSubmit, &attached).is_ok());
    }

    #[test]
    fn test_paid_requires_invoice_and_receipt() {
        let invoice_only = vec![doc(DocumentCategory::Invoice)];
        let err = ensure_required(WorkflowOp::MarkAsPaid, &invoice_only).unwrap_err();
        assert!(err.to_string().contains("RECEIPT"));

        let both = vec![doc(DocumentCategory::Invoice), doc(DocumentCategory::Receipt)];
        assert!(ensure_required(WorkflowOp::MarkAsPaid, &both).is_ok());
    }

    #[test]
    fn test_other_ops_require_nothing() {
        for op in [
            WorkflowOp::Verify,
            WorkflowOp::Approve,
            WorkflowOp::Reject,
            WorkflowOp::Cancel,
        ] {
            assert!(required_categories(op).is_empty());
            assert!(ensure_required(op, &[]).is_ok());
        }
    }

    #[test]
    fn test_other_category_does_not_satisfy() {
        let attached = vec![doc(DocumentCategory::Other("PAYMENT_PROOF".to_string()))];
        assert!(ensure_required(WorkflowOp::CalculateAndSubmit, &attached).is_err());
    }
}
