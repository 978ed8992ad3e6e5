use crate::application::documents::{self, WorkflowOp};
use crate::application::verification::{self, VerifyTerms};
use crate::domain::billing;
use crate::domain::document::{DocumentCategory, DocumentSource, EvidenceDocument};
use crate::domain::payment::{
    ContractId, PartnerId, PaymentId, PaymentRecord, PaymentStatus, TalentId,
};
use crate::domain::period::PaymentPeriod;
use crate::domain::ports::{DocumentStoreBox, FileStoreBox, PaymentStoreBox};
use crate::domain::tier::TierSchedule;
use crate::error::{PaymentError, Result};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

/// Reported work for one period, driving the actual-amount calculation.
#[derive(Debug, Clone)]
pub struct WorkReport {
    pub actual_work_hours: u32,
    pub ot_hours: Option<u32>,
    pub notes: Option<String>,
}

/// Settlement details for the mark-as-paid transition.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub paid_amount: Decimal,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
}

/// Absolute tolerance allowed between paid and actual amount.
const PAID_TOLERANCE: Decimal = dec!(0.01);

/// The single entry point for partner contract payments.
///
/// Every operation loads the record, validates and computes on a working
/// copy, then commits through a compare-and-swap on the prior status, so a
/// failure of any step leaves the persisted record untouched and two racing
/// transitions cannot both succeed.
pub struct PaymentWorkflow {
    payments: PaymentStoreBox,
    documents: DocumentStoreBox,
    files: FileStoreBox,
    schedule: TierSchedule,
}

impl PaymentWorkflow {
    pub fn new(payments: PaymentStoreBox, documents: DocumentStoreBox, files: FileStoreBox) -> Self {
        Self::with_schedule(payments, documents, files, TierSchedule::default())
    }

    pub fn with_schedule(
        payments: PaymentStoreBox,
        documents: DocumentStoreBox,
        files: FileStoreBox,
        schedule: TierSchedule,
    ) -> Self {
        Self {
            payments,
            documents,
            files,
            schedule,
        }
    }

    async fn load(&self, id: PaymentId) -> Result<PaymentRecord> {
        self.payments
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("payment record {id}")))
    }

    /// Commits a transition via CAS; a lost race surfaces as a state error.
    async fn commit(&self, record: PaymentRecord, expected: PaymentStatus, op: WorkflowOp) -> Result<PaymentRecord> {
        let next = record.status;
        let id = record.id;
        if self.payments.update_if_status(record.clone(), expected).await? {
            info!(payment = id, from = %expected, to = %next, op = op.name(), "payment transition committed");
            Ok(record)
        } else {
            warn!(payment = id, op = op.name(), "concurrent modification detected");
            // The racing writer already moved the record on; report where it
            // actually is now, not the status this transition started from.
            let status = self
                .payments
                .get(id)
                .await?
                .map(|current| current.status)
                .unwrap_or(expected);
            Err(PaymentError::state(op.name(), status))
        }
    }

    fn guard_status(record: &PaymentRecord, op: WorkflowOp, allowed: &[PaymentStatus]) -> Result<()> {
        if allowed.contains(&record.status) {
            Ok(())
        } else {
            Err(PaymentError::state(op.name(), record.status))
        }
    }

    /// Opens a record for a newly opened contract payment period.
    pub async fn open(
        &self,
        id: PaymentId,
        contract: ContractId,
        period: PaymentPeriod,
        talent: TalentId,
        partner: PartnerId,
    ) -> Result<PaymentRecord> {
        let record = PaymentRecord::open(id, contract, period, talent, partner);
        self.payments.insert(record.clone()).await?;
        info!(payment = id, contract, %period, "payment record opened");
        Ok(record)
    }

    /// Establishes contractual pricing terms and the planned amount.
    pub async fn verify(&self, id: PaymentId, terms: VerifyTerms) -> Result<PaymentRecord> {
        let op = WorkflowOp::Verify;
        let mut record = self.load(id).await?;
        Self::guard_status(
            &record,
            op,
            &[PaymentStatus::PendingCalculation, PaymentStatus::Rejected],
        )?;

        let contract_terms = verification::validate(&terms)?;
        let prior = record.status;
        record.planned_amount_vnd = Some(billing::planned_amount(&contract_terms));
        record.terms = Some(contract_terms);
        if let Some(notes) = terms.notes {
            record.notes = Some(notes);
        }
        // Re-verification after a rejection starts a fresh calculation cycle.
        record.actual_amount_vnd = None;
        record.man_month_coefficient = None;
        record.effective_coefficient = None;
        record.tier_breakdown.clear();
        record.rejection_reason = None;
        record.status = PaymentStatus::Verified;
        self.commit(record, prior, op).await
    }

    /// Computes the binding actual amount from reported hours and submits the
    /// record for approval. Requires an acceptance document.
    pub async fn calculate_and_submit(&self, id: PaymentId, report: WorkReport) -> Result<PaymentRecord> {
        let op = WorkflowOp::CalculateAndSubmit;
        let mut record = self.load(id).await?;
        Self::guard_status(
            &record,
            op,
            &[PaymentStatus::Verified, PaymentStatus::PendingCalculation],
        )?;

        let terms = record.terms.clone().ok_or_else(|| {
            PaymentError::validation("contract terms have not been verified")
        })?;
        if report.actual_work_hours == 0 {
            return Err(PaymentError::validation("actual work hours must be positive"));
        }
        let attached = self.documents.for_record(id).await?;
        documents::ensure_required(op, &attached)?;

        let outcome = billing::actual_amount(&self.schedule, &terms, report.actual_work_hours);
        let prior = record.status;
        record.actual_work_hours = Some(report.actual_work_hours);
        record.ot_hours = report.ot_hours;
        record.actual_amount_vnd = Some(outcome.actual_amount_vnd);
        record.man_month_coefficient = outcome.man_month_coefficient;
        record.effective_coefficient = outcome.effective_coefficient;
        record.tier_breakdown = outcome.slices;
        if let Some(notes) = report.notes {
            record.notes = Some(notes);
        }
        record.status = PaymentStatus::PendingApproval;
        self.commit(record, prior, op).await
    }

    pub async fn approve(&self, id: PaymentId, notes: Option<String>) -> Result<PaymentRecord> {
        let op = WorkflowOp::Approve;
        let mut record = self.load(id).await?;
        Self::guard_status(&record, op, &[PaymentStatus::PendingApproval])?;

        let prior = record.status;
        if let Some(notes) = notes {
            record.notes = Some(notes);
        }
        record.status = PaymentStatus::Approved;
        self.commit(record, prior, op).await
    }

    /// Rejects a submitted calculation. Accountant-sourced evidence is purged
    /// after the transition commits, since it belongs to the rejected cycle.
    pub async fn reject(&self, id: PaymentId, reason: &str) -> Result<PaymentRecord> {
        let op = WorkflowOp::Reject;
        let mut record = self.load(id).await?;
        Self::guard_status(&record, op, &[PaymentStatus::PendingApproval])?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PaymentError::validation("rejection reason must not be empty"));
        }

        let prior = record.status;
        record.rejection_reason = Some(reason.to_string());
        record.status = PaymentStatus::Rejected;
        let record = self.commit(record, prior, op).await?;

        let purged = self
            .documents
            .remove_by_source(id, DocumentSource::Accountant)
            .await?;
        if purged > 0 {
            info!(payment = id, purged, "accountant evidence purged on rejection");
        }
        Ok(record)
    }

    /// Settles an approved payment. Requires invoice and receipt evidence, a
    /// payment date inside the period month, and a paid amount matching the
    /// actual amount within the tolerance.
    pub async fn mark_as_paid(&self, id: PaymentId, settlement: Settlement) -> Result<PaymentRecord> {
        let op = WorkflowOp::MarkAsPaid;
        let mut record = self.load(id).await?;
        Self::guard_status(&record, op, &[PaymentStatus::Approved])?;

        let actual = record
            .actual_amount_vnd
            .filter(|amount| *amount > Decimal::ZERO)
            .ok_or_else(|| {
                PaymentError::validation("actual amount has not been calculated")
            })?;
        if (settlement.paid_amount - actual).abs() > PAID_TOLERANCE {
            return Err(PaymentError::validation(format!(
                "paid amount {} does not match actual amount {}",
                settlement.paid_amount, actual
            )));
        }
        if !record.period.contains(settlement.payment_date) {
            return Err(PaymentError::validation(format!(
                "payment date {} is outside period {}",
                settlement.payment_date, record.period
            )));
        }
        let attached = self.documents.for_record(id).await?;
        documents::ensure_required(op, &attached)?;

        let prior = record.status;
        record.paid_amount = Some(settlement.paid_amount);
        record.payment_date = Some(settlement.payment_date);
        if let Some(notes) = settlement.notes {
            record.notes = Some(notes);
        }
        record.status = PaymentStatus::Paid;
        self.commit(record, prior, op).await
    }

    /// Terminal escape hatch from any non-terminal state.
    pub async fn cancel(&self, id: PaymentId, notes: Option<String>) -> Result<PaymentRecord> {
        let op = WorkflowOp::Cancel;
        let mut record = self.load(id).await?;
        if record.status.is_terminal() {
            return Err(PaymentError::state(op.name(), record.status));
        }

        let prior = record.status;
        if let Some(notes) = notes {
            record.notes = Some(notes);
        }
        record.status = PaymentStatus::Cancelled;
        self.commit(record, prior, op).await
    }

    /// Two-phase evidence attachment: the bytes are staged in the file store
    /// first; only a successful upload is recorded as metadata, and a failed
    /// metadata write discards the staged file.
    pub async fn attach_evidence(
        &self,
        id: PaymentId,
        category: DocumentCategory,
        source: DocumentSource,
        uploaded_by: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<EvidenceDocument> {
        let record = self.load(id).await?;
        if record.status.is_terminal() {
            return Err(PaymentError::state("attach_evidence", record.status));
        }

        let path = format!("payments/{id}/{file_name}");
        let url = self.files.upload(&path, bytes).await?;
        let mut doc = EvidenceDocument {
            id: 0,
            payment: id,
            category,
            file_url: url.clone(),
            source,
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: Utc::now(),
        };
        match self.documents.attach(doc.clone()).await {
            Ok(doc_id) => {
                doc.id = doc_id;
                info!(payment = id, doc = doc_id, category = %doc.category, "evidence attached");
                Ok(doc)
            }
            Err(err) => {
                // The staged file is garbage now; best-effort cleanup.
                if let Err(discard_err) = self.files.discard(&url).await {
                    warn!(payment = id, %url, %discard_err, "failed to discard staged file");
                }
                Err(err)
            }
        }
    }

    pub async fn evidence(&self, id: PaymentId) -> Result<Vec<EvidenceDocument>> {
        self.documents.for_record(id).await
    }

    /// Final state of all records, ordered by id.
    pub async fn records(&self) -> Result<Vec<PaymentRecord>> {
        let mut records = self.payments.all().await?;
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::verification::CalculationMethod;
    use crate::domain::ports::{FileStore, PaymentStore};
    use crate::infrastructure::in_memory::{
        InMemoryDocumentStore, InMemoryFileStore, InMemoryPaymentStore,
    };
    use async_trait::async_trait;

    fn workflow() -> PaymentWorkflow {
        PaymentWorkflow::new(
            Box::new(InMemoryPaymentStore::new()),
            Box::new(InMemoryDocumentStore::new()),
            Box::new(InMemoryFileStore::new()),
        )
    }

    fn percentage_terms() -> VerifyTerms {
        VerifyTerms {
            unit_price: Some(dec!(3000)),
            currency: Some("USD".to_string()),
            exchange_rate: Some(dec!(25000)),
            method: Some(CalculationMethod::Percentage),
            percentage_value: Some(dec!(100)),
            standard_hours: Some(160),
            ..Default::default()
        }
    }

    fn period() -> PaymentPeriod {
        PaymentPeriod::new(2026, 3).unwrap()
    }

    async fn open_and_verify(flow: &PaymentWorkflow) -> PaymentRecord {
        flow.open(1, 10, period(), 20, 30).await.unwrap();
        flow.verify(1, percentage_terms()).await.unwrap()
    }

    async fn attach(flow: &PaymentWorkflow, category: DocumentCategory, source: DocumentSource) {
        flow.attach_evidence(1, category, source, "tester", "evidence.pdf", b"bytes")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_verify_sets_terms_and_planned_amount() {
        let flow = workflow();
        let record = open_and_verify(&flow).await;
        assert_eq!(record.status, PaymentStatus::Verified);
        assert_eq!(record.planned_amount_vnd.unwrap().normalize(), dec!(75000000));
        assert!(record.terms.is_some());
    }

    #[tokio::test]
    async fn test_verify_twice_is_a_state_error() {
        let flow = workflow();
        open_and_verify(&flow).await;
        let err = flow.verify(1, percentage_terms()).await.unwrap_err();
        assert!(matches!(err, PaymentError::State { .. }));
    }

    #[tokio::test]
    async fn test_submit_requires_acceptance_document() {
        let flow = workflow();
        open_and_verify(&flow).await;
        let report = WorkReport {
            actual_work_hours: 220,
            ot_hours: None,
            notes: None,
        };
        let err = flow.calculate_and_submit(1, report.clone()).await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
        // Record untouched by the failed attempt.
        let record = flow.records().await.unwrap().remove(0);
        assert_eq!(record.status, PaymentStatus::Verified);
        assert!(record.actual_amount_vnd.is_none());

        attach(&flow, DocumentCategory::Acceptance, DocumentSource::Partner).await;
        let record = flow.calculate_and_submit(1, report).await.unwrap();
        assert_eq!(record.status, PaymentStatus::PendingApproval);
        assert_eq!(record.actual_amount_vnd.unwrap().normalize(), dec!(110156250));
        assert_eq!(record.effective_coefficient.unwrap().normalize(), dec!(1.46875));
    }

    #[tokio::test]
    async fn test_submit_rejects_zero_hours() {
        let flow = workflow();
        open_and_verify(&flow).await;
        attach(&flow, DocumentCategory::Acceptance, DocumentSource::Partner).await;
        let err = flow
            .calculate_and_submit(
                1,
                WorkReport {
                    actual_work_hours: 0,
                    ot_hours: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_approve_from_pending_calculation_is_state_error() {
        let flow = workflow();
        flow.open(1, 10, period(), 20, 30).await.unwrap();
        let err = flow.approve(1, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::State { .. }));
        let record = flow.records().await.unwrap().remove(0);
        assert_eq!(record.status, PaymentStatus::PendingCalculation);
        assert!(record.notes.is_none());
    }

    #[tokio::test]
    async fn test_reject_requires_reason_and_purges_accountant_documents() {
        let flow = workflow();
        open_and_verify(&flow).await;
        attach(&flow, DocumentCategory::Acceptance, DocumentSource::Partner).await;
        attach(&flow, DocumentCategory::Invoice, DocumentSource::Accountant).await;
        flow.calculate_and_submit(
            1,
            WorkReport {
                actual_work_hours: 160,
                ot_hours: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        let err = flow.reject(1, "  ").await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));

        let record = flow.reject(1, "hours do not match the timesheet").await.unwrap();
        assert_eq!(record.status, PaymentStatus::Rejected);
        assert_eq!(
            record.rejection_reason.as_deref(),
            Some("hours do not match the timesheet")
        );
        let remaining = flow.evidence(1).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].source, DocumentSource::Partner);
    }

    #[tokio::test]
    async fn test_rejected_record_can_be_reverified() {
        let flow = workflow();
        open_and_verify(&flow).await;
        attach(&flow, DocumentCategory::Acceptance, DocumentSource::Partner).await;
        flow.calculate_and_submit(
            1,
            WorkReport {
                actual_work_hours: 220,
                ot_hours: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        flow.reject(1, "recalculate").await.unwrap();

        let record = flow.verify(1, percentage_terms()).await.unwrap();
        assert_eq!(record.status, PaymentStatus::Verified);
        assert!(record.actual_amount_vnd.is_none());
        assert!(record.tier_breakdown.is_empty());
        assert!(record.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_paid_amount_tolerance_gate() {
        let flow = workflow();
        open_and_verify(&flow).await;
        attach(&flow, DocumentCategory::Acceptance, DocumentSource::Partner).await;
        flow.calculate_and_submit(
            1,
            WorkReport {
                actual_work_hours: 160,
                ot_hours: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        flow.approve(1, None).await.unwrap();
        attach(&flow, DocumentCategory::Invoice, DocumentSource::Accountant).await;
        attach(&flow, DocumentCategory::Receipt, DocumentSource::Accountant).await;

        let date = NaiveDate::from_ymd_opt(2026, 3, 25).unwrap();
        let err = flow
            .mark_as_paid(
                1,
                Settlement {
                    paid_amount: dec!(75000000.02),
                    payment_date: date,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
        let record = flow.records().await.unwrap().remove(0);
        assert_eq!(record.status, PaymentStatus::Approved);
        assert!(record.paid_amount.is_none());

        let record = flow
            .mark_as_paid(
                1,
                Settlement {
                    paid_amount: dec!(75000000.01),
                    payment_date: date,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(record.status, PaymentStatus::Paid);
        assert_eq!(record.paid_amount.unwrap(), dec!(75000000.01));
    }

    #[tokio::test]
    async fn test_payment_date_must_fall_in_period() {
        let flow = workflow();
        open_and_verify(&flow).await;
        attach(&flow, DocumentCategory::Acceptance, DocumentSource::Partner).await;
        flow.calculate_and_submit(
            1,
            WorkReport {
                actual_work_hours: 160,
                ot_hours: None,
                notes: None,
            },
        )
        .await
        .unwrap();
        flow.approve(1, None).await.unwrap();
        attach(&flow, DocumentCategory::Invoice, DocumentSource::Accountant).await;
        attach(&flow, DocumentCategory::Receipt, DocumentSource::Accountant).await;

        let err = flow
            .mark_as_paid(
                1,
                Settlement {
                    paid_amount: dec!(75000000),
                    payment_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancel_from_any_non_terminal_state() {
        let flow = workflow();
        flow.open(1, 10, period(), 20, 30).await.unwrap();
        let record = flow.cancel(1, Some("contract terminated".to_string())).await.unwrap();
        assert_eq!(record.status, PaymentStatus::Cancelled);

        let err = flow.cancel(1, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::State { .. }));
    }

    #[tokio::test]
    async fn test_attach_rejected_on_terminal_record() {
        let flow = workflow();
        flow.open(1, 10, period(), 20, 30).await.unwrap();
        flow.cancel(1, None).await.unwrap();
        let err = flow
            .attach_evidence(
                1,
                DocumentCategory::Acceptance,
                DocumentSource::Partner,
                "tester",
                "late.pdf",
                b"bytes",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::State { .. }));
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_attachment() {
        struct FailingFileStore;

        #[async_trait]
        impl FileStore for FailingFileStore {
            async fn upload(&self, _path: &str, _bytes: &[u8]) -> crate::error::Result<String> {
                Err(PaymentError::ExternalService("object storage down".to_string()))
            }

            async fn discard(&self, _url: &str) -> crate::error::Result<()> {
                Ok(())
            }
        }

        let flow = PaymentWorkflow::new(
            Box::new(InMemoryPaymentStore::new()),
            Box::new(InMemoryDocumentStore::new()),
            Box::new(FailingFileStore),
        );
        flow.open(1, 10, period(), 20, 30).await.unwrap();
        let err = flow
            .attach_evidence(
                1,
                DocumentCategory::Acceptance,
                DocumentSource::Partner,
                "tester",
                "evidence.pdf",
                b"bytes",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::ExternalService(_)));
        assert!(flow.evidence(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lost_race_reports_current_status() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // Looks PendingApproval on the first read, then reveals that a
        // racing approval already won: the CAS fails and later reads see
        // Approved.
        struct ContendedStore {
            reads: AtomicUsize,
        }

        #[async_trait]
        impl PaymentStore for ContendedStore {
            async fn insert(&self, _record: PaymentRecord) -> crate::error::Result<()> {
                Ok(())
            }

            async fn get(&self, id: PaymentId) -> crate::error::Result<Option<PaymentRecord>> {
                let mut record =
                    PaymentRecord::open(id, 10, PaymentPeriod::new(2026, 3).unwrap(), 20, 30);
                record.status = if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                    PaymentStatus::PendingApproval
                } else {
                    PaymentStatus::Approved
                };
                Ok(Some(record))
            }

            async fn update_if_status(
                &self,
                _record: PaymentRecord,
                _expected: PaymentStatus,
            ) -> crate::error::Result<bool> {
                Ok(false)
            }

            async fn all(&self) -> crate::error::Result<Vec<PaymentRecord>> {
                Ok(Vec::new())
            }
        }

        let flow = PaymentWorkflow::new(
            Box::new(ContendedStore {
                reads: AtomicUsize::new(0),
            }),
            Box::new(InMemoryDocumentStore::new()),
            Box::new(InMemoryFileStore::new()),
        );
        let err = flow.approve(1, None).await.unwrap_err();
        match err {
            PaymentError::State { status, .. } => assert_eq!(status, PaymentStatus::Approved),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fixed_method_actual_equals_planned() {
        let flow = workflow();
        flow.open(1, 10, period(), 20, 30).await.unwrap();
        let terms = VerifyTerms {
            method: Some(CalculationMethod::Fixed),
            percentage_value: None,
            fixed_amount: Some(dec!(3000)),
            ..percentage_terms()
        };
        flow.verify(1, terms).await.unwrap();
        attach(&flow, DocumentCategory::Acceptance, DocumentSource::Partner).await;
        let record = flow
            .calculate_and_submit(
                1,
                WorkReport {
                    actual_work_hours: 220,
                    ot_hours: Some(60),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(record.actual_amount_vnd, record.planned_amount_vnd);
        assert_eq!(record.man_month_coefficient.unwrap(), dec!(1.375));
        assert!(record.effective_coefficient.is_none());
    }

    #[tokio::test]
    async fn test_not_found() {
        let flow = workflow();
        let err = flow.approve(99, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound(_)));
    }
}
