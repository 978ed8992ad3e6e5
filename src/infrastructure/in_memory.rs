use crate::domain::document::{DocumentId, DocumentSource, EvidenceDocument};
use crate::domain::payment::{PaymentId, PaymentRecord, PaymentStatus};
use crate::domain::ports::{DocumentStore, FileStore, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment records.
///
/// The compare-and-swap check and the write happen under one write lock, so
/// concurrent transitions on the same record are serialized.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<RwLock<HashMap<PaymentId, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(PaymentError::validation(format!(
                "payment record {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn update_if_status(
        &self,
        record: PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get(&record.id) {
            Some(current) if current.status == expected => {
                records.insert(record.id, record);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PaymentError::NotFound(format!(
                "payment record {}",
                record.id
            ))),
        }
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}

/// In-memory evidence document metadata, keyed by assigned id.
#[derive(Default, Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<DocumentsInner>>,
}

#[derive(Default)]
struct DocumentsInner {
    docs: HashMap<DocumentId, EvidenceDocument>,
    next_id: DocumentId,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn attach(&self, mut doc: EvidenceDocument) -> Result<DocumentId> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        doc.id = id;
        inner.docs.insert(id, doc);
        Ok(id)
    }

    async fn for_record(&self, payment: PaymentId) -> Result<Vec<EvidenceDocument>> {
        let inner = self.inner.read().await;
        let mut docs: Vec<EvidenceDocument> = inner
            .docs
            .values()
            .filter(|doc| doc.payment == payment)
            .cloned()
            .collect();
        docs.sort_by_key(|doc| doc.id);
        Ok(docs)
    }

    async fn remove_by_source(
        &self,
        payment: PaymentId,
        source: DocumentSource,
    ) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.docs.len();
        inner
            .docs
            .retain(|_, doc| !(doc.payment == payment && doc.source == source));
        Ok(before - inner.docs.len())
    }
}

/// In-memory object storage standing in for the external document store.
#[derive(Default, Clone)]
pub struct InMemoryFileStore {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.files.read().await.contains_key(url)
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String> {
        let url = format!("mem://{path}");
        let mut files = self.files.write().await;
        files.insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    async fn discard(&self, url: &str) -> Result<()> {
        let mut files = self.files.write().await;
        files.remove(url);
        Ok(())
    }
}
