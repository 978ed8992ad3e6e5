use crate::domain::document::{DocumentId, DocumentSource, EvidenceDocument};
use crate::domain::payment::{PaymentId, PaymentRecord, PaymentStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Storage port for payment records.
///
/// `update_if_status` is the serialization point of the workflow: the write
/// succeeds only when the persisted status still matches `expected`, so two
/// racing transitions cannot both commit.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a fresh record; fails validation if the id is already taken.
    async fn insert(&self, record: PaymentRecord) -> Result<()>;
    async fn get(&self, id: PaymentId) -> Result<Option<PaymentRecord>>;
    /// Compare-and-swap on the current status. Returns false when the
    /// persisted status no longer matches `expected`.
    async fn update_if_status(
        &self,
        record: PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool>;
    async fn all(&self) -> Result<Vec<PaymentRecord>>;
}

/// Storage port for evidence document metadata.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Attaches a document and returns its assigned id.
    async fn attach(&self, doc: EvidenceDocument) -> Result<DocumentId>;
    async fn for_record(&self, payment: PaymentId) -> Result<Vec<EvidenceDocument>>;
    /// Removes every document of `payment` produced by `source`; returns the
    /// number removed.
    async fn remove_by_source(&self, payment: PaymentId, source: DocumentSource)
    -> Result<usize>;
}

/// External object storage for evidence files. The engine only ever records
/// the returned reference.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stages the bytes and returns a durable reference.
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String>;
    /// Deletes a staged file whose metadata could not be committed.
    async fn discard(&self, url: &str) -> Result<()>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type DocumentStoreBox = Box<dyn DocumentStore>;
pub type FileStoreBox = Box<dyn FileStore>;
