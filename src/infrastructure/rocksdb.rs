use crate::domain::document::{DocumentId, DocumentSource, EvidenceDocument};
use crate::domain::payment::{PaymentId, PaymentRecord, PaymentStatus};
use crate::domain::ports::{DocumentStore, PaymentStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column family for payment records.
pub const CF_PAYMENTS: &str = "payments";
/// Column family for evidence document metadata.
pub const CF_DOCUMENTS: &str = "documents";

/// A persistent store backed by RocksDB.
///
/// Payment records and document metadata live in separate column families
/// with big-endian integer keys and `serde_json` values. Writes that must be
/// atomic against a read (the status compare-and-swap and document id
/// assignment) are serialized by a store-level mutex, since RocksDB itself
/// only gives per-key atomicity.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at `path`, ensuring both column
    /// families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_documents = ColumnFamilyDescriptor::new(CF_DOCUMENTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_documents])
            .map_err(|e| PaymentError::Internal(format!("failed to open RocksDB: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::Internal(format!("column family '{name}' not found")))
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| PaymentError::Internal(format!("serialization error: {e}")))
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| PaymentError::Internal(format!("deserialization error: {e}")))
    }

    fn read_payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        let cf = self.cf(CF_PAYMENTS)?;
        let bytes = self
            .db
            .get_cf(cf, id.to_be_bytes())
            .map_err(|e| PaymentError::Internal(format!("RocksDB read error: {e}")))?;
        bytes.as_deref().map(Self::decode).transpose()
    }

    fn write_payment(&self, record: &PaymentRecord) -> Result<()> {
        let cf = self.cf(CF_PAYMENTS)?;
        self.db
            .put_cf(cf, record.id.to_be_bytes(), Self::encode(record)?)
            .map_err(|e| PaymentError::Internal(format!("RocksDB write error: {e}")))
    }

    fn scan_documents(&self) -> Result<Vec<EvidenceDocument>> {
        let cf = self.cf(CF_DOCUMENTS)?;
        let mut docs = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item
                .map_err(|e| PaymentError::Internal(format!("RocksDB iteration error: {e}")))?;
            docs.push(Self::decode(&value)?);
        }
        Ok(docs)
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.read_payment(record.id)?.is_some() {
            return Err(PaymentError::validation(format!(
                "payment record {} already exists",
                record.id
            )));
        }
        self.write_payment(&record)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<PaymentRecord>> {
        self.read_payment(id)
    }

    async fn update_if_status(
        &self,
        record: PaymentRecord,
        expected: PaymentStatus,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        match self.read_payment(record.id)? {
            Some(current) if current.status == expected => {
                self.write_payment(&record)?;
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
        let cf = self.cf(CF_PAYMENTS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item
                .map_err(|e| PaymentError::Internal(format!("RocksDB iteration error: {e}")))?;
            records.push(Self::decode(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl DocumentStore for RocksDbStore {
    async fn attach(&self, mut doc: EvidenceDocument) -> Result<DocumentId> {
        let _guard = self.write_lock.lock().await;
        let next_id = self
            .scan_documents()?
            .iter()
            .map(|d| d.id)
            .max()
            .unwrap_or(0)
            + 1;
        doc.id = next_id;
        let cf = self.cf(CF_DOCUMENTS)?;
        self.db
            .put_cf(cf, next_id.to_be_bytes(), Self::encode(&doc)?)
            .map_err(|e| PaymentError::Internal(format!("RocksDB write error: {e}")))?;
        Ok(next_id)
    }

    async fn for_record(&self, payment: PaymentId) -> Result<Vec<EvidenceDocument>> {
        let mut docs: Vec<EvidenceDocument> = self
            .scan_documents()?
            .into_iter()
            .filter(|doc| doc.payment == payment)
            .collect();
        docs.sort_by_key(|doc| doc.id);
        Ok(docs)
    }

    async fn remove_by_source(
        &self,
        payment: PaymentId,
        source: DocumentSource,
    ) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let targets: Vec<DocumentId> = self
            .scan_documents()?
            .into_iter()
            .filter(|doc| doc.payment == payment && doc.source == source)
            .map(|doc| doc.id)
            .collect();
        let cf = self.cf(CF_DOCUMENTS)?;
        for id in &targets {
            self.db
                .delete_cf(cf, id.to_be_bytes())
                .map_err(|e| PaymentError::Internal(format!("RocksDB delete error: {e}")))?;
        }
        Ok(targets.len())
    }
}
