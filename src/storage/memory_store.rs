// src/storage/memory_store.rs
//! In-memory certificate store.
//!
//! Backs local development (seeded from a JSON file) and tests. Supports
//! failure injection and artificial latency so the verification flow's
//! error and in-flight paths can be exercised without a real database.

use crate::error::StoreError;
use crate::models::certificate::CertificateRecord;
use crate::storage::record_store::RecordStore;
use crate::utils::serialization::read_json_file;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Certificates held in process memory.
///
/// Records are kept in insertion order and duplicates are allowed, mirroring
/// a document collection without a uniqueness constraint.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<CertificateRecord>>,
    unavailable: AtomicBool,
    latency_ms: AtomicUsize,
    queries: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<CertificateRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Loads a JSON array of certificate documents.
    ///
    /// Documents go through the same validation as those fetched over HTTP.
    ///
    /// # Errors
    /// Returns [`StoreError::Malformed`] if the file is unreadable or any
    /// document is invalid.
    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let records: Vec<CertificateRecord> = read_json_file(path).map_err(StoreError::Malformed)?;
        Ok(Self::with_records(records))
    }

    /// Adds a record. Does not check for an existing registration number.
    pub fn insert(&self, record: CertificateRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Number of records held.
    pub fn record_count(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Makes every subsequent query fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every subsequent query.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as usize, Ordering::SeqCst);
    }

    /// Number of queries served so far, including failed ones.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_registration_no(
        &self,
        registration_no: &str,
    ) -> Result<Vec<CertificateRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }

        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .iter()
            .filter(|record| record.registration_no == registration_no)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tokio_test::{assert_err, assert_ok};

    fn record(registration_no: &str, student_name: &str) -> CertificateRecord {
        CertificateRecord {
            registration_no: registration_no.into(),
            serial_no: "07".into(),
            student_name: student_name.into(),
            guardian_name: "Mahesh Singh".into(),
            course_name: "DTP".into(),
            duration: "6 Months".into(),
            grade: "A".into(),
            place: "Dumka".into(),
            issue_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2022, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_exact_match_only() {
        let store = MemoryRecordStore::with_records(vec![
            record("JTI-001", "Kavita Singh"),
            record("JTI-0011", "Someone Else"),
        ]);

        let found = assert_ok!(store.find_by_registration_no("JTI-001").await);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].student_name, "Kavita Singh");

        let found = assert_ok!(store.find_by_registration_no("jti-001").await);
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_are_all_returned() {
        let store = MemoryRecordStore::new();
        store.insert(record("JTI-DUP", "First Holder"));
        store.insert(record("JTI-DUP", "Second Holder"));

        let found = assert_ok!(store.find_by_registration_no("JTI-DUP").await);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].student_name, "First Holder");
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryRecordStore::with_records(vec![record("JTI-001", "Kavita Singh")]);
        store.set_unavailable(true);
        assert_err!(store.find_by_registration_no("JTI-001").await);

        store.set_unavailable(false);
        assert_ok!(store.find_by_registration_no("JTI-001").await);
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn test_missing_seed_file() {
        let err = MemoryRecordStore::from_seed_file(Path::new("/nonexistent/certs.json"))
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Malformed(_)));
    }
}
