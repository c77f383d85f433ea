// src/storage/record_store.rs
//! Record store abstraction for issued certificates.

use crate::error::StoreError;
use crate::models::certificate::CertificateRecord;
use async_trait::async_trait;

/// Name of the collection holding issued certificates.
pub const CERTIFICATES_COLLECTION: &str = "certificates";

/// Read access to the `certificates` collection.
///
/// Implementations return every document whose `registrationNo` equals the
/// given value exactly. Uniqueness is expected but not enforced by the store,
/// so deciding what to do with several matches is left to the caller.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_registration_no(
        &self,
        registration_no: &str,
    ) -> Result<Vec<CertificateRecord>, StoreError>;
}
