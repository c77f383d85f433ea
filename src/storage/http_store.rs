// src/storage/http_store.rs
//! HTTP client for the hosted document database.
//!
//! Queries the `certificates` collection over the database's REST interface:
//!
//! ```text
//! GET {base_url}/collections/{collection}/documents?registrationNo=<value>
//! Authorization: Bearer <api_key>        (when configured)
//! ```
//!
//! The response body is either a bare JSON array of documents or an object
//! wrapping them as `{ "documents": [...] }`. Every document is decoded into a
//! [`CertificateRecord`]; one malformed document fails the whole query.
//!
//! # Features
//! - Connection pooling via a shared `reqwest::Client`
//! - Per-request timeout taken from configuration
//! - Transport, status and decode failures mapped onto [`StoreError`]

use crate::config::StoreSettings;
use crate::error::StoreError;
use crate::models::certificate::CertificateRecord;
use crate::storage::record_store::RecordStore;
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Document database client scoped to one collection.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

impl HttpRecordStore {
    /// Creates a client for the configured database endpoint.
    ///
    /// # Arguments
    /// * `base_url` - Root URL of the database REST interface
    /// * `settings` - Collection name, credentials and timeout
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the HTTP client can't be built.
    pub fn new(base_url: &str, settings: &StoreSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/collections/{}/documents",
            self.base_url, self.collection
        )
    }
}

/// Accepted response bodies for a filtered query.
#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResponse {
    Documents(Vec<Value>),
    Wrapped { documents: Vec<Value> },
}

impl QueryResponse {
    fn into_documents(self) -> Vec<Value> {
        match self {
            QueryResponse::Documents(documents) => documents,
            QueryResponse::Wrapped { documents } => documents,
        }
    }
}

fn decode_record(registration_no: &str, document: Value) -> Result<CertificateRecord, StoreError> {
    serde_json::from_value(document).map_err(|e| {
        warn!(
            "Certificate document for {} failed validation: {}",
            registration_no, e
        );
        StoreError::Malformed(e.to_string())
    })
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn find_by_registration_no(
        &self,
        registration_no: &str,
    ) -> Result<Vec<CertificateRecord>, StoreError> {
        let mut request = self
            .client
            .get(self.documents_url())
            .query(&[("registrationNo", registration_no)]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: QueryResponse = response.json().await?;
        let documents = body.into_documents();
        debug!(
            "Document query for {} returned {} document(s)",
            registration_no,
            documents.len()
        );

        documents
            .into_iter()
            .map(|document| decode_record(registration_no, document))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{mock, Matcher};
    use serde_json::json;

    const DOCUMENTS_PATH: &str = "/collections/certificates/documents";

    fn settings(api_key: Option<&str>) -> StoreSettings {
        StoreSettings {
            base_url: None,
            api_key: api_key.map(str::to_string),
            collection: "certificates".into(),
            timeout_secs: 5,
            seed_file: None,
        }
    }

    fn store(api_key: Option<&str>) -> HttpRecordStore {
        HttpRecordStore::new(&mockito::server_url(), &settings(api_key)).unwrap()
    }

    fn document(registration_no: &str) -> Value {
        json!({
            "registrationNo": registration_no,
            "serialNo": "112",
            "studentName": "Anjali Devi",
            "guardianName": "Ramesh Prasad",
            "courseName": "Advanced Excel",
            "duration": "3 Months",
            "grade": "B",
            "place": "Deoghar",
            "issueDate": "2024-01-20",
            "createdAt": { "_seconds": 1_705_700_000, "_nanoseconds": 0 }
        })
    }

    #[tokio::test]
    async fn test_query_returns_array_body() {
        let _m = mock("GET", DOCUMENTS_PATH)
            .match_query(Matcher::UrlEncoded(
                "registrationNo".into(),
                "JTI-HTTP-001".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([document("JTI-HTTP-001")]).to_string())
            .create();

        let records = store(None)
            .find_by_registration_no("JTI-HTTP-001")
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].student_name, "Anjali Devi");
    }

    #[tokio::test]
    async fn test_query_accepts_wrapped_body_and_sends_key() {
        let _m = mock("GET", DOCUMENTS_PATH)
            .match_query(Matcher::UrlEncoded(
                "registrationNo".into(),
                "JTI-HTTP-002".into(),
            ))
            .match_header("authorization", "Bearer secret-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "documents": [document("JTI-HTTP-002")] }).to_string())
            .create();

        let records = store(Some("secret-key"))
            .find_by_registration_no("JTI-HTTP-002")
            .await
            .unwrap();
        assert_eq!(records[0].registration_no, "JTI-HTTP-002");
    }

    #[tokio::test]
    async fn test_empty_result() {
        let _m = mock("GET", DOCUMENTS_PATH)
            .match_query(Matcher::UrlEncoded(
                "registrationNo".into(),
                "JTI-HTTP-003".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create();

        let records = store(None)
            .find_by_registration_no("JTI-HTTP-003")
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let _m = mock("GET", DOCUMENTS_PATH)
            .match_query(Matcher::UrlEncoded(
                "registrationNo".into(),
                "JTI-HTTP-004".into(),
            ))
            .with_status(503)
            .create();

        let err = store(None)
            .find_by_registration_no("JTI-HTTP-004")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_malformed_document_is_rejected() {
        let mut broken = document("JTI-HTTP-005");
        broken.as_object_mut().unwrap().remove("studentName");
        let _m = mock("GET", DOCUMENTS_PATH)
            .match_query(Matcher::UrlEncoded(
                "registrationNo".into(),
                "JTI-HTTP-005".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([broken]).to_string())
            .create();

        let err = store(None)
            .find_by_registration_no("JTI-HTTP-005")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = HttpRecordStore::new("http://127.0.0.1:9", &settings(None)).unwrap();
        let err = store.find_by_registration_no("JTI-HTTP-006").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unavailable(_) | StoreError::Timeout
        ));
    }
}
