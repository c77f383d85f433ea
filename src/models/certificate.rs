// src/models/certificate.rs
//! Issued certificate data model.
//!
//! Defines the fixed shape of a certificate document as stored in the hosted
//! `certificates` collection. Field names on the wire are camelCase and must
//! match the existing stored data exactly.
//!
//! Documents are validated when they cross the record store boundary: a
//! missing field or an unparseable date fails deserialization instead of
//! flowing half-populated into the verification or rendering path.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// A certificate issued by the institute.
///
/// # Fields
/// - `registration_no`: unique public identifier, the sole search key
/// - `serial_no`: display-only sequence label printed on the certificate
/// - `student_name`: the protected secret used for identity confirmation
/// - remaining subject fields are disclosed only after confirmation
///
/// # Lifecycle
/// Created by the issuance back-office. Read-only from this service's point
/// of view; never mutated or deleted here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    /// Unique registration number, e.g. "JTI-GOD-PRO-046-2023"
    pub registration_no: String,

    /// Sequence label printed in the certificate corner
    pub serial_no: String,

    /// Full name of the certificate holder
    pub student_name: String,

    /// Parent or guardian name printed beneath the holder's name
    pub guardian_name: String,

    pub course_name: String,

    /// Free-form duration label, e.g. "6 Months"
    pub duration: String,

    pub grade: String,

    /// Place of issue
    pub place: String,

    #[serde(deserialize_with = "deserialize_issue_date")]
    pub issue_date: NaiveDate,

    /// Server-assigned creation timestamp
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
}

impl CertificateRecord {
    /// File name under which the rendered certificate is saved.
    pub fn artifact_filename(&self) -> String {
        format!(
            "Certificate-{}-{}.pdf",
            self.student_name, self.registration_no
        )
    }
}

/// Timestamp shapes accepted from the document database.
///
/// Dates written by the admin client arrive as RFC 3339 strings, while
/// server-assigned timestamps arrive as `{ seconds, nanoseconds }` objects
/// (or their underscore-prefixed REST variants).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Seconds {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(alias = "_nanoseconds", default)]
        nanoseconds: u32,
    },
}

impl RawTimestamp {
    fn into_datetime<E: de::Error>(self) -> Result<DateTime<Utc>, E> {
        match self {
            RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| E::custom(format!("invalid timestamp `{}`: {}", text, e))),
            RawTimestamp::Seconds {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(seconds, nanoseconds)
                .ok_or_else(|| E::custom(format!("timestamp out of range: {}s", seconds))),
        }
    }
}

fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deserializer)?.into_datetime()
}

/// Accepts `YYYY-MM-DD`, or any full timestamp whose date part is kept.
///
/// A text timestamp keeps the date as written in its own offset.
fn deserialize_issue_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
            Ok(date) => Ok(date),
            Err(_) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.date_naive())
                .map_err(|e| de::Error::custom(format!("invalid date `{}`: {}", text, e))),
        },
        seconds => seconds.into_datetime::<D::Error>().map(|dt| dt.date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "registrationNo": "JTI-GOD-PRO-046-2023",
            "serialNo": "046",
            "studentName": "Rupesh Kumar",
            "guardianName": "Suresh Kumar",
            "courseName": "Diploma in Computer Application",
            "duration": "12 Months",
            "grade": "A",
            "place": "Godda",
            "issueDate": "2023-06-15",
            "createdAt": "2023-06-15T10:30:00Z",
            "id": "doc-1"
        })
    }

    #[test]
    fn test_decodes_camel_case_document() {
        let record: CertificateRecord = serde_json::from_value(document()).unwrap();
        assert_eq!(record.registration_no, "JTI-GOD-PRO-046-2023");
        assert_eq!(record.student_name, "Rupesh Kumar");
        assert_eq!(record.issue_date, NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut doc = document();
        doc.as_object_mut().unwrap().remove("grade");
        let err = serde_json::from_value::<CertificateRecord>(doc).unwrap_err();
        assert!(err.to_string().contains("grade"));
    }

    #[test]
    fn test_accepts_database_timestamp_objects() {
        let mut doc = document();
        doc["createdAt"] = json!({ "_seconds": 1_686_825_000, "_nanoseconds": 0 });
        doc["issueDate"] = json!({ "seconds": 1_686_825_000 });
        let record: CertificateRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.created_at.timestamp(), 1_686_825_000);
        assert_eq!(record.issue_date, NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
    }

    #[test]
    fn test_issue_date_from_full_timestamp() {
        let mut doc = document();
        doc["issueDate"] = json!("2023-06-15T18:00:00+00:00");
        let record: CertificateRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.issue_date, NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
    }

    #[test]
    fn test_issue_date_keeps_local_date_of_offset() {
        let mut doc = document();
        doc["issueDate"] = json!("2023-06-15T00:00:00+05:30");
        let record: CertificateRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.issue_date, NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
    }

    #[test]
    fn test_garbage_date_is_rejected() {
        let mut doc = document();
        doc["issueDate"] = json!("15th June");
        assert!(serde_json::from_value::<CertificateRecord>(doc).is_err());
    }

    #[test]
    fn test_artifact_filename() {
        let record: CertificateRecord = serde_json::from_value(document()).unwrap();
        assert_eq!(
            record.artifact_filename(),
            "Certificate-Rupesh Kumar-JTI-GOD-PRO-046-2023.pdf"
        );
    }
}
