// src/models/session.rs
//! Verification session state.
//!
//! A [`VerificationSession`] is an explicit value owned by one caller. It is
//! only mutated through the transitions in
//! [`Verifier`](crate::services::verifier::Verifier); everything a caller may
//! observe goes through [`SessionView`], which never exposes protected
//! certificate fields before the holder's name has been confirmed.

use crate::models::certificate::CertificateRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step of the three-step verification flow.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStep {
    /// Awaiting a registration number
    #[default]
    Initial,
    /// Record found, awaiting full-name confirmation
    Confirm,
    /// Terminal; disclosure and download permitted
    Verified,
}

impl fmt::Display for VerificationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationStep::Initial => "initial",
            VerificationStep::Confirm => "confirm",
            VerificationStep::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// Progress of a single verification attempt.
///
/// # Invariants
/// - `found_record` is `Some` exactly when `step` is `Confirm` or `Verified`
/// - `masked_name` is derived once, when the record is found
///
/// Deserialization re-checks the first invariant, so a stored snapshot can't
/// smuggle in an inconsistent state.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "RawSession")]
pub struct VerificationSession {
    step: VerificationStep,
    found_record: Option<CertificateRecord>,
    masked_name: String,
    error_message: Option<String>,
}

impl VerificationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> VerificationStep {
        self.step
    }

    pub fn found_record(&self) -> Option<&CertificateRecord> {
        self.found_record.as_ref()
    }

    pub fn masked_name(&self) -> &str {
        &self.masked_name
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Caller-observable projection of the session.
    pub fn view(&self) -> SessionView {
        let mut view = SessionView {
            step: self.step,
            registration_no: None,
            masked_name: None,
            certificate: None,
            error_message: self.error_message.clone(),
        };

        match (self.step, &self.found_record) {
            (VerificationStep::Confirm, Some(record)) => {
                view.registration_no = Some(record.registration_no.clone());
                view.masked_name = Some(self.masked_name.clone());
            }
            (VerificationStep::Verified, Some(record)) => {
                view.registration_no = Some(record.registration_no.clone());
                view.masked_name = Some(self.masked_name.clone());
                view.certificate = Some(record.clone());
            }
            _ => {}
        }

        view
    }

    pub(crate) fn enter_confirm(&mut self, record: CertificateRecord, masked_name: String) {
        self.step = VerificationStep::Confirm;
        self.found_record = Some(record);
        self.masked_name = masked_name;
        self.error_message = None;
    }

    pub(crate) fn enter_verified(&mut self) {
        self.step = VerificationStep::Verified;
        self.error_message = None;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}

/// What a caller is allowed to see of a session.
///
/// `initial` exposes only the step and any error; `confirm` adds the
/// registration number and masked name; `verified` adds the full certificate.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub step: VerificationStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateRecord>,
    pub error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    #[serde(default)]
    step: VerificationStep,
    #[serde(default)]
    found_record: Option<CertificateRecord>,
    #[serde(default)]
    masked_name: String,
    #[serde(default)]
    error_message: Option<String>,
}

impl TryFrom<RawSession> for VerificationSession {
    type Error = String;

    fn try_from(raw: RawSession) -> Result<Self, Self::Error> {
        let has_record = raw.found_record.is_some();
        let expects_record = raw.step != VerificationStep::Initial;
        if has_record != expects_record {
            return Err(format!(
                "session in step `{}` {} a found record",
                raw.step,
                if expects_record { "requires" } else { "must not carry" }
            ));
        }

        Ok(Self {
            step: raw.step,
            found_record: raw.found_record,
            masked_name: raw.masked_name,
            error_message: raw.error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn record() -> CertificateRecord {
        CertificateRecord {
            registration_no: "JTI-REG-001".into(),
            serial_no: "001".into(),
            student_name: "Rupesh Kumar".into(),
            guardian_name: "Suresh Kumar".into(),
            course_name: "Tally Prime".into(),
            duration: "3 Months".into(),
            grade: "A+".into(),
            place: "Godda".into(),
            issue_date: NaiveDate::from_ymd_opt(2023, 6, 15).unwrap(),
            created_at: Utc.with_ymd_and_hms(2023, 6, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_confirm_view_hides_protected_fields() {
        let mut session = VerificationSession::new();
        session.enter_confirm(record(), "R****h K****r".into());

        let view = session.view();
        assert_eq!(view.step, VerificationStep::Confirm);
        assert_eq!(view.masked_name.as_deref(), Some("R****h K****r"));
        assert!(view.certificate.is_none());

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("Rupesh"));
        assert!(!json.contains("Tally"));
        assert!(!json.contains("A+"));
    }

    #[test]
    fn test_verified_view_discloses_record() {
        let mut session = VerificationSession::new();
        session.enter_confirm(record(), "R****h K****r".into());
        session.enter_verified();

        let view = session.view();
        assert_eq!(view.certificate, Some(record()));
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_state() {
        let mut session = VerificationSession::new();
        session.enter_confirm(record(), "R****h K****r".into());
        session.set_error("The name does not match the record.");

        let json = serde_json::to_string(&session).unwrap();
        let restored: VerificationSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_inconsistent_snapshot_is_rejected() {
        let json = r#"{"step":"verified","foundRecord":null,"maskedName":"","errorMessage":null}"#;
        assert!(serde_json::from_str::<VerificationSession>(json).is_err());
    }

    #[test]
    fn test_clear_returns_to_initial() {
        let mut session = VerificationSession::new();
        session.enter_confirm(record(), "R****h K****r".into());
        session.clear();
        assert_eq!(session, VerificationSession::new());
        assert!(session.found_record().is_none());
    }
}
