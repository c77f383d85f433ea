// src/services/verifier.rs
//! Certificate verification state machine.
//!
//! Drives a [`VerificationSession`] through
//! `initial → confirm → verified`, with `reset` available from any step:
//!
//! 1. [`Verifier::search`] looks up a registration number and, on a hit,
//!    exposes only a masked form of the holder's name
//! 2. [`Verifier::confirm_name`] checks the caller's claimed full name
//! 3. [`Verifier::download`] renders the certificate once confirmed
//!
//! Lookup and comparison failures are reported through the session's error
//! message and never end the session.

use crate::error::{messages, FlowError, RenderError};
use crate::models::session::{VerificationSession, VerificationStep};
use crate::render::{Artifact, ArtifactRenderer, PageSpec};
use crate::storage::record_store::RecordStore;
use crate::utils::masking::mask_name;
use log::{error, info, warn};
use std::sync::Arc;

/// Result of a registration number search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A record was found; the session moved to `confirm`.
    Found,
    /// No record matched; the session stayed in `initial`.
    NotFound,
}

/// Result of a full-name confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCheck {
    /// The name matched; the session moved to `verified`.
    Matched,
    /// The name did not match; the session stayed in `confirm`.
    Mismatched,
}

/// Runs verification transitions against a record store and renderer.
///
/// Holds no per-caller state, so one instance serves every session.
#[derive(Clone)]
pub struct Verifier {
    store: Arc<dyn RecordStore>,
    renderer: Arc<dyn ArtifactRenderer>,
    page: PageSpec,
}

impl Verifier {
    /// Constructs a new Verifier rendering on A4 landscape.
    ///
    /// # Arguments
    /// * `store` - Source of issued certificates
    /// * `renderer` - Produces the downloadable artifact
    pub fn new(store: Arc<dyn RecordStore>, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        Self {
            store,
            renderer,
            page: PageSpec::A4_LANDSCAPE,
        }
    }

    fn expect_step(
        session: &VerificationSession,
        step: VerificationStep,
        action: &'static str,
    ) -> Result<(), FlowError> {
        if session.step() == step {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                action,
                step: session.step(),
            })
        }
    }

    /// Looks up a certificate by registration number.
    ///
    /// Valid only from `initial`. The input is trimmed before the query.
    ///
    /// # Returns
    /// - `Ok(Found)` after moving to `confirm` with the masked name computed
    /// - `Ok(NotFound)` with the not-found message set
    ///
    /// # Errors
    /// - [`FlowError::Validation`] if the trimmed input is empty
    /// - [`FlowError::StoreUnavailable`] if the query fails
    /// - [`FlowError::InvalidTransition`] outside `initial`
    ///
    /// The first two also set the session's error message; the step is
    /// unchanged in every error case.
    pub async fn search(
        &self,
        session: &mut VerificationSession,
        registration_no: &str,
    ) -> Result<SearchOutcome, FlowError> {
        Self::expect_step(session, VerificationStep::Initial, "search")?;

        let registration_no = registration_no.trim();
        if registration_no.is_empty() {
            session.set_error(messages::EMPTY_REGISTRATION_NO);
            return Err(FlowError::Validation(messages::EMPTY_REGISTRATION_NO));
        }

        let mut matches = match self.store.find_by_registration_no(registration_no).await {
            Ok(matches) => matches,
            Err(e) => {
                error!("Certificate search for {} failed: {}", registration_no, e);
                session.set_error(messages::STORE_UNAVAILABLE);
                return Err(FlowError::StoreUnavailable(e));
            }
        };

        if matches.is_empty() {
            info!("No certificate found for {}", registration_no);
            session.set_error(messages::NOT_FOUND);
            return Ok(SearchOutcome::NotFound);
        }

        if matches.len() > 1 {
            warn!(
                "Registration number {} matches {} certificates; using the first",
                registration_no,
                matches.len()
            );
        }

        let record = matches.swap_remove(0);
        let masked = mask_name(&record.student_name);
        session.enter_confirm(record, masked);
        info!("Certificate {} found, awaiting name confirmation", registration_no);
        Ok(SearchOutcome::Found)
    }

    /// Checks the claimed full name against the found record.
    ///
    /// Valid only from `confirm`. The claim is trimmed and both sides are
    /// lower-cased; internal whitespace must match exactly.
    ///
    /// # Errors
    /// - [`FlowError::Validation`] if the trimmed claim is empty
    /// - [`FlowError::InvalidTransition`] outside `confirm`
    pub fn confirm_name(
        &self,
        session: &mut VerificationSession,
        claimed_full_name: &str,
    ) -> Result<NameCheck, FlowError> {
        Self::expect_step(session, VerificationStep::Confirm, "confirm")?;

        let claimed = claimed_full_name.trim();
        if claimed.is_empty() {
            session.set_error(messages::EMPTY_FULL_NAME);
            return Err(FlowError::Validation(messages::EMPTY_FULL_NAME));
        }

        let (registration_no, matched) = match session.found_record() {
            Some(record) => (
                record.registration_no.clone(),
                claimed.to_lowercase() == record.student_name.to_lowercase(),
            ),
            None => {
                return Err(FlowError::InvalidTransition {
                    action: "confirm",
                    step: session.step(),
                })
            }
        };

        if matched {
            session.enter_verified();
            info!("Certificate {} verified", registration_no);
            Ok(NameCheck::Matched)
        } else {
            session.set_error(messages::NAME_MISMATCH);
            info!("Name confirmation failed for {}", registration_no);
            Ok(NameCheck::Mismatched)
        }
    }

    /// Discards all session data and returns to `initial`. Idempotent.
    pub fn reset(&self, session: &mut VerificationSession) {
        session.clear();
    }

    /// Renders the verified certificate.
    ///
    /// Valid only from `verified`. Never changes the session, so a failed
    /// render can simply be retried.
    pub async fn download(&self, session: &VerificationSession) -> Result<Artifact, FlowError> {
        Self::expect_step(session, VerificationStep::Verified, "download")?;

        let record = session
            .found_record()
            .cloned()
            .ok_or(FlowError::InvalidTransition {
                action: "download",
                step: session.step(),
            })?;
        let registration_no = record.registration_no.clone();

        let renderer = Arc::clone(&self.renderer);
        let page = self.page;
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&record, page))
            .await
            .map_err(|e| RenderError::Aborted(e.to_string()))
            .and_then(|result| result);

        rendered.map_err(|e| {
            error!("Rendering certificate {} failed: {}", registration_no, e);
            FlowError::Render(e)
        })
    }
}
