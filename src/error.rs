// src/error.rs
//! Error types for the verification flow and its collaborators.
//!
//! A not-found search and a mismatched name are *outcomes*, not errors; see
//! [`SearchOutcome`](crate::services::verifier::SearchOutcome) and
//! [`NameCheck`](crate::services::verifier::NameCheck).

use crate::models::session::VerificationStep;
use thiserror::Error;

/// User-facing messages shown inline by the website.
pub mod messages {
    pub const EMPTY_REGISTRATION_NO: &str = "Please enter a registration number.";
    pub const EMPTY_FULL_NAME: &str = "Please enter the full name.";
    pub const NOT_FOUND: &str = "No certificate found with this registration number.";
    pub const NAME_MISMATCH: &str = "The name does not match the record.";
    pub const STORE_UNAVAILABLE: &str =
        "An error occurred while searching. Please try again later.";
    pub const RENDER_FAILED: &str = "Failed to generate PDF. Please try again.";
}

/// Failures at the record store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("record store unreachable: {0}")]
    Unavailable(String),

    /// The query did not complete in time.
    #[error("record store query timed out")]
    Timeout,

    /// The store answered with a non-success status.
    #[error("record store returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// A stored document does not have the certificate shape.
    #[error("malformed certificate document: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if let Some(status) = err.status() {
            StoreError::Status {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            StoreError::Malformed(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

/// Failures while producing the certificate artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A field that must appear on the page is blank.
    #[error("certificate template field `{0}` is empty")]
    MissingField(&'static str),

    /// A field holds a character the page fonts cannot draw.
    #[error("certificate template field `{field}` contains unsupported character {character:?}")]
    UnsupportedCharacter {
        field: &'static str,
        character: char,
    },

    /// The PDF backend failed.
    #[error("PDF backend failed: {0}")]
    Backend(String),

    /// The blocking render task panicked or was cancelled.
    #[error("render task aborted: {0}")]
    Aborted(String),
}

/// Errors returned by verification flow transitions.
///
/// All of them are recoverable; none require restarting the session.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Empty or malformed input; no state change.
    #[error("invalid input: {0}")]
    Validation(&'static str),

    /// The record store query failed.
    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The artifact renderer failed; the session is unchanged.
    #[error("certificate rendering failed: {0}")]
    Render(#[from] RenderError),

    /// The transition is not valid from the current step.
    #[error("`{action}` is not allowed in the `{step}` step")]
    InvalidTransition {
        /// Attempted transition.
        action: &'static str,
        /// Step the session was in.
        step: VerificationStep,
    },
}

impl FlowError {
    /// Message suitable for showing to the person verifying.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Validation(message) => (*message).to_string(),
            FlowError::StoreUnavailable(_) => messages::STORE_UNAVAILABLE.to_string(),
            FlowError::Render(_) => messages::RENDER_FAILED.to_string(),
            FlowError::InvalidTransition { .. } => self.to_string(),
        }
    }
}

/// Errors from the per-caller session registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("verification session not found")]
    NotFound,

    /// A transition on this session is still in flight.
    #[error("another request for this session is still in progress")]
    Busy,
}
