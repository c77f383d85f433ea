// src/services/session_store.rs
//! Per-caller verification session registry.
//!
//! Each caller gets an isolated [`VerificationSession`] behind a random id.
//! A transition *checks out* a copy of the session, runs (possibly awaiting
//! the record store or renderer) and *commits* the result back:
//!
//! - while a checkout is outstanding, further checkouts of the same session
//!   fail with [`SessionError::Busy`], so transitions never overlap
//! - a checkout dropped without being committed (e.g. the request was
//!   cancelled) releases the session unchanged
//! - [`SessionStore::reset`] is always accepted; it bumps the session epoch so
//!   the outstanding checkout's result is discarded when it is committed
//!
//! Sessions idle for longer than the configured TTL are purged lazily, whether
//! or not a transition is outstanding.

use crate::error::SessionError;
use crate::models::session::{SessionView, VerificationSession};
use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const SESSION_ID_LEN: usize = 32;

struct SessionEntry {
    session: VerificationSession,
    epoch: u64,
    in_flight: bool,
    touched: Instant,
}

/// A session copy handed out for the duration of one transition.
///
/// Holds the session busy until it is passed to [`SessionStore::commit`] or
/// dropped.
pub struct Checkout<'a> {
    store: &'a SessionStore,
    id: String,
    epoch: u64,
    committed: bool,
    /// Working copy the transition mutates.
    pub session: VerificationSession,
}

impl fmt::Debug for Checkout<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checkout")
            .field("id", &self.id)
            .field("epoch", &self.epoch)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut sessions = self.store.entries();
        if let Some(entry) = sessions.get_mut(&self.id) {
            // A reset already released the session; a newer checkout may own it now.
            if entry.epoch == self.epoch {
                debug!("Releasing abandoned transition without committing");
                entry.in_flight = false;
                entry.touched = Instant::now();
            }
        }
    }
}

/// In-memory registry of verification sessions.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let ttl = self.ttl;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.touched.elapsed() < ttl);
        let purged = before - sessions.len();
        if purged > 0 {
            debug!("Purged {} idle verification session(s)", purged);
        }
    }

    /// Starts a fresh session in `initial`.
    pub fn create(&self) -> (String, SessionView) {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        let session = VerificationSession::new();
        let view = session.view();

        let mut sessions = self.entries();
        self.purge_expired(&mut sessions);
        sessions.insert(
            id.clone(),
            SessionEntry {
                session,
                epoch: 0,
                in_flight: false,
                touched: Instant::now(),
            },
        );
        (id, view)
    }

    /// Current view of a session.
    pub fn view(&self, id: &str) -> Result<SessionView, SessionError> {
        let mut sessions = self.entries();
        self.purge_expired(&mut sessions);
        let entry = sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        entry.touched = Instant::now();
        Ok(entry.session.view())
    }

    /// Takes a working copy of a session for one transition.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] for unknown or expired ids
    /// - [`SessionError::Busy`] if another transition is in flight
    pub fn checkout(&self, id: &str) -> Result<Checkout<'_>, SessionError> {
        let mut sessions = self.entries();
        self.purge_expired(&mut sessions);
        let entry = sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        if entry.in_flight {
            return Err(SessionError::Busy);
        }

        entry.in_flight = true;
        entry.touched = Instant::now();
        Ok(Checkout {
            store: self,
            id: id.to_string(),
            epoch: entry.epoch,
            committed: false,
            session: entry.session.clone(),
        })
    }

    /// Stores the result of a transition and returns the resulting view.
    ///
    /// If the session was reset while the transition ran, the working copy
    /// is dropped and the view of the reset session is returned instead.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session expired while the transition ran.
    pub fn commit(&self, mut checkout: Checkout<'_>) -> Result<SessionView, SessionError> {
        checkout.committed = true;
        let mut sessions = self.entries();
        let entry = sessions.get_mut(&checkout.id).ok_or(SessionError::NotFound)?;
        entry.touched = Instant::now();

        if entry.epoch == checkout.epoch {
            entry.session = mem::take(&mut checkout.session);
            entry.in_flight = false;
        } else {
            debug!("Discarding stale transition result for a reset session");
        }
        Ok(entry.session.view())
    }

    /// Returns a session to `initial`, abandoning any in-flight transition.
    pub fn reset(&self, id: &str) -> Result<SessionView, SessionError> {
        let mut sessions = self.entries();
        self.purge_expired(&mut sessions);
        let entry = sessions.get_mut(id).ok_or(SessionError::NotFound)?;

        entry.session = VerificationSession::new();
        entry.epoch += 1;
        entry.in_flight = false;
        entry.touched = Instant::now();
        Ok(entry.session.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::VerificationStep;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[test]
    fn test_create_starts_initial() {
        let store = store();
        let (id, view) = store.create();
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert_eq!(view.step, VerificationStep::Initial);
        assert_eq!(store.view(&id).unwrap(), view);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = store();
        let (a, _) = store.create();
        let (b, _) = store.create();
        assert_ne!(a, b);

        let mut checkout = store.checkout(&a).unwrap();
        checkout.session.set_error("only for a");
        store.commit(checkout).unwrap();

        assert!(store.view(&a).unwrap().error_message.is_some());
        assert!(store.view(&b).unwrap().error_message.is_none());
    }

    #[test]
    fn test_overlapping_checkout_is_busy() {
        let store = store();
        let (id, _) = store.create();

        let checkout = store.checkout(&id).unwrap();
        assert_eq!(store.checkout(&id).unwrap_err(), SessionError::Busy);

        store.commit(checkout).unwrap();
        assert!(store.checkout(&id).is_ok());
    }

    #[test]
    fn test_dropped_checkout_releases_session() {
        let store = store();
        let (id, _) = store.create();

        let mut checkout = store.checkout(&id).unwrap();
        checkout.session.set_error("never committed");
        drop(checkout);

        assert_eq!(store.view(&id).unwrap().error_message, None);
        let checkout = store.checkout(&id).unwrap();
        store.commit(checkout).unwrap();
    }

    #[test]
    fn test_stale_drop_keeps_newer_checkout_busy() {
        let store = store();
        let (id, _) = store.create();

        let stale = store.checkout(&id).unwrap();
        store.reset(&id).unwrap();
        let current = store.checkout(&id).unwrap();

        drop(stale);
        assert_eq!(store.checkout(&id).unwrap_err(), SessionError::Busy);

        store.commit(current).unwrap();
        assert!(store.checkout(&id).is_ok());
    }

    #[test]
    fn test_reset_discards_in_flight_result() {
        let store = store();
        let (id, _) = store.create();

        let mut checkout = store.checkout(&id).unwrap();
        checkout.session.set_error("stale");
        store.reset(&id).unwrap();

        let view = store.commit(checkout).unwrap();
        assert_eq!(view.error_message, None);
        assert_eq!(store.view(&id).unwrap().error_message, None);
        assert!(store.checkout(&id).is_ok());
    }

    #[test]
    fn test_unknown_session() {
        let store = store();
        assert_eq!(store.view("missing").unwrap_err(), SessionError::NotFound);
        assert_eq!(store.checkout("missing").unwrap_err(), SessionError::NotFound);
        assert_eq!(store.reset("missing").unwrap_err(), SessionError::NotFound);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::new(Duration::ZERO);
        let (id, _) = store.create();
        assert_eq!(store.view(&id).unwrap_err(), SessionError::NotFound);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_in_flight_sessions_expire() {
        let store = SessionStore::new(Duration::from_millis(20));
        let (id, _) = store.create();
        let checkout = store.checkout(&id).unwrap();

        std::thread::sleep(Duration::from_millis(40));
        store.create();
        assert!(!store.entries().contains_key(&id));

        assert_eq!(store.commit(checkout).unwrap_err(), SessionError::NotFound);
    }
}
