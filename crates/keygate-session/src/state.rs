//! The session state: the single writer for identity and credential.
//!
//! Everything that changes who is logged in goes through
//! [`SessionState`]. It keeps two copies of the session in step:
//!
//! - an in-memory [`Session`] snapshot, observable through a
//!   `tokio::sync::watch` channel
//! - the persisted slots in a [`SessionStore`], which survive restarts
//!
//! # Concurrency note
//!
//! All methods take `&self` so one `Arc<SessionState>` can be shared by
//! the guard, the API clients and the application root. The snapshot is
//! replaced as a whole, so an observer never sees a user without a
//! credential (or the reverse) from `commit_login`, `logout` or recovery.
//! Racing logins are not guarded against; the application drives one
//! login/logout sequence at a time.

use std::fmt;
use std::sync::Arc;

use keygate_protocol::{
    AuthResponse, Codec, Credential, IdentityPayload, JsonCodec, ProtocolError, User,
};
use keygate_store::{SessionStore, Slot, StoreError};
use tokio::sync::watch;

use crate::SessionError;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// The logged-in user, if any.
    pub user: Option<User>,
    /// The bearer credential, if any.
    pub credential: Option<Credential>,
}

impl Session {
    /// An authenticated session for `user` holding `credential`.
    pub fn authenticated(user: User, credential: Credential) -> Self {
        Self {
            user: Some(user),
            credential: Some(credential),
        }
    }

    /// `true` iff both the user and the credential are present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.credential.is_some()
    }

    /// The state-machine state this snapshot is in.
    pub fn status(&self) -> SessionStatus {
        if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The session state machine. There is no "authenticating" state:
///
/// ```text
///   Unauthenticated ──(commit_login / recovery)──→ Authenticated
///         ↑                                             │
///         └──────(logout / corrupt recovery)────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::Authenticated => write!(f, "Authenticated"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecoveryOutcome
// ---------------------------------------------------------------------------

/// What [`SessionState::recover_from_persistence`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Credential and user were both persisted and valid; session applied.
    Restored,
    /// At least one of credential or user was absent; nothing changed.
    NothingPersisted,
    /// The persisted user could not be parsed; the session was logged out.
    Corrupt,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Process-wide session state, backed by a persisted store.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ recover_from_persistence() ──→ [Authenticated | Unauthenticated]
///                                                   │
///            commit_login() ───────────────────────→ Authenticated
///            logout() ─────────────────────────────→ Unauthenticated
/// ```
pub struct SessionState<C: Codec = JsonCodec> {
    store: Arc<dyn SessionStore>,
    codec: C,
    session: watch::Sender<Session>,
}

impl SessionState {
    /// Creates an unauthenticated session over `store`, encoding
    /// persisted users as JSON.
    ///
    /// Nothing is read from the store until
    /// [`recover_from_persistence`](Self::recover_from_persistence).
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_codec(store, JsonCodec)
    }
}

impl<C: Codec> SessionState<C> {
    /// Creates an unauthenticated session using a specific codec for the
    /// serialized-user slot.
    pub fn with_codec(store: Arc<dyn SessionStore>, codec: C) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            store,
            codec,
            session,
        }
    }

    // -- Reads -------------------------------------------------------------

    /// Returns a clone of the current snapshot.
    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Returns the current user.
    pub fn user(&self) -> Option<User> {
        self.session.borrow().user.clone()
    }

    /// Returns the current in-memory credential.
    pub fn credential(&self) -> Option<Credential> {
        self.session.borrow().credential.clone()
    }

    /// `true` iff both user and credential are present in memory.
    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    /// The current state-machine state.
    pub fn status(&self) -> SessionStatus {
        self.session.borrow().status()
    }

    /// Subscribes to session changes.
    ///
    /// The receiver starts at the current snapshot and is notified each
    /// time the session actually changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// The store this session persists to.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    // -- Writes ------------------------------------------------------------

    /// Replaces the in-memory user. Does not touch persistence.
    pub fn set_user(&self, user: Option<User>) {
        self.session.send_if_modified(|session| {
            if session.user == user {
                return false;
            }
            session.user = user;
            true
        });
    }

    /// Replaces the in-memory credential and syncs the credential slot:
    /// written when `Some`, removed when `None`. An empty credential counts
    /// as `None`.
    ///
    /// The slot is written first; if that fails memory is left unchanged.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] if the slot cannot be written.
    pub fn set_credential(&self, credential: Option<Credential>) -> Result<(), SessionError> {
        let credential = credential.filter(|token| !token.as_str().is_empty());
        self.write_credential_slot(credential.as_ref())?;
        self.session.send_if_modified(|session| {
            if session.credential == credential {
                return false;
            }
            session.credential = credential;
            true
        });
        Ok(())
    }

    /// Validates a login result and, if complete, commits it.
    ///
    /// # Errors
    /// - [`SessionError::MalformedAuthResponse`] if the user or the
    ///   credential is missing; nothing is mutated
    /// - anything [`commit_identity`](Self::commit_identity) returns
    pub fn commit_login(&self, response: AuthResponse) -> Result<(), SessionError> {
        let identity = response.into_identity().map_err(|e| match e {
            ProtocolError::MalformedResponse(reason) => {
                tracing::warn!(%reason, "refusing to commit incomplete login");
                SessionError::MalformedAuthResponse(reason)
            }
            other => SessionError::Protocol(other),
        })?;
        self.commit_identity(identity)
    }

    /// Commits a validated identity: persists every slot, then swaps the
    /// in-memory snapshot to authenticated in one step.
    ///
    /// If any slot write fails every slot is cleared and memory is reset to
    /// signed out, whoever was signed in before.
    ///
    /// # Errors
    /// - [`SessionError::MalformedAuthResponse`] if the credential is empty;
    ///   nothing is mutated
    /// - [`SessionError::Protocol`] if the user cannot be encoded
    /// - [`SessionError::Store`] if a slot cannot be written
    pub fn commit_identity(&self, identity: IdentityPayload) -> Result<(), SessionError> {
        let IdentityPayload { user, credential } = identity;
        if credential.as_str().is_empty() {
            return Err(SessionError::MalformedAuthResponse(
                "missing access_token".to_owned(),
            ));
        }
        let serialized = self.codec.encode(&user)?;

        let written = self
            .write_credential_slot(Some(&credential))
            .map_err(|e| (Slot::Credential, e))
            .and_then(|()| {
                [
                    (Slot::SerializedUser, serialized.as_str()),
                    (Slot::UserId, user.id.as_str()),
                    (Slot::UserEmail, user.email.as_str()),
                ]
                .into_iter()
                .try_for_each(|(slot, value)| {
                    self.store.set_slot(slot, value).map_err(|e| (slot, e))
                })
            });
        if let Err((slot, e)) = written {
            tracing::warn!(%slot, error = %e, "slot write failed, rolling back login");
            self.clear_slots();
            let previous = self.session.send_replace(Session::default());
            if let Some(dropped) = &previous.user {
                tracing::warn!(user_id = %dropped.id, "previous session dropped by failed login");
            }
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "session committed");
        self.session
            .send_replace(Session::authenticated(user, credential));
        Ok(())
    }

    /// Clears the session in memory and every persisted slot.
    ///
    /// Safe to call when nobody is logged in.
    ///
    /// # Errors
    /// Returns the first [`SessionError::Store`] hit while removing slots;
    /// the remaining slots are still attempted and memory is cleared
    /// regardless.
    pub fn logout(&self) -> Result<(), SessionError> {
        let previous = self.session.send_replace(Session::default());
        if let Some(user) = &previous.user {
            tracing::info!(user_id = %user.id, "session logged out");
        }
        match self.clear_slots() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Rebuilds the in-memory session from the persisted slots.
    ///
    /// Called once at boot and before every guarded navigation, so it is
    /// cheap when nothing changed: subscribers are only notified if the
    /// snapshot differs.
    ///
    /// # Errors
    /// Returns [`SessionError::Store`] only if a corrupt session could not
    /// be cleared.
    pub fn recover_from_persistence(&self) -> Result<RecoveryOutcome, SessionError> {
        let (Some(token), Some(raw_user)) = (
            self.store
                .get_slot(Slot::Credential)
                .filter(|token| !token.is_empty()),
            self.store.get_slot(Slot::SerializedUser),
        ) else {
            return Ok(RecoveryOutcome::NothingPersisted);
        };

        let user: User = match self.codec.decode(&raw_user) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "persisted user is corrupt, clearing session");
                self.logout()?;
                return Ok(RecoveryOutcome::Corrupt);
            }
        };

        let restored = Session::authenticated(user, Credential::new(token));
        let changed = self.session.send_if_modified(|session| {
            if *session == restored {
                return false;
            }
            *session = restored;
            true
        });
        if changed {
            tracing::info!("session restored from persistence");
        }
        Ok(RecoveryOutcome::Restored)
    }

    /// Removes every slot, returning the first failure.
    /// Syncs the credential slot: written for `Some`, removed for `None`.
    fn write_credential_slot(&self, credential: Option<&Credential>) -> Result<(), StoreError> {
        match credential {
            Some(token) => self.store.set_slot(Slot::Credential, token.as_str()),
            None => self.store.remove_slot(Slot::Credential),
        }
    }

    fn clear_slots(&self) -> Option<StoreError> {
        let mut first = None;
        for slot in Slot::ALL {
            if let Err(e) = self.store.remove_slot(slot) {
                tracing::warn!(%slot, error = %e, "failed to remove slot");
                first.get_or_insert(e);
            }
        }
        first
    }
}

impl<C: Codec> fmt::Debug for SessionState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("session", &*self.session.borrow())
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionState`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //! Every test uses a `MemoryStore` so the persisted side can be
    //! inspected directly.

    use super::*;
    use keygate_store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    // -- Helpers ----------------------------------------------------------

    fn fresh() -> (Arc<MemoryStore>, SessionState) {
        let store = Arc::new(MemoryStore::new());
        let state = SessionState::new(store.clone());
        (store, state)
    }

    fn alice() -> User {
        User::new("u1", "a@b.com")
    }

    fn login(state: &SessionState) {
        state
            .commit_login(AuthResponse::new(alice(), "tok"))
            .expect("login should commit");
    }

    /// A store whose writes always fail.
    struct ReadOnlyStore;

    impl SessionStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: key.into(),
                source: std::io::Error::other("read-only"),
            })
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// A store that starts failing writes to one slot once armed.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_user_id: AtomicBool,
    }

    impl SessionStore for FlakyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_user_id.load(Ordering::SeqCst) && key == Slot::UserId.key() {
                return Err(StoreError::Io {
                    path: key.into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    // =====================================================================
    // set_user() / set_credential()
    // =====================================================================

    #[test]
    fn test_is_authenticated_requires_both_halves() {
        // Walk every combination of present/absent user and credential.
        let (_, state) = fresh();
        for (user, cred, expected) in [
            (false, false, false),
            (true, false, false),
            (false, true, false),
            (true, true, true),
        ] {
            state.set_user(user.then(alice));
            state
                .set_credential(cred.then(|| Credential::new("tok")))
                .unwrap();
            assert_eq!(
                state.is_authenticated(),
                expected,
                "user={user} credential={cred}"
            );
        }
    }

    #[test]
    fn test_set_user_does_not_touch_store() {
        let (store, state) = fresh();
        state.set_user(Some(alice()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_credential_some_writes_slot_none_removes_it() {
        let (store, state) = fresh();

        state.set_credential(Some(Credential::new("tok"))).unwrap();
        assert_eq!(store.get_slot(Slot::Credential).as_deref(), Some("tok"));

        state.set_credential(None).unwrap();
        assert!(store.get_slot(Slot::Credential).is_none());
        assert!(state.credential().is_none());
    }

    #[test]
    fn test_set_credential_empty_removes_slot_and_clears_memory() {
        let (store, state) = fresh();
        state.set_credential(Some(Credential::new("tok"))).unwrap();

        state.set_credential(Some(Credential::new(""))).unwrap();

        assert!(store.get_slot(Slot::Credential).is_none());
        assert!(state.credential().is_none());
    }

    #[test]
    fn test_set_credential_store_failure_leaves_memory_unchanged() {
        let state = SessionState::new(Arc::new(ReadOnlyStore));

        let result = state.set_credential(Some(Credential::new("tok")));

        assert!(matches!(result, Err(SessionError::Store(_))));
        assert!(state.credential().is_none());
    }

    // =====================================================================
    // commit_login()
    // =====================================================================

    #[test]
    fn test_commit_login_complete_response_persists_every_slot() {
        let (store, state) = fresh();

        login(&state);

        assert_eq!(state.status(), SessionStatus::Authenticated);
        assert_eq!(store.get_slot(Slot::Credential).as_deref(), Some("tok"));
        assert_eq!(store.get_slot(Slot::UserId).as_deref(), Some("u1"));
        assert_eq!(store.get_slot(Slot::UserEmail).as_deref(), Some("a@b.com"));
        let raw = store.get_slot(Slot::SerializedUser).unwrap();
        let persisted: User = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, alice());
    }

    #[test]
    fn test_commit_login_missing_credential_is_malformed_and_mutates_nothing() {
        let (store, state) = fresh();
        let response = AuthResponse {
            user: Some(alice()),
            ..AuthResponse::default()
        };

        let result = state.commit_login(response);

        assert!(matches!(result, Err(SessionError::MalformedAuthResponse(_))));
        assert!(state.user().is_none(), "no partial commit");
        assert!(store.is_empty(), "nothing persisted");
    }

    #[test]
    fn test_commit_login_missing_user_is_malformed() {
        let (_, state) = fresh();
        let response = AuthResponse {
            access_token: Some("tok".into()),
            ..AuthResponse::default()
        };

        let err = state.commit_login(response).unwrap_err();

        assert!(err.to_string().contains("missing user"), "got: {err}");
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_commit_login_store_failure_stays_unauthenticated() {
        let state = SessionState::new(Arc::new(ReadOnlyStore));

        let result = state.commit_login(AuthResponse::new(alice(), "tok"));

        assert!(matches!(result, Err(SessionError::Store(_))));
        assert_eq!(state.status(), SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_commit_login_relogin_slot_failure_signs_out_completely() {
        let store = Arc::new(FlakyStore::default());
        let state = SessionState::new(store.clone());
        login(&state);
        store.fail_user_id.store(true, Ordering::SeqCst);

        let result = state.commit_login(AuthResponse::new(User::new("u2", "b@c.com"), "tok-2"));

        assert!(matches!(result, Err(SessionError::Store(_))));
        assert_eq!(state.status(), SessionStatus::Unauthenticated);
        assert!(state.user().is_none(), "previous user not left in memory");
        assert!(state.credential().is_none());
        for slot in Slot::ALL {
            assert!(store.get_slot(slot).is_none(), "{slot} should be cleared");
        }
    }

    #[test]
    fn test_commit_identity_empty_credential_is_malformed_and_mutates_nothing() {
        let (store, state) = fresh();
        let identity = IdentityPayload {
            user: alice(),
            credential: Credential::new(""),
        };

        let result = state.commit_identity(identity);

        assert!(matches!(result, Err(SessionError::MalformedAuthResponse(_))));
        assert!(!state.is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn test_commit_login_notifies_subscribers_once_with_full_session() {
        let (_, state) = fresh();
        let mut rx = state.subscribe();

        login(&state);

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());
    }

    // =====================================================================
    // logout()
    // =====================================================================

    #[test]
    fn test_logout_clears_memory_and_every_slot() {
        let (store, state) = fresh();
        login(&state);

        state.logout().expect("logout should succeed");

        assert_eq!(state.status(), SessionStatus::Unauthenticated);
        assert!(state.user().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_logout_when_unauthenticated_is_noop() {
        let (store, state) = fresh();

        state.logout().expect("logout is idempotent");
        state.logout().expect("twice, even");

        assert!(store.is_empty());
        assert!(!state.is_authenticated());
    }

    // =====================================================================
    // recover_from_persistence()
    // =====================================================================

    #[test]
    fn test_recover_empty_store_is_nothing_persisted() {
        let (_, state) = fresh();
        assert_eq!(
            state.recover_from_persistence().unwrap(),
            RecoveryOutcome::NothingPersisted
        );
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_recover_credential_without_user_changes_nothing() {
        let (store, state) = fresh();
        store.set_slot(Slot::Credential, "tok").unwrap();

        let outcome = state.recover_from_persistence().unwrap();

        assert_eq!(outcome, RecoveryOutcome::NothingPersisted);
        assert!(!state.is_authenticated());
        assert!(state.credential().is_none(), "no half session");
    }

    #[test]
    fn test_recover_empty_credential_is_nothing_persisted() {
        let (store, state) = fresh();
        store.set_slot(Slot::Credential, "").unwrap();
        store
            .set_slot(Slot::SerializedUser, &serde_json::to_string(&alice()).unwrap())
            .unwrap();

        let outcome = state.recover_from_persistence().unwrap();

        assert_eq!(outcome, RecoveryOutcome::NothingPersisted);
        assert!(!state.is_authenticated());
        assert!(state.user().is_none());
    }

    #[test]
    fn test_recover_corrupt_user_logs_out_and_clears_slots() {
        let (store, state) = fresh();
        store.set_slot(Slot::Credential, "tok").unwrap();
        store.set_slot(Slot::SerializedUser, "{not json").unwrap();
        store.set_slot(Slot::UserId, "u1").unwrap();

        let outcome = state.recover_from_persistence().unwrap();

        assert_eq!(outcome, RecoveryOutcome::Corrupt);
        assert_eq!(state.status(), SessionStatus::Unauthenticated);
        assert!(store.is_empty(), "every slot cleared");
    }

    #[test]
    fn test_recover_unchanged_session_does_not_notify() {
        let (_, state) = fresh();
        login(&state);
        let rx = state.subscribe();

        assert_eq!(
            state.recover_from_persistence().unwrap(),
            RecoveryOutcome::Restored
        );

        assert!(!rx.has_changed().unwrap());
    }
}
