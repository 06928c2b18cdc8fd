// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Owned session state shared by the transport and the session manager.
//!
//! One `SessionState` per running client. It hydrates from persistence on
//! construction, serializes every write to the credential store so the
//! token and user are never observed unpaired, and broadcasts a
//! [`SessionEvent`] for each change.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

use crate::models::{Credential, Session, User};
use crate::store::{CredentialStore, Storage, StorageError};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// Explicit logout.
    LoggedOut,
    /// The backend answered 401 to some request.
    AuthorityRejected,
}

/// Change notification for subscribers (access gate, navigation layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Established { user_id: u64 },
    ProfileRefreshed { user_id: u64 },
    CredentialRenewed { user_id: u64 },
    Invalidated(InvalidationReason),
}

/// Credential last received in this process, with its arrival time.
///
/// Not persisted; a session hydrated from disk has no expiry information.
#[derive(Clone)]
struct TrackedCredential {
    credential: Credential,
    received_at: DateTime<Utc>,
}

struct Inner {
    store: CredentialStore,
    tracked: RwLock<Option<TrackedCredential>>,
    events: broadcast::Sender<SessionEvent>,
}

/// Handle to the session state. Clones share the same state.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Inner>,
}

impl SessionState {
    /// Create the state over `storage` and hydrate from it.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = Self {
            inner: Arc::new(Inner {
                store: CredentialStore::new(storage),
                tracked: RwLock::new(None),
                events,
            }),
        };
        state.hydrate();
        state
    }

    /// Reconcile persisted state: a token without a readable user (or the
    /// reverse) is cleared so the pair is all-or-nothing from startup.
    ///
    /// Returns whether a session is present afterwards.
    pub fn hydrate(&self) -> bool {
        let mut tracked = self.inner.tracked.write();
        let store = &self.inner.store;

        let token = store.current_token();
        let user = store.current_user();

        match (&token, &user) {
            (Some(_), Some(user)) => {
                tracing::debug!(user_id = user.id, "Hydrated session from storage");
                true
            }
            (None, None) => {
                *tracked = None;
                false
            }
            _ => {
                tracing::warn!(
                    has_token = token.is_some(),
                    has_user = user.is_some(),
                    "Unpaired session in storage, clearing"
                );
                if let Err(e) = store.clear() {
                    tracing::error!(error = %e, "Failed to clear unpaired session");
                }
                *tracked = None;
                false
            }
        }
    }

    /// Non-owning handle, for tasks that must not keep the state alive.
    pub fn downgrade(&self) -> WeakSessionState {
        WeakSessionState {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Persist a freshly issued session.
    pub fn establish(&self, session: &Session) -> Result<(), StorageError> {
        {
            let mut tracked = self.inner.tracked.write();
            self.inner.store.save(session)?;
            *tracked = Some(TrackedCredential {
                credential: session.credential.clone(),
                received_at: Utc::now(),
            });
        }
        tracing::info!(user_id = session.user.id, "Session established");
        self.emit(SessionEvent::Established {
            user_id: session.user.id,
        });
        Ok(())
    }

    /// Replace the stored user, keeping the credential.
    ///
    /// `presented` is the token the profile request was sent with. Returns
    /// `Ok(false)` without writing unless that token is still stored and the
    /// stored user is the same account, so a late response can never land in
    /// a cleared or different session.
    pub fn replace_user(&self, presented: &str, user: &User) -> Result<bool, StorageError> {
        {
            let _tracked = self.inner.tracked.write();
            if !self.is_current_session(presented, user.id) {
                return Ok(false);
            }
            self.inner.store.save_user(user)?;
        }
        self.emit(SessionEvent::ProfileRefreshed { user_id: user.id });
        Ok(true)
    }

    /// Replace the stored credential, keeping the user.
    ///
    /// Same discard rule as [`replace_user`](Self::replace_user), keyed on
    /// the credential's subject.
    pub fn replace_credential(
        &self,
        presented: &str,
        credential: &Credential,
    ) -> Result<bool, StorageError> {
        {
            let mut tracked = self.inner.tracked.write();
            if !self.is_current_session(presented, credential.user_id) {
                return Ok(false);
            }
            self.inner.store.save_token(&credential.access_token)?;
            *tracked = Some(TrackedCredential {
                credential: credential.clone(),
                received_at: Utc::now(),
            });
        }
        self.emit(SessionEvent::CredentialRenewed {
            user_id: credential.user_id,
        });
        Ok(true)
    }

    /// Caller must hold the `tracked` lock.
    fn is_current_session(&self, token: &str, user_id: u64) -> bool {
        let store = &self.inner.store;
        store.current_token().as_deref() == Some(token)
            && store.current_user().is_some_and(|u| u.id == user_id)
    }

    /// Clear the session and notify subscribers.
    ///
    /// Always emits, even if nothing was stored.
    pub fn invalidate(&self, reason: InvalidationReason) {
        {
            let mut tracked = self.inner.tracked.write();
            if let Err(e) = self.inner.store.clear() {
                tracing::error!(error = %e, "Failed to clear credential store");
            }
            *tracked = None;
        }
        tracing::info!(?reason, "Session invalidated");
        self.emit(SessionEvent::Invalidated(reason));
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    // ─── Reads ───────────────────────────────────────────────────

    pub fn current_user(&self) -> Option<User> {
        let _tracked = self.inner.tracked.read();
        self.inner.store.current_user()
    }

    pub fn current_token(&self) -> Option<String> {
        let _tracked = self.inner.tracked.read();
        self.inner.store.current_token()
    }

    pub fn is_authenticated(&self) -> bool {
        let _tracked = self.inner.tracked.read();
        self.inner.store.is_authenticated()
    }

    /// User and token read under one lock.
    pub fn snapshot(&self) -> (Option<User>, Option<String>) {
        let _tracked = self.inner.tracked.read();
        (
            self.inner.store.current_user(),
            self.inner.store.current_token(),
        )
    }

    /// The full credential last received in this process, if it is still the
    /// stored one.
    pub fn current_credential(&self) -> Option<Credential> {
        let tracked = self.inner.tracked.read();
        let token = self.inner.store.current_token()?;
        tracked
            .as_ref()
            .filter(|t| t.credential.access_token == token)
            .map(|t| t.credential.clone())
    }

    /// When the stored credential expires, if known.
    pub fn credential_expires_at(&self) -> Option<DateTime<Utc>> {
        let tracked = self.inner.tracked.read();
        let token = self.inner.store.current_token()?;
        tracked
            .as_ref()
            .filter(|t| t.credential.access_token == token)
            .map(|t| t.received_at + Duration::seconds(t.credential.expires_in as i64))
    }

    /// Whether the stored credential is within `margin` of expiry.
    ///
    /// A session hydrated from disk has unknown expiry and reports `true`;
    /// with no session at all this is `false`.
    pub fn needs_renewal(&self, margin: std::time::Duration) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        let margin = Duration::from_std(margin).unwrap_or_else(|_| Duration::zero());
        match self.credential_expires_at() {
            Some(expires_at) => Utc::now() + margin >= expires_at,
            None => true,
        }
    }
}

/// Weak counterpart of [`SessionState`].
#[derive(Clone)]
pub struct WeakSessionState {
    inner: Weak<Inner>,
}

impl WeakSessionState {
    pub fn upgrade(&self) -> Option<SessionState> {
        self.inner.upgrade().map(|inner| SessionState { inner })
    }
}
