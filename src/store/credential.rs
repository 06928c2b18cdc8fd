// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store: the current token and user profile under two keys.

use std::sync::Arc;

use super::{Storage, StorageError};
use crate::models::{Session, User};

/// Key holding the raw access-token string.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key holding the JSON-serialized user.
pub const USER_KEY: &str = "user";

/// Typed access to the persisted session.
///
/// Pairing of token and user is enforced by callers that hold the session
/// state lock across both writes; this type only guarantees that a failed
/// second write of [`save`](Self::save) undoes the first.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Persist both halves of a session.
    ///
    /// If the user write fails the previous token is put back, so storage
    /// holds either the old pair or the new one. If that restore also fails
    /// both keys are cleared.
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&session.user)?;
        let previous_token = self.storage.get_item(ACCESS_TOKEN_KEY);

        self.storage
            .set_item(ACCESS_TOKEN_KEY, &session.credential.access_token)?;
        if let Err(e) = self.storage.set_item(USER_KEY, &user_json) {
            self.restore_token(previous_token.as_deref());
            return Err(e);
        }
        Ok(())
    }

    fn restore_token(&self, previous: Option<&str>) {
        let restored = match previous {
            Some(token) => self.storage.set_item(ACCESS_TOKEN_KEY, token),
            None => self.storage.remove_item(ACCESS_TOKEN_KEY),
        };
        if let Err(rollback) = restored {
            tracing::error!(error = %rollback, "Failed to restore token after user write failed, clearing");
            if let Err(e) = self.clear() {
                tracing::error!(error = %e, "Failed to clear credential store");
            }
        }
    }

    /// Replace only the stored user.
    pub fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        self.storage.set_item(USER_KEY, &user_json)
    }

    /// Replace only the stored token.
    pub fn save_token(&self, access_token: &str) -> Result<(), StorageError> {
        self.storage.set_item(ACCESS_TOKEN_KEY, access_token)
    }

    /// Remove both keys. Attempts both removals even if the first fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let token = self.storage.remove_item(ACCESS_TOKEN_KEY);
        let user = self.storage.remove_item(USER_KEY);
        token.and(user)
    }

    /// Last persisted user; a missing or undecodable record reads as `None`.
    pub fn current_user(&self) -> Option<User> {
        let raw = self.storage.get_item(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "Stored user record is not decodable, treating as absent");
                None
            }
        }
    }

    /// Last persisted token string.
    pub fn current_token(&self) -> Option<String> {
        self.storage
            .get_item(ACCESS_TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    /// True iff a token is present.
    pub fn is_authenticated(&self) -> bool {
        self.current_token().is_some()
    }
}
