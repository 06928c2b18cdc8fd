// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager: login, registration, OAuth exchange, profile refresh,
//! token renewal and logout.
//!
//! Each network operation makes exactly one backend call and writes to the
//! credential store only on success. Failures are normalized into
//! [`AuthError`] with a single display message.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{AuthError, Result, TransportError};
use crate::models::{
    Credential, GoogleOAuthRequest, LoginRequest, RegisterRequest, Session, User,
};
use crate::session::{InvalidationReason, SessionState};
use crate::transport::ApiTransport;
use crate::validation::RegistrationInput;

/// Backend paths, relative to the API base URL.
pub mod paths {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const GOOGLE: &str = "/auth/google";
    pub const ME: &str = "/auth/me";
    pub const REFRESH: &str = "/auth/refresh";
}

/// Which operation failed; decides how a status code is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Login,
    Register,
    OAuthExchange,
    RefreshProfile,
    RenewToken,
}

/// Orchestrates every session-changing operation.
#[derive(Clone)]
pub struct SessionManager {
    transport: ApiTransport,
    state: SessionState,
    /// Serializes token renewal so concurrent callers share one request.
    renewal_lock: Arc<Mutex<()>>,
}

impl SessionManager {
    /// Create a manager over the transport's session state.
    pub fn new(transport: ApiTransport) -> Self {
        let state = transport.session_state().clone();
        Self {
            transport,
            state,
            renewal_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn transport(&self) -> &ApiTransport {
        &self.transport
    }

    pub fn session_state(&self) -> &SessionState {
        &self.state
    }

    // ─── Session-establishing operations ─────────────────────────

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = LoginRequest { email, password };
        let session: Session = self
            .transport
            .post_json(paths::LOGIN, Some(&body))
            .await
            .map_err(|e| map_transport_error(Operation::Login, e))?;

        self.persist(&session)?;
        Ok(session)
    }

    /// Register a new account.
    ///
    /// Run [`validate_registration`](crate::validation::validate_registration)
    /// first; this only forwards to the backend and surfaces its verdict.
    pub async fn register(&self, input: &RegistrationInput) -> Result<Session> {
        let body = RegisterRequest {
            first_name: &input.first_name,
            last_name: &input.last_name,
            email: &input.email,
            password: &input.password,
            confirm_password: &input.confirm_password,
        };
        let session: Session = self
            .transport
            .post_json(paths::REGISTER, Some(&body))
            .await
            .map_err(|e| map_transport_error(Operation::Register, e))?;

        self.persist(&session)?;
        Ok(session)
    }

    /// Exchange an identity-provider token for a session.
    ///
    /// Whether this creates a user or links an existing one is the backend's call.
    pub async fn exchange_oauth(
        &self,
        provider_token: &str,
        provider_access_token: Option<&str>,
    ) -> Result<Session> {
        let body = GoogleOAuthRequest {
            id_token: provider_token,
            access_token: provider_access_token,
        };
        let session: Session = self
            .transport
            .post_json(paths::GOOGLE, Some(&body))
            .await
            .map_err(|e| map_transport_error(Operation::OAuthExchange, e))?;

        self.persist(&session)?;
        Ok(session)
    }

    fn persist(&self, session: &Session) -> Result<()> {
        self.state.establish(session)?;
        Ok(())
    }

    // ─── In-place refresh ────────────────────────────────────────

    /// Fetch the latest user record and replace the stored one.
    ///
    /// Fails with [`AuthError::Unauthenticated`] without a network call when
    /// no token is stored.
    pub async fn refresh_profile(&self) -> Result<User> {
        let presented = self
            .state
            .current_token()
            .ok_or(AuthError::Unauthenticated)?;

        let user: User = self
            .transport
            .get_json(paths::ME)
            .await
            .map_err(|e| map_transport_error(Operation::RefreshProfile, e))?;

        if !self.state.replace_user(&presented, &user)? {
            tracing::info!(user_id = user.id, "Session ended during profile refresh, discarding");
            return Err(AuthError::Unauthenticated);
        }
        tracing::debug!(user_id = user.id, "Profile refreshed");
        Ok(user)
    }

    /// Exchange the current credential for a new one, keeping the user.
    ///
    /// Concurrent calls are coalesced: a caller that waited while another
    /// renewal completed gets that renewal's credential without a second
    /// backend request.
    pub async fn renew_token(&self) -> Result<Credential> {
        let (user, presented) = match self.state.snapshot() {
            (Some(user), Some(token)) => (user, token),
            _ => return Err(AuthError::Unauthenticated),
        };

        let _guard = self.renewal_lock.lock().await;

        // Re-check after acquiring the lock; another task may have renewed,
        // or the session may have changed hands.
        let current = match self.state.snapshot() {
            (Some(current_user), Some(token)) if current_user.id == user.id => token,
            _ => {
                tracing::info!(user_id = user.id, "Session changed while waiting to renew");
                return Err(AuthError::Unauthenticated);
            }
        };
        if current != presented {
            if let Some(credential) = self
                .state
                .current_credential()
                .filter(|c| c.user_id == user.id)
            {
                tracing::debug!("Token renewed by a concurrent caller, reusing");
                return Ok(credential);
            }
        }

        let credential: Credential = self
            .transport
            .post_json::<(), _>(paths::REFRESH, None)
            .await
            .map_err(|e| map_transport_error(Operation::RenewToken, e))?;

        if !self.state.replace_credential(&current, &credential)? {
            tracing::info!("Session ended during token renewal, discarding");
            return Err(AuthError::Unauthenticated);
        }
        tracing::info!(
            user_id = credential.user_id,
            expires_in = credential.expires_in,
            "Token renewed"
        );
        Ok(credential)
    }

    /// Whether the stored credential is within `margin` of expiry.
    ///
    /// For caller-owned renewal schedulers; nothing here renews on its own.
    pub fn needs_renewal(&self, margin: std::time::Duration) -> bool {
        self.state.needs_renewal(margin)
    }

    // ─── Teardown and local reads ────────────────────────────────

    /// Clear the session. Subscribers redirect to the login entry point.
    pub fn logout(&self) {
        self.state.invalidate(InvalidationReason::LoggedOut);
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.current_user()
    }

    pub fn current_token(&self) -> Option<String> {
        self.state.current_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }
}

/// Classify a transport failure for the operation that produced it.
fn map_transport_error(op: Operation, err: TransportError) -> AuthError {
    tracing::warn!(operation = ?op, error = %err, "Session operation failed");
    match err {
        TransportError::Network(message) => AuthError::Network(message),
        TransportError::Decode(message) => AuthError::InvalidResponse(message),
        TransportError::Status {
            status: 401 | 403,
            message,
        } => AuthError::InvalidCredentials(message),
        TransportError::Status { status, message }
            if op == Operation::Register && (400..500).contains(&status) =>
        {
            AuthError::ValidationFailed(message)
        }
        TransportError::Status { status, message } => AuthError::Api { status, message },
    }
}
