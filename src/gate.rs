// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access gate for protected destinations.
//!
//! Evaluated synchronously once per navigation, from local state only. A
//! token the backend no longer accepts still renders here; the first
//! protected backend call gets a 401 and the transport evicts the session.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::Config;
use crate::session::{SessionEvent, SessionState, WeakSessionState};

/// What a destination requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePolicy {
    /// A token is stored.
    #[default]
    Authenticated,
    /// A token is stored and the stored user is active.
    ActiveUser,
    /// Active user with the privileged flag.
    Superuser,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(String),
}

impl GateDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, GateDecision::Render)
    }
}

/// Render-permission check over the session state.
#[derive(Clone)]
pub struct AccessGate {
    state: SessionState,
    login_path: String,
    forbidden_path: String,
}

impl AccessGate {
    pub fn new(
        state: SessionState,
        login_path: impl Into<String>,
        forbidden_path: impl Into<String>,
    ) -> Self {
        Self {
            state,
            login_path: login_path.into(),
            forbidden_path: forbidden_path.into(),
        }
    }

    pub fn from_config(state: SessionState, config: &Config) -> Self {
        Self::new(state, &config.login_path, &config.forbidden_path)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Boolean form of [`evaluate`](Self::evaluate).
    pub fn is_allowed(&self) -> bool {
        self.evaluate().is_render()
    }

    /// Check the default policy: any stored session may render.
    pub fn evaluate(&self) -> GateDecision {
        self.evaluate_with(GatePolicy::Authenticated)
    }

    /// Check a destination's policy.
    pub fn evaluate_with(&self, policy: GatePolicy) -> GateDecision {
        let (user, token) = self.state.snapshot();
        if token.is_none() {
            return GateDecision::Redirect(self.login_path.clone());
        }

        let allowed = match policy {
            GatePolicy::Authenticated => return GateDecision::Render,
            GatePolicy::ActiveUser => user.as_ref().map(|u| u.is_active),
            GatePolicy::Superuser => user.as_ref().map(|u| u.is_active && u.is_superuser),
        };

        match allowed {
            Some(true) => GateDecision::Render,
            Some(false) => {
                tracing::debug!(?policy, "Gate denied for insufficient privilege");
                GateDecision::Redirect(self.forbidden_path.clone())
            }
            // Token without a readable user: treat as signed out.
            None => GateDecision::Redirect(self.login_path.clone()),
        }
    }

    /// Watch for the session ending while a protected view is shown.
    pub fn watch(&self) -> GateWatcher {
        GateWatcher {
            events: self.state.subscribe(),
            state: self.state.downgrade(),
            login_path: self.login_path.clone(),
        }
    }
}

/// Resolves once the session is invalidated.
pub struct GateWatcher {
    events: broadcast::Receiver<SessionEvent>,
    state: WeakSessionState,
    login_path: String,
}

impl GateWatcher {
    /// Wait until the session is invalidated, then return the redirect.
    pub async fn evicted(&mut self) -> GateDecision {
        loop {
            match self.events.recv().await {
                Ok(SessionEvent::Invalidated(reason)) => {
                    tracing::debug!(?reason, "Protected view lost its session");
                    return GateDecision::Redirect(self.login_path.clone());
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // The missed events may have included an invalidation.
                    tracing::warn!(skipped, "Gate watcher lagged behind session events");
                    let signed_in = self
                        .state
                        .upgrade()
                        .is_some_and(|state| state.is_authenticated());
                    if !signed_in {
                        return GateDecision::Redirect(self.login_path.clone());
                    }
                }
                Err(RecvError::Closed) => {
                    return GateDecision::Redirect(self.login_path.clone());
                }
            }
        }
    }
}
