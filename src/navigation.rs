// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation hook: sends the active view to the login entry point whenever
//! the session is invalidated, whether by logout or by a 401.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::session::{SessionEvent, SessionState};

/// Whatever owns the active view.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Navigator that only records where it was sent.
#[derive(Debug, Clone, Default)]
pub struct MemoryNavigator {
    history: Arc<Mutex<Vec<String>>>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent redirect target.
    pub fn current_location(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }

    /// All redirects, oldest first.
    pub fn redirects(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Navigator for MemoryNavigator {
    fn redirect(&self, path: &str) {
        self.history.lock().push(path.to_string());
    }
}

/// Spawn a task that redirects to `login_path` on every invalidation.
///
/// Subscribes before returning, so invalidations after this call are never
/// missed. Ends when the session state is dropped.
pub fn spawn_redirect_listener(
    state: &SessionState,
    navigator: Arc<dyn Navigator>,
    login_path: impl Into<String>,
) -> JoinHandle<()> {
    let mut events = state.subscribe();
    let state = state.downgrade();
    let login_path = login_path.into();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Invalidated(reason)) => {
                    tracing::debug!(?reason, path = %login_path, "Redirecting to login");
                    navigator.redirect(&login_path);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // Missed events may have included an invalidation.
                    tracing::warn!(skipped, "Redirect listener lagged behind session events");
                    let signed_out = state.upgrade().map_or(true, |s| !s.is_authenticated());
                    if signed_out {
                        navigator.redirect(&login_path);
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
