// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Authsession: client-side session and authentication manager.
//!
//! Acquires, persists, attaches, renews and invalidates the bearer
//! credential used against the identity/API backend, and decides whether
//! protected destinations may render.

pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod navigation;
pub mod session;
pub mod store;
pub mod transport;
pub mod validation;

use std::sync::Arc;

use config::Config;
use error::TransportError;
use gate::AccessGate;
use session::{SessionManager, SessionState};
use store::{FileStorage, Storage};
use transport::ApiTransport;

/// Everything one running client needs, wired around a single session state.
#[derive(Clone)]
pub struct AuthClient {
    pub config: Config,
    pub state: SessionState,
    pub sessions: SessionManager,
    pub gate: AccessGate,
}

impl AuthClient {
    /// Wire a client over the given storage.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Result<Self, TransportError> {
        let state = SessionState::new(storage);
        let transport =
            ApiTransport::with_timeout(config.api_base_url(), state.clone(), config.http_timeout)?;
        let sessions = SessionManager::new(transport);
        let gate = AccessGate::from_config(state.clone(), &config);

        Ok(Self {
            config,
            state,
            sessions,
            gate,
        })
    }

    /// Wire a client over the file store for the API's origin.
    pub fn with_file_storage(config: Config) -> Result<Self, TransportError> {
        let storage = FileStorage::for_origin(&config.store_dir, &config.origin());
        tracing::debug!(path = %storage.path().display(), "Using file-backed session storage");
        Self::new(config, Arc::new(storage))
    }

    pub fn transport(&self) -> &ApiTransport {
        self.sessions.transport()
    }
}
