// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session state and the operations that change it.

pub mod manager;
pub mod state;

pub use manager::SessionManager;
pub use state::{InvalidationReason, SessionEvent, SessionState, WeakSessionState};
