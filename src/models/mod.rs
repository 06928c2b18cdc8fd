// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models shared with the identity backend.

pub mod session;
pub mod user;

pub use session::{Credential, GoogleOAuthRequest, LoginRequest, RegisterRequest, Session};
pub use user::{SubscriptionTier, User};
