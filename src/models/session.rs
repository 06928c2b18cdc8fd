// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential and session types, plus the request bodies sent to `/auth/*`.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::User;

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Bearer credential issued by the identity backend.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Credential {
    /// Opaque token string
    pub access_token: String,
    /// Always "bearer" today, kept as a string to stay provider-agnostic
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds from issuance
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub expires_in: u64,
    /// Subject the token authenticates
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub email: String,
}

impl fmt::Debug for Credential {
    // Keeps the token out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}

/// An authenticated actor: exactly one user paired with exactly one credential.
///
/// Deserializes directly from the backend's `{user, token}` auth response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    #[serde(rename = "token")]
    pub credential: Credential,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// Body of `POST /auth/google`.
///
/// `id_token` is the identity-provider token; `access_token` is the optional
/// provider access token, not ours.
#[derive(Debug, Serialize)]
pub struct GoogleOAuthRequest<'a> {
    pub id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<&'a str>,
}
