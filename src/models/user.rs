// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile as returned by the identity backend and persisted locally.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Identity record for the authenticated actor.
///
/// Replaced wholesale by a profile refresh; never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Display name as computed by the backend
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    /// `google`, `local`, ... (absent for password accounts on older backends)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_provider: Option<String>,
    pub email_verified: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub subscription_tier: SubscriptionTier,
    /// Creation timestamp exactly as the backend sent it
    pub created_at: String,
}

impl User {
    /// Display name derived from the name fields, the same way the backend does.
    ///
    /// Full name, else "first last", else first name, else the local part of
    /// the email address.
    pub fn derived_display_name(&self) -> String {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|v| !v.trim().is_empty())
        }

        if let Some(full) = non_empty(&self.full_name) {
            return full.to_string();
        }
        match (non_empty(&self.first_name), non_empty(&self.last_name)) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Name to show in the UI: the backend's value, or the derived one if blank.
    pub fn name_for_display(&self) -> String {
        if self.display_name.trim().is_empty() {
            self.derived_display_name()
        } else {
            self.display_name.clone()
        }
    }

    /// Parse `created_at` (RFC 3339, or a naive ISO timestamp taken as UTC).
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.created_at, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

/// Subscription tier. Unknown tiers are preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Basic,
    Pro,
    Enterprise,
    Other(String),
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
            SubscriptionTier::Other(s) => s,
        }
    }

    /// Whether this is a paid plan.
    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            SubscriptionTier::Basic | SubscriptionTier::Pro | SubscriptionTier::Enterprise
        )
    }
}

impl From<String> for SubscriptionTier {
    fn from(value: String) -> Self {
        match value.as_str() {
            "free" => SubscriptionTier::Free,
            "basic" => SubscriptionTier::Basic,
            "pro" => SubscriptionTier::Pro,
            "enterprise" => SubscriptionTier::Enterprise,
            _ => SubscriptionTier::Other(value),
        }
    }
}

impl From<SubscriptionTier> for String {
    fn from(tier: SubscriptionTier) -> Self {
        match tier {
            SubscriptionTier::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
