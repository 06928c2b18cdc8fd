// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend root URL (e.g. `http://localhost:8000`)
    pub api_url: String,
    /// Path prefix of the versioned API under `api_url`
    pub api_prefix: String,
    /// Directory holding the file-backed credential store
    pub store_dir: PathBuf,
    /// Login entry point used when a session is invalidated
    pub login_path: String,
    /// Where privilege denials are sent
    pub forbidden_path: String,
    /// Transport timeout for every request
    pub http_timeout: Duration,
    /// How close to expiry a credential counts as due for renewal
    pub renewal_margin: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            store_dir: PathBuf::from(".authsession"),
            login_path: "/login".to_string(),
            forbidden_path: "/".to_string(),
            http_timeout: Duration::from_secs(30),
            renewal_margin: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        let api_url = match env::var("API_URL") {
            Ok(v) => parse_api_url(&v)?,
            Err(_) => defaults.api_url,
        };

        Ok(Self {
            api_url,
            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            store_dir: env::var("SESSION_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            login_path: env::var("LOGIN_PATH").unwrap_or(defaults.login_path),
            forbidden_path: env::var("FORBIDDEN_PATH").unwrap_or(defaults.forbidden_path),
            http_timeout: secs_var("HTTP_TIMEOUT_SECS")?.unwrap_or(defaults.http_timeout),
            renewal_margin: secs_var("RENEWAL_MARGIN_SECS")?.unwrap_or(defaults.renewal_margin),
        })
    }

    /// Point at a different backend, validated like `API_URL`.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(api_url)?;
        Ok(self)
    }

    /// Base URL every API path is joined onto.
    pub fn api_base_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
        .trim_end_matches('/')
        .to_string()
    }

    /// Origin (scheme, host and port) the credential store is scoped to.
    pub fn origin(&self) -> String {
        origin_of(&self.api_url)
    }
}

/// Reduce a URL to its `scheme://host[:port]` origin.
pub fn origin_of(url: &str) -> String {
    let (scheme, rest) = url.split_once("://").unwrap_or(("http", url));
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    format!("{}://{}", scheme.to_ascii_lowercase(), authority.to_ascii_lowercase())
}

fn parse_api_url(raw: &str) -> Result<String, ConfigError> {
    let api_url = raw.trim().trim_end_matches('/').to_string();
    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        return Err(ConfigError::Invalid("API_URL", api_url));
    }
    Ok(api_url)
}

fn secs_var(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::Invalid(name, v)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
