// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP transport for the identity/API backend.
//!
//! Every request goes through two interceptors:
//! - outbound: attach `Authorization: Bearer <token>` when a token is stored
//! - inbound: on a 401 from any request, invalidate the session before the
//!   error is handed back to the caller

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::{normalize_error_message, TransportError};
use crate::session::{InvalidationReason, SessionState};

/// Transport to the backend, bound to one session state.
#[derive(Clone)]
pub struct ApiTransport {
    http: reqwest::Client,
    base_url: String,
    state: SessionState,
}

impl ApiTransport {
    /// Create a transport rooted at `base_url` (e.g. `http://localhost:8000/api/v1`).
    pub fn new(base_url: impl Into<String>, state: SessionState) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, state)
    }

    /// Create a transport whose requests time out after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        state: SessionState,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, state))
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        state: SessionState,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_state(&self) -> &SessionState {
        &self.state
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with the outbound interceptor applied.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorize(self.http.request(method, self.url(path)))
    }

    /// Outbound interceptor. Reads local state only.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.state.current_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Dispatch a request and run the inbound interceptor on the outcome.
    pub async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Request failed without a response");
                return Err(e.into());
            }
        };

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = normalize_error_message(status.as_u16(), &body);

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %url, "Backend rejected credential, evicting session");
            self.state.invalidate(InvalidationReason::AuthorityRejected);
        } else {
            tracing::debug!(path = %url, status = status.as_u16(), "Backend returned error");
        }

        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Send and decode a JSON success body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Decode(format!("JSON parse error: {}", e)))
    }

    /// `GET` a JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.send_json(self.request(Method::GET, path)).await
    }

    /// `POST` an optional JSON body and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::POST, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send_json(request).await
    }

    /// `DELETE` a resource, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), TransportError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}
