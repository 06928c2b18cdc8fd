// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session manager flows against the fake backend.

use authsession::error::AuthError;
use authsession::store::{Storage, ACCESS_TOKEN_KEY, USER_KEY};
use authsession::validation::{validate_registration, RegistrationInput};
use authsession::AuthClient;

mod common;
use common::{FlakyStorage, MockBackend, GOOD_ID_TOKEN, GOOD_PASSWORD, TAKEN_EMAIL};

fn registration(email: &str) -> RegistrationInput {
    RegistrationInput {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: email.to_string(),
        password: "password1".to_string(),
        confirm_password: "password1".to_string(),
    }
}

/// Token and user are either both present or both absent.
fn assert_paired(client: &AuthClient) {
    let (user, token) = client.state.snapshot();
    assert_eq!(user.is_some(), token.is_some(), "session must be paired");
}

#[tokio::test]
async fn test_login_establishes_session() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();

    let session = client
        .sessions
        .login("user@example.com", GOOD_PASSWORD)
        .await
        .expect("login should succeed");

    assert!(client.sessions.is_authenticated());
    assert_eq!(client.sessions.current_user().unwrap().id, 1);
    assert_eq!(
        client.sessions.current_token(),
        Some(session.credential.access_token.clone())
    );
    assert_eq!(client.sessions.current_user(), Some(session.user));
    assert_paired(&client);

    // The login request itself carried no credential.
    assert_eq!(backend.hits()[0].authorization, None);
}

#[tokio::test]
async fn test_login_rejected_writes_nothing() {
    let backend = MockBackend::start().await;
    let (client, storage) = backend.client();

    let err = client
        .sessions
        .login("user@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials(_)));
    assert_eq!(err.to_string(), "Incorrect email or password");
    assert!(!client.sessions.is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_failed_save_keeps_existing_session() {
    let backend = MockBackend::start().await;
    let storage = FlakyStorage::default();
    let client = backend.client_with(std::sync::Arc::new(storage.clone()));
    let first = client
        .sessions
        .login("user@example.com", GOOD_PASSWORD)
        .await
        .unwrap();

    storage.fail_user_writes(true);
    let err = client
        .sessions
        .register(&registration("new@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Storage(_)));
    assert_paired(&client);
    assert_eq!(
        client.sessions.current_token(),
        Some(first.credential.access_token)
    );
    assert_eq!(client.sessions.current_user(), Some(first.user));
}

#[tokio::test]
async fn test_register_establishes_session() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();
    let input = registration("new@example.com");
    assert!(validate_registration(&input).is_empty());

    let session = client.sessions.register(&input).await.unwrap();

    assert_eq!(session.user.email, "new@example.com");
    assert!(client.sessions.is_authenticated());
    assert_paired(&client);
}

#[tokio::test]
async fn test_register_surfaces_backend_validation() {
    let backend = MockBackend::start().await;
    let (client, storage) = backend.client();

    let err = client
        .sessions
        .register(&registration(TAKEN_EMAIL))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ValidationFailed(_)));
    assert_eq!(err.to_string(), "Email already registered");
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_register_does_not_revalidate_locally() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();
    let input = RegistrationInput {
        confirm_password: "different1".to_string(),
        ..registration("new@example.com")
    };

    let err = client.sessions.register(&input).await.unwrap_err();

    // The backend saw the request and answered with its own message.
    assert_eq!(backend.hit_count("/auth/register"), 1);
    assert!(matches!(err, AuthError::ValidationFailed(ref m) if m == "Passwords do not match"));
}

#[tokio::test]
async fn test_oauth_exchange() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();

    let session = client
        .sessions
        .exchange_oauth(GOOD_ID_TOKEN, Some("provider-access"))
        .await
        .unwrap();
    assert_eq!(session.user.oauth_provider.as_deref(), Some("google"));
    assert!(client.sessions.is_authenticated());

    let (other, storage) = backend.client();
    let err = other
        .sessions
        .exchange_oauth("forged", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(ref m) if m == "Google authentication failed"));
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_logout_clears_both_keys() {
    let backend = MockBackend::start().await;
    let (client, storage) = backend.client();
    client
        .sessions
        .login("user@example.com", GOOD_PASSWORD)
        .await
        .unwrap();

    client.sessions.logout();

    assert!(!client.sessions.is_authenticated());
    assert_eq!(storage.get_item(ACCESS_TOKEN_KEY), None);
    assert_eq!(storage.get_item(USER_KEY), None);
    assert!(!client.gate.is_allowed());
}

#[tokio::test]
async fn test_refresh_profile_without_token_makes_no_call() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();

    let err = client.sessions.refresh_profile().await.unwrap_err();

    assert!(matches!(err, AuthError::Unauthenticated));
    assert!(backend.hits().is_empty());

    let err = client.sessions.renew_token().await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthenticated));
    assert!(backend.hits().is_empty());
}

#[tokio::test]
async fn test_refresh_profile_replaces_user_only() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();
    client
        .sessions
        .login("user@example.com", GOOD_PASSWORD)
        .await
        .unwrap();
    let token_before = client.sessions.current_token();

    backend.set_display_name("Renamed User");
    let user = client.sessions.refresh_profile().await.unwrap();

    assert_eq!(user.display_name, "Renamed User");
    assert_eq!(client.sessions.current_user(), Some(user));
    assert_eq!(client.sessions.current_token(), token_before);

    let me = backend
        .hits()
        .into_iter()
        .find(|h| h.path == "/auth/me")
        .unwrap();
    assert_eq!(me.authorization, token_before.map(|t| format!("Bearer {}", t)));
}

#[tokio::test]
async fn test_renew_token_replaces_credential_only() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();
    let session = client
        .sessions
        .login("user@example.com", GOOD_PASSWORD)
        .await
        .unwrap();

    let renewed = client.sessions.renew_token().await.unwrap();

    assert_ne!(renewed.access_token, session.credential.access_token);
    assert_eq!(client.sessions.current_token(), Some(renewed.access_token));
    assert_eq!(client.sessions.current_user(), Some(session.user));
    assert!(!client
        .sessions
        .needs_renewal(std::time::Duration::from_secs(60)));
}

#[tokio::test]
async fn test_network_failure_is_reported() {
    let client = AuthClient::new(
        common::unreachable_config().await,
        std::sync::Arc::new(authsession::store::MemoryStorage::new()),
    )
    .unwrap();

    let err = client
        .sessions
        .login("user@example.com", GOOD_PASSWORD)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Network(ref m) if !m.is_empty()));
    assert!(!client.sessions.is_authenticated());
}

#[tokio::test]
async fn test_server_error_message_falls_back_to_status() {
    let backend = MockBackend::start().await;
    let (client, _) = backend.client();

    let err = client
        .transport()
        .get_json::<serde_json::Value>("/broken")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Request failed with status code 500");
}
