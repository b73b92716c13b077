//! Identity Toolkit client against a mock server.

use serde_json::json;
use supernotes_core::{AuthFailure, AuthGateway, AuthProvider, Error, TokenProvider};
use supernotes_gateway::{FirebaseAuth, FirebaseConfig};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth(server: &MockServer) -> FirebaseAuth {
    FirebaseAuth::new(FirebaseConfig::new("api-key", "demo").with_base_url(server.uri())).unwrap()
}

fn error_body(message: &str) -> serde_json::Value {
    json!({"error": {"code": 400, "message": message, "errors": []}})
}

#[tokio::test]
async fn test_sign_in_publishes_identity_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithPassword"))
        .and(query_param("key", "api-key"))
        .and(body_partial_json(json!({
            "email": "ana@example.com",
            "password": "secret1",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-1",
            "email": "ana@example.com",
            "displayName": "Ana",
            "idToken": "tok-1",
            "refreshToken": "ref-1",
            "expiresIn": "3600",
            "registered": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth(&server);
    let mut rx = auth.subscribe();
    let identity = auth.sign_in("ana@example.com", "secret1").await.unwrap();

    assert_eq!(identity.uid, "uid-1");
    assert_eq!(identity.display_name.as_deref(), Some("Ana"));
    assert_eq!(auth.bearer_token().as_deref(), Some("tok-1"));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().as_ref().map(|i| i.uid.clone()), Some("uid-1".to_string()));

    auth.sign_out().await.unwrap();
    assert!(auth.current().is_none());
    assert!(auth.bearer_token().is_none());
}

#[tokio::test]
async fn test_sign_up_error_codes_map_to_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .and(body_partial_json(json!({"email": "taken@example.com"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body("EMAIL_EXISTS")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .and(body_partial_json(json!({"email": "new@example.com"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body(
            "WEAK_PASSWORD : Password should be at least 6 characters",
        )))
        .mount(&server)
        .await;

    let auth = auth(&server);
    let err = auth.sign_up("taken@example.com", "secret1").await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthFailure::EmailAlreadyInUse)));

    let err = auth.sign_up("new@example.com", "123").await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthFailure::WeakPassword)));
    assert!(auth.current().is_none());
}

#[tokio::test]
async fn test_federated_sign_in_posts_google_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithIdp"))
        .and(body_partial_json(json!({
            "postBody": "id_token=google-jwt&providerId=google.com",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "providerId": "google.com",
            "localId": "uid-g",
            "email": "g@example.com",
            "displayName": "Gee",
            "photoUrl": "https://lh3.example/p.png",
            "idToken": "tok-g",
            "refreshToken": "ref-g",
            "isNewUser": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let signed_in = auth(&server)
        .sign_in_with_idp(AuthProvider::Google, "google-jwt")
        .await
        .unwrap();
    assert!(signed_in.is_new_user);
    assert_eq!(signed_in.identity.provider, AuthProvider::Google);
    assert_eq!(
        signed_in.identity.photo_url.as_deref(),
        Some("https://lh3.example/p.png")
    );
}

#[tokio::test]
async fn test_federated_needs_confirmation_is_account_clash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signInWithIdp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-g",
            "email": "g@example.com",
            "needConfirmation": true
        })))
        .mount(&server)
        .await;

    let auth = auth(&server);
    let err = auth
        .sign_in_with_idp(AuthProvider::Google, "google-jwt")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Auth(AuthFailure::AccountExistsWithDifferentCredential)
    ));
    assert!(auth.current().is_none());
}

#[tokio::test]
async fn test_update_display_name_and_delete_use_current_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts:signUp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-1",
            "email": "ana@example.com",
            "idToken": "tok-1",
            "refreshToken": "ref-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:update"))
        .and(body_partial_json(json!({"idToken": "tok-1", "displayName": "Ana"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "uid-1",
            "displayName": "Ana"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts:delete"))
        .and(body_partial_json(json!({"idToken": "tok-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth(&server);
    auth.sign_up("ana@example.com", "secret1").await.unwrap();
    auth.update_display_name("Ana").await.unwrap();
    assert_eq!(
        auth.current().and_then(|i| i.display_name),
        Some("Ana".to_string())
    );

    auth.delete_current().await.unwrap();
    assert!(auth.current().is_none());
}

#[tokio::test]
async fn test_unreachable_server_is_network_failure() {
    // Nothing listens on port 1.
    let auth = FirebaseAuth::new(
        FirebaseConfig::new("api-key", "demo").with_base_url("http://127.0.0.1:1"),
    )
    .unwrap();
    let err = auth.sign_in("ana@example.com", "secret1").await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthFailure::NetworkRequestFailed)));
}
