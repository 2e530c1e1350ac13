//! Request and response shapes for the hosted identity provider and
//! realtime database, checked against a local mock server.

mod common;

use common::principal;
use gogodo::auth::{AuthError, FirebaseIdentity, IdentityProvider};
use gogodo::config::FirebaseConfig;
use gogodo::models::NewTask;
use gogodo::store::{FirebaseStore, RemoteStore, StoreError};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> FirebaseConfig {
    FirebaseConfig {
        api_key: "test-key".to_string(),
        database_url: format!("{}/", server.uri()),
        auth_endpoint: format!("{}/v1", server.uri()),
        token_endpoint: format!("{}/securetoken", server.uri()),
        ..FirebaseConfig::default()
    }
}

#[tokio::test]
async fn sign_in_posts_credentials_with_the_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "test-key"))
        .and(body_json(json!({
            "email": "alice@example.com",
            "password": "hunter22",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "uid-alice",
            "email": "alice@example.com",
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600",
            "registered": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = FirebaseIdentity::new(&config(&server)).unwrap();
    let principal = identity.sign_in("alice@example.com", "hunter22").await.unwrap();
    assert_eq!(principal.uid, "uid-alice");
    assert_eq!(principal.id_token, "id-token");
    assert!(!principal.is_expired(chrono::Utc::now()));
}

#[tokio::test]
async fn provider_error_codes_become_readable_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "EMAIL_EXISTS", "errors": []}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS"}
        })))
        .mount(&server)
        .await;

    let identity = FirebaseIdentity::new(&config(&server)).unwrap();
    assert!(matches!(
        identity.sign_up("alice@example.com", "hunter22").await,
        Err(AuthError::EmailExists)
    ));
    assert!(matches!(
        identity.sign_in("alice@example.com", "hunter22").await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn refresh_exchanges_the_refresh_token_and_keeps_the_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/securetoken/token"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "refresh-alice"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "new-id-token",
            "refresh_token": "new-refresh-token",
            "expires_in": "3600",
            "token_type": "Bearer",
            "user_id": "alice",
            "project_id": "123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = FirebaseIdentity::new(&config(&server)).unwrap();
    let fresh = identity.refresh(&principal("alice")).await.unwrap();
    assert_eq!(fresh.id_token, "new-id-token");
    assert_eq!(fresh.refresh_token, "new-refresh-token");
    assert_eq!(fresh.email, "alice@example.com");
}

#[tokio::test]
async fn append_pushes_the_record_and_returns_the_generated_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/alice.json"))
        .and(query_param("auth", "token-alice"))
        .and(body_json(json!({
            "description": "call mom",
            "dueDate": "2024-06-02",
            "dueTime": "17:00",
            "completed": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "-NxYz"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = FirebaseStore::new(&config(&server)).unwrap();
    let task = NewTask {
        description: "call mom".to_string(),
        due_date: Some("2024-06-02".to_string()),
        due_time: Some("17:00".to_string()),
        completed: false,
    };
    let key = store.append(&principal("alice"), &task).await.unwrap();
    assert_eq!(key, "-NxYz");
}

#[tokio::test]
async fn undated_records_omit_the_schedule_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/tasks/alice/-Na.json"))
        .and(query_param("auth", "token-alice"))
        .and(body_json(json!({"description": "buy milk", "completed": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "description": "buy milk",
            "completed": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = FirebaseStore::new(&config(&server)).unwrap();
    let task = NewTask {
        completed: true,
        ..NewTask::new("buy milk")
    };
    store.overwrite(&principal("alice"), "-Na", &task).await.unwrap();
}

#[tokio::test]
async fn read_all_handles_empty_and_populated_collections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/alice.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/bob.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "-Nb": {"description": "second"},
            "-Na": {"description": "first", "dueDate": "2024-06-02", "dueTime": "17:00", "completed": true}
        })))
        .mount(&server)
        .await;

    let store = FirebaseStore::new(&config(&server)).unwrap();
    assert!(store.read_all(&principal("alice")).await.unwrap().is_empty());

    let tasks = store.read_all(&principal("bob")).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, "-Na");
    assert_eq!(tasks[0].due_label().as_deref(), Some("June 2nd, 2024 5:00 PM"));
    assert_eq!(tasks[1].description, "second");
}

#[tokio::test]
async fn rejected_writes_surface_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/tasks/alice/-Na.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})))
        .mount(&server)
        .await;

    let store = FirebaseStore::new(&config(&server)).unwrap();
    match store.delete(&principal("alice"), "-Na").await {
        Err(StoreError::Response { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Permission denied"));
        }
        other => panic!("expected a rejected delete, got {:?}", other),
    }
}
