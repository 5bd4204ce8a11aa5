//! Integration tests against a local stub API.
//!
//! The stub serves canned JSON in the shapes the real server uses, counts
//! hits per endpoint so tests can assert which requests were (not) issued,
//! and answers 401/4xx/204 on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use clubhub_api::validate::validate_registration;
use clubhub_api::{ApiClient, ApiError, RegisterStudent, SessionManager, SessionStore};

const ACCESS_TOKEN: &str = "tok-valid-access";

#[derive(Clone, Default)]
struct StubState {
    hits: Arc<Mutex<HashMap<&'static str, usize>>>,
    fail_current_user: Arc<AtomicBool>,
}

impl StubState {
    fn record(&self, name: &'static str) {
        *self.hits.lock().unwrap().entry(name).or_insert(0) += 1;
    }

    fn hits(&self, name: &'static str) -> usize {
        self.hits.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

fn student_json() -> Value {
    json!({
        "id": 7,
        "username": "validuser",
        "email": "validuser@uni.edu",
        "faculty": "Computer Science",
        "speciality": "Software Engineering",
        "wallet_balance": 42.5
    })
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {ACCESS_TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

async fn token(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    state.record("token");
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if username == "validuser" && password == "validpass" {
        Json(json!({"access": ACCESS_TOKEN, "refresh": "tok-refresh"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response()
    }
}

async fn current_student(State(state): State<StubState>, headers: HeaderMap) -> Response {
    state.record("current");
    if state.fail_current_user.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "temporarily unavailable"})),
        )
            .into_response();
    }
    if bearer_ok(&headers) {
        Json(student_json()).into_response()
    } else {
        unauthorized()
    }
}

async fn register_student(State(state): State<StubState>, Json(body): Json<Value>) -> Response {
    state.record("register");
    let username = body["username"].as_str().unwrap_or_default();
    if username == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["A user with that username already exists."]})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 8,
            "username": username,
            "email": body["email"],
            "faculty": body["faculty"].as_str().unwrap_or(""),
            "speciality": body["speciality"].as_str().unwrap_or(""),
            "wallet_balance": 0.0
        })),
    )
        .into_response()
}

async fn list_clubs(State(state): State<StubState>, headers: HeaderMap) -> Response {
    state.record("clubs");
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    Json(json!([{
        "id": 1,
        "name": "Programming Club",
        "description": "We write code",
        "image": null,
        "created_at": "2025-01-10T09:00:00Z"
    }]))
    .into_response()
}

async fn purchase_ticket(State(state): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("purchase");
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    let (Some(event), Some(student)) = (body["event"].as_i64(), body["student"].as_i64()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "event and student are required"})),
        )
            .into_response();
    };
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 11,
            "student": student,
            "student_username": "validuser",
            "event": event,
            "event_title": "Rust Workshop",
            "purchased_at": "2025-04-20T12:00:00Z"
        })),
    )
        .into_response()
}

async fn cancel_ticket(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(_id): Path<i64>,
) -> Response {
    state.record("cancel");
    if !bearer_ok(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_stub() -> (StubState, String) {
    let state = StubState::default();
    let app = Router::new()
        .route("/api/token/", post(token))
        .route("/api/students/current/", get(current_student))
        .route("/api/students/", post(register_student))
        .route("/api/clubs/", get(list_clubs))
        .route("/api/tickets/", post(purchase_ticket))
        .route("/api/tickets/:id/", delete(cancel_ticket))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    (state, format!("http://{addr}/api"))
}

fn temp_store() -> (TempDir, Arc<SessionStore>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(SessionStore::load(dir.path().join("session.toml")));
    (dir, store)
}

fn valid_registration() -> RegisterStudent {
    RegisterStudent {
        username: "newstudent".to_string(),
        email: "new@uni.edu".to_string(),
        password: "secret1".to_string(),
        password2: "secret1".to_string(),
        faculty: None,
        speciality: None,
    }
}

#[tokio::test]
async fn test_auth_required_without_token_makes_no_request() {
    let (stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    let client = ApiClient::new(base, store);

    let result = client.clubs().list().await;
    assert!(matches!(result, Err(ApiError::AuthRequired)));
    assert_eq!(stub.hits("clubs"), 0);
}

#[tokio::test]
async fn test_session_expired_purges_stored_token() {
    let (stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    store.set_tokens("stale-token".to_string(), None);

    let client = Arc::new(ApiClient::new(base, store.clone()));
    let result = client.clubs().list().await;
    assert!(matches!(result, Err(ApiError::SessionExpired)));
    assert!(store.access_token().is_none());

    // A fresh session finds no token and stays unauthenticated without
    // probing the server.
    let manager = SessionManager::new(client, store);
    manager.initialize().await;
    assert!(!manager.is_authenticated());
    assert_eq!(stub.hits("current"), 0);
}

#[tokio::test]
async fn test_login_then_fresh_initialize_rehydrates() {
    let (_stub, base) = spawn_stub().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("session.toml");

    let store = Arc::new(SessionStore::load(path.clone()));
    let client = Arc::new(ApiClient::new(base.clone(), store.clone()));
    let manager = SessionManager::new(client, store.clone());

    let user = manager
        .login("validuser", "validpass")
        .await
        .expect("login should succeed");
    assert_eq!(user.username, "validuser");
    assert!(manager.is_authenticated());
    assert_eq!(store.refresh_token().as_deref(), Some("tok-refresh"));

    // Simulate a restart: reload the persisted pair and rehydrate.
    let store2 = Arc::new(SessionStore::load(path));
    let client2 = Arc::new(ApiClient::new(base, store2.clone()));
    let manager2 = SessionManager::new(client2, store2);
    manager2.initialize().await;
    assert!(manager2.is_authenticated());
    assert_eq!(manager2.current_user().expect("user").username, "validuser");
    assert!(!manager2.is_loading());
}

#[tokio::test]
async fn test_invalid_credentials_leave_no_state() {
    let (_stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    let client = Arc::new(ApiClient::new(base, store.clone()));
    let manager = SessionManager::new(client, store.clone());

    let err = manager
        .login("validuser", "wrongpass")
        .await
        .expect_err("login should fail");
    match err {
        ApiError::Http { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "No active account found with the given credentials");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert!(store.access_token().is_none());
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_user_fetch_failure_discards_fresh_tokens() {
    let (stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    let client = Arc::new(ApiClient::new(base, store.clone()));
    let manager = SessionManager::new(client, store.clone());

    stub.fail_current_user.store(true, Ordering::SeqCst);
    let err = manager
        .login("validuser", "validpass")
        .await
        .expect_err("login should fail");
    assert!(matches!(err, ApiError::Http { status: 500, .. }));

    // The exchange succeeded but the session never became usable, so no
    // partial state survives.
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_both_tokens_without_network() {
    let (stub, base) = spawn_stub().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("session.toml");

    let store = Arc::new(SessionStore::load(path.clone()));
    store.set_tokens("some-access".to_string(), Some("some-refresh".to_string()));

    let client = Arc::new(ApiClient::new(base, store.clone()));
    let manager = SessionManager::new(client, store);
    manager.logout();

    let reloaded = SessionStore::load(path);
    assert!(reloaded.access_token().is_none());
    assert!(reloaded.refresh_token().is_none());
    assert_eq!(stub.hits("token"), 0);
    assert_eq!(stub.hits("current"), 0);
}

#[tokio::test]
async fn test_registration_validates_before_any_request() {
    let (stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    let client = ApiClient::new(base, store);

    let mut form = valid_registration();
    form.password2 = "different".to_string();
    assert!(validate_registration(&form).is_err());
    // The form never reached the network.
    assert_eq!(stub.hits("register"), 0);

    let form = valid_registration();
    validate_registration(&form).expect("form should validate");
    let created = client
        .students()
        .register(&form)
        .await
        .expect("registration should succeed");
    assert_eq!(created.username, "newstudent");
    assert_eq!(stub.hits("register"), 1);
}

#[tokio::test]
async fn test_field_error_body_extracted_from_registration() {
    let (_stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    let client = ApiClient::new(base, store);

    let mut form = valid_registration();
    form.username = "taken".to_string();
    let err = client
        .students()
        .register(&form)
        .await
        .expect_err("registration should be rejected");
    match err {
        ApiError::Http { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "username: A user with that username already exists.");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_decodes_204_as_empty() {
    let (stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    store.set_tokens(ACCESS_TOKEN.to_string(), None);
    let client = ApiClient::new(base, store);

    client.tickets().cancel(11).await.expect("cancel succeeds");
    assert_eq!(stub.hits("cancel"), 1);
}

#[tokio::test]
async fn test_purchase_posts_event_and_student() {
    let (stub, base) = spawn_stub().await;
    let (_dir, store) = temp_store();
    store.set_tokens(ACCESS_TOKEN.to_string(), None);
    let client = ApiClient::new(base, store);

    let ticket = client
        .tickets()
        .purchase(3, 7)
        .await
        .expect("purchase succeeds");
    assert_eq!(ticket.event, 3);
    assert_eq!(ticket.student, 7);
    assert_eq!(stub.hits("purchase"), 1);
}
