//! End-to-end tests for the `Keygate` root against a local provider.
//!
//! The axum app below plays both the identity provider (`/auth/v1`) and
//! the resource API (`/rest/v1`), and rejects resource calls that do not
//! carry the token it issued.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use keygate::prelude::*;
use serde_json::{Value, json};

// =========================================================================
// Helpers
// =========================================================================

const TOKEN: &str = "tok-e2e";

async fn spawn_provider() -> SocketAddr {
    let app = Router::new()
        .route(
            "/auth/v1/token",
            post(|Json(body): Json<Value>| async move {
                if body["password"] == "secret" {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "access_token": TOKEN,
                            "user": {"id": "u1", "email": body["email"], "role": "authenticated"}
                        })),
                    )
                } else {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"error_description": "Invalid login credentials"})),
                    )
                }
            }),
        )
        .route(
            "/auth/v1/signup",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"user": {"id": "u2", "email": body["email"]}}))
            }),
        )
        .route(
            "/rest/v1/bonds",
            get(|headers: HeaderMap| async move {
                let bearer = format!("Bearer {TOKEN}");
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v == bearer);
                if authorized {
                    (StatusCode::OK, Json(json!([{"id": 1, "user_id": "u1", "nombre": "B1"}])))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({"message": "JWT expired"})))
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });
    addr
}

fn build(addr: SocketAddr, store_path: &Path) -> Keygate {
    let config = KeygateConfig::new(format!("http://{addr}"), "anon").store_path(store_path);
    Keygate::builder(config).build().expect("build should succeed")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_login_guard_logout_flow() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let app = build(addr, &dir.path().join("session.json"));

    assert_eq!(app.navigate("/bonds/list").unwrap().route.name, "login");

    let user = app.login("a@b.com", "secret").await.unwrap();
    assert_eq!(user.data().unwrap().id.as_str(), "u1");
    assert_eq!(app.status(), SessionStatus::Authenticated);
    assert_eq!(app.navigate("/bonds/list").unwrap().route.name, "bond-list");
    assert_eq!(app.navigate("/login").unwrap().route.name, "bond-list");

    app.logout().unwrap();
    assert_eq!(app.status(), SessionStatus::Unauthenticated);
    assert_eq!(app.navigate("/bonds/list").unwrap().route.name, "login");
}

#[tokio::test]
async fn test_login_persists_all_slots() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let app = build(addr, &dir.path().join("session.json"));

    app.login("a@b.com", "secret").await.unwrap();

    let store = app.store();
    assert_eq!(store.get_slot(Slot::Credential).as_deref(), Some(TOKEN));
    assert_eq!(store.get_slot(Slot::UserId).as_deref(), Some("u1"));
    assert_eq!(store.get_slot(Slot::UserEmail).as_deref(), Some("a@b.com"));
    let record: Value = serde_json::from_str(&store.get_slot(Slot::SerializedUser).unwrap()).unwrap();
    assert_eq!(record["role"], "authenticated");
}

#[tokio::test]
async fn test_login_wrong_password_leaves_session_untouched() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let app = build(addr, &dir.path().join("session.json"));

    let envelope = app.login("a@b.com", "wrong").await.unwrap();

    assert_eq!(envelope.error(), Some("Invalid login credentials"));
    assert_eq!(app.status(), SessionStatus::Unauthenticated);
    assert!(app.store().get_slot(Slot::Credential).is_none());
}

#[tokio::test]
async fn test_restart_recovers_session_and_authorizes_requests() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    {
        let app = build(addr, &path);
        app.login("a@b.com", "secret").await.unwrap();
    }

    let restarted = build(addr, &path);
    assert_eq!(restarted.status(), SessionStatus::Authenticated);
    assert_eq!(restarted.current_user_id().unwrap().as_str(), "u1");

    let bonds = restarted.my_bonds().await.unwrap();
    assert_eq!(bonds.data().unwrap()[0].fields["nombre"], "B1");
}

#[tokio::test]
async fn test_requests_after_logout_are_rejected_by_server() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let app = build(addr, &dir.path().join("session.json"));
    app.login("a@b.com", "secret").await.unwrap();
    let owner = app.current_user_id().unwrap();
    app.logout().unwrap();

    let envelope = app.bonds().list_by_user(&owner).await;

    assert_eq!(envelope.error(), Some("JWT expired"));
    assert_eq!(envelope.failure_kind(), Some(FailureKind::Rejected { status: 401 }));
}

#[tokio::test]
async fn test_my_bonds_without_session_is_not_signed_in() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let app = build(addr, &dir.path().join("session.json"));

    assert!(matches!(app.my_bonds().await, Err(KeygateError::NotSignedIn)));
    assert!(matches!(app.new_bond(), Err(KeygateError::NotSignedIn)));
}

#[tokio::test]
async fn test_register_does_not_sign_in() {
    let addr = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let app = build(addr, &dir.path().join("session.json"));

    let envelope = app.register("new@b.com", "pw").await;

    let user = envelope.data().and_then(|r| r.registered_user()).unwrap();
    assert_eq!(user.id.as_str(), "u2");
    assert_eq!(app.status(), SessionStatus::Unauthenticated);
}

#[test]
fn test_build_invalid_config_fails() {
    let err = Keygate::builder(KeygateConfig::new("not a url", "anon"))
        .store(Arc::new(MemoryStore::new()))
        .build()
        .unwrap_err();

    assert!(matches!(err, KeygateError::Config(ConfigError::InvalidProviderUrl(_))));
}

#[test]
fn test_build_corrupt_persisted_user_starts_signed_out() {
    let store = Arc::new(MemoryStore::new());
    store.set_slot(Slot::Credential, "tok").unwrap();
    store.set_slot(Slot::SerializedUser, "{oops").unwrap();

    let app = Keygate::builder(KeygateConfig::new("http://127.0.0.1:9", "anon"))
        .store(store.clone())
        .build()
        .unwrap();

    assert_eq!(app.status(), SessionStatus::Unauthenticated);
    assert!(store.get_slot(Slot::Credential).is_none());
}

#[test]
fn test_navigate_unknown_path_is_guard_error() {
    let app = Keygate::builder(KeygateConfig::new("http://127.0.0.1:9", "anon"))
        .store(Arc::new(MemoryStore::new()))
        .build()
        .unwrap();

    assert!(matches!(app.navigate("/nope"), Err(KeygateError::Guard(_))));
}
