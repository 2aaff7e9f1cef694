//! Login, restart and logout against a mock backend.

mod common;

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use common::Recorder;
use morasel_core::api::ApiError;
use morasel_core::auth::credentials::{TOKEN_KEY, USER_KEY};
use morasel_core::auth::MemoryBackend;
use morasel_core::{App, AppError, Config, CredentialStore, LoginForm, RegisterForm, Session};

fn backend(recorder: Recorder) -> Router {
    let login = post(|Json(body): Json<Value>| async move {
        if body["email"] == "a@b.com" && body["password"] == "secret1" {
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": "tok123",
                    "user": {"id": "u1", "name": "Ali", "email": "a@b.com"}
                })),
            )
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid credentials", "statusCode": 401})),
            )
        }
    });

    let register = post(|Json(body): Json<Value>| async move {
        Json(json!({
            "data": {
                "token": "legacy-tok",
                "user": {"id": 42, "name": body["name"], "email": body["email"]}
            }
        }))
    });

    let channels = get(move |headers: HeaderMap| {
        let recorder = recorder.clone();
        async move {
            recorder.record("/channels", &headers, None);
            Json(json!([{"id": "c1", "name": "Sales", "status": "connected"}]))
        }
    });

    Router::new()
        .route("/auth/login", login)
        .route("/auth/register", register)
        .route("/channels", channels)
}

fn config(base_url: &str) -> Config {
    Config {
        api_base_url: base_url.to_string(),
        ..Default::default()
    }
}

async fn setup() -> (String, Recorder, Arc<MemoryBackend>) {
    let recorder = Recorder::default();
    let base_url = common::serve(backend(recorder.clone())).await;
    (base_url, recorder, Arc::new(MemoryBackend::new()))
}

#[tokio::test]
async fn test_login_binds_token_and_persists() {
    let (base_url, recorder, memory) = setup().await;
    let app = App::with_store(&config(&base_url), CredentialStore::new(memory.clone())).unwrap();
    app.restore().await;

    let user = app.login(&LoginForm::new("a@b.com", "secret1")).await.unwrap();
    assert_eq!(user.id, "u1");

    let session = app.current();
    assert!(session.is_authenticated());
    assert!(!session.is_loading());
    assert_eq!(session.token(), Some("tok123"));
    assert_eq!(
        app.client().authorization_header().as_deref(),
        Some("Bearer tok123")
    );
    assert_eq!(memory.peek(TOKEN_KEY).as_deref(), Some("tok123"));
    assert!(memory.peek(USER_KEY).is_some());

    let channels = app.channels.list().await.unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(
        recorder.last().authorization.as_deref(),
        Some("Bearer tok123")
    );
}

#[tokio::test]
async fn test_logout_clears_header_for_next_request() {
    let (base_url, recorder, memory) = setup().await;
    let app = App::with_store(&config(&base_url), CredentialStore::new(memory.clone())).unwrap();
    app.login(&LoginForm::new("a@b.com", "secret1")).await.unwrap();

    app.logout().await.unwrap();
    assert_eq!(app.current(), Session::Unauthenticated);
    assert_eq!(memory.peek(TOKEN_KEY), None);
    assert_eq!(memory.peek(USER_KEY), None);

    app.channels.list().await.unwrap();
    assert_eq!(recorder.last().authorization, None);
}

#[tokio::test]
async fn test_restart_restores_identical_session() {
    let (base_url, recorder, memory) = setup().await;
    let first = App::with_store(&config(&base_url), CredentialStore::new(memory.clone())).unwrap();
    first.login(&LoginForm::new("a@b.com", "secret1")).await.unwrap();
    let before = first.current();
    drop(first);

    let second = App::with_store(&config(&base_url), CredentialStore::new(memory.clone())).unwrap();
    assert!(second.current().is_loading());
    assert!(second.restore().await.is_authenticated());
    assert_eq!(second.current(), before);

    second.channels.list().await.unwrap();
    assert_eq!(
        recorder.last().authorization.as_deref(),
        Some("Bearer tok123")
    );
}

#[tokio::test]
async fn test_rejected_login_keeps_session_signed_out() {
    let (base_url, _recorder, memory) = setup().await;
    let app = App::with_store(&config(&base_url), CredentialStore::new(memory.clone())).unwrap();

    let err = app
        .login(&LoginForm::new("a@b.com", "wrong-pass"))
        .await
        .unwrap_err();
    match err {
        AppError::Api(ApiError::Server { status, message }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(app.current(), Session::Unauthenticated);
    assert_eq!(memory.peek(TOKEN_KEY), None);
    assert!(app.client().authorization_header().is_none());
}

#[tokio::test]
async fn test_register_accepts_enveloped_legacy_token() {
    let (base_url, _recorder, memory) = setup().await;
    let app = App::with_store(&config(&base_url), CredentialStore::new(memory)).unwrap();

    let form = RegisterForm {
        name: " Ali ".into(),
        email: "ali@example.com".into(),
        phone: "+201000000000".into(),
        password: "secret1".into(),
    };
    let user = app.register(&form).await.unwrap();
    assert_eq!(user.id, "42");
    assert_eq!(user.name, "Ali");
    assert_eq!(app.current().token(), Some("legacy-tok"));
}

#[tokio::test]
async fn test_store_write_failure_publishes_nothing() {
    let (base_url, _recorder, memory) = setup().await;
    let app = App::with_store(&config(&base_url), CredentialStore::new(memory.clone())).unwrap();
    app.restore().await;
    memory.fail_writes(true);

    let err = app.login(&LoginForm::new("a@b.com", "secret1")).await.unwrap_err();
    assert!(matches!(err, AppError::Session(_)));
    assert_eq!(app.current(), Session::Unauthenticated);
    assert!(app.client().authorization_header().is_none());
}
