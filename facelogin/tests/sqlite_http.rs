#![cfg(all(feature = "sqlite", feature = "http"))]

use std::sync::Arc;

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use chrono::{Duration, Utc};
use facelogin::{
    HttpAuthApi, HttpAuthApiConfig, LoginForm, LoginGuardConfig, LoginOutcome, LoginPortal,
    LoginResult, SqliteStateStore, StateStore, keys,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

async fn login_handler(Json(body): Json<Value>) -> axum::response::Response {
    if body["username"] == "crash" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if body["username"] == "sv001" && body["password"] == "secret" {
        let token = encode(
            &Header::default(),
            &json!({ "sub": "sv001", "exp": (Utc::now() + Duration::hours(1)).timestamp() }),
            &EncodingKey::from_secret(b"server-secret"),
        )
        .unwrap();
        return Json(json!({
            "accessToken": token,
            "refreshToken": "refresh-sv001",
            "user": { "username": "sv001", "vaiTro": "SINHVIEN" }
        }))
        .into_response();
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Sai tên đăng nhập hoặc mật khẩu" })),
    )
        .into_response()
}

async fn spawn_server() -> HttpAuthApi {
    let router = Router::new().route("/api/auth/login", post(login_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    HttpAuthApi::new(HttpAuthApiConfig::default().with_base_url(format!("http://{addr}/api")))
        .unwrap()
}

async fn setup_store() -> Arc<SqliteStateStore> {
    let store = SqliteStateStore::connect("sqlite::memory:").await.unwrap();
    store.migrate().await.unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn test_sqlite_http_login() {
    let _ = tracing_subscriber::fmt::try_init();
    let store = setup_store().await;
    let api = Arc::new(spawn_server().await);
    let portal = LoginPortal::new(store.clone(), api);

    let result = portal.login(LoginForm::new("sv001", "wrong1")).await.unwrap();
    assert_eq!(
        result,
        LoginResult::Refused(LoginOutcome::Rejected {
            message: "Sai tên đăng nhập hoặc mật khẩu".to_string(),
            attempts_remaining: 2,
        })
    );
    assert_eq!(
        store.get(keys::LOGIN_ATTEMPTS).await.unwrap().as_deref(),
        Some("1")
    );

    let result = portal
        .login(LoginForm::new("sv001", "secret").remember_me(true))
        .await
        .unwrap();
    assert_eq!(result.route(), Some("/student/dashboard"));
    assert_eq!(store.get(keys::LOGIN_ATTEMPTS).await.unwrap(), None);
    assert_eq!(
        store.get(keys::REMEMBER_ME).await.unwrap().as_deref(),
        Some("true")
    );
    assert_eq!(
        portal.existing_login_route().await.unwrap(),
        Some("/student/dashboard")
    );
}

#[tokio::test]
async fn test_sqlite_http_lockout() {
    let _ = tracing_subscriber::fmt::try_init();
    let store = setup_store().await;
    let api = Arc::new(spawn_server().await);
    let config = LoginGuardConfig::default().with_max_attempts(2);
    let portal = LoginPortal::with_config(store.clone(), api.clone(), config.clone());

    portal.login(LoginForm::new("sv001", "wrong1")).await.unwrap();
    let result = portal.login(LoginForm::new("sv001", "wrong2")).await.unwrap();
    assert_eq!(
        result,
        LoginResult::Refused(LoginOutcome::LockedJustNow { lockout_ms: 900_000 })
    );

    // A new portal over the same database is still locked, even for the right password
    let reloaded = LoginPortal::with_config(store.clone(), api, config);
    let result = reloaded.login(LoginForm::new("sv001", "secret")).await.unwrap();
    assert!(matches!(
        result,
        LoginResult::Refused(LoginOutcome::Locked { remaining_ms }) if remaining_ms <= 900_000
    ));

    let status = reloaded.status().await.unwrap();
    assert!(status.locked);
    assert_eq!(status.attempts_remaining, 0);
}

#[tokio::test]
async fn test_sqlite_http_server_errors_count_toward_lockout() {
    let _ = tracing_subscriber::fmt::try_init();
    let store = setup_store().await;
    let api = Arc::new(spawn_server().await);
    let portal = LoginPortal::new(store.clone(), api);

    for remaining in [2, 1] {
        let result = portal.login(LoginForm::new("crash", "secret")).await.unwrap();
        assert_eq!(
            result,
            LoginResult::Refused(LoginOutcome::Rejected {
                message: "boom".to_string(),
                attempts_remaining: remaining,
            })
        );
    }

    let result = portal.login(LoginForm::new("crash", "secret")).await.unwrap();
    assert_eq!(
        result,
        LoginResult::Refused(LoginOutcome::LockedJustNow { lockout_ms: 900_000 })
    );

    for _ in 0..2 {
        let result = portal.login(LoginForm::new("crash", "secret")).await.unwrap();
        assert!(matches!(
            result,
            LoginResult::Refused(LoginOutcome::Locked { .. })
        ));
    }
    assert!(portal.status().await.unwrap().locked);
}
