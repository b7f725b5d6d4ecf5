//! Tests the REST backend against a real in-process server.
//!
//! The mock mirrors the booking service's auth endpoints: one account,
//! a `SESSION` cookie on login, 401 from `currentUser` without it.

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use railpass_http::{HttpAuthBackend, HttpConfig, HttpError};
use railpass_protocol::{Credentials, Principal, Registration};
use railpass_session::{AuthBackend, Environment, SessionConfig, SessionController, SessionError};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const PHONE: &str = "13800138000";
const PASSWORD: &str = "password123";
const COOKIE: &str = "SESSION=4f2a";

fn user() -> Value {
    json!({ "id": "1", "phoneNumber": PHONE, "realName": "Zhang San" })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["phoneNumber"] != PHONE {
        let reply = json!({ "success": false, "message": "user not found" });
        return (StatusCode::BAD_REQUEST, Json(reply)).into_response();
    }
    if body["password"] != PASSWORD {
        let reply = json!({ "success": false, "message": "incorrect password" });
        return (StatusCode::UNAUTHORIZED, Json(reply)).into_response();
    }
    let reply = json!({ "success": true, "message": "login ok", "user": user() });
    (
        StatusCode::OK,
        [(header::SET_COOKIE, format!("{COOKIE}; Path=/"))],
        Json(reply),
    )
        .into_response()
}

async fn current_user(headers: HeaderMap) -> Response {
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|cookies| cookies.contains(COOKIE));
    if has_session {
        Json(json!({ "success": true, "user": user() })).into_response()
    } else {
        let reply = json!({ "success": false, "message": "not logged in" });
        (StatusCode::UNAUTHORIZED, Json(reply)).into_response()
    }
}

async fn logout() -> Json<Value> {
    Json(json!({ "success": true, "message": "logged out" }))
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["phoneNumber"] == PHONE {
        let reply = json!({ "success": false, "message": "phone number is already registered" });
        return (StatusCode::BAD_REQUEST, Json(reply)).into_response();
    }
    let mut created = body.clone();
    created["id"] = json!("2");
    if let Some(fields) = created.as_object_mut() {
        fields.remove("password");
    }
    Json(json!({ "success": true, "user": created })).into_response()
}

async fn not_json() -> &'static str {
    "<html>oops</html>"
}

async fn crash() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
}

async fn success_without_user() -> Json<Value> {
    Json(json!({ "success": true }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "success": true, "user": user() }))
}

/// Starts the mock server and returns its `http://addr` origin.
async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/register", post(register))
        .route("/api/auth/currentUser", get(current_user))
        .route("/html/auth/currentUser", get(not_json))
        .route("/crash/auth/login", post(crash))
        .route("/empty/auth/login", post(success_without_user))
        .route("/slow/auth/currentUser", get(slow));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn backend(origin: &str, prefix: &str) -> HttpAuthBackend {
    HttpAuthBackend::new(HttpConfig::new(format!("{origin}{prefix}"))).expect("client")
}

#[tokio::test]
async fn test_login_returns_principal() {
    let origin = spawn_server().await;
    let api = backend(&origin, "/api");

    let user = api.login(PHONE, PASSWORD).await.unwrap();
    assert_eq!(user.phone_number(), Some(PHONE));
    assert_eq!(user.get("realName"), Some(&json!("Zhang San")));
}

#[tokio::test]
async fn test_login_rejection_passes_message_through() {
    let origin = spawn_server().await;
    let api = backend(&origin, "/api");

    let err = api.login("13900000000", PASSWORD).await.unwrap_err();
    assert_eq!(err, SessionError::Rejected("user not found".into()));

    let err = api.login(PHONE, "wrong").await.unwrap_err();
    assert_eq!(err, SessionError::Rejected("incorrect password".into()));
}

#[tokio::test]
async fn test_current_user_follows_session_cookie() {
    let origin = spawn_server().await;
    let api = backend(&origin, "/api");

    assert_eq!(api.current_user().await.unwrap(), None, "401 means no session");

    api.login(PHONE, PASSWORD).await.unwrap();
    let user = api.current_user().await.unwrap().expect("cookie replayed");
    assert_eq!(user.phone_number(), Some(PHONE));
}

#[tokio::test]
async fn test_logout_acknowledged() {
    let origin = spawn_server().await;
    assert!(backend(&origin, "/api").logout().await.is_ok());
}

#[tokio::test]
async fn test_register_success_and_duplicate() {
    let origin = spawn_server().await;
    let api = backend(&origin, "/api");

    let form = Registration {
        phone_number: "13900139000".into(),
        password: "pw".into(),
        email: Some("li@example.com".into()),
        ..Registration::default()
    };
    let created = api.register(&form).await.unwrap();
    assert_eq!(created.phone_number(), Some("13900139000"));
    assert_eq!(created.get("password"), None);

    let dup = Registration {
        phone_number: PHONE.into(),
        ..form
    };
    let err = api.register(&dup).await.unwrap_err();
    assert!(matches!(err, SessionError::Rejected(m) if m.contains("already registered")));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let origin = spawn_server().await;
    let err = backend(&origin, "/html").current_user().await.unwrap_err();
    assert!(matches!(err, SessionError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let origin = spawn_server().await;
    let err = backend(&origin, "/crash").login(PHONE, PASSWORD).await.unwrap_err();
    assert!(matches!(err, SessionError::Unavailable(_)));
}

#[tokio::test]
async fn test_success_without_user_is_malformed() {
    let origin = spawn_server().await;
    let err = backend(&origin, "/empty").login(PHONE, PASSWORD).await.unwrap_err();
    assert!(matches!(err, SessionError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = backend(&format!("http://{addr}"), "/api");
    let err = api.current_user().await.unwrap_err();
    assert!(matches!(err, SessionError::Unavailable(_)));
}

#[tokio::test]
async fn test_request_timeout_is_unavailable() {
    let origin = spawn_server().await;
    let config = HttpConfig {
        base_url: format!("{origin}/slow"),
        timeout_ms: 200,
    };
    let err = HttpAuthBackend::new(config)
        .unwrap()
        .current_user()
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Unavailable("request timed out".into()));
}

#[test]
fn test_invalid_base_url_rejected() {
    let err = HttpAuthBackend::new(HttpConfig::new("localhost:8080")).unwrap_err();
    assert!(matches!(err, HttpError::InvalidBaseUrl(_)));
}

#[tokio::test]
async fn test_controller_over_http_login_check_logout() {
    let origin = spawn_server().await;
    let controller = SessionController::new(
        backend(&origin, "/api"),
        SessionConfig::default(),
        Environment::default(),
    );

    controller
        .login(&Credentials::new(PHONE, PASSWORD))
        .await
        .unwrap();
    assert!(controller.is_authenticated());
    assert!(controller.check_session().await);

    controller.logout().await;
    assert!(!controller.is_authenticated());
    assert_eq!(controller.take_timeout_notice(), None);
}

#[tokio::test]
async fn test_controller_check_session_without_cookie_signs_out() {
    let origin = spawn_server().await;
    let controller = SessionController::new(
        backend(&origin, "/api"),
        SessionConfig::default(),
        Environment::default(),
    );
    controller.restore(Principal::from_value(user()).unwrap());

    assert!(!controller.check_session().await);
    assert!(!controller.is_authenticated());
}
