use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use configuration::load_config_with_env;
use database::DbRepository;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use web_server::{build_router, AppState};

fn app() -> Router {
    let settings = load_config_with_env(None, |_| None).unwrap();
    let repo = DbRepository::offline(&settings.database.schema).unwrap();
    let state = AppState::new(settings, repo).unwrap();
    build_router(Arc::new(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(
            r#"{{"username":"{username}","password":"{password}"}}"#
        )))
        .unwrap()
}

/// Logs in and returns the `name=value` pair of the session cookie.
async fn session_cookie(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(login_request(username, password))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets the session cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn offline_login_options_list_demo_users() {
    let response = app().oneshot(get("/api/login-options", None)).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["demo_mode"], Value::Bool(true));
    assert_eq!(body["entra_enabled"], Value::Bool(false));
    assert_eq!(body["demo_credentials"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = app();
    for uri in ["/api/me", "/api/kpis", "/api/extract", "/api/analysis/liquidity"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = app
        .oneshot(get("/api/me", Some("painel_session=not-a-session")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_me_returns_the_user() {
    let app = app();
    let cookie = session_cookie(&app, "gestor", "gestor123").await;

    let response = app.oneshot(get("/api/me", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "gestor");
    assert_eq!(body["profile"], "gestor");
}

#[tokio::test]
async fn unsigned_session_cookie_is_rejected() {
    let app = app();
    let response = app
        .clone()
        .oneshot(login_request("admin", "admin123"))
        .await
        .unwrap();
    let session_id = body_json(response).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    // The bare session id is valid server-side but carries no signature.
    let forged = format!("painel_session={session_id}");
    let response = app.oneshot(get("/api/me", Some(&forged))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let response = app()
        .oneshot(login_request("admin", "nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app();
    let cookie = session_cookie(&app, "admin", "admin123").await;

    let logout = Request::builder()
        .method("POST")
        .uri("/api/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/me", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn monitoring_is_restricted_to_managers() {
    let app = app();

    let viewer = session_cookie(&app, "usuario", "usuario123").await;
    let response = app
        .clone()
        .oneshot(get("/api/monitoring", Some(&viewer)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = session_cookie(&app, "admin", "admin123").await;
    let response = app
        .oneshot(get("/api/monitoring", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["database"]["connected"], Value::Bool(false));
    assert_eq!(body["database"]["view"], "DW_STAGING.vw_extrato");
}

#[tokio::test]
async fn inverted_dates_are_rejected() {
    let app = app();
    let cookie = session_cookie(&app, "admin", "admin123").await;

    let response = app
        .oneshot(get(
            "/api/extract?start_date=2024-02-01&end_date=2024-01-01",
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn offline_reads_degrade_to_empty_data() {
    let app = app();
    let cookie = session_cookie(&app, "admin", "admin123").await;

    let response = app
        .clone()
        .oneshot(get("/api/extract?preset=7d", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
    assert!(body["message"].is_string());

    let response = app
        .clone()
        .oneshot(get("/api/analysis/concentration", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], Value::Bool(false));
    assert_eq!(body["analysis_type"], "concentration");

    let response = app
        .oneshot(get("/api/kpis", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["kpis"]["operation_count"], 0);
}

#[tokio::test]
async fn unknown_analysis_is_not_found() {
    let app = app();
    let cookie = session_cookie(&app, "admin", "admin123").await;
    let response = app
        .oneshot(get("/api/analysis/volatility", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
