use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;

use basaltpass_auth::AccessToken;
use basaltpass_core::{Scope, TenantId, UserId};
use basaltpass_session::{
    ApiError, AuthApi, CheckOutcome, FileTokenStore, HttpAuthApi, RecordingNavigator,
    SessionController, TokenStore,
};

const TIMEOUT: Duration = Duration::from_secs(5);

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let app = Router::new()
            .route("/api/v1/user/profile", get(profile))
            .route("/api/v1/user/tenants", get(tenants))
            .route("/api/v1/auth/refresh", post(refresh))
            .route("/test/cookie/:value", get(set_cookie));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn jwt(scope: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 600;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({"sub": "1", "scope": scope, "exp": exp});
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

async fn profile(headers: HeaderMap) -> Response {
    let user = json!({
        "id": 1,
        "email": "ada@example.com",
        "nickname": "ada",
        "is_super_admin": false,
    });
    match bearer(&headers) {
        None | Some("revoked") => StatusCode::UNAUTHORIZED.into_response(),
        Some("broken") => {
            (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response()
        }
        Some("bare") => axum::Json(user).into_response(),
        Some(_) => axum::Json(json!({"data": user, "message": "ok"})).into_response(),
    }
}

async fn tenants(headers: HeaderMap) -> Response {
    if bearer(&headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    axum::Json(json!({
        "data": [{"tenant_id": 7, "name": "Acme", "role": "owner", "status": "active"}]
    }))
    .into_response()
}

async fn refresh(headers: HeaderMap) -> Response {
    match cookie(&headers, "refresh_token").as_deref() {
        Some("ok") => axum::Json(json!({"data": {"access_token": jwt("user")}})).into_response(),
        Some("empty") => StatusCode::OK.into_response(),
        Some("boom") => StatusCode::BAD_GATEWAY.into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn set_cookie(Path(value): Path<String>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, format!("refresh_token={value}; Path=/; HttpOnly"))],
        "ok",
    )
}

/// Client with a cookie jar primed with `refresh_token=<value>`.
async fn client_with_cookie(server: &TestServer, value: &str) -> reqwest::Client {
    let client = reqwest::Client::builder().cookie_store(true).build().unwrap();
    let res = client
        .get(format!("{}/test/cookie/{}", server.base_url, value))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    client
}

#[tokio::test]
async fn profile_is_unwrapped_from_envelope() {
    let server = TestServer::spawn().await;
    let api = HttpAuthApi::new(server.base_url.clone(), TIMEOUT).unwrap();

    let user = api.fetch_profile(&AccessToken::new("good")).await.unwrap();
    assert_eq!(user.id, UserId::new(1));
    assert_eq!(user.email, "ada@example.com");

    let bare = api.fetch_profile(&AccessToken::new("bare")).await.unwrap();
    assert_eq!(bare, user);
}

#[tokio::test]
async fn profile_maps_status_codes() {
    let server = TestServer::spawn().await;
    let api = HttpAuthApi::new(format!("{}/", server.base_url), TIMEOUT).unwrap();

    let err = api.fetch_profile(&AccessToken::new("revoked")).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    assert!(err.is_auth_rejected());

    let err = api.fetch_profile(&AccessToken::new("broken")).await.unwrap_err();
    assert_eq!(err, ApiError::Status(500, "database unavailable".to_string()));
    assert!(!err.is_auth_rejected());
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpAuthApi::new(format!("http://{addr}"), TIMEOUT).unwrap();
    let err = api.fetch_profile(&AccessToken::new("good")).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn tenants_are_decoded() {
    let server = TestServer::spawn().await;
    let api = HttpAuthApi::new(server.base_url.clone(), TIMEOUT).unwrap();

    let memberships = api.fetch_tenants(&AccessToken::new("good")).await.unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].tenant_id, TenantId::new(7));
    assert!(memberships[0].is_active());
}

#[tokio::test]
async fn refresh_uses_cookie_jar() {
    let server = TestServer::spawn().await;

    let without_cookie = HttpAuthApi::new(server.base_url.clone(), TIMEOUT).unwrap();
    assert_eq!(without_cookie.refresh().await.unwrap(), None);

    let client = client_with_cookie(&server, "ok").await;
    let api = HttpAuthApi::with_client(server.base_url.clone(), client);
    let token = api.refresh().await.unwrap().expect("refresh should issue a token");
    assert_eq!(token.claims().unwrap().console_scope(), Ok(Scope::User));
}

#[tokio::test]
async fn refresh_with_empty_body_is_not_logged_in() {
    let server = TestServer::spawn().await;
    let client = client_with_cookie(&server, "empty").await;
    let api = HttpAuthApi::with_client(server.base_url.clone(), client);

    assert_eq!(api.refresh().await.unwrap(), None);
}

#[tokio::test]
async fn refresh_server_error_is_reported() {
    let server = TestServer::spawn().await;
    let client = client_with_cookie(&server, "boom").await;
    let api = HttpAuthApi::with_client(server.base_url.clone(), client);

    let err = api.refresh().await.unwrap_err();
    assert!(matches!(err, ApiError::Status(502, _)));
}

#[tokio::test]
async fn bootstrap_restores_session_from_refresh_cookie() {
    let server = TestServer::spawn().await;
    let client = client_with_cookie(&server, "ok").await;
    let api = HttpAuthApi::with_client(server.base_url.clone(), client);

    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    let mut controller = SessionController::new(api, store, RecordingNavigator::new(), Scope::User);

    assert_eq!(controller.check_auth().await, CheckOutcome::Authenticated);
    let session = controller.session();
    assert!(session.is_authenticated());
    assert_eq!(session.tenant_memberships().len(), 1);

    // Refreshed token was persisted for the next boot.
    let reopened = FileTokenStore::new(dir.path());
    assert!(reopened.get().is_some());
}
