//! The three backend calls the session lifecycle depends on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use basaltpass_auth::{AccessToken, TenantMembership, User};

pub const PROFILE_PATH: &str = "/api/v1/user/profile";
pub const TENANTS_PATH: &str = "/api/v1/user/tenants";
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Backend operations used by the session controller.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Fetch the profile of the token's owner.
    async fn fetch_profile(&self, token: &AccessToken) -> Result<User, ApiError>;

    /// Fetch the tenants the token's owner belongs to.
    async fn fetch_tenants(&self, token: &AccessToken) -> Result<Vec<TenantMembership>, ApiError>;

    /// Rotate the access token using the refresh cookie.
    ///
    /// `Ok(None)` means "not logged in" (no cookie, expired cookie, empty body).
    async fn refresh(&self) -> Result<Option<AccessToken>, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("authentication rejected (401)")]
    Unauthorized,
    #[error("API error ({0}): {1}")]
    Status(u16, String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

/// Response bodies arrive either bare or wrapped as `{ "data": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

#[derive(Deserialize)]
struct RefreshBody {
    #[serde(default, alias = "token")]
    access_token: Option<String>,
}

/// `reqwest`-backed [`AuthApi`].
///
/// The client keeps a cookie jar so the httpOnly refresh cookie set by the
/// backend is replayed on `refresh`.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self::with_client(base_url, client))
    }

    /// Use a preconfigured client (custom TLS, proxies, shared cookie jar).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &AccessToken,
    ) -> Result<T, ApiError> {
        tracing::debug!(path, "GET");
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16(), resp.text().await.unwrap_or_default()));
        }

        let body: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.into_inner())
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn fetch_profile(&self, token: &AccessToken) -> Result<User, ApiError> {
        self.get_json(PROFILE_PATH, token).await
    }

    async fn fetch_tenants(&self, token: &AccessToken) -> Result<Vec<TenantMembership>, ApiError> {
        self.get_json(TENANTS_PATH, token).await
    }

    async fn refresh(&self) -> Result<Option<AccessToken>, ApiError> {
        tracing::debug!(path = REFRESH_PATH, "POST");
        let resp = self
            .client
            .post(self.url(REFRESH_PATH))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST
                | StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::NOT_FOUND
        ) {
            tracing::debug!(%status, "refresh declined; no refresh cookie");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16(), resp.text().await.unwrap_or_default()));
        }

        let text = resp.text().await.map_err(|e| ApiError::Network(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        let body: Envelope<RefreshBody> =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.into_inner().access_token.and_then(AccessToken::non_empty))
    }
}
