//! Session error taxonomy.
//!
//! Lower-level HTTP and storage errors are translated into these variants by
//! the controller; nothing below this layer reaches UI code.

use thiserror::Error;

use basaltpass_auth::{ClaimsError, TenantMembership};
use basaltpass_core::Scope;

use crate::api::ApiError;
use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The backend rejected the token (401). Always ends the session.
    #[error("authentication rejected by the server")]
    AuthRejected,

    /// The token was minted for another console. Ends the session without a
    /// server round trip.
    #[error("token scope mismatch: console expects '{expected}', token is for '{found}'")]
    ScopeMismatch { expected: Scope, found: Scope },

    /// The token could not be decoded or has expired.
    #[error("invalid access token: {0}")]
    InvalidToken(String),

    /// Network or server failure. Session state is left as it was.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The token could not be persisted or removed.
    #[error("token storage failed: {0}")]
    Storage(String),
}

impl SessionError {
    /// Whether this error ends the session (as opposed to "retry later").
    pub fn forces_logout(&self) -> bool {
        !matches!(self, SessionError::Transient(_))
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => SessionError::AuthRejected,
            other => SessionError::Transient(other.to_string()),
        }
    }
}

impl From<ClaimsError> for SessionError {
    fn from(err: ClaimsError) -> Self {
        SessionError::InvalidToken(err.to_string())
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Storage(err.to_string())
    }
}

/// Default-on-error policy for the tenant membership fetch.
///
/// A failed fetch never affects authentication; it is logged and yields an
/// empty list.
pub fn best_effort(result: Result<Vec<TenantMembership>, ApiError>) -> Vec<TenantMembership> {
    match result {
        Ok(memberships) => memberships,
        Err(err) => {
            tracing::warn!("tenant membership fetch failed, continuing without memberships: {err}");
            Vec::new()
        }
    }
}
