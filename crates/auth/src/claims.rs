//! Unverified access-token claims.
//!
//! The console decodes the JWT payload only to learn which console the token
//! was minted for and when it expires. Signature verification is the
//! backend's job.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use basaltpass_core::Scope;

/// Claim names that may carry the console scope, in lookup order.
const SCOPE_CLAIMS: [&str; 3] = ["scope", "scp", "aud"];

/// Claims the client cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (user id as issued by the backend).
    pub subject: Option<String>,

    /// What the token says about the console it was issued for.
    pub scope: ScopeClaim,

    /// Tenant the token was issued within (tenant console tokens).
    pub tenant_id: Option<String>,

    pub issued_at: Option<DateTime<Utc>>,

    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of the scope claim lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeClaim {
    /// None of `scope`, `scp` or `aud` is present.
    Absent,
    /// A scope claim is present but names no console. Holds the raw claim.
    Unrecognized(String),
    Known(Scope),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token is not a JWT ({0})")]
    Malformed(&'static str),

    #[error("token payload is not valid base64url")]
    Encoding,

    #[error("token payload: {0}")]
    Payload(String),

    #[error("token scope claim names no known console: {0}")]
    UnrecognizedScope(String),
}

impl TokenClaims {
    /// Decode the payload segment of a compact JWT without verification.
    pub fn decode_unverified(token: &str) -> Result<Self, ClaimsError> {
        let mut parts = token.trim().split('.');
        let _header = parts
            .next()
            .filter(|h| !h.is_empty())
            .ok_or(ClaimsError::Malformed("missing header"))?;
        let payload = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or(ClaimsError::Malformed("missing payload"))?;
        if parts.next().is_none() {
            return Err(ClaimsError::Malformed("missing signature"));
        }
        if parts.next().is_some() {
            return Err(ClaimsError::Malformed("too many segments"));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| ClaimsError::Encoding)?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Payload(e.to_string()))?;
        if !value.is_object() {
            return Err(ClaimsError::Payload("expected a JSON object".to_string()));
        }

        Ok(Self::from_value(&value))
    }

    fn from_value(value: &Value) -> Self {
        let present: Vec<&Value> = SCOPE_CLAIMS
            .iter()
            .filter_map(|name| value.get(*name))
            .collect();
        let scope = match present.iter().find_map(|claim| scope_from_claim(claim)) {
            Some(scope) => ScopeClaim::Known(scope),
            None => match present.first() {
                Some(raw) => {
                    tracing::debug!("token scope claim names no known console");
                    ScopeClaim::Unrecognized(raw_claim(raw))
                }
                None => ScopeClaim::Absent,
            },
        };

        Self {
            subject: value.get("sub").and_then(string_or_number),
            scope,
            tenant_id: value
                .get("tid")
                .or_else(|| value.get("tenant_id"))
                .and_then(string_or_number),
            issued_at: value.get("iat").and_then(timestamp),
            expires_at: value.get("exp").and_then(timestamp),
        }
    }

    /// Scope used for the console check.
    ///
    /// Tokens without any scope claim predate console scoping and are
    /// user-console tokens. A scope claim that names no console is an error.
    pub fn console_scope(&self) -> Result<Scope, ClaimsError> {
        match &self.scope {
            ScopeClaim::Absent => Ok(Scope::User),
            ScopeClaim::Known(scope) => Ok(*scope),
            ScopeClaim::Unrecognized(raw) => Err(ClaimsError::UnrecognizedScope(raw.clone())),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

fn scope_from_claim(claim: &Value) -> Option<Scope> {
    match claim {
        Value::String(s) => s.split_whitespace().find_map(|word| word.parse().ok()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .find_map(|s| s.parse().ok()),
        _ => None,
    }
}

fn raw_claim(claim: &Value) -> String {
    match claim {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_or_number(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp(secs, 0)
}
