//! Bearer access token.

use serde::{Deserialize, Serialize};

use crate::claims::{ClaimsError, TokenClaims};

/// An opaque bearer token as handed out by the backend.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Build a token from possibly-empty input (storage, response bodies).
    pub fn non_empty(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == value.len() {
            Some(Self(value))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload claims without verifying the signature.
    pub fn claims(&self) -> Result<TokenClaims, ClaimsError> {
        TokenClaims::decode_unverified(self.as_str())
    }
}

impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AccessToken(<redacted, {} bytes>)", self.0.len())
    }
}
