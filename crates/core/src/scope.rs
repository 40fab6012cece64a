//! Console scope (token audience).
//!
//! Every access token is minted for exactly one console. A console only
//! accepts tokens whose scope matches its own.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The console an access token was issued for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// End-user self-service console.
    #[default]
    User,
    /// Tenant administration console.
    Tenant,
    /// Platform administration console.
    Admin,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::User, Scope::Tenant, Scope::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Tenant => "tenant",
            Scope::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Scope::User),
            "tenant" => Ok(Scope::Tenant),
            "admin" => Ok(Scope::Admin),
            other => Err(CoreError::invalid_scope(other)),
        }
    }
}
