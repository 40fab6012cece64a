use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A user's role within a tenant.
///
/// Roles are opaque strings on the wire. The well-known roles form a
/// hierarchy (`owner > admin > member`); unknown roles rank below all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantRole(Cow<'static, str>);

impl TenantRole {
    pub const OWNER: TenantRole = TenantRole(Cow::Borrowed("owner"));
    pub const ADMIN: TenantRole = TenantRole(Cow::Borrowed("admin"));
    pub const MEMBER: TenantRole = TenantRole(Cow::Borrowed("member"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position in the role hierarchy; `None` for roles the client does not know.
    pub fn rank(&self) -> Option<u8> {
        let name = self.as_str().trim();
        if name.eq_ignore_ascii_case("owner") {
            Some(3)
        } else if name.eq_ignore_ascii_case("admin") {
            Some(2)
        } else if name.eq_ignore_ascii_case("member") {
            Some(1)
        } else {
            None
        }
    }

    /// Whether this role grants at least the privileges of `min`.
    ///
    /// Unknown roles only satisfy an identical unknown requirement.
    pub fn at_least(&self, min: &TenantRole) -> bool {
        match (self.rank(), min.rank()) {
            (Some(have), Some(need)) => have >= need,
            (_, None) => self == min,
            (None, Some(_)) => false,
        }
    }
}

impl PartialEq for TenantRole {
    fn eq(&self, other: &Self) -> bool {
        self.as_str().trim().eq_ignore_ascii_case(other.as_str().trim())
    }
}

impl Eq for TenantRole {}

impl core::fmt::Display for TenantRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
