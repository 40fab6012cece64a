//! The signed-in user and their tenant memberships, as reported by the backend.

use serde::{Deserialize, Serialize};

use basaltpass_core::{TenantId, UserId};

use crate::roles::TenantRole;

/// Current user's profile (`GET /api/v1/user/profile`).
///
/// Read-only from the client's perspective; profile edits go through their own
/// endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, alias = "avatarUrl", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(default, alias = "isSuperAdmin")]
    pub is_super_admin: bool,

    #[serde(default, alias = "hasTenant")]
    pub has_tenant: bool,

    #[serde(default, alias = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    #[serde(default, alias = "tenantRole", skip_serializing_if = "Option::is_none")]
    pub tenant_role: Option<TenantRole>,
}

impl User {
    /// Name to show in UI chrome: nickname, falling back to email.
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// A user's membership in a tenant (`GET /api/v1/user/tenants`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    #[serde(alias = "tenantId")]
    pub tenant_id: TenantId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<TenantRole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TenantMembership {
    /// Memberships without a status are active; otherwise only `active` is.
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_none_or(|s| s.trim().eq_ignore_ascii_case("active"))
    }
}
