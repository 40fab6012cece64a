use serde::{Deserialize, Serialize};
use thiserror::Error;

use basaltpass_core::TenantId;

use crate::{TenantMembership, TenantRole, User};

/// Which tenant a tenant-scoped capability refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantTarget {
    /// The tenant the user is currently acting in (see [`active_tenant`]).
    Active,
    /// A specific tenant, e.g. taken from the route.
    Id(TenantId),
}

/// A capability a page may require beyond being signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Platform super administrator.
    SuperAdmin,
    /// An active membership in `tenant` with a role of at least `min_role`.
    TenantRole { tenant: TenantTarget, min_role: TenantRole },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("super admin privileges required")]
    NotSuperAdmin,

    #[error("no active tenant for this user")]
    NoActiveTenant,

    #[error("not a member of tenant {0}")]
    NotTenantMember(TenantId),

    #[error("role '{actual}' in tenant {tenant} does not satisfy '{required}'")]
    InsufficientRole {
        tenant: TenantId,
        required: TenantRole,
        actual: TenantRole,
    },
}

/// Decide whether `user` holds `capability`.
///
/// - No IO
/// - No panics
/// - Super admins hold every capability
pub fn authorize(
    user: Option<&User>,
    memberships: &[TenantMembership],
    capability: &Capability,
) -> Result<(), AccessError> {
    let user = user.ok_or(AccessError::NotAuthenticated)?;

    match capability {
        Capability::SuperAdmin if user.is_super_admin => Ok(()),
        Capability::SuperAdmin => Err(AccessError::NotSuperAdmin),
        Capability::TenantRole { .. } if user.is_super_admin => Ok(()),
        Capability::TenantRole { tenant, min_role } => {
            let tenant_id = match tenant {
                TenantTarget::Id(id) => *id,
                TenantTarget::Active => {
                    active_tenant(user, memberships).ok_or(AccessError::NoActiveTenant)?
                }
            };

            let role = tenant_role_in(user, memberships, tenant_id)
                .ok_or(AccessError::NotTenantMember(tenant_id))?;

            if role.at_least(min_role) {
                Ok(())
            } else {
                Err(AccessError::InsufficientRole {
                    tenant: tenant_id,
                    required: min_role.clone(),
                    actual: role,
                })
            }
        }
    }
}

/// The tenant the user is acting in.
///
/// The profile's own `tenant_id` wins; otherwise a user with exactly one
/// active membership acts in that tenant.
pub fn active_tenant(user: &User, memberships: &[TenantMembership]) -> Option<TenantId> {
    if let Some(id) = user.tenant_id {
        return Some(id);
    }

    let mut active = memberships.iter().filter(|m| m.is_active());
    match (active.next(), active.next()) {
        (Some(only), None) => Some(only.tenant_id),
        _ => None,
    }
}

/// Highest role the user holds in `tenant_id` through an active membership.
///
/// The profile's `tenant_id`/`tenant_role` pair counts as a membership.
/// A membership without a role is treated as `member`.
pub fn tenant_role_in(
    user: &User,
    memberships: &[TenantMembership],
    tenant_id: TenantId,
) -> Option<TenantRole> {
    let from_profile = (user.tenant_id == Some(tenant_id))
        .then(|| user.tenant_role.clone().unwrap_or(TenantRole::MEMBER));

    let from_memberships = memberships
        .iter()
        .filter(|m| m.tenant_id == tenant_id && m.is_active())
        .map(|m| m.role.clone().unwrap_or(TenantRole::MEMBER));

    from_profile
        .into_iter()
        .chain(from_memberships)
        .max_by_key(|role| role.rank())
}
