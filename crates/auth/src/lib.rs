//! `basaltpass-auth`: client-side identity model and capability checks.
//!
//! No HTTP and no storage here. Nothing in this crate
//! is a security boundary: the backend is the authority, these checks only
//! keep a console from rendering pages the user cannot use.

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{
    AccessError, Capability, TenantTarget, active_tenant, authorize, tenant_role_in,
};
pub use claims::{ClaimsError, ScopeClaim, TokenClaims};
pub use principal::{TenantMembership, User};
pub use roles::TenantRole;
pub use token::AccessToken;
