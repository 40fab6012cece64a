//! Session snapshot published by the controller.

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use basaltpass_auth::{TenantMembership, User};

/// Lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing has been checked yet (app boot).
    Uninitialized,
    /// A bootstrap check is in flight.
    Checking,
    Authenticated,
    Unauthenticated,
}

/// The client's view of who is signed in.
///
/// # Invariants
/// - `is_authenticated()` is true iff a user is present.
/// - Memberships are empty whenever no user is present.
///
/// Fields are private and every constructor upholds the invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    status: SessionStatus,
    user: Option<User>,
    tenant_memberships: Vec<TenantMembership>,
    is_loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl Session {
    /// Empty session created at boot, before any check ran.
    pub fn uninitialized() -> Self {
        Self {
            status: SessionStatus::Uninitialized,
            user: None,
            tenant_memberships: Vec::new(),
            is_loading: true,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user: None,
            tenant_memberships: Vec::new(),
            is_loading: false,
        }
    }

    pub fn authenticated(user: User, tenant_memberships: Vec<TenantMembership>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            user: Some(user),
            tenant_memberships,
            is_loading: false,
        }
    }

    /// The same session, marked as being (re)checked.
    pub(crate) fn checking(&self) -> Self {
        Self {
            status: SessionStatus::Checking,
            is_loading: true,
            ..self.clone()
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn tenant_memberships(&self) -> &[TenantMembership] {
        &self.tenant_memberships
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether a check has settled at least once.
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, SessionStatus::Authenticated | SessionStatus::Unauthenticated)
    }
}

impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Session", 5)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("is_authenticated", &self.is_authenticated())?;
        state.serialize_field("is_loading", &self.is_loading)?;
        state.serialize_field("user", &self.user)?;
        state.serialize_field("tenant_memberships", &self.tenant_memberships)?;
        state.end()
    }
}
