//! `basaltpass-core`: identifiers and console scopes shared by every crate.
//!
//! This crate contains no I/O and no HTTP concerns.

pub mod error;
pub mod id;
pub mod scope;

pub use error::{CoreError, CoreResult};
pub use id::{TenantId, UserId};
pub use scope::Scope;
