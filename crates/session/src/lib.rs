//! `basaltpass-session`
//!
//! **Responsibility:** client-side session lifecycle for the BasaltPass
//! consoles.
//!
//! This crate provides:
//! - Access-token persistence (`TokenStore`)
//! - The backend calls the session needs (`AuthApi`)
//! - The session state machine (`SessionController`)
//! - Route guard decisions over session snapshots (`guard`)
//!
//! The backend remains the authority on every decision made here.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod guard;
pub mod navigator;
pub mod session;
pub mod store;

pub use api::{ApiError, AuthApi, HttpAuthApi};
pub use config::SessionConfig;
pub use controller::{CheckOutcome, SessionController};
pub use error::{SessionError, best_effort};
pub use guard::{
    AllowWhen, AuthRequirement, DeniedTarget, GuardDecision, GuardRoutes, Location, RoutePolicy,
    evaluate,
};
pub use navigator::{Navigator, RecordingNavigator};
pub use session::{Session, SessionStatus};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
