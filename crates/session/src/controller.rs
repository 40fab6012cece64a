//! Session controller: the only thing allowed to change a [`Session`].
//!
//! State machine:
//!
//! ```text
//! uninitialized ──check_auth──▶ checking ──▶ authenticated
//!                                    │              │ logout / 401
//!                                    └────────────▶ unauthenticated
//! ```
//!
//! Failure policy:
//! - 401 from the profile fetch, a scope mismatch or an undecodable token end
//!   the session and clear the stored token.
//! - Network/server errors are "unknown, retry later": the previous session is
//!   kept and the token stays in the store.
//! - Tenant membership failures never affect authentication.

use chrono::Utc;
use tokio::sync::watch;

use basaltpass_auth::{AccessToken, TenantMembership, User};
use basaltpass_core::Scope;

use crate::api::{ApiError, AuthApi};
use crate::error::{SessionError, best_effort};
use crate::navigator::Navigator;
use crate::session::Session;
use crate::store::TokenStore;

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Result of a bootstrap check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// A previous check already ran; nothing was done.
    AlreadyChecked,
    Authenticated,
    /// Settled as signed out. `reason` is `None` when there simply was no session.
    Unauthenticated { reason: Option<SessionError> },
    /// The check was inconclusive; the previous session was kept.
    Kept(SessionError),
}

/// How a check resolved, before it is applied to the session.
enum Resolution {
    SignedIn(User, Vec<TenantMembership>),
    SignedOut(Option<SessionError>),
    Unknown(SessionError),
}

/// Owns the session and every path that mutates it.
///
/// Collaborators are injected: `A` talks to the backend, `S` persists the
/// token, `N` performs client-side navigation.
pub struct SessionController<A, S, N> {
    api: A,
    store: S,
    navigator: N,
    expected_scope: Scope,
    login_route: String,
    session: Session,
    checked: bool,
    publisher: watch::Sender<Session>,
}

impl<A, S, N> SessionController<A, S, N>
where
    A: AuthApi,
    S: TokenStore,
    N: Navigator,
{
    /// Create a controller for a console that accepts `expected_scope` tokens.
    pub fn new(api: A, store: S, navigator: N, expected_scope: Scope) -> Self {
        let session = Session::uninitialized();
        let (publisher, _) = watch::channel(session.clone());

        Self {
            api,
            store,
            navigator,
            expected_scope,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            session,
            checked: false,
            publisher,
        }
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Receive every session snapshot the controller publishes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.publisher.subscribe()
    }

    pub fn expected_scope(&self) -> Scope {
        self.expected_scope
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Resolve the session at boot. Runs at most once; later calls return
    /// [`CheckOutcome::AlreadyChecked`] without touching the session.
    pub async fn check_auth(&mut self) -> CheckOutcome {
        if self.checked {
            tracing::debug!("session already checked; skipping");
            return CheckOutcome::AlreadyChecked;
        }
        self.checked = true;
        self.run_check().await
    }

    /// Re-run the bootstrap check regardless of earlier checks.
    pub async fn revalidate(&mut self) -> CheckOutcome {
        self.checked = true;
        self.run_check().await
    }

    /// Sign in with a freshly issued token.
    ///
    /// Atomic: on any failure the token is cleared and the session is signed
    /// out before the error is returned.
    pub async fn login(&mut self, token: AccessToken) -> Result<&Session, SessionError> {
        self.checked = true;

        match self.try_login(&token).await {
            Ok((user, memberships)) => {
                tracing::info!(
                    user_id = %user.id,
                    memberships = memberships.len(),
                    "login succeeded"
                );
                self.publish(Session::authenticated(user, memberships));
                Ok(&self.session)
            }
            Err(err) => {
                tracing::warn!("login failed, rolling back: {err}");
                self.clear_token();
                self.publish(Session::unauthenticated());
                Err(err)
            }
        }
    }

    /// Sign out locally and navigate to the login route.
    ///
    /// No server round trip is awaited.
    pub fn logout(&mut self) {
        self.checked = true;
        self.clear_token();
        self.publish(Session::unauthenticated());
        tracing::info!("logged out");
        self.navigator.navigate(&self.login_route);
    }

    async fn run_check(&mut self) -> CheckOutcome {
        let previous = self.session.clone();
        self.publish(previous.checking());

        match self.resolve().await {
            Resolution::SignedIn(user, memberships) => {
                tracing::info!(
                    user_id = %user.id,
                    memberships = memberships.len(),
                    "session authenticated"
                );
                self.publish(Session::authenticated(user, memberships));
                CheckOutcome::Authenticated
            }
            Resolution::SignedOut(reason) => {
                match &reason {
                    Some(reason) => tracing::info!("session ended: {reason}"),
                    None => tracing::info!("no session"),
                }
                self.clear_token();
                self.publish(Session::unauthenticated());
                CheckOutcome::Unauthenticated { reason }
            }
            Resolution::Unknown(err) => {
                tracing::warn!("session check inconclusive, keeping previous state: {err}");
                // Nothing to fall back to on the first check: settle as signed
                // out for rendering, but keep the token for the next attempt.
                let kept = if previous.is_resolved() {
                    previous
                } else {
                    Session::unauthenticated()
                };
                self.publish(kept);
                CheckOutcome::Kept(err)
            }
        }
    }

    async fn resolve(&self) -> Resolution {
        let token = match self.usable_stored_token() {
            Ok(Some(token)) => token,
            Ok(None) => match self.silent_refresh().await {
                Ok(Some(token)) => token,
                Ok(None) => return Resolution::SignedOut(None),
                Err(err) => return Resolution::SignedOut(Some(err)),
            },
            Err(err) => return Resolution::SignedOut(Some(err)),
        };

        match self.api.fetch_profile(&token).await {
            Ok(user) => {
                let memberships = best_effort(self.api.fetch_tenants(&token).await);
                Resolution::SignedIn(user, memberships)
            }
            Err(ApiError::Unauthorized) => Resolution::SignedOut(Some(SessionError::AuthRejected)),
            Err(err) => Resolution::Unknown(err.into()),
        }
    }

    /// The stored token, if present, unexpired and minted for this console.
    fn usable_stored_token(&self) -> Result<Option<AccessToken>, SessionError> {
        let Some(token) = self.store.get() else {
            return Ok(None);
        };

        let claims = token.claims()?;
        if claims.is_expired(Utc::now()) {
            tracing::info!("stored access token has expired");
            self.clear_token();
            return Ok(None);
        }
        self.check_scope(claims.console_scope()?)?;

        Ok(Some(token))
    }

    /// One refresh attempt through the refresh cookie. Failures read as "no session".
    async fn silent_refresh(&self) -> Result<Option<AccessToken>, SessionError> {
        let token = match self.api.refresh().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("silent refresh returned no token");
                return Ok(None);
            }
            Err(err) => {
                tracing::warn!("silent refresh failed: {err}");
                return Ok(None);
            }
        };

        let claims = token.claims()?;
        self.check_scope(claims.console_scope()?)?;
        self.store.set(&token)?;
        tracing::info!("access token restored by silent refresh");

        Ok(Some(token))
    }

    async fn try_login(
        &self,
        token: &AccessToken,
    ) -> Result<(User, Vec<TenantMembership>), SessionError> {
        let claims = token.claims()?;
        if claims.is_expired(Utc::now()) {
            return Err(SessionError::InvalidToken("token has expired".to_string()));
        }
        self.check_scope(claims.console_scope()?)?;

        self.store.set(token)?;
        let user = self.api.fetch_profile(token).await?;
        let memberships = best_effort(self.api.fetch_tenants(token).await);

        Ok((user, memberships))
    }

    fn check_scope(&self, found: Scope) -> Result<(), SessionError> {
        if found == self.expected_scope {
            return Ok(());
        }
        tracing::warn!(
            expected = %self.expected_scope,
            %found,
            "discarding token minted for another console"
        );
        Err(SessionError::ScopeMismatch {
            expected: self.expected_scope,
            found,
        })
    }

    fn clear_token(&self) {
        if let Err(err) = self.store.clear() {
            tracing::error!("failed to clear stored access token: {err}");
        }
    }

    fn publish(&mut self, session: Session) {
        self.session = session;
        self.publisher.send_replace(self.session.clone());
    }
}
