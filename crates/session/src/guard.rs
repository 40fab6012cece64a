//! Route guards as one pure decision function over a declarative policy.
//!
//! A page declares a [`RoutePolicy`]; [`evaluate`] turns the policy, the
//! current session snapshot and the current location into a
//! [`GuardDecision`]. No I/O happens here.

use serde::{Deserialize, Serialize};
use url::Url;
use url::form_urlencoded;

use basaltpass_auth::{Capability, TenantRole, TenantTarget, authorize};

use crate::session::Session;

/// Path of the backend's hosted OAuth authorize endpoint.
pub const OAUTH_AUTHORIZE_PATH: &str = "/api/v1/oauth/authorize";

/// Query parameter carrying the post-login destination.
pub const REDIRECT_PARAM: &str = "redirect";

/// Who may see a page at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthRequirement {
    /// Only signed-out visitors (login, register).
    Anonymous,
    /// Only signed-in users.
    Authenticated,
    /// Everybody.
    Any,
}

/// Carve-outs that render a page even when the requirement would redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowWhen {
    /// The location is part of a hosted OAuth login, i.e. its `redirect`
    /// parameter points at the authorize endpoint. That flow runs on server
    /// cookies, so a local session must not short-circuit it.
    OAuthAuthorizeRedirect,
}

/// Where to send a signed-in user who lacks the required capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedTarget {
    Unauthorized,
    Dashboard,
}

/// Declarative access policy of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    pub require_auth: AuthRequirement,
    pub require_scope: Option<Capability>,
    pub allow_when: Option<AllowWhen>,
    pub on_denied: DeniedTarget,
}

impl RoutePolicy {
    /// Login/register pages: signed-in users go to the dashboard, except
    /// during a hosted OAuth login.
    pub fn public_only() -> Self {
        Self {
            require_auth: AuthRequirement::Anonymous,
            require_scope: None,
            allow_when: Some(AllowWhen::OAuthAuthorizeRedirect),
            on_denied: DeniedTarget::Dashboard,
        }
    }

    pub fn authenticated_only() -> Self {
        Self {
            require_auth: AuthRequirement::Authenticated,
            require_scope: None,
            allow_when: None,
            on_denied: DeniedTarget::Unauthorized,
        }
    }

    /// Platform admin console pages.
    pub fn admin_only() -> Self {
        Self {
            require_auth: AuthRequirement::Authenticated,
            require_scope: Some(Capability::SuperAdmin),
            allow_when: None,
            on_denied: DeniedTarget::Unauthorized,
        }
    }

    /// Tenant console pages: admin (or owner) of the active tenant.
    pub fn tenant_only() -> Self {
        Self::tenant_only_with(TenantRole::ADMIN)
    }

    pub fn tenant_only_with(min_role: TenantRole) -> Self {
        Self {
            require_auth: AuthRequirement::Authenticated,
            require_scope: Some(Capability::TenantRole {
                tenant: TenantTarget::Active,
                min_role,
            }),
            allow_when: None,
            on_denied: DeniedTarget::Dashboard,
        }
    }
}

/// Redirect targets used by guard decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardRoutes {
    pub login: String,
    pub dashboard: String,
    pub unauthorized: String,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            dashboard: "/dashboard".to_string(),
            unauthorized: "/unauthorized".to_string(),
        }
    }
}

/// Current client location (path plus optional query string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Option<String>,
}

impl Location {
    /// Parse `"/path?query"`. A leading `/` is added when missing.
    pub fn parse(href: &str) -> Self {
        let href = href.trim();
        let (path, query) = match href.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (href, None),
        };

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Self {
            path,
            query: query.filter(|q| !q.is_empty()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// First value of query parameter `name`, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn href(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Whether the `redirect` parameter targets the hosted OAuth authorize endpoint.
    pub fn is_oauth_authorize_redirect(&self) -> bool {
        let Some(target) = self.query_param(REDIRECT_PARAM) else {
            return false;
        };

        let path = match Url::parse(&target) {
            Ok(url) => url.path().to_string(),
            Err(_) => target
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };

        path.trim_end_matches('/') == OAUTH_AUTHORIZE_PATH
    }
}

/// What the guarded page should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum GuardDecision {
    /// The session is still being resolved; render a neutral loading state.
    Loading,
    Render,
    Redirect(String),
}

/// Decide render vs. redirect for `location` under `policy`.
pub fn evaluate(
    policy: &RoutePolicy,
    session: &Session,
    location: &Location,
    routes: &GuardRoutes,
) -> GuardDecision {
    if session.is_loading() || !session.is_resolved() {
        return GuardDecision::Loading;
    }

    if let Some(AllowWhen::OAuthAuthorizeRedirect) = policy.allow_when {
        if location.is_oauth_authorize_redirect() {
            return GuardDecision::Render;
        }
    }

    match (policy.require_auth, session.is_authenticated()) {
        (AuthRequirement::Anonymous, true) => {
            return GuardDecision::Redirect(routes.dashboard.clone());
        }
        (AuthRequirement::Anonymous, false) => return GuardDecision::Render,
        (AuthRequirement::Authenticated, false) => return login_redirect(location, routes),
        (AuthRequirement::Authenticated, true) | (AuthRequirement::Any, _) => {}
    }

    let Some(capability) = &policy.require_scope else {
        return GuardDecision::Render;
    };

    if !session.is_authenticated() {
        return login_redirect(location, routes);
    }

    match authorize(session.user(), session.tenant_memberships(), capability) {
        Ok(()) => GuardDecision::Render,
        Err(err) => {
            tracing::debug!(path = location.path(), "access denied: {err}");
            let target = match policy.on_denied {
                DeniedTarget::Unauthorized => &routes.unauthorized,
                DeniedTarget::Dashboard => &routes.dashboard,
            };
            GuardDecision::Redirect(target.clone())
        }
    }
}

/// Login route carrying the original location, so login can send the user back.
fn login_redirect(location: &Location, routes: &GuardRoutes) -> GuardDecision {
    if location.path() == routes.login || location.path() == "/" {
        return GuardDecision::Redirect(routes.login.clone());
    }

    let target: String = form_urlencoded::Serializer::new(String::new())
        .append_pair(REDIRECT_PARAM, &location.href())
        .finish();
    GuardDecision::Redirect(format!("{}?{}", routes.login, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use basaltpass_auth::{TenantMembership, User};
    use basaltpass_core::TenantId;
    use serde_json::json;

    fn user(super_admin: bool) -> User {
        serde_json::from_value(json!({
            "id": 1,
            "email": "u@example.com",
            "is_super_admin": super_admin,
        }))
        .unwrap()
    }

    fn signed_in(super_admin: bool) -> Session {
        Session::authenticated(user(super_admin), Vec::new())
    }

    fn routes() -> GuardRoutes {
        GuardRoutes::default()
    }

    fn redirect_query(target: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(REDIRECT_PARAM, target)
            .finish()
    }

    #[test]
    fn loading_session_renders_neutral_state() {
        let loc = Location::parse("/dashboard");
        for policy in [
            RoutePolicy::public_only(),
            RoutePolicy::authenticated_only(),
            RoutePolicy::admin_only(),
        ] {
            assert_eq!(
                evaluate(&policy, &Session::uninitialized(), &loc, &routes()),
                GuardDecision::Loading
            );
            assert_eq!(
                evaluate(&policy, &signed_in(true).checking(), &loc, &routes()),
                GuardDecision::Loading
            );
        }
    }

    #[test]
    fn public_only_renders_for_visitors_and_redirects_members() {
        let loc = Location::parse("/login");
        let policy = RoutePolicy::public_only();

        assert_eq!(
            evaluate(&policy, &Session::unauthenticated(), &loc, &routes()),
            GuardDecision::Render
        );
        assert_eq!(
            evaluate(&policy, &signed_in(false), &loc, &routes()),
            GuardDecision::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn public_only_keeps_login_page_during_hosted_oauth_flow() {
        let target = "/api/v1/oauth/authorize?client_id=abc&response_type=code";
        let loc = Location::parse(&format!("/login?{}", redirect_query(target)));
        assert!(loc.is_oauth_authorize_redirect());
        assert_eq!(
            evaluate(&RoutePolicy::public_only(), &signed_in(false), &loc, &routes()),
            GuardDecision::Render
        );
    }

    #[test]
    fn oauth_detection_accepts_absolute_urls() {
        let target = "https://auth.example.com/api/v1/oauth/authorize?x=1";
        let loc = Location::parse(&format!("/login?{}", redirect_query(target)));
        assert!(loc.is_oauth_authorize_redirect());

        let other = Location::parse("/login?redirect=%2Fapi%2Fv1%2Foauth%2Ftoken");
        assert!(!other.is_oauth_authorize_redirect());
        assert!(!Location::parse("/login").is_oauth_authorize_redirect());
    }

    #[test]
    fn authenticated_only_sends_visitors_to_login_with_return_path() {
        let loc = Location::parse("/wallet?tab=history");
        assert_eq!(
            evaluate(
                &RoutePolicy::authenticated_only(),
                &Session::unauthenticated(),
                &loc,
                &routes()
            ),
            GuardDecision::Redirect("/login?redirect=%2Fwallet%3Ftab%3Dhistory".to_string())
        );
        assert_eq!(
            evaluate(&RoutePolicy::authenticated_only(), &signed_in(false), &loc, &routes()),
            GuardDecision::Render
        );
    }

    #[test]
    fn admin_only_redirects_non_admins() {
        let loc = Location::parse("/admin/users");
        assert_eq!(
            evaluate(&RoutePolicy::admin_only(), &signed_in(false), &loc, &routes()),
            GuardDecision::Redirect("/unauthorized".to_string())
        );
        assert_eq!(
            evaluate(&RoutePolicy::admin_only(), &signed_in(true), &loc, &routes()),
            GuardDecision::Render
        );
    }

    #[test]
    fn tenant_only_checks_role_in_active_tenant() {
        let loc = Location::parse("/tenant/members");
        let admin = TenantMembership {
            tenant_id: TenantId::new(3),
            name: None,
            role: Some(TenantRole::ADMIN),
            status: None,
        };
        let member = TenantMembership {
            role: Some(TenantRole::MEMBER),
            ..admin.clone()
        };

        let as_admin = Session::authenticated(user(false), vec![admin]);
        let as_member = Session::authenticated(user(false), vec![member]);

        assert_eq!(
            evaluate(&RoutePolicy::tenant_only(), &as_admin, &loc, &routes()),
            GuardDecision::Render
        );
        assert_eq!(
            evaluate(&RoutePolicy::tenant_only(), &as_member, &loc, &routes()),
            GuardDecision::Redirect("/dashboard".to_string())
        );
        assert_eq!(
            evaluate(
                &RoutePolicy::tenant_only_with(TenantRole::MEMBER),
                &as_member,
                &loc,
                &routes()
            ),
            GuardDecision::Render
        );
    }

    #[test]
    fn open_pages_with_capability_still_require_login() {
        let policy = RoutePolicy {
            require_auth: AuthRequirement::Any,
            require_scope: Some(Capability::SuperAdmin),
            allow_when: None,
            on_denied: DeniedTarget::Unauthorized,
        };
        let loc = Location::parse("/admin");
        assert_eq!(
            evaluate(&policy, &Session::unauthenticated(), &loc, &routes()),
            GuardDecision::Redirect("/login?redirect=%2Fadmin".to_string())
        );
    }

    #[test]
    fn location_parsing_normalizes_input() {
        let loc = Location::parse("settings?");
        assert_eq!(loc.path(), "/settings");
        assert_eq!(loc.query(), None);
        assert_eq!(loc.href(), "/settings");

        let loc = Location::parse("/cb?code=a%20b&state=1");
        assert_eq!(loc.query_param("code").as_deref(), Some("a b"));
        assert_eq!(loc.query_param("missing"), None);
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(GuardDecision::Redirect("/login".to_string())).unwrap();
        assert_eq!(json, json!({"decision": "redirect", "target": "/login"}));
        let json = serde_json::to_value(GuardDecision::Render).unwrap();
        assert_eq!(json, json!({"decision": "render"}));
    }
}
