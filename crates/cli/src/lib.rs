//! `basalt-session`: drive the BasaltPass session lifecycle from a terminal.
//!
//! Every command prints one JSON document on stdout; logs go to stderr.

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};

use basaltpass_auth::AccessToken;
use basaltpass_session::{
    CheckOutcome, FileTokenStore, HttpAuthApi, Location, RecordingNavigator, RoutePolicy,
    SessionConfig, SessionController, evaluate,
};

#[derive(Debug, Parser)]
#[command(name = "basalt-session", version, about = "BasaltPass client session tool")]
pub struct Cli {
    /// Emit logs as JSON lines instead of compact text.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the stored session (or the refresh cookie) and print it.
    Status,
    /// Sign in with an access token issued by the backend.
    Login {
        token: String,
    },
    /// Forget the stored token.
    Logout,
    /// Decide whether a page may render for the current session.
    Guard {
        /// Location as `/path?query`.
        location: String,
        #[arg(long, value_enum, default_value_t = PolicyArg::Authenticated)]
        policy: PolicyArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Public,
    Authenticated,
    Admin,
    Tenant,
}

impl PolicyArg {
    pub fn policy(self) -> RoutePolicy {
        match self {
            PolicyArg::Public => RoutePolicy::public_only(),
            PolicyArg::Authenticated => RoutePolicy::authenticated_only(),
            PolicyArg::Admin => RoutePolicy::admin_only(),
            PolicyArg::Tenant => RoutePolicy::tenant_only(),
        }
    }
}

type Controller = SessionController<HttpAuthApi, FileTokenStore, RecordingNavigator>;

fn controller(config: &SessionConfig) -> anyhow::Result<Controller> {
    let api = HttpAuthApi::new(config.api.base_url.clone(), config.timeout())?;
    let store = FileTokenStore::new(&config.storage.dir);
    Ok(SessionController::new(api, store, RecordingNavigator::new(), config.console.scope)
        .with_login_route(config.routes.login.clone()))
}

fn outcome_json(outcome: &CheckOutcome) -> Value {
    match outcome {
        CheckOutcome::AlreadyChecked => json!({"result": "already_checked"}),
        CheckOutcome::Authenticated => json!({"result": "authenticated"}),
        CheckOutcome::Unauthenticated { reason } => json!({
            "result": "unauthenticated",
            "reason": reason.as_ref().map(|r| r.to_string()),
        }),
        CheckOutcome::Kept(err) => json!({"result": "kept", "reason": err.to_string()}),
    }
}

/// Execute `command` and return the document to print.
pub async fn run(command: Command, config: &SessionConfig) -> anyhow::Result<Value> {
    let mut controller = controller(config)?;
    tracing::debug!(
        api = %config.api.base_url,
        scope = %config.console.scope,
        "session tool starting"
    );

    match command {
        Command::Status => {
            let outcome = controller.check_auth().await;
            Ok(json!({
                "outcome": outcome_json(&outcome),
                "session": controller.session(),
            }))
        }
        Command::Login { token } => {
            let token = AccessToken::non_empty(&token)
                .ok_or_else(|| anyhow::anyhow!("token must not be empty"))?;
            let session = controller.login(token).await?;
            Ok(json!({ "session": session }))
        }
        Command::Logout => {
            controller.logout();
            Ok(json!({
                "session": controller.session(),
                "navigated_to": controller.navigator().last(),
            }))
        }
        Command::Guard { location, policy } => {
            let outcome = controller.check_auth().await;
            let location = Location::parse(&location);
            let decision =
                evaluate(&policy.policy(), controller.session(), &location, &config.routes);
            Ok(json!({
                "outcome": outcome_json(&outcome),
                "location": location.href(),
                "decision": decision,
            }))
        }
    }
}
