//! Session client configuration.
//!
//! Loaded from:
//! 1. A config file (TOML or JSON) named by `BASALTPASS_CONFIG`
//! 2. Environment variables
//!
//! Environment variables take precedence over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use basaltpass_core::Scope;

use crate::guard::GuardRoutes;

pub const CONFIG_ENV: &str = "BASALTPASS_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub api: ApiConfig,
    pub console: ConsoleConfig,
    pub routes: GuardRoutes,
    pub storage: StorageConfig,
}

/// Backend connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL (default: "http://localhost:8080")
    pub base_url: String,
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

/// Which console this client runs as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Token scope this console accepts (default: user)
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `session.json` (default: ".basaltpass")
    pub dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".basaltpass"),
        }
    }
}

impl SessionConfig {
    /// Load configuration from file and environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(config_path) = std::env::var(CONFIG_ENV) {
            config = Self::from_file(&config_path)?;
            tracing::info!("loaded configuration from: {config_path}");
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a TOML or JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: SessionConfig = match extension {
            "toml" => toml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ if content.trim_start().starts_with('{') => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };

        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in [`load`](Self::load)).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("BASALTPASS_API_URL") {
            self.api.base_url = val;
        }
        if let Some(val) = lookup("BASALTPASS_API_TIMEOUT_SECS") {
            match val.parse() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => tracing::warn!("ignoring invalid BASALTPASS_API_TIMEOUT_SECS: {val}"),
            }
        }
        if let Some(val) = lookup("BASALTPASS_SCOPE") {
            match val.parse() {
                Ok(scope) => self.console.scope = scope,
                Err(e) => tracing::warn!("ignoring BASALTPASS_SCOPE: {e}"),
            }
        }
        if let Some(val) = lookup("BASALTPASS_LOGIN_ROUTE") {
            self.routes.login = val;
        }
        if let Some(val) = lookup("BASALTPASS_DASHBOARD_ROUTE") {
            self.routes.dashboard = val;
        }
        if let Some(val) = lookup("BASALTPASS_UNAUTHORIZED_ROUTE") {
            self.routes.unauthorized = val;
        }
        if let Some(val) = lookup("BASALTPASS_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(val);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.console.scope, Scope::User);
        assert_eq!(config.routes.login, "/login");
        assert_eq!(config.storage.dir, PathBuf::from(".basaltpass"));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_content = r#"
[api]
base_url = "https://auth.example.com"

[console]
scope = "admin"

[routes]
dashboard = "/admin/dashboard"
"#;
        let config: SessionConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "https://auth.example.com");
        assert_eq!(config.console.scope, Scope::Admin);
        assert_eq!(config.routes.dashboard, "/admin/dashboard");
        // Missing fields keep their defaults
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.routes.login, "/login");
    }

    #[test]
    fn test_from_file_detects_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basaltpass.conf");
        let body = r#"{"console": {"scope": "tenant"}, "storage": {"dir": "/tmp/bp"}}"#;
        std::fs::write(&path, body).unwrap();

        let config = SessionConfig::from_file(&path).unwrap();
        assert_eq!(config.console.scope, Scope::Tenant);
        assert_eq!(config.storage.dir, PathBuf::from("/tmp/bp"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BASALTPASS_API_URL", "http://api:9000"),
            ("BASALTPASS_API_TIMEOUT_SECS", "not-a-number"),
            ("BASALTPASS_SCOPE", "Tenant"),
            ("BASALTPASS_LOGIN_ROUTE", "/signin"),
        ]);

        let mut config = SessionConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://api:9000");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.console.scope, Scope::Tenant);
        assert_eq!(config.routes.login, "/signin");
        assert_eq!(config.routes.dashboard, "/dashboard");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SessionConfig::from_file(dir.path().join("absent.toml")).is_err());
    }
}
