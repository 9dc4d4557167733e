//! # Application State
//!
//! Shared state for the Axum application: the read-only catalog, the access
//! policy, the session and pending-login stores, and the optional identity
//! provider client.
//!
//! `AppState` is cloned into every handler. Everything inside is either
//! immutable behind an `Arc` or a store whose clones share one map.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secureapp_core::{AccessPolicy, Catalog};

use crate::oidc::{OidcClient, OidcConfig};
use crate::session::{PendingLogins, SessionStore, DEFAULT_SESSION_TTL};

/// Registration used when `OIDC_REGISTRATION_ID` is unset.
pub const DEFAULT_REGISTRATION_ID: &str = "google";

/// Configuration errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(&'static str, String),
}

/// Application configuration.
///
/// The secret-bearing OIDC registration redacts itself in `Debug`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory holding `index.html`, `favicon.ico` and the `static/` tree.
    pub static_dir: PathBuf,
    /// Client registration id, the `{registration}` in the login paths.
    pub registration_id: String,
    /// Identity provider registration. `None` disables login.
    pub oidc: Option<OidcConfig>,
    /// Whether the session cookie carries the `Secure` attribute.
    pub secure_cookies: bool,
    /// Idle time after which a session ends.
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: PathBuf::from("./static"),
            registration_id: DEFAULT_REGISTRATION_ID.to_string(),
            oidc: None,
            secure_cookies: false,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT", raw))?,
            None => defaults.port,
        };
        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);
        let registration_id =
            lookup("OIDC_REGISTRATION_ID").unwrap_or(defaults.registration_id);
        let secure_cookies = match lookup("SESSION_COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid("SESSION_COOKIE_SECURE", raw))?,
            None => defaults.secure_cookies,
        };
        let session_ttl = match lookup("SESSION_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::Invalid("SESSION_TIMEOUT_SECS", raw)),
            },
            None => defaults.session_ttl,
        };

        let default_redirect =
            format!("http://localhost:{port}/login/oauth2/code/{registration_id}");
        let oidc = OidcConfig::from_lookup(&lookup, &default_redirect)?;

        Ok(Self {
            port,
            static_dir,
            registration_id,
            oidc,
            secure_cookies,
            session_ttl,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub policy: Arc<AccessPolicy>,
    pub sessions: SessionStore,
    pub pending_logins: PendingLogins,
    /// Identity provider client. `None` makes the login endpoints answer 503.
    pub oidc: Option<OidcClient>,
    pub config: AppConfig,
}

impl AppState {
    /// State with the default configuration, the seed catalog, and login
    /// disabled.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    pub fn with_config(config: AppConfig, oidc: Option<OidcClient>) -> Self {
        Self {
            catalog: Arc::new(Catalog::seeded()),
            policy: Arc::new(AccessPolicy::standard()),
            sessions: SessionStore::with_ttl(config.session_ttl),
            pending_logins: PendingLogins::new(),
            oidc,
            config,
        }
    }

    /// Where unauthenticated callers are sent to start a login.
    pub fn login_path(&self) -> String {
        format!(
            "{}/{}",
            secureapp_core::policy::LOGIN_INITIATION_PREFIX,
            self.config.registration_id
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = from_vars(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.static_dir, PathBuf::from("./static"));
        assert_eq!(cfg.registration_id, "google");
        assert!(cfg.oidc.is_none());
        assert!(!cfg.secure_cookies);
        assert_eq!(cfg.session_ttl, Duration::from_secs(1800));
    }

    #[test]
    fn session_timeout_parses() {
        let cfg = from_vars(&[("SESSION_TIMEOUT_SECS", "90")]).unwrap();
        assert_eq!(cfg.session_ttl, Duration::from_secs(90));
        assert!(from_vars(&[("SESSION_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_vars(&[("SESSION_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(matches!(
            from_vars(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid("PORT", _))
        ));
    }

    #[test]
    fn secure_cookie_flag_parses() {
        assert!(from_vars(&[("SESSION_COOKIE_SECURE", "true")]).unwrap().secure_cookies);
        assert!(!from_vars(&[("SESSION_COOKIE_SECURE", "0")]).unwrap().secure_cookies);
        assert!(from_vars(&[("SESSION_COOKIE_SECURE", "maybe")]).is_err());
    }

    #[test]
    fn default_redirect_follows_port_and_registration() {
        let cfg = from_vars(&[
            ("PORT", "9090"),
            ("OIDC_REGISTRATION_ID", "corp"),
            ("OIDC_CLIENT_ID", "app"),
            ("OIDC_CLIENT_SECRET", "s3cret"),
        ])
        .unwrap();
        let oidc = cfg.oidc.unwrap();
        assert_eq!(
            oidc.redirect_uri.as_str(),
            "http://localhost:9090/login/oauth2/code/corp"
        );
    }

    #[test]
    fn login_path_uses_registration() {
        let state = AppState::new();
        assert_eq!(state.login_path(), "/oauth2/authorization/google");
    }

    #[test]
    fn new_state_serves_seed_catalog() {
        let state = AppState::new();
        assert_eq!(state.catalog.len(), 3);
        assert!(state.oidc.is_none());
        assert!(state.sessions.is_empty());
    }
}
