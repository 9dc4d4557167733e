//! # OpenID Connect Login Client
//!
//! The minimum of the authorization-code flow needed to obtain identity
//! claims: build the authorize redirect, trade the code for an access token,
//! and read the user-info endpoint with it.
//!
//! The ID token, if the provider returns one, is ignored. Claims come from
//! user-info over a TLS channel the client opened itself, so no signature
//! validation is performed. There is no discovery, refresh, or PKCE.

use std::time::Duration;

use reqwest::StatusCode;
use secureapp_core::IdentityClaims;
use serde::Deserialize;
use url::Url;

use crate::state::ConfigError;

/// Google's endpoints, used when no override is configured.
const DEFAULT_AUTHORIZATION_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URI: &str = "https://www.googleapis.com/oauth2/v4/token";
const DEFAULT_USER_INFO_URI: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

const DEFAULT_SCOPES: &str = "openid profile email";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Client registration for the single configured identity provider.
///
/// Custom `Debug` redacts the client secret.
#[derive(Clone)]
pub struct OidcConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_uri: Url,
    pub token_uri: Url,
    pub user_info_uri: Url,
    /// Where the provider sends the browser back to, i.e. this service's
    /// `/login/oauth2/code/{registration}`.
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authorization_uri", &self.authorization_uri.as_str())
            .field("token_uri", &self.token_uri.as_str())
            .field("user_info_uri", &self.user_info_uri.as_str())
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OidcConfig {
    /// Read the registration from variables supplied by `lookup`.
    ///
    /// Returns `Ok(None)` when `OIDC_CLIENT_ID` is unset, meaning login is
    /// disabled. `default_redirect` is used when `OIDC_REDIRECT_URI` is unset.
    pub fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        default_redirect: &str,
    ) -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = lookup("OIDC_CLIENT_ID") else {
            return Ok(None);
        };
        let client_secret =
            lookup("OIDC_CLIENT_SECRET").ok_or(ConfigError::Missing("OIDC_CLIENT_SECRET"))?;

        let url = |name: &'static str, default: &str| -> Result<Url, ConfigError> {
            let raw = lookup(name).unwrap_or_else(|| default.to_string());
            Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(name, e.to_string()))
        };

        let scopes = lookup("OIDC_SCOPES")
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let timeout_secs = match lookup("OIDC_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("OIDC_TIMEOUT_SECS", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Some(Self {
            client_id,
            client_secret,
            authorization_uri: url("OIDC_AUTHORIZATION_URI", DEFAULT_AUTHORIZATION_URI)?,
            token_uri: url("OIDC_TOKEN_URI", DEFAULT_TOKEN_URI)?,
            user_info_uri: url("OIDC_USER_INFO_URI", DEFAULT_USER_INFO_URI)?,
            redirect_uri: url("OIDC_REDIRECT_URI", default_redirect)?,
            scopes,
            timeout_secs,
        }))
    }
}

/// Errors from the token and user-info exchange.
#[derive(Debug, thiserror::Error)]
pub enum OidcError {
    /// Transport failure talking to the provider.
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Provider {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The provider's answer did not have the expected shape.
    #[error("unexpected response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

/// HTTP client for one identity provider registration.
#[derive(Debug, Clone)]
pub struct OidcClient {
    http: reqwest::Client,
    config: OidcConfig,
}

impl OidcClient {
    pub fn new(config: OidcConfig) -> Result<Self, OidcError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(OidcError::ClientBuild)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// The provider URL the browser is sent to, carrying `state`.
    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.config.authorization_uri.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str());
        url
    }

    /// Trade an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, OidcError> {
        let endpoint = self.config.token_uri.to_string();
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let resp = self
            .http
            .post(self.config.token_uri.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|source| OidcError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let token: TokenResponse = Self::read_json(&endpoint, resp).await?;
        if let Some(token_type) = &token.token_type {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(OidcError::InvalidResponse {
                    endpoint,
                    message: format!("unsupported token type '{token_type}'"),
                });
            }
        }
        Ok(token.access_token)
    }

    /// Read the caller's claims from the user-info endpoint.
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<IdentityClaims, OidcError> {
        let endpoint = self.config.user_info_uri.to_string();
        let resp = self
            .http
            .get(self.config.user_info_uri.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|source| OidcError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        match Self::read_json::<serde_json::Value>(&endpoint, resp).await? {
            serde_json::Value::Object(map) => Ok(IdentityClaims::new(map)),
            other => Err(OidcError::InvalidResponse {
                endpoint,
                message: format!("expected a JSON object, got {other}"),
            }),
        }
    }

    /// Complete a login: code to token to claims.
    pub async fn load_claims(&self, code: &str) -> Result<IdentityClaims, OidcError> {
        let access_token = self.exchange_code(code).await?;
        self.fetch_user_info(&access_token).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<T, OidcError> {
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(OidcError::Provider {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        resp.json().await.map_err(|e| OidcError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}
