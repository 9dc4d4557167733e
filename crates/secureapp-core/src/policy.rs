//! # Access Policy
//!
//! An ordered table of `(path pattern, requirement)` rules evaluated
//! first-match-wins, plus a fallback requirement for paths no rule names.
//! Evaluation is a pure function of the request path and the caller's
//! role set; it holds no state and never suspends.
//!
//! ## Standard Policy
//!
//! | Order | Patterns | Requirement |
//! |-------|----------|-------------|
//! | 1 | `/`, `/index.html`, `/static/**`, `/favicon.ico`, `/health/**`, login endpoints | none |
//! | 2 | `/api/**` | `USER` or `ADMIN` |
//! | — | anything else | authenticated |
//!
//! ## Pattern Grammar
//!
//! A pattern is either an exact path (`/favicon.ico`) or a prefix ending in
//! `/**` (`/static/**`). A prefix pattern matches the prefix itself and any
//! path below it on a segment boundary, so `/api/**` matches `/api` and
//! `/api/products/1` but not `/apiary`.

use std::fmt;

use crate::error::ValidationError;
use crate::role::{Role, RoleSet};

/// Path where unauthenticated callers start the external login.
pub const LOGIN_INITIATION_PREFIX: &str = "/oauth2/authorization";

/// Path the identity provider redirects back to with the authorization code.
pub const LOGIN_CALLBACK_PREFIX: &str = "/login/oauth2/code";

/// Outcome of evaluating a request against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The request may proceed to the handler.
    Permit,
    /// The caller is not authenticated; send them through the login flow.
    Challenge,
    /// The caller is authenticated but lacks the required role.
    Deny,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permit => "permit",
            Self::Challenge => "challenge",
            Self::Deny => "deny",
        }
    }
}

/// What a rule demands of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone, including unauthenticated callers.
    PermitAll,
    /// Any authenticated caller.
    Authenticated,
    /// An authenticated caller holding at least one of these roles.
    AnyRole(Vec<Role>),
}

impl Requirement {
    /// Judge a caller against this requirement. An empty role set means
    /// the caller is not authenticated.
    pub fn check(&self, roles: &RoleSet) -> Decision {
        match self {
            Self::PermitAll => Decision::Permit,
            _ if roles.is_empty() => Decision::Challenge,
            Self::Authenticated => Decision::Permit,
            Self::AnyRole(required) if roles.contains_any(required) => Decision::Permit,
            Self::AnyRole(_) => Decision::Deny,
        }
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches one path exactly.
    Exact(String),
    /// Matches the stored prefix and everything below it. Stored without
    /// the trailing `/**`; the root wildcard `/**` is stored as `""`.
    Prefix(String),
}

impl PathPattern {
    /// Parse `"/exact"` or `"/prefix/**"`.
    pub fn parse(pattern: &str) -> Result<Self, ValidationError> {
        if !pattern.starts_with('/') {
            return Err(ValidationError::InvalidPattern(
                pattern.to_string(),
                "must start with '/'",
            ));
        }
        if let Some(prefix) = pattern.strip_suffix("/**") {
            if prefix.contains('*') {
                return Err(ValidationError::InvalidPattern(
                    pattern.to_string(),
                    "'**' is only allowed as the final segment",
                ));
            }
            return Ok(Self::Prefix(prefix.to_string()));
        }
        if pattern.contains('*') {
            return Err(ValidationError::InvalidPattern(
                pattern.to_string(),
                "'**' is only allowed as the final segment",
            ));
        }
        Ok(Self::Exact(pattern.to_string()))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(exact) => f.write_str(exact),
            Self::Prefix(prefix) => write!(f, "{prefix}/**"),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub patterns: Vec<PathPattern>,
    pub requirement: Requirement,
}

impl AccessRule {
    /// Build a rule from pattern strings.
    pub fn new<'a>(
        patterns: impl IntoIterator<Item = &'a str>,
        requirement: Requirement,
    ) -> Result<Self, ValidationError> {
        let patterns = patterns
            .into_iter()
            .map(PathPattern::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            requirement,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Ordered rule table with a fallback for unmatched paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
    any_request: Requirement,
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>, any_request: Requirement) -> Self {
        Self { rules, any_request }
    }

    /// The policy SecureApp ships with.
    ///
    /// # Panics
    ///
    /// Only if a pattern literal below is malformed, which the unit tests
    /// rule out.
    pub fn standard() -> Self {
        let login_initiation = format!("{LOGIN_INITIATION_PREFIX}/**");
        let login_callback = format!("{LOGIN_CALLBACK_PREFIX}/**");
        let public = AccessRule::new(
            [
                "/",
                "/index.html",
                "/static/**",
                "/favicon.ico",
                "/health/**",
                login_initiation.as_str(),
                login_callback.as_str(),
            ],
            Requirement::PermitAll,
        )
        .expect("public patterns are valid");
        let api = AccessRule::new(
            ["/api/**"],
            Requirement::AnyRole(vec![Role::User, Role::Admin]),
        )
        .expect("api pattern is valid");

        Self::new(vec![public, api], Requirement::Authenticated)
    }

    /// The requirement governing `path`: the first matching rule's, or the
    /// fallback.
    pub fn requirement_for(&self, path: &str) -> &Requirement {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| &rule.requirement)
            .unwrap_or(&self.any_request)
    }

    /// Decide whether a caller holding `roles` may request `path`.
    pub fn evaluate(&self, path: &str, roles: &RoleSet) -> Decision {
        self.requirement_for(path).check(roles)
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> RoleSet {
        RoleSet::from([Role::User])
    }

    fn admin() -> RoleSet {
        RoleSet::from([Role::User, Role::Admin])
    }

    #[test]
    fn standard_public_rules_are_literal() {
        let public: Vec<String> = AccessPolicy::standard().rules()[0]
            .patterns
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            public,
            [
                "/",
                "/index.html",
                "/static/**",
                "/favicon.ico",
                "/health/**",
                "/oauth2/authorization/**",
                "/login/oauth2/code/**",
            ]
        );
    }

    // ── PathPattern ──────────────────────────────────────────────

    #[test]
    fn parse_exact_and_prefix() {
        assert_eq!(
            PathPattern::parse("/favicon.ico").unwrap(),
            PathPattern::Exact("/favicon.ico".into())
        );
        assert_eq!(
            PathPattern::parse("/static/**").unwrap(),
            PathPattern::Prefix("/static".into())
        );
        assert_eq!(PathPattern::parse("/**").unwrap(), PathPattern::Prefix("".into()));
    }

    #[test]
    fn parse_rejects_relative_and_inner_wildcards() {
        assert!(PathPattern::parse("api/**").is_err());
        assert!(PathPattern::parse("/api/*/x").is_err());
        assert!(PathPattern::parse("/a/**/b/**").is_err());
        assert!(PathPattern::parse("/api/*").is_err());
    }

    #[test]
    fn prefix_matches_on_segment_boundary() {
        let api = PathPattern::parse("/api/**").unwrap();
        assert!(api.matches("/api"));
        assert!(api.matches("/api/"));
        assert!(api.matches("/api/products"));
        assert!(api.matches("/api/products/1"));
        assert!(!api.matches("/apiary"));
        assert!(!api.matches("/v1/api/products"));
    }

    #[test]
    fn root_wildcard_matches_everything() {
        let all = PathPattern::parse("/**").unwrap();
        assert!(all.matches("/"));
        assert!(all.matches("/anything/here"));
    }

    #[test]
    fn exact_does_not_match_children() {
        let root = PathPattern::parse("/").unwrap();
        assert!(root.matches("/"));
        assert!(!root.matches("/me"));
    }

    // ── Requirement ──────────────────────────────────────────────

    #[test]
    fn requirement_check_table() {
        let any = Requirement::AnyRole(vec![Role::Admin]);
        assert_eq!(Requirement::PermitAll.check(&RoleSet::new()), Decision::Permit);
        assert_eq!(Requirement::Authenticated.check(&RoleSet::new()), Decision::Challenge);
        assert_eq!(Requirement::Authenticated.check(&user()), Decision::Permit);
        assert_eq!(any.check(&RoleSet::new()), Decision::Challenge);
        assert_eq!(any.check(&user()), Decision::Deny);
        assert_eq!(any.check(&admin()), Decision::Permit);
    }

    // ── Standard policy ──────────────────────────────────────────

    #[test]
    fn public_paths_permit_everyone() {
        let policy = AccessPolicy::standard();
        for path in [
            "/",
            "/index.html",
            "/static/js/main.js",
            "/favicon.ico",
            "/health/liveness",
            "/oauth2/authorization/google",
            "/login/oauth2/code/google",
        ] {
            assert_eq!(policy.evaluate(path, &RoleSet::new()), Decision::Permit, "{path}");
            assert_eq!(policy.evaluate(path, &user()), Decision::Permit, "{path}");
        }
    }

    #[test]
    fn api_permits_user_and_admin() {
        let policy = AccessPolicy::standard();
        for path in ["/api/products", "/api/products/1", "/api/products/999"] {
            assert_eq!(policy.evaluate(path, &user()), Decision::Permit);
            assert_eq!(policy.evaluate(path, &admin()), Decision::Permit);
            assert_eq!(
                policy.evaluate(path, &RoleSet::from([Role::Admin])),
                Decision::Permit
            );
        }
    }

    #[test]
    fn api_challenges_anonymous_callers() {
        let policy = AccessPolicy::standard();
        assert_eq!(
            policy.evaluate("/api/products", &RoleSet::new()),
            Decision::Challenge
        );
    }

    #[test]
    fn api_denies_authenticated_caller_without_api_roles() {
        let policy = AccessPolicy::new(
            vec![AccessRule::new(["/api/**"], Requirement::AnyRole(vec![Role::Admin])).unwrap()],
            Requirement::Authenticated,
        );
        assert_eq!(policy.evaluate("/api/products", &user()), Decision::Deny);
    }

    #[test]
    fn other_paths_require_authentication() {
        let policy = AccessPolicy::standard();
        assert_eq!(policy.evaluate("/me", &RoleSet::new()), Decision::Challenge);
        assert_eq!(policy.evaluate("/me", &user()), Decision::Permit);
        assert_eq!(policy.evaluate("/apiary", &RoleSet::new()), Decision::Challenge);
        assert_eq!(policy.evaluate("/index.htm", &RoleSet::new()), Decision::Challenge);
    }

    #[test]
    fn first_match_wins() {
        let policy = AccessPolicy::new(
            vec![
                AccessRule::new(["/api/public/**"], Requirement::PermitAll).unwrap(),
                AccessRule::new(["/api/**"], Requirement::AnyRole(vec![Role::Admin])).unwrap(),
            ],
            Requirement::Authenticated,
        );
        assert_eq!(
            policy.evaluate("/api/public/info", &RoleSet::new()),
            Decision::Permit
        );
        assert_eq!(policy.evaluate("/api/private", &user()), Decision::Deny);
    }

    #[test]
    fn decision_names() {
        assert_eq!(Decision::Permit.as_str(), "permit");
        assert_eq!(Decision::Challenge.as_str(), "challenge");
        assert_eq!(Decision::Deny.as_str(), "deny");
    }
}
