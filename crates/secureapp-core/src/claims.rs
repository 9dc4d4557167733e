//! # Identity Claims & Role Mapping
//!
//! Claims arrive from the identity provider's user-info endpoint after the
//! single sign-on exchange. [`map_roles`] runs exactly once per login,
//! before the session is established, and its output is attached to the
//! session for every later request.
//!
//! ## Mapping Rule
//!
//! ```text
//! roles = { USER }                          always
//!       ∪ { ADMIN }  if claims.groups is an array containing "admin"
//! ```
//!
//! A missing or malformed `groups` claim is never an error. It simply
//! grants no elevated role.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::role::{Role, RoleSet};

/// Claim carrying the caller's group memberships.
pub const GROUPS_CLAIM: &str = "groups";

/// Group whose members receive [`Role::Admin`].
pub const ADMIN_GROUP: &str = "admin";

/// Claims returned by the identity provider, keyed by claim name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityClaims(Map<String, Value>);

impl IdentityClaims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Build claims from a JSON value. Anything other than an object yields
    /// an empty claim set.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A claim read as a string, if present and a JSON string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// A claim read as a list of strings.
    ///
    /// Returns `None` when the claim is absent or not an array. Non-string
    /// entries in the array are skipped.
    pub fn get_str_list(&self, name: &str) -> Option<Vec<&str>> {
        match self.0.get(name)? {
            Value::Array(items) => Some(items.iter().filter_map(Value::as_str).collect()),
            _ => None,
        }
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// The `email` claim.
    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// Preferred display name: `name`, then `preferred_username`, then
    /// `email`, then `sub`.
    pub fn display_name(&self) -> Option<&str> {
        self.get_str("name")
            .or_else(|| self.get_str("preferred_username"))
            .or_else(|| self.email())
            .or_else(|| self.subject())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for IdentityClaims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Derive the role set for a completed login.
pub fn map_roles(claims: &IdentityClaims) -> RoleSet {
    let mut roles = RoleSet::new();
    roles.grant(Role::User);

    let is_admin = claims
        .get_str_list(GROUPS_CLAIM)
        .is_some_and(|groups| groups.contains(&ADMIN_GROUP));
    if is_admin {
        roles.grant(Role::Admin);
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> IdentityClaims {
        IdentityClaims::from_value(value)
    }

    #[test]
    fn no_groups_claim_yields_user_only() {
        let roles = map_roles(&claims(json!({"sub": "alice"})));
        assert_eq!(roles, RoleSet::from([Role::User]));
    }

    #[test]
    fn empty_claims_yield_user_only() {
        assert_eq!(map_roles(&IdentityClaims::default()), RoleSet::from([Role::User]));
    }

    #[test]
    fn admin_group_yields_user_and_admin() {
        let roles = map_roles(&claims(json!({"sub": "bob", "groups": ["staff", "admin"]})));
        assert_eq!(roles, RoleSet::from([Role::User, Role::Admin]));
    }

    #[test]
    fn other_groups_yield_user_only() {
        let roles = map_roles(&claims(json!({"groups": ["staff", "developers"]})));
        assert_eq!(roles, RoleSet::from([Role::User]));
    }

    #[test]
    fn group_match_is_exact() {
        for group in ["Admin", "ADMIN", "admins", " admin"] {
            let roles = map_roles(&claims(json!({"groups": [group]})));
            assert!(!roles.contains(Role::Admin), "group {group:?} must not elevate");
        }
    }

    #[test]
    fn malformed_groups_claim_is_not_an_error() {
        for groups in [json!("admin"), json!(42), json!(null), json!({"admin": true})] {
            let roles = map_roles(&claims(json!({"groups": groups})));
            assert_eq!(roles, RoleSet::from([Role::User]));
        }
    }

    #[test]
    fn non_string_entries_are_skipped() {
        let roles = map_roles(&claims(json!({"groups": [1, null, "admin"]})));
        assert!(roles.contains(Role::Admin));
    }

    #[test]
    fn unrelated_claims_are_ignored() {
        let roles = map_roles(&claims(json!({
            "roles": ["admin"],
            "admin": true,
            "group": ["admin"],
        })));
        assert_eq!(roles, RoleSet::from([Role::User]));
    }

    #[test]
    fn non_object_value_yields_empty_claims() {
        assert!(claims(json!(["sub"])).as_map().is_empty());
    }

    #[test]
    fn display_name_fallback_order() {
        assert_eq!(
            claims(json!({"name": "Alice", "email": "a@example.com"})).display_name(),
            Some("Alice")
        );
        assert_eq!(
            claims(json!({"preferred_username": "alice", "sub": "1"})).display_name(),
            Some("alice")
        );
        assert_eq!(claims(json!({"email": "a@example.com"})).display_name(), Some("a@example.com"));
        assert_eq!(claims(json!({"sub": "1"})).display_name(), Some("1"));
        assert_eq!(claims(json!({})).display_name(), None);
    }

    #[test]
    fn get_str_list_reads_arrays_only() {
        let c = claims(json!({"groups": ["a", "b"], "single": "a"}));
        assert_eq!(c.get_str_list("groups"), Some(vec!["a", "b"]));
        assert_eq!(c.get_str_list("single"), None);
        assert_eq!(c.get_str_list("missing"), None);
    }
}
