//! # Sessions
//!
//! In-memory session and pending-login stores.
//!
//! A session is created once, when the login callback completes, and
//! carries the role set computed by [`secureapp_core::map_roles`] at that
//! moment. The role set is never modified afterwards; a caller whose group
//! membership changes sees the change at their next login.
//!
//! Both stores use `parking_lot` locks that are never held across `.await`.
//! `parking_lot::RwLock` does not poison, so a panicking writer cannot wedge
//! the gate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use secureapp_core::{map_roles, IdentityClaims, Role, RoleSet};
use uuid::Uuid;

use crate::error::AppError;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "SESSION";

/// Name of the cookie binding an authorization request to the browser that
/// started it.
pub const LOGIN_STATE_COOKIE: &str = "OAUTH_STATE";

/// How long an authorization request may stay unanswered.
const PENDING_LOGIN_TTL: Duration = Duration::from_secs(600);

/// Idle timeout applied when none is configured.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on live sessions. The session closest to expiry is evicted
/// to make room.
const MAX_SESSIONS: usize = 10_000;

/// Upper bound on outstanding authorization requests.
const MAX_PENDING_LOGINS: usize = 1_024;

/// The authenticated caller behind a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub session_id: Uuid,
    /// The identity provider's `sub` claim.
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: RoleSet,
    pub claims: IdentityClaims,
    pub authenticated_at: DateTime<Utc>,
    /// End of the idle window. Pushed forward each time the session is used.
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe, cloneable session store keyed by session id.
///
/// Sessions expire after `ttl` without use. Expired sessions resolve to
/// `None` and are dropped the next time one is looked up or established.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Principal>>>,
    ttl: chrono::Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(ttl, MAX_SESSIONS)
    }

    /// A store whose sessions idle out after `ttl`, holding at most
    /// `max_sessions` (at least one).
    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::default(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52)),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Map roles from `claims` and open a session for them.
    ///
    /// Fails if the claims carry no `sub`, since a session must name its
    /// subject.
    pub fn establish(&self, claims: IdentityClaims) -> Result<Principal, AppError> {
        self.establish_at(claims, Utc::now())
    }

    fn establish_at(
        &self,
        claims: IdentityClaims,
        now: DateTime<Utc>,
    ) -> Result<Principal, AppError> {
        let subject = claims
            .subject()
            .ok_or_else(|| AppError::Unauthorized("identity provider returned no subject".into()))?
            .to_string();

        let principal = Principal {
            session_id: Uuid::new_v4(),
            name: claims.display_name().map(str::to_string),
            email: claims.email().map(str::to_string),
            roles: map_roles(&claims),
            subject,
            claims,
            authenticated_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write();
        sessions.retain(|_, p| !p.is_expired_at(now));
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .values()
                .min_by_key(|p| p.expires_at)
                .map(|p| p.session_id);
            if let Some(id) = oldest {
                sessions.remove(&id);
                tracing::warn!(
                    max_sessions = self.max_sessions,
                    "session limit reached, evicted least recently used session"
                );
            }
        }
        sessions.insert(principal.session_id, principal.clone());
        drop(sessions);

        tracing::debug!(
            subject = %principal.subject,
            roles = %principal.roles,
            "session established"
        );
        Ok(principal)
    }

    /// Look up a live session by id and extend its idle window.
    pub fn resolve(&self, session_id: &Uuid) -> Option<Principal> {
        self.resolve_at(session_id, Utc::now())
    }

    fn resolve_at(&self, session_id: &Uuid, now: DateTime<Utc>) -> Option<Principal> {
        let mut sessions = self.sessions.write();
        let principal = sessions.get_mut(session_id)?;
        if principal.is_expired_at(now) {
            sessions.remove(session_id);
            return None;
        }
        principal.expires_at = now + self.ttl;
        Some(principal.clone())
    }

    /// Look up a session from the raw cookie value. Malformed ids resolve to
    /// `None` rather than an error.
    pub fn resolve_cookie(&self, value: &str) -> Option<Principal> {
        Uuid::parse_str(value).ok().and_then(|id| self.resolve(&id))
    }

    /// End a session. Returns `true` if it existed.
    pub fn revoke(&self, session_id: &Uuid) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    /// Number of sessions that have not expired.
    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .values()
            .filter(|p| !p.is_expired_at(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outstanding authorization requests, keyed by their `state` parameter.
///
/// Each state is single-use: [`PendingLogins::consume`] removes it whether
/// or not it has expired. The map holds at most a fixed number of states;
/// issuing past that evicts the oldest.
#[derive(Debug, Clone)]
pub struct PendingLogins {
    states: Arc<Mutex<HashMap<String, Instant>>>,
    limit: usize,
}

impl Default for PendingLogins {
    fn default() -> Self {
        Self::with_limit(MAX_PENDING_LOGINS)
    }
}

impl PendingLogins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            states: Arc::default(),
            limit: limit.max(1),
        }
    }

    /// Issue a fresh `state` value and remember it.
    pub fn issue(&self) -> String {
        let state = Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let mut states = self.states.lock();
        states.retain(|_, issued| now.duration_since(*issued) < PENDING_LOGIN_TTL);
        while states.len() >= self.limit {
            let Some(oldest) = states
                .iter()
                .min_by_key(|(_, issued)| **issued)
                .map(|(s, _)| s.clone())
            else {
                break;
            };
            states.remove(&oldest);
        }
        states.insert(state.clone(), now);
        state
    }

    /// Redeem a `state` value. Returns `false` for unknown, reused, or
    /// expired values.
    pub fn consume(&self, state: &str) -> bool {
        match self.states.lock().remove(state) {
            Some(issued) => issued.elapsed() < PENDING_LOGIN_TTL,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> IdentityClaims {
        IdentityClaims::from_value(value)
    }

    #[test]
    fn establish_maps_roles_and_profile() {
        let store = SessionStore::new();
        let principal = store
            .establish(claims(json!({
                "sub": "alice",
                "name": "Alice",
                "email": "alice@example.com",
                "groups": ["admin"],
            })))
            .unwrap();
        assert_eq!(principal.subject, "alice");
        assert_eq!(principal.name.as_deref(), Some("Alice"));
        assert_eq!(principal.email.as_deref(), Some("alice@example.com"));
        assert!(principal.has_role(Role::User));
        assert!(principal.has_role(Role::Admin));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn establish_requires_subject() {
        let store = SessionStore::new();
        assert!(matches!(
            store.establish(claims(json!({"email": "x@example.com"}))),
            Err(AppError::Unauthorized(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn resolve_returns_established_session() {
        let store = SessionStore::new();
        let principal = store.establish(claims(json!({"sub": "bob"}))).unwrap();
        let resolved = store.resolve(&principal.session_id).unwrap();
        assert_eq!(resolved.subject, "bob");
        assert_eq!(resolved.session_id, principal.session_id);
        let from_cookie = store
            .resolve_cookie(&principal.session_id.to_string())
            .unwrap();
        assert_eq!(from_cookie.session_id, principal.session_id);
    }

    #[test]
    fn resolve_cookie_ignores_garbage() {
        let store = SessionStore::new();
        assert!(store.resolve_cookie("not-a-uuid").is_none());
        assert!(store.resolve_cookie(&Uuid::new_v4().to_string()).is_none());
    }

    #[test]
    fn revoke_removes_session() {
        let store = SessionStore::new();
        let principal = store.establish(claims(json!({"sub": "bob"}))).unwrap();
        assert!(store.revoke(&principal.session_id));
        assert!(!store.revoke(&principal.session_id));
        assert!(store.resolve(&principal.session_id).is_none());
    }

    #[test]
    fn clones_share_sessions() {
        let store = SessionStore::new();
        let other = store.clone();
        let principal = store.establish(claims(json!({"sub": "carol"}))).unwrap();
        assert!(other.resolve(&principal.session_id).is_some());
    }

    #[test]
    fn pending_login_state_is_single_use() {
        let pending = PendingLogins::new();
        let state = pending.issue();
        assert_eq!(pending.len(), 1);
        assert!(pending.consume(&state));
        assert!(!pending.consume(&state));
        assert!(pending.is_empty());
    }

    #[test]
    fn unknown_state_is_rejected() {
        let pending = PendingLogins::new();
        pending.issue();
        assert!(!pending.consume("forged"));
    }

    #[test]
    fn issued_states_are_distinct() {
        let pending = PendingLogins::new();
        assert_ne!(pending.issue(), pending.issue());
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn idle_session_expires() {
        let store = SessionStore::with_limits(Duration::from_secs(60), 10);
        let t0 = Utc::now();
        let principal = store.establish_at(claims(json!({"sub": "dave"})), t0).unwrap();

        let later = t0 + chrono::Duration::seconds(61);
        assert!(store.resolve_at(&principal.session_id, later).is_none());
        assert!(store.sessions.read().is_empty());
    }

    #[test]
    fn use_extends_idle_window() {
        let store = SessionStore::with_limits(Duration::from_secs(60), 10);
        let t0 = Utc::now();
        let principal = store.establish_at(claims(json!({"sub": "erin"})), t0).unwrap();

        let t1 = t0 + chrono::Duration::seconds(45);
        assert!(store.resolve_at(&principal.session_id, t1).is_some());
        let t2 = t0 + chrono::Duration::seconds(90);
        let resolved = store.resolve_at(&principal.session_id, t2).unwrap();
        assert_eq!(resolved.expires_at, t2 + chrono::Duration::seconds(60));
    }

    #[test]
    fn establish_prunes_expired_sessions() {
        let store = SessionStore::with_limits(Duration::from_secs(60), 10);
        let t0 = Utc::now();
        for i in 0..5 {
            store
                .establish_at(claims(json!({"sub": format!("u{i}")})), t0)
                .unwrap();
        }
        assert_eq!(store.sessions.read().len(), 5);

        let later = t0 + chrono::Duration::seconds(120);
        store.establish_at(claims(json!({"sub": "fresh"})), later).unwrap();
        assert_eq!(store.sessions.read().len(), 1);
    }

    #[test]
    fn session_count_is_capped() {
        let store = SessionStore::with_limits(Duration::from_secs(60), 3);
        let t0 = Utc::now();
        let first = store.establish_at(claims(json!({"sub": "first"})), t0).unwrap();
        for i in 1..10 {
            let at = t0 + chrono::Duration::seconds(i);
            store
                .establish_at(claims(json!({"sub": format!("u{i}")})), at)
                .unwrap();
        }
        assert_eq!(store.sessions.read().len(), 3);
        assert!(!store.sessions.read().contains_key(&first.session_id));
    }

    #[test]
    fn pending_logins_are_capped() {
        let pending = PendingLogins::with_limit(4);
        let states: Vec<String> = (0..50).map(|_| pending.issue()).collect();
        assert_eq!(pending.len(), 4);
        assert!(pending.consume(states.last().unwrap()));
    }
}
