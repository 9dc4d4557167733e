//! # Access Gate & Principal Extraction
//!
//! Every request passes through [`access_gate`] after routing and before
//! any handler runs. The gate resolves the caller's session from the
//! `SESSION` cookie, evaluates the [`AccessPolicy`], and then:
//!
//! | Decision | Response |
//! |----------|----------|
//! | Permit | handler runs; the [`Principal`] (if any) is in request extensions |
//! | Challenge | `302 Found` to the login initiation path |
//! | Deny | `403 Forbidden` with a `FORBIDDEN` error body |
//!
//! A session cookie that names no live session is treated as absent.
//!
//! Handlers that need a narrower role than their path rule demands call
//! [`require_role`] themselves.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use secureapp_core::{AccessPolicy, Decision, Role, RoleSet};

use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;
use crate::session::{Principal, SessionStore, SESSION_COOKIE};
use crate::state::AppState;

/// Axum `FromRequestParts` implementation for `Principal`.
///
/// Extracts the principal the access gate injected into extensions.
/// Returns 401 if none is present, which only happens on public paths.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no authenticated session".into()))
    }
}

/// Check that the caller holds `role`.
/// Returns 403 Forbidden otherwise.
pub fn require_role(principal: &Principal, role: Role) -> Result<(), AppError> {
    if principal.has_role(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has {}",
            role, principal.roles
        )))
    }
}

/// Gate configuration injected into request extensions.
#[derive(Debug, Clone)]
pub struct AccessGate {
    pub policy: Arc<AccessPolicy>,
    pub sessions: SessionStore,
    /// Redirect target for challenged requests.
    pub login_path: String,
}

impl AccessGate {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            policy: Arc::clone(&state.policy),
            sessions: state.sessions.clone(),
            login_path: state.login_path(),
        }
    }

    /// Resolve the session named by the request's cookies, if any.
    pub fn resolve(&self, jar: &CookieJar) -> Option<Principal> {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| self.sessions.resolve_cookie(cookie.value()))
    }
}

/// Evaluate the access policy for the request and permit, challenge, or
/// deny it.
///
/// Fails closed: without an [`AccessGate`] extension every request is
/// rejected with 500.
pub async fn access_gate(mut request: Request, next: Next) -> Response {
    let Some(gate) = request.extensions().get::<AccessGate>().cloned() else {
        return AppError::Internal("access gate is not configured".into()).into_response();
    };
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let jar = CookieJar::from_headers(request.headers());
    let principal = gate.resolve(&jar);
    let roles = principal
        .as_ref()
        .map(|p| p.roles.clone())
        .unwrap_or_else(RoleSet::new);

    let path = request.uri().path().to_string();
    let decision = gate.policy.evaluate(&path, &roles);
    if let Some(m) = &metrics {
        m.record_decision(decision);
    }

    match decision {
        Decision::Permit => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        Decision::Challenge => {
            tracing::debug!(%path, "unauthenticated request challenged");
            redirect(&gate.login_path)
        }
        Decision::Deny => {
            let subject = principal.as_ref().map(|p| p.subject.as_str()).unwrap_or("-");
            tracing::warn!(%path, %subject, %roles, "access denied");
            AppError::Forbidden(format!("access to '{path}' denied for roles {roles}"))
                .into_response()
        }
    }
}

/// `302 Found` to `location`. `Redirect::to` would answer 303.
pub fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
