//! # Account Endpoints
//!
//! The signed-in caller's view of their own session.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use secureapp_core::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::redirect;
use crate::session::{Principal, SESSION_COOKIE};
use crate::state::AppState;

/// The current caller.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Roles granted at login, `USER` first.
    pub roles: Vec<Role>,
    pub authenticated_at: DateTime<Utc>,
}

impl From<&Principal> for MeResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            subject: principal.subject.clone(),
            name: principal.name.clone(),
            email: principal.email.clone(),
            roles: principal.roles.iter().collect(),
            authenticated_at: principal.authenticated_at,
        }
    }
}

/// Build the account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
}

/// GET /me — Describe the current session.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The signed-in caller", body = MeResponse),
        (status = 302, description = "Not signed in; redirect to login"),
    ),
    tag = "account"
)]
async fn me(principal: Principal) -> Json<MeResponse> {
    Json(MeResponse::from(&principal))
}

/// POST /logout — End the session and clear its cookie.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 302, description = "Session ended; redirect to /"),
    ),
    tag = "account"
)]
async fn logout(
    State(state): State<AppState>,
    principal: Principal,
    jar: CookieJar,
) -> Response {
    state.sessions.revoke(&principal.session_id);
    tracing::info!(subject = %principal.subject, "logged out");
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, redirect("/")).into_response()
}
