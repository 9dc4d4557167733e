//! # Single Sign-On Login
//!
//! The two public endpoints of the authorization-code flow:
//!
//! 1. `GET /oauth2/authorization/{registration}` issues a single-use
//!    `state`, pins it to the browser in the `OAUTH_STATE` cookie, and
//!    redirects to the identity provider.
//! 2. `GET /login/oauth2/code/{registration}` receives the provider's
//!    answer, checks the query `state` against the browser's cookie, redeems
//!    it, trades the code for claims, maps roles, opens a session and sets
//!    the `SESSION` cookie.
//!
//! Every failure in step 2 is a 401; no session is created. The
//! `OAUTH_STATE` cookie is cleared either way.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::auth::redirect;
use crate::error::AppError;
use crate::oidc::OidcClient;
use crate::session::{LOGIN_STATE_COOKIE, SESSION_COOKIE};
use crate::state::AppState;

/// Query parameters the identity provider sends back.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// The state cookie is only sent back to the callback.
const LOGIN_STATE_PATH: &str = secureapp_core::policy::LOGIN_CALLBACK_PREFIX;

/// Build the login router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/oauth2/authorization/:registration", get(begin_login))
        .route("/login/oauth2/code/:registration", get(complete_login))
}

/// The configured client, provided `registration` names it.
fn client_for<'a>(state: &'a AppState, registration: &str) -> Result<&'a OidcClient, AppError> {
    let client = state
        .oidc
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("single sign-on is not configured".into()))?;
    if registration != state.config.registration_id {
        return Err(AppError::Unauthorized(format!(
            "unknown client registration '{registration}'"
        )));
    }
    Ok(client)
}

/// GET /oauth2/authorization/{registration} — Start a login.
async fn begin_login(
    State(state): State<AppState>,
    Path(registration): Path<String>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let client = client_for(&state, &registration)?;
    let login_state = state.pending_logins.issue();
    let url = client.authorization_url(&login_state);

    // Browser-session lifetime; the state itself expires server-side.
    let cookie = Cookie::build((LOGIN_STATE_COOKIE, login_state))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path(LOGIN_STATE_PATH)
        .secure(state.config.secure_cookies);

    tracing::debug!(%registration, "redirecting to identity provider");
    Ok((jar.add(cookie), redirect(url.as_str())).into_response())
}

/// GET /login/oauth2/code/{registration} — Finish a login.
async fn complete_login(
    State(state): State<AppState>,
    Path(registration): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> Response {
    let browser_state = jar.get(LOGIN_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(LOGIN_STATE_COOKIE).path(LOGIN_STATE_PATH));

    match finish_login(&state, &registration, params, browser_state.as_deref()).await {
        Ok(cookie) => (jar.add(cookie), redirect("/")).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

/// Validate the callback and open a session. Returns the session cookie.
async fn finish_login(
    state: &AppState,
    registration: &str,
    params: CallbackParams,
    browser_state: Option<&str>,
) -> Result<Cookie<'static>, AppError> {
    let client = client_for(state, registration)?;

    if let Some(error) = params.error {
        tracing::warn!(
            %registration,
            %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "identity provider reported a login error"
        );
        return Err(AppError::Unauthorized(format!(
            "identity provider returned '{error}'"
        )));
    }

    // The state must come back to the browser it was issued to.
    let Some(login_state) = params.state.as_deref().filter(|s| Some(*s) == browser_state) else {
        tracing::warn!(%registration, "login callback state does not match this browser");
        return Err(AppError::Unauthorized("invalid or expired login state".into()));
    };
    if !state.pending_logins.consume(login_state) {
        tracing::warn!(%registration, "login callback with unknown or expired state");
        return Err(AppError::Unauthorized("invalid or expired login state".into()));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::Unauthorized("authorization code missing".into()))?;

    let claims = client.load_claims(&code).await.map_err(|e| {
        tracing::warn!(%registration, error = %e, "identity provider exchange failed");
        AppError::Unauthorized("identity provider exchange failed".into())
    })?;

    let principal = state.sessions.establish(claims)?;
    tracing::info!(
        %registration,
        subject = %principal.subject,
        roles = %principal.roles,
        "login completed"
    );

    Ok(Cookie::build((SESSION_COOKIE, principal.session_id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(state.config.secure_cookies)
        .build())
}
