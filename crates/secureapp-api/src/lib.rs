//! # secureapp-api — Axum API Service for SecureApp
//!
//! A product catalog behind single sign-on. Callers log in through an
//! external OpenID Connect provider; their roles are derived once from the
//! returned claims, and an access gate judges every later request by path
//! and role before any handler runs.
//!
//! ## API Surface
//!
//! | Path | Module | Access |
//! |------|--------|--------|
//! | `/api/products*` | [`routes::products`] | `USER` or `ADMIN` (create: `ADMIN`) |
//! | `/oauth2/authorization/*`, `/login/oauth2/code/*` | [`routes::login`] | public |
//! | `/me`, `/logout` | [`routes::account`] | signed in |
//! | `/`, `/index.html`, `/static/*`, `/favicon.ico` | static files | public |
//! | `/health/liveness`, `/health/readiness` | probes | public |
//! | `/metrics`, `/openapi.json` | operations | signed in |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! SecurityHeaders → TraceLayer → MetricsMiddleware → AccessGate → Handler
//! ```
//!
//! The gate also wraps the fallback, so an unrouted path is a login
//! redirect for anonymous callers and a 404 for signed-in ones.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod oidc;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::services::{ServeDir, ServeFile};

use crate::auth::AccessGate;
use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// Like [`app`], recording into the supplied metrics registry.
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let gate = AccessGate::from_state(&state);
    let static_dir = state.config.static_dir.clone();
    let index = static_dir.join("index.html");

    let router = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route_service("/", ServeFile::new(&index))
        .route_service("/index.html", ServeFile::new(&index))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .nest_service("/static", ServeDir::new(static_dir.join("static")))
        .merge(routes::products::router())
        .merge(routes::login::router())
        .merge(routes::account::router())
        .merge(openapi::router())
        .route("/metrics", get(middleware::metrics::prometheus_metrics))
        .fallback(not_found)
        .layer(from_fn(auth::access_gate))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(Extension(gate))
        .layer(Extension(metrics))
        .with_state(state);

    middleware::security_headers::apply(router)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — the catalog is in memory, so ready once serving.
async fn readiness() -> &'static str {
    "ready"
}

async fn not_found() -> AppError {
    AppError::NotFound("no route for this path".into())
}
