//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI spec served
//! at `/openapi.json`. The document is behind the access gate like any
//! other non-public path.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the SecureApp API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SecureApp API",
        version = "0.1.0",
        description = "Product catalog behind single sign-on, with role-based access control.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::products::list_products,
        crate::routes::products::get_product,
        crate::routes::products::create_product,
        crate::routes::account::me,
        crate::routes::account::logout,
    ),
    components(schemas(
        secureapp_core::Product,
        secureapp_core::Role,
        crate::routes::account::MeResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "account", description = "Current session"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_product_paths() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).unwrap();
        let paths = json["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/products"));
        assert!(paths.contains_key("/api/products/{id}"));
        assert!(paths.contains_key("/me"));
        assert!(json["components"]["schemas"]["Product"].is_object());
    }

    #[test]
    fn create_documents_forbidden() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert!(json["paths"]["/api/products"]["post"]["responses"]["403"].is_object());
    }
}
