//! # Product Catalog API
//!
//! Read access to the seed catalog for any signed-in caller, and an
//! administrator-only create endpoint that validates, logs, and echoes the
//! submitted product without storing it.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use secureapp_core::{Product, Role};

use crate::auth::require_role;
use crate::error::AppError;
use crate::extractors::extract_validated_json;
use crate::session::Principal;
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/:id", get(get_product))
}

/// GET /api/products — List the catalog.
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "All products in catalog order", body = [Product]),
        (status = 302, description = "Not signed in; redirect to login"),
    ),
    tag = "products"
)]
async fn list_products(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.catalog.list().to_vec())
}

/// GET /api/products/{id} — Look up one product.
///
/// A miss is not an error: the body is JSON `null` with status 200.
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product, or null when no product has this id", body = Product),
        (status = 302, description = "Not signed in; redirect to login"),
    ),
    tag = "products"
)]
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Option<Product>> {
    Json(state.catalog.find(&id).cloned())
}

/// POST /api/products — Create a product (ADMIN only).
///
/// The role check runs before the body is looked at, so a non-admin gets
/// 403 even for a malformed body. The catalog is not modified.
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = Product,
    responses(
        (status = 200, description = "The submitted product, echoed", body = Product),
        (status = 400, description = "Malformed JSON body", body = crate::error::ErrorBody),
        (status = 403, description = "Caller lacks ADMIN", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid product", body = crate::error::ErrorBody),
    ),
    tag = "products"
)]
async fn create_product(
    principal: Principal,
    body: Result<Json<Product>, JsonRejection>,
) -> Result<Json<Product>, AppError> {
    require_role(&principal, Role::Admin)?;
    let product = extract_validated_json(body)?;
    tracing::info!(
        id = %product.id,
        created_by = %principal.subject,
        "Creating product: {}",
        product.name
    );
    Ok(Json(product))
}
