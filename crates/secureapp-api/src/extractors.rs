//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies in handlers.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use secureapp_core::{Product, ValidationError};

use crate::error::AppError;

/// Request types that carry business rules beyond what serde checks.
pub trait Validate {
    /// Validate business rules.
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for Product {
    fn validate(&self) -> Result<(), ValidationError> {
        Product::validate(self)
    }
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// Handlers take the body as `Result<Json<T>, JsonRejection>` so they can
/// run authorization checks before the body is inspected:
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    Validate::validate(&value)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_product_passes() {
        let product = Product::new("4", "Monitor", 300.0).unwrap();
        assert!(extract_validated_json(Ok(Json(product))).is_ok());
    }

    #[test]
    fn invalid_product_is_validation_error() {
        let product = Product {
            id: "4".into(),
            name: "Monitor".into(),
            price: -300.0,
        };
        match extract_validated_json(Ok(Json(product))) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("non-negative"), "got: {msg}"),
            other => panic!("expected Validation, got: {other:?}"),
        }
    }
}
