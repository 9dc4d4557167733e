//! # secureapp-catalog-client -- Typed client for the external product service
//!
//! The external product service publishes catalog entries at
//! `{base_url}/external-products/{id}` using the same JSON shape as the
//! SecureApp catalog (`{"id", "name", "price"}`).
//!
//! ## Behavior
//!
//! | Response | Result |
//! |----------|--------|
//! | 2xx with a product body | `Ok(Some(product))` |
//! | 404 | `Ok(None)` |
//! | other non-2xx | `Err(CatalogClientError::Status)` |
//! | connect failure or timeout | retried per [`RetryPolicy`], then `Err(CatalogClientError::Unreachable)` |

pub mod config;
pub mod error;
pub mod products;
pub(crate) mod retry;

pub use config::{ExternalCatalogConfig, RetryPolicy};
pub use error::CatalogClientError;
pub use products::ExternalCatalogClient;
