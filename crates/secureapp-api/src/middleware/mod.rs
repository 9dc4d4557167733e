//! # Middleware
//!
//! Cross-cutting layers for the SecureApp API. The access gate lives in
//! [`crate::auth`] next to the `Principal` extractor it feeds.

pub mod metrics;
pub mod security_headers;
pub mod tracing_layer;
