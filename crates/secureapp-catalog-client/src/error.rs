//! External catalog client error types.

/// Errors from external product lookups.
#[derive(Debug, thiserror::Error)]
pub enum CatalogClientError {
    /// The service could not be reached within the retry budget.
    #[error("external catalog unreachable for {endpoint} after {attempts} attempt(s): {source}")]
    Unreachable {
        endpoint: String,
        attempts: u32,
        source: reqwest::Error,
    },
    /// A request failed in a way retrying cannot fix, or the HTTP client
    /// could not be built.
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service answered with a non-2xx status other than 404.
    #[error("external catalog {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The body was not a product.
    #[error("malformed product from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
