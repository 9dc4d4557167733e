//! Idempotent product lookups that ride out an unreachable service.
//!
//! Only GETs go through here. A lookup is retried when the connection could
//! not be made or timed out; once any HTTP response arrives, whatever its
//! status, it is handed back for the caller to classify.

use reqwest::{Client, Response};
use url::Url;

use crate::config::RetryPolicy;
use crate::error::CatalogClientError;

/// Whether a failed send may succeed if tried again.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// `GET url`, retrying transient failures on `policy`'s schedule.
pub(crate) async fn get_with_retry(
    http: &Client,
    url: &Url,
    endpoint: &str,
    policy: &RetryPolicy,
) -> Result<Response, CatalogClientError> {
    let mut retry = 0;
    loop {
        let error = match http.get(url.clone()).send().await {
            Ok(resp) => return Ok(resp),
            Err(e) => e,
        };

        if !is_transient(&error) {
            return Err(CatalogClientError::Request {
                endpoint: endpoint.to_string(),
                source: error,
            });
        }
        if retry >= policy.max_retries {
            return Err(CatalogClientError::Unreachable {
                endpoint: endpoint.to_string(),
                attempts: retry + 1,
                source: error,
            });
        }

        let delay = policy.delay_for(retry);
        tracing::warn!(
            %endpoint,
            retry = retry + 1,
            max_retries = policy.max_retries,
            ?delay,
            error = %error,
            "external catalog unreachable, backing off"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
