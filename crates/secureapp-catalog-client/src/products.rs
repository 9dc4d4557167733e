//! Typed client for the external product service.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/external-products/{id}` | Fetch one product |

use std::time::Duration;

use secureapp_core::Product;
use url::Url;

use crate::config::{ConfigError, ExternalCatalogConfig, RetryPolicy};
use crate::error::CatalogClientError;

/// Path segment under which the service publishes products.
const PRODUCTS_SEGMENT: &str = "external-products";

/// Client for the external product service.
#[derive(Debug, Clone)]
pub struct ExternalCatalogClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ExternalCatalogClient {
    /// Create a new client from configuration.
    pub fn new(config: ExternalCatalogConfig) -> Result<Self, CatalogClientError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(
                "base_url".to_string(),
                format!("{} cannot be a base URL", config.base_url),
            )
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogClientError::Request {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
            retry: config.retry,
        })
    }

    /// Fetch a product by id.
    ///
    /// Calls `GET {base_url}/external-products/{id}`. Returns `Ok(None)` on 404.
    pub async fn get_product(&self, id: &str) -> Result<Option<Product>, CatalogClientError> {
        let endpoint = format!("GET /{PRODUCTS_SEGMENT}/{id}");
        let Some(resp) = self.fetch(id, &endpoint).await? else {
            return Ok(None);
        };

        let product = resp
            .json()
            .await
            .map_err(|e| CatalogClientError::Decode {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        Ok(Some(product))
    }

    /// Fetch a product by id and return the response body verbatim.
    pub async fn get_product_raw(&self, id: &str) -> Result<Option<String>, CatalogClientError> {
        let endpoint = format!("GET /{PRODUCTS_SEGMENT}/{id}");
        let Some(resp) = self.fetch(id, &endpoint).await? else {
            return Ok(None);
        };

        let body = resp
            .text()
            .await
            .map_err(|e| CatalogClientError::Decode {
                endpoint: endpoint.clone(),
                source: e,
            })?;
        Ok(Some(body))
    }

    /// Issue the GET and classify the status. `None` means 404.
    async fn fetch(
        &self,
        id: &str,
        endpoint: &str,
    ) -> Result<Option<reqwest::Response>, CatalogClientError> {
        let url = self.product_url(id);

        let resp = crate::retry::get_with_retry(&self.http, &url, endpoint, &self.retry).await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(%endpoint, "external product not found");
            return Ok(None);
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogClientError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        Ok(Some(resp))
    }

    /// Build `{base_url}/external-products/{id}`, percent-encoding `id` as a
    /// single path segment.
    fn product_url(&self, id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(PRODUCTS_SEGMENT).push(id);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ExternalCatalogClient {
        ExternalCatalogClient::new(ExternalCatalogConfig::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn product_url_appends_segments() {
        let c = client("http://localhost:8089");
        assert_eq!(
            c.product_url("1").as_str(),
            "http://localhost:8089/external-products/1"
        );
    }

    #[test]
    fn product_url_keeps_base_path() {
        let c = client("http://localhost:8089/catalog/");
        assert_eq!(
            c.product_url("1").as_str(),
            "http://localhost:8089/catalog/external-products/1"
        );
    }

    #[test]
    fn product_url_encodes_id_as_one_segment() {
        let c = client("http://localhost:8089");
        assert_eq!(
            c.product_url("a/b c").as_str(),
            "http://localhost:8089/external-products/a%2Fb%20c"
        );
    }

    #[test]
    fn rejects_cannot_be_a_base_url() {
        let config = ExternalCatalogConfig::new(Url::parse("mailto:catalog@example.com").unwrap());
        assert!(matches!(
            ExternalCatalogClient::new(config),
            Err(CatalogClientError::Config(_))
        ));
    }
}
