use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::list::{Page, PageProvider, PageRequest, ProviderError};

const MAX_RETRIES: u32 = 3;
const MAX_PAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const TOKEN_ENV_VAR: &str = "INFINILIST_API_TOKEN";

/// Pages a remote entity collection.
///
/// Requests `GET {base}/{entity}?page=&pageSize=&orderIndex=` and expects a
/// JSON body of the form `{"items": [...], "data"?, "layouts"?, "records"?}`.
///
/// # Behavior
///
/// - Each attempt is bounded by the request timeout (30s by default)
/// - HTTP 429 and 5xx responses are retried up to 3 times with exponential
///   backoff (1s, 2s, 4s by default)
/// - Other non-2xx responses fail immediately
/// - Response bodies are limited to 10MB
pub struct RestPageProvider {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
    timeout: Duration,
    backoff: Duration,
}

impl RestPageProvider {
    /// Provider for `entity` under `base_url`.
    pub fn new(client: reqwest::Client, base_url: &str, entity: &str) -> Result<Self, ProviderError> {
        let mut endpoint = Url::parse(base_url)
            .map_err(|e| ProviderError::Other(format!("invalid base URL '{base_url}': {e}")))?;
        endpoint
            .path_segments_mut()
            .map_err(|_| ProviderError::Other(format!("base URL '{base_url}' cannot have a path")))?
            .pop_if_empty()
            .push(entity);

        Ok(Self {
            client,
            endpoint,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// Provider configured from `api_base_url`, `api_token` and
    /// `request_timeout_secs`. Without a configured token the
    /// `INFINILIST_API_TOKEN` environment variable is used.
    pub fn from_config(config: &Config, entity: &str) -> Result<Self, ProviderError> {
        let base = config
            .api_base_url
            .as_deref()
            .ok_or_else(|| ProviderError::Other("api_base_url is not configured".into()))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("infinilist/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let provider = Self::new(client, base, entity)?
            .with_timeout(Duration::from_secs(config.request_timeout_secs));
        let token = config
            .api_token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok());
        Ok(match token {
            Some(token) => provider.with_token(token),
            None => provider,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base delay for retries; attempt `n` waits `backoff * 2^n`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn page_url(&self, request: &PageRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &request.page.to_string())
                .append_pair("pageSize", &request.page_size.to_string());
            if let Some(order_index) = request.order_index {
                query.append_pair("orderIndex", &order_index.to_string());
            }
        }
        url
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ProviderError> {
        let mut retry_count = 0;

        loop {
            let mut builder = self.client.get(url.clone());
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token.expose_secret());
            }

            let response = tokio::time::timeout(self.timeout, builder.send())
                .await
                .map_err(|_| ProviderError::Timeout)??;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= MAX_RETRIES {
                    return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        ProviderError::RateLimited(MAX_RETRIES)
                    } else {
                        ProviderError::HttpStatus(status.as_u16())
                    });
                }

                let delay = self.backoff.saturating_mul(2u32.pow(retry_count));
                tracing::warn!(
                    url = %url,
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Page request refused, backing off"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            // 4xx errors fail immediately
            if !status.is_success() {
                return Err(ProviderError::HttpStatus(status.as_u16()));
            }

            return read_limited_bytes(response, MAX_PAGE_SIZE).await;
        }
    }
}

#[async_trait]
impl PageProvider for RestPageProvider {
    async fn load_items(&self, request: PageRequest) -> Result<Page, ProviderError> {
        let url = self.page_url(&request);
        let bytes = self.fetch(&url).await?;
        let page: Page = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            url = %url,
            page = request.page,
            items = page.items.len(),
            "Loaded page over HTTP"
        );
        Ok(page)
    }
}

impl fmt::Debug for RestPageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestPageProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .finish()
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ProviderError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(ProviderError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ProviderError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider(base: &str) -> RestPageProvider {
        RestPageProvider::new(reqwest::Client::new(), base, "customers").unwrap()
    }

    #[test]
    fn test_endpoint_appends_entity() {
        assert_eq!(
            provider("https://crm.example.com/api").endpoint().as_str(),
            "https://crm.example.com/api/customers"
        );
        assert_eq!(
            provider("https://crm.example.com/api/").endpoint().as_str(),
            "https://crm.example.com/api/customers"
        );
    }

    #[test]
    fn test_page_url_query() {
        let provider = provider("https://crm.example.com");
        let url = provider.page_url(&PageRequest {
            page: 2,
            page_size: 20,
            order_index: Some(-3),
        });
        assert_eq!(
            url.as_str(),
            "https://crm.example.com/customers?page=2&pageSize=20&orderIndex=-3"
        );

        let unordered = provider.page_url(&PageRequest {
            page: 1,
            page_size: 10,
            order_index: None,
        });
        assert_eq!(unordered.query(), Some("page=1&pageSize=10"));
    }

    #[test]
    fn test_invalid_base_rejected() {
        let result = RestPageProvider::new(reqwest::Client::new(), "not a url", "customers");
        assert!(matches!(result, Err(ProviderError::Other(_))));

        let result = RestPageProvider::new(reqwest::Client::new(), "mailto:ops@example.com", "x");
        assert!(matches!(result, Err(ProviderError::Other(_))));
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let result = RestPageProvider::from_config(&Config::default(), "customers");
        assert!(matches!(result, Err(ProviderError::Other(_))));
    }

    #[test]
    fn test_debug_masks_token() {
        let provider = provider("https://crm.example.com").with_token("hunter2");
        let debug_output = format!("{:?}", provider);
        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
