//! HTTP plumbing shared by every provider

use crate::error::{ConfigError, FetchError};
use crate::proxy::decode::{decode_body, ContentEncoding};
use reqwest::header::{HeaderMap, CONTENT_ENCODING};
use reqwest::{Client, Proxy as ReqwestProxy, Response};
use std::time::Duration;

/// Default user agent for HTTP requests
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/45.0.2454.85 Safari/537.36";

/// Per-provider HTTP settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Bound on every single request, connect through body
    pub timeout: Duration,
    /// Upstream proxy to dial through
    pub proxy: Option<String>,
    /// The public list hosts are fetched without certificate verification
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl HttpSettings {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            proxy: None,
            accept_invalid_certs: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Timeout in seconds, falling back to `default_secs` when unset or zero
    pub fn from_secs(timeout: Option<u64>, default_secs: u64) -> Self {
        let secs = timeout.filter(|t| *t > 0).unwrap_or(default_secs);
        Self::new(Duration::from_secs(secs))
    }

    pub fn with_proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy.map(str::to_string);
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Build a client honoring these settings
    pub fn build_client(&self) -> Result<Client, ConfigError> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(raw) = self.proxy.as_deref() {
            builder = builder.proxy(upstream_proxy(raw)?);
        }

        builder.build().map_err(ConfigError::Client)
    }
}

/// Anything mentioning `http` is an HTTP proxy; everything else is SOCKS5.
pub fn upstream_proxy(raw: &str) -> Result<ReqwestProxy, ConfigError> {
    let url = if raw.contains("http") || raw.contains("://") {
        raw.to_string()
    } else {
        format!("socks5://{raw}")
    };

    ReqwestProxy::all(&url).map_err(|source| ConfigError::InvalidProxy {
        proxy: raw.to_string(),
        source,
    })
}

/// Reject non-2xx, then decode the body by its declared encoding
pub async fn read_body(response: Response) -> Result<Vec<u8>, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: response.url().to_string(),
            status,
        });
    }

    let encoding = ContentEncoding::from_header(
        response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok()),
    );
    let bytes = response.bytes().await?;
    decode_body(encoding, &bytes)
}

/// GET `url` and return the decoded body
pub async fn get_decoded(
    client: &Client,
    url: &str,
    headers: HeaderMap,
) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).headers(headers).send().await?;
    read_body(response).await
}
