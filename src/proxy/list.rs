//! Providers backed by static newline-delimited `host:port` lists

use crate::config::{non_empty, DualListConfig, SingleListConfig};
use crate::error::{ConfigError, FetchError};
use crate::proxy::client::{get_decoded, HttpSettings};
use crate::proxy::models::{now_epoch, DialType, ProviderKind, ProxyRecord};
use crate::proxy::parser::ProxyParser;
use crate::proxy::provider::Provider;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use tracing::{debug, error, info, warn};

/// Default timeout for list providers in seconds
pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 5;

pub const SHIFTYTR_HTTP_URL: &str =
    "https://raw.githubusercontent.com/shiftytr/proxy-list/master/http.txt";
pub const SHIFTYTR_SOCKS5_URL: &str =
    "https://raw.githubusercontent.com/shiftytr/proxy-list/master/socks5.txt";
pub const SPEEDX_HTTP_URL: &str =
    "https://raw.githubusercontent.com/TheSpeedX/SOCKS-List/master/http.txt";
pub const SPEEDX_SOCKS5_URL: &str =
    "https://raw.githubusercontent.com/TheSpeedX/SOCKS-List/master/socks5.txt";
pub const CLARKETM_URL: &str =
    "https://raw.githubusercontent.com/clarketm/proxy-list/master/proxy-list-raw.txt";

/// One list URL and the transport every entry in it speaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSource {
    pub url: String,
    pub dial_type: DialType,
}

impl ListSource {
    pub fn new(url: &str, dial_type: DialType) -> Self {
        Self {
            url: url.to_string(),
            dial_type,
        }
    }
}

/// A provider that GETs one or more plain lists
pub struct ListProvider {
    kind: ProviderKind,
    sources: Vec<ListSource>,
    client: Client,
}

impl ListProvider {
    pub fn new(
        kind: ProviderKind,
        sources: Vec<ListSource>,
        settings: &HttpSettings,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            kind,
            sources,
            client: settings.build_client()?,
        })
    }

    /// shiftytr/proxy-list
    pub fn shiftytr(config: &DualListConfig) -> Result<Self, ConfigError> {
        Self::dual(ProviderKind::Str, config, SHIFTYTR_HTTP_URL, SHIFTYTR_SOCKS5_URL)
    }

    /// TheSpeedX/SOCKS-List
    pub fn speedx(config: &DualListConfig) -> Result<Self, ConfigError> {
        Self::dual(ProviderKind::Tsx, config, SPEEDX_HTTP_URL, SPEEDX_SOCKS5_URL)
    }

    /// clarketm/proxy-list; the combined list is tagged HTTP
    pub fn clarketm(config: &SingleListConfig) -> Result<Self, ConfigError> {
        let url = non_empty(&config.url).unwrap_or(CLARKETM_URL);
        let settings = HttpSettings::from_secs(config.timeout, DEFAULT_LIST_TIMEOUT_SECS)
            .with_proxy(non_empty(&config.proxy));
        Self::new(
            ProviderKind::Cpl,
            vec![ListSource::new(url, DialType::Http)],
            &settings,
        )
    }

    fn dual(
        kind: ProviderKind,
        config: &DualListConfig,
        default_http: &str,
        default_socks5: &str,
    ) -> Result<Self, ConfigError> {
        let http_url = non_empty(&config.http_url).unwrap_or(default_http);
        let socks5_url = non_empty(&config.socks5_url).unwrap_or(default_socks5);
        let settings = HttpSettings::from_secs(config.timeout, DEFAULT_LIST_TIMEOUT_SECS)
            .with_proxy(non_empty(&config.proxy));
        Self::new(
            kind,
            vec![
                ListSource::new(http_url, DialType::Http),
                ListSource::new(socks5_url, DialType::Socks5),
            ],
            &settings,
        )
    }

    pub fn sources(&self) -> &[ListSource] {
        &self.sources
    }

    async fn fetch_source(&self, source: &ListSource) -> Result<Vec<ProxyRecord>, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let body = get_decoded(&self.client, &source.url, headers).await?;
        let text = String::from_utf8_lossy(&body);
        Ok(ProxyParser::parse_lines(
            &text,
            source.dial_type,
            self.kind,
            now_epoch(),
        ))
    }
}

#[async_trait]
impl Provider for ListProvider {
    async fn fetch(&self) -> Vec<ProxyRecord> {
        info!(provider = %self.kind, "fetching proxies");

        // Sources are independent; one failing must not drop the others.
        let results = join_all(self.sources.iter().map(|s| self.fetch_source(s))).await;

        let mut records = Vec::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(batch) if batch.is_empty() => {
                    warn!(
                        provider = %self.kind,
                        url = %source.url,
                        dial_type = %source.dial_type,
                        "no proxies in response"
                    );
                }
                Ok(batch) => {
                    debug!(
                        provider = %self.kind,
                        dial_type = %source.dial_type,
                        count = batch.len(),
                        "fetched proxy list"
                    );
                    records.extend(batch);
                }
                Err(e) => {
                    error!(
                        provider = %self.kind,
                        url = %source.url,
                        dial_type = %source.dial_type,
                        error = %e,
                        "failed to fetch proxy list"
                    );
                }
            }
        }
        records
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shiftytr_defaults() {
        let provider = ListProvider::shiftytr(&DualListConfig::default()).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Str);
        assert_eq!(
            provider.sources(),
            &[
                ListSource::new(SHIFTYTR_HTTP_URL, DialType::Http),
                ListSource::new(SHIFTYTR_SOCKS5_URL, DialType::Socks5),
            ]
        );
    }

    #[test]
    fn test_speedx_overrides() {
        let config = DualListConfig {
            http_url: Some("http://localhost/h.txt".to_string()),
            socks5_url: Some(String::new()),
            timeout: Some(1),
            proxy: None,
        };
        let provider = ListProvider::speedx(&config).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Tsx);
        assert_eq!(provider.sources()[0].url, "http://localhost/h.txt");
        assert_eq!(provider.sources()[1].url, SPEEDX_SOCKS5_URL);
    }

    #[test]
    fn test_clarketm_single_http_source() {
        let provider = ListProvider::clarketm(&SingleListConfig::default()).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Cpl);
        assert_eq!(
            provider.sources(),
            &[ListSource::new(CLARKETM_URL, DialType::Http)]
        );
    }
}
