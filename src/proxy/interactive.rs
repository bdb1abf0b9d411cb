//! ip.ihuan.me provider
//!
//! The data endpoint only answers requests carrying a key that is handed out
//! to a browser session, so the provider walks a small state machine before
//! its first query:
//!
//! ```text
//! NoSession --GET statistics--> HasCookie --GET key (Cookie, Referer)--> Ready
//! ```
//!
//! Both values live in memory for the lifetime of the provider and are only
//! derived again when found empty at the start of a fetch. There is no expiry
//! tracking; a key the server silently stops honoring shows up as a page with
//! no addresses.

use crate::config::{non_empty, IhuanConfig};
use crate::error::{ConfigError, FetchError};
use crate::proxy::client::{get_decoded, read_body, HttpSettings};
use crate::proxy::models::{now_epoch, DialType, ProviderKind, ProxyRecord};
use crate::proxy::parser::ProxyParser;
use crate::proxy::provider::Provider;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, COOKIE, REFERER, SET_COOKIE};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub const IHUAN_DATA_URL: &str = "https://ip.ihuan.me/tqdl.html";
pub const IHUAN_STATISTICS_URL: &str = "https://ip.ihuan.me/ti.html";
pub const IHUAN_KEY_URL: &str = "https://ip.ihuan.me/mouse.do";

/// Default timeout for the interactive provider in seconds
pub const DEFAULT_IHUAN_TIMEOUT_SECS: u64 = 15;

/// Default number of proxies requested per fetch
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct IhuanSettings {
    /// Form endpoint returning the proxy page
    pub data_url: String,
    /// Page that issues the session cookie
    pub statistics_url: String,
    /// Endpoint whose body embeds the request key
    pub key_url: String,
    pub page_size: u32,
    /// Geographic filter, empty for any
    pub zone: String,
    pub http: HttpSettings,
}

impl IhuanSettings {
    pub fn from_config(config: &IhuanConfig) -> Self {
        Self {
            data_url: non_empty(&config.http_url).unwrap_or(IHUAN_DATA_URL).to_string(),
            statistics_url: non_empty(&config.statistics_url)
                .unwrap_or(IHUAN_STATISTICS_URL)
                .to_string(),
            key_url: non_empty(&config.key_url).unwrap_or(IHUAN_KEY_URL).to_string(),
            page_size: config
                .each_fetch_num
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            zone: config.zone.clone().unwrap_or_default(),
            http: HttpSettings::from_secs(config.timeout, DEFAULT_IHUAN_TIMEOUT_SECS)
                .with_proxy(non_empty(&config.proxy)),
        }
    }
}

impl Default for IhuanSettings {
    fn default() -> Self {
        Self::from_config(&IhuanConfig::default())
    }
}

/// Where the provider is in the session derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    HasCookie,
    Ready,
}

#[derive(Debug, Default)]
struct Session {
    cookie: String,
    key: String,
}

impl Session {
    fn state(&self) -> SessionState {
        match (self.cookie.is_empty(), self.key.is_empty()) {
            (true, _) => SessionState::NoSession,
            (false, true) => SessionState::HasCookie,
            (false, false) => SessionState::Ready,
        }
    }
}

pub struct IhuanProvider {
    settings: IhuanSettings,
    client: Client,
    session: Mutex<Session>,
}

impl IhuanProvider {
    pub fn new(settings: IhuanSettings) -> Result<Self, ConfigError> {
        let client = settings.http.build_client()?;
        Ok(Self {
            settings,
            client,
            session: Mutex::new(Session::default()),
        })
    }

    pub fn from_config(config: &IhuanConfig) -> Result<Self, ConfigError> {
        Self::new(IhuanSettings::from_config(config))
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Fill in whatever part of the session is missing. A failed step keeps
    /// what was already derived.
    async fn ensure_session(&self, session: &mut Session) -> Result<(), FetchError> {
        if session.cookie.is_empty() {
            session.cookie = self.derive_cookie().await?;
        }
        if session.key.is_empty() {
            session.key = self.derive_key(&session.cookie).await?;
        }
        Ok(())
    }

    async fn derive_cookie(&self) -> Result<String, FetchError> {
        info!(provider = %self.kind(), "deriving session cookie");
        let url = &self.settings.statistics_url;
        let response = self
            .client
            .get(url)
            .header(ACCEPT_ENCODING, "br")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        session_cookie(response.headers()).ok_or_else(|| FetchError::MissingCookie {
            url: url.clone(),
        })
    }

    async fn derive_key(&self, cookie: &str) -> Result<String, FetchError> {
        info!(provider = %self.kind(), "deriving request key");
        let url = &self.settings.key_url;

        let mut headers = self.browser_headers();
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.insert(COOKIE, value);
        }

        let body = get_decoded(&self.client, url, headers).await?;
        ProxyParser::extract_request_key(&String::from_utf8_lossy(&body))
            .ok_or_else(|| FetchError::MissingKey { url: url.clone() })
    }

    async fn fetch_page(&self, key: &str) -> Result<Vec<ProxyRecord>, FetchError> {
        let num = self.settings.page_size.to_string();
        let form = [
            ("num", num.as_str()),
            ("port", ""),
            ("kill_port", ""),
            ("address", self.settings.zone.as_str()),
            ("kill_address", ""),
            ("anonymity", ""),
            ("type", ""),
            ("post", ""),
            ("sort", "1"),
            ("key", key),
        ];

        let response = self
            .client
            .post(&self.settings.data_url)
            .headers(self.browser_headers())
            .form(&form)
            .send()
            .await?;
        let body = read_body(response).await?;

        Ok(ProxyParser::extract_addresses(
            &String::from_utf8_lossy(&body),
            DialType::Http,
            self.kind(),
            now_epoch(),
        ))
    }

    fn browser_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("br"));
        if let Ok(referer) = HeaderValue::from_str(&self.settings.statistics_url) {
            headers.insert(REFERER, referer);
        }
        headers
    }
}

#[async_trait]
impl Provider for IhuanProvider {
    async fn fetch(&self) -> Vec<ProxyRecord> {
        info!(provider = %self.kind(), "fetching proxies");

        let key = {
            let mut session = self.session.lock().await;
            if let Err(e) = self.ensure_session(&mut session).await {
                error!(
                    provider = %self.kind(),
                    state = ?session.state(),
                    error = %e,
                    "session derivation failed"
                );
                return Vec::new();
            }
            session.key.clone()
        };

        match self.fetch_page(&key).await {
            Ok(records) if records.is_empty() => {
                warn!(
                    provider = %self.kind(),
                    url = %self.settings.data_url,
                    "no addresses extracted; session key may be stale"
                );
                records
            }
            Ok(records) => {
                info!(provider = %self.kind(), count = records.len(), "fetched proxies");
                records
            }
            Err(e) => {
                error!(
                    provider = %self.kind(),
                    url = %self.settings.data_url,
                    error = %e,
                    "failed to fetch proxy"
                );
                Vec::new()
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Ihuan
    }
}

/// `name=value` pairs of every `Set-Cookie` header, attributes dropped
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
