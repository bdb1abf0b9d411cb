//! Turns decoded provider bodies into proxy records

use crate::proxy::models::{DialType, ProviderKind, ProxyRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// IPv4:PORT anywhere in free text. Matches are taken verbatim, no range checks.
/// ASCII digits only; `\d` would also accept fullwidth digits.
static IP_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}:[0-9]{1,5}")
        .expect("Invalid IP:PORT regex")
});

/// Request key handed out by the interactive provider's key endpoint
static REQUEST_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9]{32}").expect("Invalid request key regex"));

/// Parser for provider response bodies
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a newline-delimited `host:port` list.
    ///
    /// One record per non-blank line, in body order. Lines are trimmed so
    /// CRLF bodies behave the same as LF bodies.
    pub fn parse_lines(
        body: &str,
        dial_type: DialType,
        provider: ProviderKind,
        now: i64,
    ) -> Vec<ProxyRecord> {
        body.split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| ProxyRecord::observed(line, dial_type, provider, now))
            .collect()
    }

    /// Extract every `IPv4:PORT` substring from unstructured text.
    ///
    /// Duplicates in the source yield duplicate records.
    pub fn extract_addresses(
        body: &str,
        dial_type: DialType,
        provider: ProviderKind,
        now: i64,
    ) -> Vec<ProxyRecord> {
        IP_PORT_REGEX
            .find_iter(body)
            .map(|m| ProxyRecord::observed(m.as_str(), dial_type, provider, now))
            .collect()
    }

    /// First 32-character lowercase alphanumeric token in `body`
    pub fn extract_request_key(body: &str) -> Option<String> {
        REQUEST_KEY_REGEX.find(body).map(|m| m.as_str().to_string())
    }
}
