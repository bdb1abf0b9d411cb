//! Proxy data models

use std::fmt;
use std::str::FromStr;

/// Transport a discovered proxy speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DialType {
    #[default]
    Http,
    Socks5,
}

impl DialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialType::Http => "http",
            DialType::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for DialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(DialType::Http),
            "socks5" => Ok(DialType::Socks5),
            other => Err(format!("invalid dial type: {other}")),
        }
    }
}

/// Identifies which provider produced a record. Attribution only, never
/// part of a record's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// shiftytr/proxy-list, separate HTTP and SOCKS5 lists
    Str,
    /// TheSpeedX/SOCKS-List, separate HTTP and SOCKS5 lists
    Tsx,
    /// clarketm/proxy-list, one combined HTTP list
    Cpl,
    /// ip.ihuan.me, session-gated form endpoint
    Ihuan,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Str,
        ProviderKind::Tsx,
        ProviderKind::Cpl,
        ProviderKind::Ihuan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Str => "STR",
            ProviderKind::Tsx => "TSX",
            ProviderKind::Cpl => "CPL",
            ProviderKind::Ihuan => "IHUAN",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == upper)
            .ok_or_else(|| s.to_string())
    }
}

/// A single discovered proxy, normalized across providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRecord {
    /// `host:port`
    pub address: String,
    pub dial_type: DialType,
    pub provider: ProviderKind,
    /// Reserved for health tracking; always reset on re-observation
    pub error_count: i64,
    /// Epoch seconds
    pub created_at: i64,
    /// Epoch seconds
    pub updated_at: i64,
}

impl ProxyRecord {
    /// A record seen for the first time at `now`
    pub fn observed(
        address: impl Into<String>,
        dial_type: DialType,
        provider: ProviderKind,
        now: i64,
    ) -> Self {
        Self {
            address: address.into(),
            dial_type,
            provider,
            error_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the record as seen again at `now`
    pub fn touch(&mut self, now: i64) {
        self.updated_at = now;
        self.error_count = 0;
    }

    /// Identity key inside the store
    pub fn key(&self) -> (&str, DialType) {
        (&self.address, self.dial_type)
    }
}

impl fmt::Display for ProxyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.dial_type, self.address)
    }
}

/// Current time in epoch seconds
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
