//! Proxy providers
//!
//! This module provides:
//! - The normalized [`ProxyRecord`] every provider emits
//! - The [`Provider`] contract and a registry that builds providers by name
//! - Static list providers and the session-gated interactive provider
//! - Shared HTTP fetching and content decoding

pub mod client;
pub mod decode;
pub mod interactive;
pub mod list;
pub mod models;
pub mod parser;
pub mod provider;

pub use client::HttpSettings;
pub use decode::ContentEncoding;
pub use interactive::{IhuanProvider, IhuanSettings, SessionState};
pub use list::{ListProvider, ListSource};
pub use models::{DialType, ProviderKind, ProxyRecord};
pub use parser::ProxyParser;
pub use provider::{Provider, ProviderRegistry};
