//! Provider contract and the registry that builds providers from config

use crate::config::ProvidersConfig;
use crate::error::ConfigError;
use crate::proxy::interactive::IhuanProvider;
use crate::proxy::list::ListProvider;
use crate::proxy::models::{ProviderKind, ProxyRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A source of proxy addresses.
///
/// `fetch` never fails: transport, decode and session errors are logged by
/// the provider and surface as an empty batch.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn fetch(&self) -> Vec<ProxyRecord>;

    fn kind(&self) -> ProviderKind;
}

pub type ProviderConstructor = fn(&ProvidersConfig) -> Result<Arc<dyn Provider>, ConfigError>;

/// Maps a provider identifier to its constructor
pub struct ProviderRegistry {
    constructors: HashMap<ProviderKind, ProviderConstructor>,
}

impl ProviderRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: ProviderKind, constructor: ProviderConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn is_registered(&self, kind: ProviderKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    pub fn build(
        &self,
        kind: ProviderKind,
        config: &ProvidersConfig,
    ) -> Result<Arc<dyn Provider>, ConfigError> {
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| ConfigError::UnknownProvider(kind.to_string()))?;
        constructor(config)
    }

    /// Build every selected provider, keeping the configured order
    pub fn build_all(
        &self,
        kinds: &[ProviderKind],
        config: &ProvidersConfig,
    ) -> Result<Vec<Arc<dyn Provider>>, ConfigError> {
        kinds.iter().map(|kind| self.build(*kind, config)).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderKind::Str, build_str);
        registry.register(ProviderKind::Tsx, build_tsx);
        registry.register(ProviderKind::Cpl, build_cpl);
        registry.register(ProviderKind::Ihuan, build_ihuan);
        registry
    }
}

fn build_str(config: &ProvidersConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let provider = ListProvider::shiftytr(&config.str)?;
    Ok(Arc::new(provider))
}

fn build_tsx(config: &ProvidersConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let provider = ListProvider::speedx(&config.tsx)?;
    Ok(Arc::new(provider))
}

fn build_cpl(config: &ProvidersConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let provider = ListProvider::clarketm(&config.cpl)?;
    Ok(Arc::new(provider))
}

fn build_ihuan(config: &ProvidersConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let provider = IhuanProvider::from_config(&config.ihuan)?;
    Ok(Arc::new(provider))
}
