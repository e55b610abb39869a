use std::sync::Arc;

use crate::{
    Config, Engine, Result,
    executors::ExecutorRegistry,
    secrets::{MemSecretStore, SecretStore},
    store::{DbStore, MemStore, Store},
};

/// Assembles an [`Engine`] from its parts, with in-memory defaults.
pub struct EngineBuilder {
    config: Config,
    registry: ExecutorRegistry,
    secrets: Option<Arc<dyn SecretStore>>,
    store: Option<Arc<Store>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            registry: ExecutorRegistry::default(),
            secrets: None,
            store: None,
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    /// Use a registry with custom or replaced executors.
    pub fn registry(
        mut self,
        registry: ExecutorRegistry,
    ) -> Self {
        self.registry = registry;
        self
    }

    pub fn secrets(
        mut self,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn store(
        mut self,
        store: Arc<Store>,
    ) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let store = match self.store {
            Some(store) => store,
            None => {
                let store = Arc::new(Store::new());
                MemStore::new().init(&store);
                store
            }
        };
        let secrets = self.secrets.unwrap_or_else(|| Arc::new(MemSecretStore::new()));

        Engine::new(&self.config, store, self.registry, secrets)
    }
}
