//! Credential storage behind a narrow trait.
//!
//! Action nodes reference credentials by id only; the secret value is looked
//! up at execution time and scoped to the workflow owner. A credential that
//! does not exist or belongs to another owner yields the same error, so a
//! caller cannot probe for foreign credential ids.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, WeftError, common::MemCache, utils};

const SECRET_CACHE_SIZE: usize = 1024;

/// A stored credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Secret {
    pub id: String,
    pub owner_id: String,
    /// display name, e.g. "OpenAI prod key"
    pub name: String,
    /// the secret material itself (api key, bot token, webhook url)
    pub value: String,
}

impl Secret {
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: utils::longid(),
            owner_id: owner_id.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a credential by id on behalf of `owner_id`.
    async fn get(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Secret>;
}

/// In-memory secret store.
#[derive(Clone)]
pub struct MemSecretStore {
    secrets: MemCache<String, Secret>,
}

impl MemSecretStore {
    pub fn new() -> Self {
        Self {
            secrets: MemCache::new(SECRET_CACHE_SIZE),
        }
    }

    pub fn put(
        &self,
        secret: Secret,
    ) {
        self.secrets.set(secret.id.clone(), secret);
    }
}

impl Default for MemSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemSecretStore {
    async fn get(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Secret> {
        match self.secrets.get(&id.to_string()) {
            Some(secret) if secret.owner_id == owner_id => Ok(secret),
            _ => Err(WeftError::Credential("Credential not found or access denied".to_string())),
        }
    }
}

/// Secret store over a plain map, handy for wiring tests.
#[async_trait]
impl SecretStore for HashMap<String, Secret> {
    async fn get(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Secret> {
        match self.get(id) {
            Some(secret) if secret.owner_id == owner_id => Ok(secret.clone()),
            _ => Err(WeftError::Credential("Credential not found or access denied".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_by_owner() {
        let store = MemSecretStore::new();
        let secret = Secret::new("user1", "OpenAI", "sk-test");
        let id = secret.id.clone();
        store.put(secret);

        let found = store.get(&id, "user1").await.unwrap();
        assert_eq!(found.value, "sk-test");
    }

    #[tokio::test]
    async fn test_foreign_owner_and_missing_are_indistinguishable() {
        let store = MemSecretStore::new();
        let secret = Secret::new("user1", "OpenAI", "sk-test");
        let id = secret.id.clone();
        store.put(secret);

        let foreign = store.get(&id, "user2").await.unwrap_err();
        let missing = store.get("nope", "user1").await.unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
        assert!(matches!(foreign, WeftError::Credential(_)));
    }
}
