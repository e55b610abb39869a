//! In-memory storage backend.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use crate::{
    Result, WeftError,
    common::MemCache,
    model::Execution,
    store::{DbCollection, DbStore, Store, data::*},
};

const COLLECTION_SIZE: usize = 8192;

trait DbDocument: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
}

impl DbDocument for Workflow {
    fn id(&self) -> &str {
        &self.id
    }
}

impl DbDocument for Execution {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone)]
pub struct MemStore {
    workflows: Arc<Collect<Workflow>>,
    executions: Arc<Collect<Execution>>,
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) {
        s.register(self.workflows());
        s.register(self.executions());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(Collect::new("workflows")),
            executions: Arc::new(Collect::new("executions")),
        }
    }

    pub fn workflows(&self) -> Arc<dyn DbCollection<Item = Workflow> + Send + Sync> {
        self.workflows.clone()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = Execution> + Send + Sync> {
        self.executions.clone()
    }
}

/// One in-memory collection keyed by record id.
pub struct Collect<T> {
    name: &'static str,
    entries: MemCache<String, T>,
}

impl<T> Collect<T>
where
    T: DbDocument + Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: MemCache::new(COLLECTION_SIZE),
        }
    }
}

impl<T> DbCollection for Collect<T>
where
    T: DbDocument + Clone + Send + Sync + 'static,
{
    type Item = T;

    fn exists(
        &self,
        id: &str,
    ) -> Result<bool> {
        Ok(self.entries.get(&id.to_string()).is_some())
    }

    fn find(
        &self,
        id: &str,
    ) -> Result<T> {
        self.entries
            .get(&id.to_string())
            .ok_or_else(|| WeftError::Store(format!("record {} not found in {}", id, self.name)))
    }

    fn list_by(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for (_, item) in self.entries.iter() {
            let doc = serde_json::to_value(&item).map_err(|e| WeftError::Store(e.to_string()))?;
            let matched = match &doc[field] {
                JsonValue::String(s) => s == value,
                other => other.to_string() == value,
            };
            if matched {
                rows.push(item);
            }
        }
        // cache iteration order is arbitrary
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(rows)
    }

    fn create(
        &self,
        data: &T,
    ) -> Result<bool> {
        if self.exists(data.id())? {
            return Err(WeftError::Store(format!("record {} already exists in {}", data.id(), self.name)));
        }
        self.entries.set(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn update(
        &self,
        data: &T,
    ) -> Result<bool> {
        if !self.exists(data.id())? {
            return Err(WeftError::Store(format!("record {} not found in {}", data.id(), self.name)));
        }
        self.entries.set(data.id().to_string(), data.clone());
        Ok(true)
    }

    fn delete(
        &self,
        id: &str,
    ) -> Result<bool> {
        if !self.exists(id)? {
            return Ok(false);
        }
        self.entries.remove(&id.to_string());
        Ok(true)
    }
}
