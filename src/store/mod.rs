//! Storage layer for persisting workflows and execution records.
//!
//! Provides an abstraction over storage backends; `MemStore` is the built-in
//! in-memory backend. Collections are registered on a [`Store`] by a
//! [`DbStore`] implementation at engine construction time.

pub mod data;
mod mem;
mod store;

use strum::{AsRefStr, EnumIter};

use crate::Result;

pub use mem::MemStore;
pub use store::Store;

/// Identifiers for the storage collections.
#[derive(Debug, Clone, AsRefStr, PartialEq, Hash, Eq, EnumIter)]
pub enum StoreIden {
    /// Workflow definitions.
    #[strum(serialize = "workflows")]
    Workflows,
    /// Execution records.
    #[strum(serialize = "executions")]
    Executions,
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// Lists records whose `field` equals `value`.
    fn list_by(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Vec<Self::Item>>;

    /// Creates a new record.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Registers this backend's collections with the store.
    fn init(
        &self,
        s: &Store,
    );
}
