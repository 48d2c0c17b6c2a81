//! Storage layer for Retention Hub
//!
//! Provides persistence for connections, warehouses, policies, sources,
//! and rules. Ships an in-memory backend; the per-entity traits are the
//! seam a durable backend would implement.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StorageError;
pub use memory::InMemoryStorage;
pub use traits::{
    ConnectionStorage, PolicyStorage, RuleStorage, SourceStorage, WarehouseStorage,
};

/// Unified storage trait
#[async_trait::async_trait]
pub trait Storage:
    ConnectionStorage + WarehouseStorage + PolicyStorage + SourceStorage + RuleStorage + Send + Sync
{
}

#[async_trait::async_trait]
impl<T> Storage for T where
    T: ConnectionStorage
        + WarehouseStorage
        + PolicyStorage
        + SourceStorage
        + RuleStorage
        + Send
        + Sync
{
}
