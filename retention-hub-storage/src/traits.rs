//! Storage traits defining the interface for persistence

use async_trait::async_trait;
use retention_hub_core::{Connection, Policy, Rule, RuleType, Source, Warehouse};
use uuid::Uuid;

use crate::StorageError;

/// Trait for connection storage operations
#[async_trait]
pub trait ConnectionStorage: Send + Sync {
    /// Save a new connection, assigning its creation sequence
    async fn save(&self, connection: Connection) -> Result<Connection, StorageError>;

    /// Get a connection by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, StorageError>;

    /// Get a connection by its unique name
    async fn get_by_name(&self, name: &str) -> Result<Option<Connection>, StorageError>;

    /// List all connections in creation order
    async fn list(&self) -> Result<Vec<Connection>, StorageError>;

    /// Update an existing connection
    async fn update(&self, connection: Connection) -> Result<Connection, StorageError>;

    /// Delete a connection
    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;
}

/// Trait for warehouse storage operations
#[async_trait]
pub trait WarehouseStorage: Send + Sync {
    /// Save a new warehouse, assigning its creation sequence
    async fn save(&self, warehouse: Warehouse) -> Result<Warehouse, StorageError>;

    /// Get a warehouse by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Warehouse>, StorageError>;

    /// Get a warehouse by its unique name
    async fn get_by_name(&self, name: &str) -> Result<Option<Warehouse>, StorageError>;

    /// List all warehouses in creation order
    async fn list(&self) -> Result<Vec<Warehouse>, StorageError>;

    /// Update an existing warehouse
    async fn update(&self, warehouse: Warehouse) -> Result<Warehouse, StorageError>;

    /// Delete a warehouse
    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;
}

/// Trait for policy storage operations
#[async_trait]
pub trait PolicyStorage: Send + Sync {
    /// Save a new policy, assigning its creation sequence
    async fn save(&self, policy: Policy) -> Result<Policy, StorageError>;

    /// Get a policy by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Policy>, StorageError>;

    /// Get a policy by its unique name
    async fn get_by_name(&self, name: &str) -> Result<Option<Policy>, StorageError>;

    /// List all policies in creation order
    async fn list(&self) -> Result<Vec<Policy>, StorageError>;

    /// Update an existing policy
    async fn update(&self, policy: Policy) -> Result<Policy, StorageError>;

    /// Delete a policy
    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;
}

/// Trait for source storage operations
#[async_trait]
pub trait SourceStorage: Send + Sync {
    /// Save a new source, assigning its creation sequence
    async fn save(&self, source: Source) -> Result<Source, StorageError>;

    /// Get a source by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Source>, StorageError>;

    /// Get a source by its unique name
    async fn get_by_name(&self, name: &str) -> Result<Option<Source>, StorageError>;

    /// List all sources in creation order
    async fn list(&self) -> Result<Vec<Source>, StorageError>;

    /// Update an existing source
    async fn update(&self, source: Source) -> Result<Source, StorageError>;

    /// Delete a source
    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;

    /// Whether any source references the given connection
    async fn any_with_connection(&self, connection_id: Uuid) -> Result<bool, StorageError>;

    /// Whether any source references the given warehouse
    async fn any_with_warehouse(&self, warehouse_id: Uuid) -> Result<bool, StorageError>;

    /// Whether any source uses the given policy as its default
    async fn any_with_policy(&self, policy_id: Uuid) -> Result<bool, StorageError>;
}

/// Trait for rule storage operations.
///
/// `find_rules` is the lookup the resolution engine builds on: it returns
/// rules of one type at one coordinate, ordered ascending by creation
/// sequence. That ordering is the tie-break authority when multiple rules
/// target the same coordinate.
#[async_trait]
pub trait RuleStorage: Send + Sync {
    /// Save a new rule, assigning its creation sequence
    async fn save(&self, rule: Rule) -> Result<Rule, StorageError>;

    /// Get a rule by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Rule>, StorageError>;

    /// List all rules of a source in creation order
    async fn list_for_source(&self, source_id: Uuid) -> Result<Vec<Rule>, StorageError>;

    /// Find rules of one type at one (schema, table) coordinate, in creation
    /// order. `table: None` selects schema-level rules only and `Some(name)`
    /// table-level rules only; the two result sets are disjoint.
    async fn find_rules(
        &self,
        source_id: Uuid,
        rule_type: RuleType,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<Rule>, StorageError>;

    /// Whether the source has any rules
    async fn any_for_source(&self, source_id: Uuid) -> Result<bool, StorageError>;

    /// Whether any override rule references the given policy
    async fn any_with_policy(&self, policy_id: Uuid) -> Result<bool, StorageError>;

    /// Update an existing rule
    async fn update(&self, rule: Rule) -> Result<Rule, StorageError>;

    /// Delete a rule
    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;
}
