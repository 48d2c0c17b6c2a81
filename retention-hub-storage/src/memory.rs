//! In-memory storage implementation for development and testing

use async_trait::async_trait;
use retention_hub_core::{Connection, Policy, Rule, RuleType, Source, Warehouse};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use crate::{
    ConnectionStorage, PolicyStorage, RuleStorage, SourceStorage, StorageError, WarehouseStorage,
};

/// In-memory storage for development and testing.
///
/// A single atomic counter stamps every saved record with a creation
/// sequence, so listing and rule tie-breaking never depend on map
/// iteration order.
pub struct InMemoryStorage {
    seq: AtomicU64,
    connections: RwLock<HashMap<Uuid, Connection>>,
    warehouses: RwLock<HashMap<Uuid, Warehouse>>,
    policies: RwLock<HashMap<Uuid, Policy>>,
    sources: RwLock<HashMap<Uuid, Source>>,
    rules: RwLock<HashMap<Uuid, Rule>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            connections: RwLock::new(HashMap::new()),
            warehouses: RwLock::new(HashMap::new()),
            policies: RwLock::new(HashMap::new()),
            sources: RwLock::new(HashMap::new()),
            rules: RwLock::new(HashMap::new()),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionStorage for InMemoryStorage {
    async fn save(&self, mut connection: Connection) -> Result<Connection, StorageError> {
        connection.seq = self.next_seq();
        let mut connections = self.connections.write().unwrap();
        connections.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, StorageError> {
        let connections = self.connections.read().unwrap();
        Ok(connections.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Connection>, StorageError> {
        let connections = self.connections.read().unwrap();
        Ok(connections.values().find(|c| c.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Connection>, StorageError> {
        let connections = self.connections.read().unwrap();
        let mut all: Vec<_> = connections.values().cloned().collect();
        all.sort_by_key(|c| c.seq);
        Ok(all)
    }

    async fn update(&self, connection: Connection) -> Result<Connection, StorageError> {
        let mut connections = self.connections.write().unwrap();
        if connections.contains_key(&connection.id) {
            connections.insert(connection.id, connection.clone());
            Ok(connection)
        } else {
            Err(StorageError::NotFound(format!(
                "Connection with id {} not found",
                connection.id
            )))
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut connections = self.connections.write().unwrap();
        if connections.remove(&id).is_some() {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!(
                "Connection with id {} not found",
                id
            )))
        }
    }
}

#[async_trait]
impl WarehouseStorage for InMemoryStorage {
    async fn save(&self, mut warehouse: Warehouse) -> Result<Warehouse, StorageError> {
        warehouse.seq = self.next_seq();
        let mut warehouses = self.warehouses.write().unwrap();
        warehouses.insert(warehouse.id, warehouse.clone());
        Ok(warehouse)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Warehouse>, StorageError> {
        let warehouses = self.warehouses.read().unwrap();
        Ok(warehouses.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Warehouse>, StorageError> {
        let warehouses = self.warehouses.read().unwrap();
        Ok(warehouses.values().find(|w| w.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Warehouse>, StorageError> {
        let warehouses = self.warehouses.read().unwrap();
        let mut all: Vec<_> = warehouses.values().cloned().collect();
        all.sort_by_key(|w| w.seq);
        Ok(all)
    }

    async fn update(&self, warehouse: Warehouse) -> Result<Warehouse, StorageError> {
        let mut warehouses = self.warehouses.write().unwrap();
        if warehouses.contains_key(&warehouse.id) {
            warehouses.insert(warehouse.id, warehouse.clone());
            Ok(warehouse)
        } else {
            Err(StorageError::NotFound(format!(
                "Warehouse with id {} not found",
                warehouse.id
            )))
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut warehouses = self.warehouses.write().unwrap();
        if warehouses.remove(&id).is_some() {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!(
                "Warehouse with id {} not found",
                id
            )))
        }
    }
}

#[async_trait]
impl PolicyStorage for InMemoryStorage {
    async fn save(&self, mut policy: Policy) -> Result<Policy, StorageError> {
        policy.seq = self.next_seq();
        let mut policies = self.policies.write().unwrap();
        policies.insert(policy.id, policy.clone());
        Ok(policy)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Policy>, StorageError> {
        let policies = self.policies.read().unwrap();
        Ok(policies.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Policy>, StorageError> {
        let policies = self.policies.read().unwrap();
        Ok(policies.values().find(|p| p.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Policy>, StorageError> {
        let policies = self.policies.read().unwrap();
        let mut all: Vec<_> = policies.values().cloned().collect();
        all.sort_by_key(|p| p.seq);
        Ok(all)
    }

    async fn update(&self, policy: Policy) -> Result<Policy, StorageError> {
        let mut policies = self.policies.write().unwrap();
        if policies.contains_key(&policy.id) {
            policies.insert(policy.id, policy.clone());
            Ok(policy)
        } else {
            Err(StorageError::NotFound(format!(
                "Policy with id {} not found",
                policy.id
            )))
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut policies = self.policies.write().unwrap();
        if policies.remove(&id).is_some() {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!(
                "Policy with id {} not found",
                id
            )))
        }
    }
}

#[async_trait]
impl SourceStorage for InMemoryStorage {
    async fn save(&self, mut source: Source) -> Result<Source, StorageError> {
        source.seq = self.next_seq();
        let mut sources = self.sources.write().unwrap();
        sources.insert(source.id, source.clone());
        Ok(source)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Source>, StorageError> {
        let sources = self.sources.read().unwrap();
        Ok(sources.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Source>, StorageError> {
        let sources = self.sources.read().unwrap();
        Ok(sources.values().find(|s| s.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Source>, StorageError> {
        let sources = self.sources.read().unwrap();
        let mut all: Vec<_> = sources.values().cloned().collect();
        all.sort_by_key(|s| s.seq);
        Ok(all)
    }

    async fn update(&self, source: Source) -> Result<Source, StorageError> {
        let mut sources = self.sources.write().unwrap();
        if sources.contains_key(&source.id) {
            sources.insert(source.id, source.clone());
            Ok(source)
        } else {
            Err(StorageError::NotFound(format!(
                "Source with id {} not found",
                source.id
            )))
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut sources = self.sources.write().unwrap();
        if sources.remove(&id).is_some() {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!(
                "Source with id {} not found",
                id
            )))
        }
    }

    async fn any_with_connection(&self, connection_id: Uuid) -> Result<bool, StorageError> {
        let sources = self.sources.read().unwrap();
        Ok(sources.values().any(|s| s.connection_id == connection_id))
    }

    async fn any_with_warehouse(&self, warehouse_id: Uuid) -> Result<bool, StorageError> {
        let sources = self.sources.read().unwrap();
        Ok(sources.values().any(|s| s.warehouse_id == warehouse_id))
    }

    async fn any_with_policy(&self, policy_id: Uuid) -> Result<bool, StorageError> {
        let sources = self.sources.read().unwrap();
        Ok(sources.values().any(|s| s.default_policy_id == policy_id))
    }
}

#[async_trait]
impl RuleStorage for InMemoryStorage {
    async fn save(&self, mut rule: Rule) -> Result<Rule, StorageError> {
        rule.seq = self.next_seq();
        let mut rules = self.rules.write().unwrap();
        rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Rule>, StorageError> {
        let rules = self.rules.read().unwrap();
        Ok(rules.get(&id).cloned())
    }

    async fn list_for_source(&self, source_id: Uuid) -> Result<Vec<Rule>, StorageError> {
        let rules = self.rules.read().unwrap();
        let mut matching: Vec<_> = rules
            .values()
            .filter(|r| r.source_id == source_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.seq);
        Ok(matching)
    }

    async fn find_rules(
        &self,
        source_id: Uuid,
        rule_type: RuleType,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<Rule>, StorageError> {
        let rules = self.rules.read().unwrap();
        let mut matching: Vec<_> = rules
            .values()
            .filter(|r| {
                r.source_id == source_id
                    && r.kind.rule_type() == rule_type
                    && r.schema == schema
                    && r.table.as_deref() == table
            })
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.seq);
        Ok(matching)
    }

    async fn any_for_source(&self, source_id: Uuid) -> Result<bool, StorageError> {
        let rules = self.rules.read().unwrap();
        Ok(rules.values().any(|r| r.source_id == source_id))
    }

    async fn any_with_policy(&self, policy_id: Uuid) -> Result<bool, StorageError> {
        let rules = self.rules.read().unwrap();
        Ok(rules
            .values()
            .any(|r| r.kind.policy_override() == Some(policy_id)))
    }

    async fn update(&self, rule: Rule) -> Result<Rule, StorageError> {
        let mut rules = self.rules.write().unwrap();
        if rules.contains_key(&rule.id) {
            rules.insert(rule.id, rule.clone());
            Ok(rule)
        } else {
            Err(StorageError::NotFound(format!(
                "Rule with id {} not found",
                rule.id
            )))
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut rules = self.rules.write().unwrap();
        if rules.remove(&id).is_some() {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!(
                "Rule with id {} not found",
                id
            )))
        }
    }
}
