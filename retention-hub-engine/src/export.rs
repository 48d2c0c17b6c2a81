//! Orchestration export document assembly

use std::collections::BTreeMap;

use retention_hub_core::{
    ExcludeBlock, ExportDocument, IncludeBlock, Rule, RuleType, SchemaGroup, TableRef,
};
use retention_hub_storage::{ConnectionStorage, PolicyStorage, RuleStorage, SourceStorage, WarehouseStorage};
use uuid::Uuid;

use crate::{EngineError, ResolutionEngine};

impl ResolutionEngine {
    /// Build the export document for a source: include/exclude rules grouped
    /// by schema with table lists sorted ascending.
    ///
    /// Output is byte-stable for a stable rule set; insertion order never
    /// leaks into the document. The `exclude` block serializes as an empty
    /// object when no exclude rule carries a table, while `include` always
    /// has a `schemas` key. Downstream consumers depend on that asymmetry.
    pub async fn export_config(&self, source_id: Uuid) -> Result<ExportDocument, EngineError> {
        let source = SourceStorage::get_by_id(self.store.as_ref(), source_id)
            .await?
            .ok_or(EngineError::SourceNotFound(source_id))?;

        let rules = RuleStorage::list_for_source(self.store.as_ref(), source_id).await?;

        let include = group_tables(rules.iter().filter(|r| r.kind.rule_type() == RuleType::Include));
        let exclude = group_tables(rules.iter().filter(|r| r.kind.rule_type() == RuleType::Exclude));

        let connection = ConnectionStorage::get_by_id(self.store.as_ref(), source.connection_id)
            .await?
            .map(|c| c.name);
        let warehouse = WarehouseStorage::get_by_id(self.store.as_ref(), source.warehouse_id)
            .await?
            .map(|w| w.name);
        let default_policy = PolicyStorage::get_by_id(self.store.as_ref(), source.default_policy_id)
            .await?
            .map(|p| p.name);

        Ok(ExportDocument {
            id: source.name,
            env: source.env,
            connection,
            warehouse,
            default_policy,
            legal_hold_default: source.legal_hold_default,
            include: IncludeBlock { schemas: include },
            exclude: ExcludeBlock {
                schemas: if exclude.is_empty() { None } else { Some(exclude) },
            },
        })
    }
}

/// Group table-level rules by schema, tables sorted ascending within each
/// schema and schemas sorted ascending overall. Rules without a table apply
/// at schema granularity and contribute nothing here.
fn group_tables<'a>(rules: impl Iterator<Item = &'a Rule>) -> Vec<SchemaGroup> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for rule in rules {
        let Some(table) = rule.table.as_deref() else {
            continue;
        };
        grouped.entry(rule.schema.as_str()).or_default().push(table);
    }

    grouped
        .into_iter()
        .map(|(schema, mut tables)| {
            tables.sort_unstable();
            SchemaGroup {
                name: schema.to_string(),
                tables: tables
                    .into_iter()
                    .map(|name| TableRef {
                        name: name.to_string(),
                    })
                    .collect(),
            }
        })
        .collect()
}
