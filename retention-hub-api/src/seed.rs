//! Demo dataset for local development

use retention_hub_core::{Connection, Policy, Rule, RuleKind, Source, Warehouse};
use retention_hub_storage::{
    ConnectionStorage, PolicyStorage, RuleStorage, SourceStorage, Storage, WarehouseStorage,
};
use std::sync::Arc;

/// Idempotently create a demo connection, warehouse, policy, and source with
/// a handful of include rules. Safe to run on every startup.
pub async fn seed_demo(store: &Arc<dyn Storage>) -> anyhow::Result<()> {
    let connection = match ConnectionStorage::get_by_name(store.as_ref(), "pg_doc_db_metadata_conn")
        .await?
    {
        Some(c) => c,
        None => {
            ConnectionStorage::save(
                store.as_ref(),
                Connection::new(
                    "pg_doc_db_metadata_conn".to_string(),
                    Some("postgres".to_string()),
                    Some("jdbc:postgresql://host:5432/doc_db_metadata".to_string()),
                ),
            )
            .await?
        }
    };

    let warehouse = match WarehouseStorage::get_by_name(store.as_ref(), "dev_warehouse").await? {
        Some(w) => w,
        None => {
            WarehouseStorage::save(
                store.as_ref(),
                Warehouse::new(
                    "dev_warehouse".to_string(),
                    "s3://data-archive-vault".to_string(),
                ),
            )
            .await?
        }
    };

    let policy = match PolicyStorage::get_by_name(store.as_ref(), "default_6m").await? {
        Some(p) => p,
        None => {
            PolicyStorage::save(
                store.as_ref(),
                Policy::new("default_6m".to_string(), "6m".to_string(), None),
            )
            .await?
        }
    };

    if let Some(existing) = SourceStorage::get_by_name(store.as_ref(), "pg_doc_db_metadata").await? {
        tracing::info!("Demo source already seeded (id {})", existing.id);
        return Ok(());
    }

    let source = SourceStorage::save(
        store.as_ref(),
        Source::new(
            "pg_doc_db_metadata".to_string(),
            "dev".to_string(),
            connection.id,
            warehouse.id,
            policy.id,
            false,
        ),
    )
    .await?;

    for table in ["bank_holidays", "feed", "feed_batch", "feed_dependencies"] {
        RuleStorage::save(
            store.as_ref(),
            Rule::new(
                source.id,
                "doc_sup_owner".to_string(),
                Some(table.to_string()),
                RuleKind::Include,
            ),
        )
        .await?;
    }

    tracing::info!("Seed complete. Source id: {}", source.id);
    Ok(())
}
