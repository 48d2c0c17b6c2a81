//! Effective policy and legal-hold resolution

use std::sync::Arc;

use retention_hub_core::{EffectivePolicy, ResolutionScope, ResolvedPolicy, RuleType};
use retention_hub_storage::{PolicyStorage, RuleStorage, SourceStorage, Storage};
use uuid::Uuid;

use crate::EngineError;

/// Resolves effective policies and builds export documents.
///
/// Holds a handle to the record store and performs pure read-then-compute
/// operations; safe to share and call concurrently.
pub struct ResolutionEngine {
    pub(crate) store: Arc<dyn Storage>,
}

/// One precedence tier: an override, when present, replaces the value
/// accumulated so far. Applied left-to-right, most specific last.
fn apply_tier<T>(current: T, tier_override: Option<T>) -> T {
    tier_override.unwrap_or(current)
}

impl ResolutionEngine {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Resolve the effective policy and legal hold for `(schema, table)`
    /// under the given source.
    ///
    /// Both chains start from the source defaults and apply the schema-level
    /// then the table-level override. Within a tier, the earliest-created
    /// rule wins; later rules on the same coordinate never change a stable
    /// resolution. A resolved policy id that no longer exists is a
    /// data-integrity failure, not a normal miss.
    pub async fn resolve(
        &self,
        source_id: Uuid,
        schema: &str,
        table: &str,
    ) -> Result<EffectivePolicy, EngineError> {
        let source = SourceStorage::get_by_id(self.store.as_ref(), source_id)
            .await?
            .ok_or(EngineError::SourceNotFound(source_id))?;

        // Policy chain: default -> schema override -> table override.
        let schema_pick = self.policy_override_at(source_id, schema, None).await?;
        let table_pick = self.policy_override_at(source_id, schema, Some(table)).await?;

        let mut policy_id = source.default_policy_id;
        policy_id = apply_tier(policy_id, schema_pick);
        policy_id = apply_tier(policy_id, table_pick);

        let policy = PolicyStorage::get_by_id(self.store.as_ref(), policy_id)
            .await?
            .ok_or(EngineError::PolicyNotFound(policy_id))?;

        // Scope reports the tier that actually supplied the winning policy,
        // not merely whether an override rule exists at that tier.
        let scope = if table_pick == Some(policy.id) {
            ResolutionScope::OverrideTable
        } else if schema_pick == Some(policy.id) {
            ResolutionScope::OverrideSchema
        } else {
            ResolutionScope::Default
        };

        // Legal-hold chain, evaluated independently of the policy chain.
        let mut legal_hold = source.legal_hold_default;
        legal_hold = apply_tier(
            legal_hold,
            self.hold_override_at(source_id, schema, None).await?,
        );
        legal_hold = apply_tier(
            legal_hold,
            self.hold_override_at(source_id, schema, Some(table)).await?,
        );

        tracing::debug!(
            source = %source.name,
            schema,
            table,
            scope = ?scope,
            policy = %policy.name,
            "resolved effective policy"
        );

        let has_rules = policy.has_rules();
        Ok(EffectivePolicy {
            source_id: source.id,
            source_name: source.name,
            schema: schema.to_string(),
            table: table.to_string(),
            scope,
            policy: ResolvedPolicy {
                id: policy.id,
                name: policy.name,
                retention_value: policy.retention_value,
                has_rules,
                rules_json: if has_rules { policy.rules_json } else { None },
            },
            legal_hold,
        })
    }

    /// The policy override at one tier: the earliest-created
    /// `override_policy` rule on the coordinate, if any.
    async fn policy_override_at(
        &self,
        source_id: Uuid,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Option<Uuid>, EngineError> {
        let rules = self
            .store
            .find_rules(source_id, RuleType::OverridePolicy, schema, table)
            .await?;
        if rules.len() > 1 {
            tracing::debug!(
                schema,
                table = table.unwrap_or("<schema-level>"),
                ignored = rules.len() - 1,
                "multiple override_policy rules on one coordinate; earliest wins"
            );
        }
        Ok(rules.first().and_then(|r| r.kind.policy_override()))
    }

    /// The legal-hold override at one tier: the earliest-created
    /// `override_hold` rule on the coordinate, if any.
    async fn hold_override_at(
        &self,
        source_id: Uuid,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Option<bool>, EngineError> {
        let rules = self
            .store
            .find_rules(source_id, RuleType::OverrideHold, schema, table)
            .await?;
        Ok(rules.first().and_then(|r| r.kind.hold_override()))
    }
}
