//! Core domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// A reference to a database that feeds the archival pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier
    pub id: Uuid,
    /// Creation sequence, assigned by the store on save
    pub seq: u64,
    /// Human-readable name (unique)
    pub name: String,
    /// Driver hint, e.g. "postgres"
    pub driver: Option<String>,
    /// JDBC-style connection string
    pub jdbc_url: Option<String>,
    /// When this connection was created
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(name: String, driver: Option<String>, jdbc_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            name,
            driver,
            jdbc_url,
            created_at: Utc::now(),
        }
    }
}

/// An archive warehouse location (e.g. an S3 bucket)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    /// Unique identifier
    pub id: Uuid,
    /// Creation sequence, assigned by the store on save
    pub seq: u64,
    /// Human-readable name (unique)
    pub name: String,
    /// Target location URI
    pub s3_uri: String,
    /// When this warehouse was created
    pub created_at: DateTime<Utc>,
}

impl Warehouse {
    pub fn new(name: String, s3_uri: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            name,
            s3_uri,
            created_at: Utc::now(),
        }
    }
}

/// A named retention policy referenced by sources and override rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Unique identifier
    pub id: Uuid,
    /// Creation sequence, assigned by the store on save
    pub seq: u64,
    /// Human-readable name (unique)
    pub name: String,
    /// Retention duration token, e.g. "6m" or "10y". Passed through verbatim,
    /// never parsed by this service.
    pub retention_value: String,
    /// Optional free-form rules payload. Opaque; only its presence is surfaced.
    pub rules_json: Option<String>,
    /// When this policy was created
    pub created_at: DateTime<Utc>,
}

impl Policy {
    pub fn new(name: String, retention_value: String, rules_json: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            name,
            retention_value,
            rules_json,
            created_at: Utc::now(),
        }
    }

    /// Whether the free-form payload is present and non-blank.
    pub fn has_rules(&self) -> bool {
        self.rules_json
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}

/// A configured data origin under retention governance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Unique identifier
    pub id: Uuid,
    /// Creation sequence, assigned by the store on save
    pub seq: u64,
    /// Human-readable name (unique)
    pub name: String,
    /// Environment tag, e.g. "dev" or "prod"
    pub env: String,
    /// Connection feeding this source
    pub connection_id: Uuid,
    /// Warehouse archived data lands in
    pub warehouse_id: Uuid,
    /// Base of the policy precedence chain. Never null once a source exists.
    pub default_policy_id: Uuid,
    /// Base of the legal-hold precedence chain
    pub legal_hold_default: bool,
    /// When this source was created
    pub created_at: DateTime<Utc>,
}

impl Source {
    pub fn new(
        name: String,
        env: String,
        connection_id: Uuid,
        warehouse_id: Uuid,
        default_policy_id: Uuid,
        legal_hold_default: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            name,
            env,
            connection_id,
            warehouse_id,
            default_policy_id,
            legal_hold_default,
            created_at: Utc::now(),
        }
    }
}

/// Discriminator for the four rule kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Include,
    Exclude,
    OverridePolicy,
    OverrideHold,
}

/// Type-specific rule payload.
///
/// The variant carries exactly the payload its type mandates, so a rule can
/// never hold a stale policy reference or legal-hold value from a previous
/// type. Serializes flattened into [`Rule`] with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    Include,
    Exclude,
    OverridePolicy { policy_id: Uuid },
    OverrideHold { legal_hold: bool },
}

impl RuleKind {
    /// Assemble a kind from the flat wire fields, validating that the
    /// type-mandated payload is present. Fields irrelevant to the type are
    /// dropped, which re-normalizes mixed-type updates on every write.
    pub fn from_parts(
        rule_type: RuleType,
        policy_id: Option<Uuid>,
        legal_hold: Option<bool>,
    ) -> Result<Self, CoreError> {
        match rule_type {
            RuleType::Include => Ok(RuleKind::Include),
            RuleType::Exclude => Ok(RuleKind::Exclude),
            RuleType::OverridePolicy => policy_id
                .map(|policy_id| RuleKind::OverridePolicy { policy_id })
                .ok_or(CoreError::PolicyIdRequired),
            RuleType::OverrideHold => legal_hold
                .map(|legal_hold| RuleKind::OverrideHold { legal_hold })
                .ok_or(CoreError::LegalHoldRequired),
        }
    }

    pub fn rule_type(&self) -> RuleType {
        match self {
            RuleKind::Include => RuleType::Include,
            RuleKind::Exclude => RuleType::Exclude,
            RuleKind::OverridePolicy { .. } => RuleType::OverridePolicy,
            RuleKind::OverrideHold { .. } => RuleType::OverrideHold,
        }
    }

    /// The policy this rule overrides to, if it is an `override_policy` rule.
    pub fn policy_override(&self) -> Option<Uuid> {
        match self {
            RuleKind::OverridePolicy { policy_id } => Some(*policy_id),
            _ => None,
        }
    }

    /// The legal-hold value this rule overrides to, if it is an
    /// `override_hold` rule.
    pub fn hold_override(&self) -> Option<bool> {
        match self {
            RuleKind::OverrideHold { legal_hold } => Some(*legal_hold),
            _ => None,
        }
    }
}

/// A schema- or table-scoped directive attached to a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier
    pub id: Uuid,
    /// Creation sequence, assigned by the store on save. The tie-break
    /// authority when multiple rules target the same coordinate.
    pub seq: u64,
    /// Source this rule belongs to
    pub source_id: Uuid,
    /// Schema the rule applies to
    pub schema: String,
    /// Table the rule applies to. Absent = schema granularity.
    pub table: Option<String>,
    /// Type and type-specific payload
    #[serde(flatten)]
    pub kind: RuleKind,
    /// When this rule was created
    pub created_at: DateTime<Utc>,
}

impl Rule {
    pub fn new(source_id: Uuid, schema: String, table: Option<String>, kind: RuleKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq: 0,
            source_id,
            schema,
            table,
            kind,
            created_at: Utc::now(),
        }
    }
}

// ==================== Request types ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConnectionRequest {
    pub name: String,
    pub driver: Option<String>,
    pub jdbc_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConnectionRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub driver: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub jdbc_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWarehouseRequest {
    pub name: String,
    pub s3_uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWarehouseRequest {
    pub name: Option<String>,
    pub s3_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicyRequest {
    pub name: String,
    pub retention_value: String,
    pub rules_json: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePolicyRequest {
    pub name: Option<String>,
    pub retention_value: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub rules_json: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSourceRequest {
    pub name: String,
    #[serde(default = "default_env")]
    pub env: String,
    pub connection_id: Uuid,
    pub warehouse_id: Uuid,
    pub default_policy_id: Uuid,
    #[serde(default)]
    pub legal_hold_default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSourceRequest {
    pub name: Option<String>,
    pub env: Option<String>,
    pub connection_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub default_policy_id: Option<Uuid>,
    pub legal_hold_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRuleRequest {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub schema: String,
    pub table: Option<String>,
    pub policy_id: Option<Uuid>,
    pub legal_hold: Option<bool>,
}

/// Patch for a rule. Nullable fields distinguish "absent" from "explicit
/// null" so a table-level rule can be demoted to schema level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRuleRequest {
    #[serde(rename = "type")]
    pub rule_type: Option<RuleType>,
    pub schema: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub table: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub policy_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub legal_hold: Option<Option<bool>>,
}

fn default_env() -> String {
    "dev".to_string()
}

/// Any value, including null, deserializes to `Some`; a missing field stays
/// `None` via `#[serde(default)]`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ==================== Resolution result types ====================

/// Which precedence tier supplied the effective policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionScope {
    Default,
    OverrideSchema,
    OverrideTable,
}

/// The policy portion of a resolution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedPolicy {
    pub id: Uuid,
    pub name: String,
    pub retention_value: String,
    pub has_rules: bool,
    /// Raw free-form payload; only surfaced when `has_rules` is true
    pub rules_json: Option<String>,
}

/// Effective policy and legal hold for one (schema, table) coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectivePolicy {
    pub source_id: Uuid,
    pub source_name: String,
    pub schema: String,
    pub table: String,
    pub scope: ResolutionScope,
    pub policy: ResolvedPolicy,
    pub legal_hold: bool,
}

// ==================== Export document types ====================

/// A table entry inside an export schema group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
}

/// Tables grouped under one schema, sorted by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaGroup {
    pub name: String,
    pub tables: Vec<TableRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeBlock {
    pub schemas: Vec<SchemaGroup>,
}

/// The exclude side of an export. Downstream consumers depend on this block
/// serializing as `{}` when no exclude rule carries a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<Vec<SchemaGroup>>,
}

/// Orchestration-consumable description of what to archive for one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Source name; the stable identifier downstream jobs key on
    pub id: String,
    pub env: String,
    pub connection: Option<String>,
    pub warehouse: Option<String>,
    pub default_policy: Option<String>,
    pub legal_hold_default: bool,
    pub include: IncludeBlock,
    pub exclude: ExcludeBlock,
}
