//! # Persisted Data Model
//!
//! Tenants, credentials, policies, sessions, and the immutable verification
//! and threat records, as described in the system's data model. All types
//! are thin, serializable structs; the storage layer ([`crate::storage`])
//! and the higher-level stores (session/policy/audit) own the invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use meerkat_checks::{CheckName, CheckResult, Domain, Remediation, VerificationMode, VerifyStatus};
use meerkat_shield::{ShieldRemediation, Severity, ThreatFinding, ThreatType};

/// SHA-256 digest size in bytes.
pub const HASH_SIZE: usize = 32;
pub type Hash = [u8; HASH_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Professional,
    Enterprise,
}

impl Plan {
    /// Monthly verification cap, `None` meaning unmetered.
    pub fn monthly_verification_cap(self) -> Option<u64> {
        match self {
            Plan::Starter => Some(1_000),
            Plan::Professional | Plan::Enterprise => None,
        }
    }

    /// Per-minute token-bucket capacity for the rate limiter.
    pub fn rate_limit_per_minute(self) -> u32 {
        match self {
            Plan::Starter => 100,
            Plan::Professional => 1_000,
            Plan::Enterprise => 10_000,
        }
    }

    pub fn upgrade_url(self) -> &'static str {
        match self {
            Plan::Starter => "https://meerkat.dev/upgrade?from=starter",
            Plan::Professional => "https://meerkat.dev/upgrade?from=professional",
            Plan::Enterprise => "https://meerkat.dev/upgrade?from=enterprise",
        }
    }
}

/// A tenant onboarded onto the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub display_name: String,
    pub plan: Plan,
    pub domain: Domain,
    /// UTC start of the current billing/quota period.
    pub period_start: DateTime<Utc>,
    pub verification_count: u64,
}

impl Tenant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, plan: Plan, period_start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            plan,
            domain: Domain::General,
            period_start,
            verification_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Active,
    Revoked,
}

/// A bearer credential. Only the SHA-256 hash of the full key is stored;
/// `prefix` is kept solely for display in tooling/dashboards, never used
/// for lookup — two code paths in the original implementation disagreed on
/// this, and hashed-full-key lookup is the one kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub prefix: String,
    pub hash: Hash,
    pub tenant_id: String,
    pub status: CredentialStatus,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn hash_key(key: &str) -> Hash {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.finalize().into()
    }

    pub fn is_active(&self) -> bool {
        self.status == CredentialStatus::Active
    }
}

/// Per-tenant verify configuration. One tenant may own several named
/// policies; requests select one via `config_id`, defaulting to the
/// tenant's default policy otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub tenant_id: String,
    pub auto_approve_threshold: u8,
    pub auto_block_threshold: u8,
    pub required_checks: Vec<CheckName>,
    pub enabled_checks: Vec<CheckName>,
    pub knowledge_base_enabled: bool,
    pub kb_top_k: usize,
    pub kb_min_relevance: f64,
    pub max_retries: u32,
    pub domain_rules: serde_json::Value,
    pub notify_on_block: bool,
    /// §9 open question: the shield engine's "aggregate low-weight
    /// signals" behavior must be an explicit tenant opt-in, not implicit.
    pub aggregate_low_weight_shield_signals: bool,
}

impl Policy {
    pub fn default_for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            id: format!("default_{}", uuid::Uuid::new_v4().simple()),
            tenant_id: tenant_id.into(),
            auto_approve_threshold: 80,
            auto_block_threshold: 50,
            required_checks: vec![CheckName::Entailment],
            enabled_checks: CheckName::ALL.to_vec(),
            knowledge_base_enabled: false,
            kb_top_k: 5,
            kb_min_relevance: 0.5,
            max_retries: 3,
            domain_rules: serde_json::json!({}),
            notify_on_block: false,
            aggregate_low_weight_shield_signals: false,
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.auto_approve_threshold > 100 || self.auto_block_threshold > 100 {
            return Err(StoreError::Validation("thresholds must be in [0, 100]".to_string()));
        }
        if self.auto_approve_threshold <= self.auto_block_threshold {
            return Err(StoreError::Validation(
                "autoApproveThreshold must be strictly greater than autoBlockThreshold".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.kb_min_relevance) {
            return Err(StoreError::Validation("kbMinRelevance must be in [0.0, 1.0]".to_string()));
        }
        if self.max_retries == 0 {
            return Err(StoreError::Validation("maxRetries must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Shield,
    Verify,
    FullPipeline,
}

/// Groups attempts at a single logical task. Shield and Verify share the
/// same session namespace; a session first seen from one endpoint and
/// later from the other is upgraded to `FullPipeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub tenant_id: String,
    pub session_type: SessionType,
    pub first_audit_id: String,
    pub latest_audit_id: String,
    pub attempt_count: u32,
    pub initial_status: String,
    pub final_status: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// One immutable egress (verify) audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub audit_id: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub agent_name: Option<String>,
    pub model: Option<String>,
    pub domain: Domain,
    pub user_input: String,
    pub ai_output: String,
    pub source_context: Option<String>,
    pub trust_score: u8,
    pub status: VerifyStatus,
    pub checks: Vec<(CheckName, CheckResult)>,
    pub flags: Vec<String>,
    pub human_review_required: bool,
    pub session_id: String,
    pub attempt: u32,
    pub verification_mode: VerificationMode,
    pub remediation: Option<Remediation>,
}

/// What happened to the message as a whole in one shield scan, summarized
/// from [`meerkat_shield::SuggestedAction`] into the three-value taxonomy
/// the threat record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatActionTaken {
    Block,
    Flag,
    Sanitize,
}

/// One immutable ingress (shield) audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub audit_id: String,
    pub tenant_id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    /// Truncated to 5,000 characters.
    pub input_text: String,
    pub threat_level: Severity,
    pub primary_attack_type: Option<ThreatType>,
    pub action_taken: ThreatActionTaken,
    pub detail: String,
    pub sanitized_input: Option<String>,
    pub threats: Vec<ThreatFinding>,
    pub remediation: Option<ShieldRemediation>,
}

impl ThreatRecord {
    pub const MAX_INPUT_CHARS: usize = 5_000;

    pub fn truncate_input(text: &str) -> String {
        if text.chars().count() <= Self::MAX_INPUT_CHARS {
            text.to_string()
        } else {
            text.chars().take(Self::MAX_INPUT_CHARS).collect()
        }
    }
}

/// A knowledge-base chunk, read-only from the gateway's viewpoint — it is
/// ingested by an external document pipeline and queried here by cosine
/// similarity via [`meerkat_checks::KbRetriever`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbChunkRecord {
    pub chunk_id: String,
    pub tenant_id: String,
    pub document_id: String,
    pub document_name: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_requires_approve_above_block() {
        let mut policy = Policy::default_for_tenant("tenant_1");
        policy.auto_approve_threshold = 50;
        policy.auto_block_threshold = 50;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn policy_default_is_valid() {
        assert!(Policy::default_for_tenant("tenant_1").validate().is_ok());
    }

    #[test]
    fn credential_hash_is_deterministic() {
        assert_eq!(Credential::hash_key("secret"), Credential::hash_key("secret"));
        assert_ne!(Credential::hash_key("secret"), Credential::hash_key("other"));
    }

    #[test]
    fn threat_record_truncates_long_input() {
        let long = "a".repeat(10_000);
        let truncated = ThreatRecord::truncate_input(&long);
        assert_eq!(truncated.chars().count(), ThreatRecord::MAX_INPUT_CHARS);
    }

    #[test]
    fn starter_plan_has_monthly_cap() {
        assert_eq!(Plan::Starter.monthly_verification_cap(), Some(1_000));
        assert_eq!(Plan::Enterprise.monthly_verification_cap(), None);
    }
}
