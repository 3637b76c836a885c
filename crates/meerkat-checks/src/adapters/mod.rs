//! # Check Adapters
//!
//! Each adapter implements [`Check`] over one governance dimension. Every
//! adapter prefers a remote ML service and, on any transport error or
//! non-OK status, falls back to a deterministic heuristic — recording
//! `"heuristic fallback"` in [`crate::models::CheckResult::detail`]. Inputs
//! and outputs are bit-identical in shape across the two modes; only the
//! scoring mechanism differs.

pub mod claim_extraction;
pub mod entailment;
pub mod implicit_preference;
pub mod numerical_verify;
pub mod semantic_entropy;

use async_trait::async_trait;

use crate::models::{CheckName, CheckResult, Domain};

/// Everything an adapter might need. Fields unused by a given check are
/// simply ignored (e.g. `user_input` is only consumed by semantic entropy).
#[derive(Debug, Clone, Default)]
pub struct CheckInput {
    pub user_input: String,
    pub ai_output: String,
    pub context: String,
    pub kb_context: Option<String>,
    pub domain: Domain,
}

#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> CheckName;

    async fn evaluate(&self, input: &CheckInput) -> CheckResult;
}
