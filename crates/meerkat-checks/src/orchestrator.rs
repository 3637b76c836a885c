//! # Check Orchestrator
//!
//! Selects which checks run for a given verify call, dispatches them
//! concurrently, and fuses their scores into a single trust score and
//! status. Remediation is attached by the caller afterward via
//! [`crate::remediation::build`] — the orchestrator's job ends at the
//! fused [`VerifyVerdict`] with `remediation: None`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::adapters::{Check, CheckInput};
use crate::error::CheckError;
use crate::models::{CheckName, CheckResult, Domain, VerificationMode, VerifyStatus, VerifyVerdict};

/// Tenant-tunable thresholds and weights for fusion. Defaults follow the
/// baseline governance posture: checks are weighted by how directly they
/// detect fabrication, and a call is approved outright only when the
/// fused trust score clears a high bar.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub auto_approve: u8,
    pub auto_block: u8,
    pub weights: HashMap<CheckName, f64>,
    /// Checks that always run, regardless of what the caller requests.
    pub required_checks: Vec<CheckName>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            auto_approve: 80,
            auto_block: 50,
            weights: CheckName::ALL.iter().map(|n| (*n, n.default_weight())).collect(),
            required_checks: vec![CheckName::Entailment],
        }
    }
}

pub struct CheckOrchestrator {
    checks: HashMap<CheckName, Arc<dyn Check>>,
    config: OrchestratorConfig,
}

/// Everything one verify call needs, beyond the per-check [`CheckInput`]
/// fields shared across adapters.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub user_input: String,
    pub ai_output: String,
    pub context: String,
    pub domain: Domain,
    pub requested_checks: Vec<CheckName>,
    pub kb_context: Option<String>,
    pub knowledge_base_used: bool,
    pub knowledge_base_matches: Vec<crate::models::KbMatch>,
    pub verification_mode: VerificationMode,
}

impl CheckOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            checks: HashMap::new(),
            config,
        }
    }

    pub fn register(&mut self, check: Arc<dyn Check>) {
        self.checks.insert(check.name(), check);
    }

    fn selected_checks(&self, requested: &[CheckName]) -> Vec<CheckName> {
        let mut selected: Vec<CheckName> = self
            .config
            .required_checks
            .iter()
            .chain(requested.iter())
            .filter(|name| self.checks.contains_key(name))
            .copied()
            .collect();
        selected.sort_by_key(|n| n.as_str());
        selected.dedup();
        selected
    }

    pub async fn run(&self, request: VerifyRequest) -> Result<VerifyVerdict, CheckError> {
        let selected = self.selected_checks(&request.requested_checks);
        if selected.is_empty() {
            return Err(CheckError::InvalidRequest(
                "no supported checks selected for this verify call".to_string(),
            ));
        }

        let input = CheckInput {
            user_input: request.user_input,
            ai_output: request.ai_output,
            context: request.context,
            kb_context: request.kb_context,
            domain: request.domain,
        };

        let mut join_set = JoinSet::new();
        for name in &selected {
            let check = Arc::clone(self.checks.get(name).expect("selected checks are always registered"));
            let input = input.clone();
            join_set.spawn(async move {
                let result = check.evaluate(&input).await;
                (check.name(), result)
            });
        }

        let mut checks: Vec<(CheckName, CheckResult)> = Vec::with_capacity(selected.len());
        while let Some(outcome) = join_set.join_next().await {
            let pair = outcome.map_err(|e| CheckError::Internal(e.to_string()))?;
            checks.push(pair);
        }
        checks.sort_by_key(|(name, _)| name.as_str());

        let (trust_score, flags) = fuse(&checks, &self.config.weights);
        let status = status_for(trust_score, &self.config);

        Ok(VerifyVerdict {
            trust_score,
            status,
            checks,
            flags,
            human_review_required: status == VerifyStatus::Flag,
            verification_mode: request.verification_mode,
            knowledge_base_used: request.knowledge_base_used,
            knowledge_base_matches: request.knowledge_base_matches,
            remediation: None,
        })
    }
}

/// `round(100 * sum(weight * score) / max(sum(weight), 0.01))`, where the
/// denominator sums only the weights of checks that actually ran — a
/// disabled check must never silently deflate the trust score.
fn fuse(checks: &[(CheckName, CheckResult)], weights: &HashMap<CheckName, f64>) -> (u8, Vec<String>) {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut flags = Vec::new();

    for (name, result) in checks {
        let weight = weights.get(name).copied().unwrap_or_else(|| name.default_weight());
        weighted_sum += weight * result.score;
        weight_total += weight;
        flags.extend(result.flags.iter().cloned());
    }

    let trust = (100.0 * weighted_sum / weight_total.max(0.01)).round();
    (trust.clamp(0.0, 100.0) as u8, flags)
}

fn status_for(trust_score: u8, config: &OrchestratorConfig) -> VerifyStatus {
    if trust_score >= config.auto_approve {
        VerifyStatus::Pass
    } else if trust_score >= config.auto_block {
        VerifyStatus::Flag
    } else {
        VerifyStatus::Block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckResult;
    use async_trait::async_trait;

    struct FixedCheck {
        name: CheckName,
        score: f64,
    }

    #[async_trait]
    impl Check for FixedCheck {
        fn name(&self) -> CheckName {
            self.name
        }

        async fn evaluate(&self, _input: &CheckInput) -> CheckResult {
            CheckResult::new(self.score, "fixed")
        }
    }

    fn request(checks: Vec<CheckName>) -> VerifyRequest {
        VerifyRequest {
            user_input: "question".to_string(),
            ai_output: "answer".to_string(),
            context: "source material".to_string(),
            domain: Domain::General,
            requested_checks: checks,
            kb_context: None,
            knowledge_base_used: false,
            knowledge_base_matches: Vec::new(),
            verification_mode: VerificationMode::Grounded,
        }
    }

    #[tokio::test]
    async fn high_scores_across_checks_pass() {
        let mut orchestrator = CheckOrchestrator::new(OrchestratorConfig {
            required_checks: vec![],
            ..OrchestratorConfig::default()
        });
        orchestrator.register(Arc::new(FixedCheck {
            name: CheckName::Entailment,
            score: 0.95,
        }));
        orchestrator.register(Arc::new(FixedCheck {
            name: CheckName::NumericalVerify,
            score: 0.9,
        }));

        let verdict = orchestrator
            .run(request(vec![CheckName::Entailment, CheckName::NumericalVerify]))
            .await
            .unwrap();
        assert_eq!(verdict.status, VerifyStatus::Pass);
        assert!(verdict.trust_score >= 80);
        assert!(!verdict.human_review_required);
    }

    #[tokio::test]
    async fn low_scores_block() {
        let mut orchestrator = CheckOrchestrator::new(OrchestratorConfig {
            required_checks: vec![],
            ..OrchestratorConfig::default()
        });
        orchestrator.register(Arc::new(FixedCheck {
            name: CheckName::Entailment,
            score: 0.1,
        }));

        let verdict = orchestrator.run(request(vec![CheckName::Entailment])).await.unwrap();
        assert_eq!(verdict.status, VerifyStatus::Block);
    }

    #[tokio::test]
    async fn unregistered_checks_are_rejected() {
        let orchestrator = CheckOrchestrator::new(OrchestratorConfig {
            required_checks: vec![],
            ..OrchestratorConfig::default()
        });
        let result = orchestrator.run(request(vec![CheckName::Entailment])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn disabled_check_does_not_deflate_trust() {
        let mut orchestrator = CheckOrchestrator::new(OrchestratorConfig {
            required_checks: vec![],
            ..OrchestratorConfig::default()
        });
        orchestrator.register(Arc::new(FixedCheck {
            name: CheckName::Entailment,
            score: 1.0,
        }));
        let verdict = orchestrator.run(request(vec![CheckName::Entailment])).await.unwrap();
        assert_eq!(verdict.trust_score, 100);
    }
}
