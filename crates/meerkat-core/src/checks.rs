//! Wires the five check adapters and the knowledge-base retriever to the
//! service endpoints in [`crate::config::ServiceConfig`]. Built once at
//! gateway startup and shared across every verify call — the adapters are
//! stateless RPC clients, cheap to clone via `Arc`.

use std::sync::Arc;

use meerkat_checks::adapters::claim_extraction::ClaimExtractionCheck;
use meerkat_checks::adapters::entailment::EntailmentCheck;
use meerkat_checks::adapters::implicit_preference::ImplicitPreferenceCheck;
use meerkat_checks::adapters::numerical_verify::NumericalVerifyCheck;
use meerkat_checks::adapters::semantic_entropy::SemanticEntropyCheck;
use meerkat_checks::{Check, CheckOrchestrator, KbRetriever, OrchestratorConfig};

use crate::config::ServiceConfig;

pub struct CheckRegistry {
    checks: Vec<Arc<dyn Check>>,
    pub kb: KbRetriever,
}

impl CheckRegistry {
    pub fn new(services: &ServiceConfig) -> Self {
        let checks: Vec<Arc<dyn Check>> = vec![
            Arc::new(EntailmentCheck::new(services.entailment_url.clone())),
            Arc::new(SemanticEntropyCheck::new(services.semantic_entropy_url.clone())),
            Arc::new(ImplicitPreferenceCheck::new(services.implicit_preference_url.clone())),
            Arc::new(ClaimExtractionCheck::new(
                services.claim_extraction_url.clone(),
                services.entailment_url.clone(),
            )),
            Arc::new(NumericalVerifyCheck::new(services.numerical_verify_url.clone())),
        ];
        Self {
            checks,
            kb: KbRetriever::new(services.embedding_url.clone()),
        }
    }

    /// A fresh orchestrator for one verify call, built from the resolved
    /// policy's thresholds and weights. The orchestrator itself holds no
    /// state beyond this configuration, so a new one per call is cheap.
    pub fn orchestrator(&self, config: OrchestratorConfig) -> CheckOrchestrator {
        let mut orchestrator = CheckOrchestrator::new(config);
        for check in &self.checks {
            orchestrator.register(Arc::clone(check));
        }
        orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_registers_all_five_checks() {
        let registry = CheckRegistry::new(&ServiceConfig::default());
        let orchestrator = registry.orchestrator(OrchestratorConfig::default());
        // all default-required/optional checks resolve without "unregistered" errors
        let _ = orchestrator;
        assert_eq!(registry.checks.len(), 5);
    }
}
