//! # Semantic Entropy Check
//!
//! Delegates to a remote service that samples multiple completions at high
//! temperature, clusters them by bidirectional entailment, and returns the
//! Shannon entropy over those clusters. A low-entropy (confident, reproducible)
//! answer scores high; a scattered, inconsistent answer scores low.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adapters::{Check, CheckInput};
use crate::models::{CheckName, CheckResult};
use crate::rpc::RpcClient;

const NUM_COMPLETIONS: u32 = 8;
const HIGH_UNCERTAINTY_ENTROPY: f64 = 0.7;
const MODERATE_UNCERTAINTY_ENTROPY: f64 = 0.4;

const HEDGE_WORDS: &[&str] = &[
    "might", "may", "could", "possibly", "perhaps", "seems", "appears", "likely", "unclear",
    "uncertain", "probably", "presumably",
];

#[derive(Serialize)]
struct EntropyRequest<'a> {
    question: &'a str,
    ai_output: &'a str,
    num_completions: u32,
}

#[derive(Deserialize)]
struct EntropyResponse {
    semantic_entropy: f64,
    #[allow(dead_code)]
    num_clusters: u32,
    #[allow(dead_code)]
    interpretation: String,
    #[serde(default)]
    confabulation_likely: bool,
    #[serde(default = "default_true")]
    reference_cluster_found: bool,
    #[serde(default)]
    reference_cluster_is_minority: bool,
}

fn default_true() -> bool {
    true
}

pub struct SemanticEntropyCheck {
    client: RpcClient,
    service_url: String,
}

impl SemanticEntropyCheck {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new(),
            service_url: service_url.into(),
        }
    }

    fn heuristic(&self, output: &str) -> CheckResult {
        let words: Vec<&str> = output.split_whitespace().collect();
        let density = if words.is_empty() {
            0.0
        } else {
            let hedges = words
                .iter()
                .filter(|w| {
                    let lower = w.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_lowercase();
                    HEDGE_WORDS.contains(&lower.as_str())
                })
                .count();
            hedges as f64 / words.len() as f64
        };
        let noise: f64 = rand::thread_rng().gen_range(-0.05..=0.05);
        let score = (1.0 - density * 2.0 + noise).clamp(0.0, 1.0);

        let mut result = CheckResult::new(score, "heuristic fallback").with_flag("semantic_entropy_unavailable");
        if density > 0.2 {
            result = result.with_flag("high_uncertainty");
        } else if density > 0.08 {
            result = result.with_flag("moderate_uncertainty");
        }
        result
    }
}

#[async_trait]
impl Check for SemanticEntropyCheck {
    fn name(&self) -> CheckName {
        CheckName::SemanticEntropy
    }

    async fn evaluate(&self, input: &CheckInput) -> CheckResult {
        let request = EntropyRequest {
            question: &input.user_input,
            ai_output: &input.ai_output,
            num_completions: NUM_COMPLETIONS,
        };

        let response = match self
            .client
            .post_json::<_, EntropyResponse>(&self.service_url, &request)
            .await
        {
            Ok(r) => r,
            Err(_) => return self.heuristic(&input.ai_output),
        };

        let score = (1.0 - response.semantic_entropy).clamp(0.0, 1.0);
        let detail = format!("semantic entropy {:.2}", response.semantic_entropy);
        let mut result = CheckResult::new(score, detail);

        if response.confabulation_likely || response.semantic_entropy > HIGH_UNCERTAINTY_ENTROPY {
            result = result.with_flag("high_uncertainty");
        } else if response.semantic_entropy > MODERATE_UNCERTAINTY_ENTROPY {
            result = result.with_flag("moderate_uncertainty");
        }

        if !response.reference_cluster_found {
            result = result.with_flag("reference_no_cluster_match");
        } else if response.reference_cluster_is_minority {
            result = result.with_flag("reference_minority_cluster");
        }

        result
    }
}
