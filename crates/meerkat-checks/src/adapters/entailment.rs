//! # Entailment Check
//!
//! Scores whether the AI output is entailed by its source context, using
//! per-sentence NLI calls against a remote service. Clinical preprocessing
//! (abbreviation expansion, sentence splitting, context chunking) lives in
//! [`crate::abbreviations`], [`crate::sentences`], and [`crate::chunking`]
//! so it can be exercised directly by both this adapter and its heuristic
//! fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::abbreviations;
use crate::adapters::{Check, CheckInput};
use crate::chunking;
use crate::models::{CheckName, CheckResult};
use crate::rpc::RpcClient;
use crate::sentences;

const LOW_ENTAILMENT_THRESHOLD: f64 = 0.5;
const FABRICATION_CONTRADICTION_RATE: f64 = 0.3;

#[derive(Serialize)]
struct NliRequest<'a> {
    premise: &'a str,
    hypothesis: &'a str,
}

#[derive(Deserialize)]
struct NliResponse {
    entailment: f64,
    contradiction: f64,
    #[allow(dead_code)]
    neutral: f64,
    label: String,
}

pub struct EntailmentCheck {
    client: RpcClient,
    service_url: String,
}

impl EntailmentCheck {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new(),
            service_url: service_url.into(),
        }
    }

    fn merged_context(input: &CheckInput) -> String {
        match &input.kb_context {
            Some(kb) if !kb.is_empty() => format!("{}\n\n{}", input.context, kb),
            _ => input.context.clone(),
        }
    }

    /// Returns the scored response plus whether the remote service was
    /// reachable; `false` means this sentence fell back to the heuristic.
    async fn score_sentence(&self, premise: &str, hypothesis: &str) -> (NliResponse, bool) {
        let request = NliRequest { premise, hypothesis };
        match self
            .client
            .post_json::<_, NliResponse>(&self.service_url, &request)
            .await
        {
            Ok(response) => (response, true),
            Err(_) => (heuristic_sentence_score(premise, hypothesis), false),
        }
    }
}

fn heuristic_sentence_score(premise: &str, hypothesis: &str) -> NliResponse {
    let premise_tokens = chunking::meaningful_tokens(premise);
    let hypothesis_tokens = chunking::meaningful_tokens(hypothesis);
    if hypothesis_tokens.is_empty() {
        return NliResponse {
            entailment: 0.0,
            contradiction: 0.0,
            neutral: 1.0,
            label: "neutral".to_string(),
        };
    }
    let overlap = hypothesis_tokens
        .iter()
        .filter(|t| premise_tokens.contains(t))
        .count();
    let ratio = overlap as f64 / hypothesis_tokens.len() as f64;
    let entailment = (ratio * 2.0).min(1.0);
    let label = if entailment >= LOW_ENTAILMENT_THRESHOLD {
        "entailment"
    } else {
        "neutral"
    };
    NliResponse {
        entailment,
        contradiction: 0.0,
        neutral: 1.0 - entailment,
        label: label.to_string(),
    }
}

#[async_trait]
impl Check for EntailmentCheck {
    fn name(&self) -> CheckName {
        CheckName::Entailment
    }

    async fn evaluate(&self, input: &CheckInput) -> CheckResult {
        let expanded_output = abbreviations::expand(&input.ai_output);
        let merged_context = abbreviations::expand(&Self::merged_context(input));
        let chunks = chunking::chunk(&merged_context);
        let sentences = sentences::split(&expanded_output);

        if sentences.is_empty() {
            return CheckResult::new(1.0, "no AI output sentences to verify");
        }

        let mut entailments = Vec::with_capacity(sentences.len());
        let mut contradictions = 0usize;
        let mut low_evidence = 0usize;
        let mut service_unavailable = false;

        for sentence in &sentences {
            let premise = chunking::best_premise_chunk(sentence, &chunks).unwrap_or("");
            if premise.is_empty() {
                low_evidence += 1;
            }
            let (result, reached_service) = self.score_sentence(premise, sentence).await;
            if !reached_service {
                service_unavailable = true;
            }
            entailments.push(result.entailment);
            if result.label == "contradiction" {
                contradictions += 1;
            }
        }

        let n = sentences.len() as f64;
        let mean_entailment = entailments.iter().sum::<f64>() / n;
        let contradiction_rate = contradictions as f64 / n;
        let low_evidence_rate = low_evidence as f64 / n;

        let score =
            (mean_entailment - 0.5 * contradiction_rate - 0.15 * low_evidence_rate).clamp(0.0, 1.0);

        let detail = format!(
            "{} sentence(s) scored, mean entailment {:.2}",
            sentences.len(),
            mean_entailment
        );

        let mut result = CheckResult::new(score, detail);
        if contradiction_rate > 0.0 {
            result = result.with_flag("entailment_contradiction");
        }
        if contradiction_rate > FABRICATION_CONTRADICTION_RATE {
            result = result.with_flag("possible_fabrication");
        }
        if mean_entailment < LOW_ENTAILMENT_THRESHOLD {
            result = result.with_flag("low_entailment");
        }
        if service_unavailable {
            result = result.with_flag("entailment_unavailable");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn heuristic_entailment_scores_matching_sentence_highly() {
        let check = EntailmentCheck::new("http://127.0.0.1:1/predict");
        let input = CheckInput {
            ai_output: "Revenue was eight hundred million dollars.".to_string(),
            context: "Quarterly revenue reached eight hundred million dollars this year."
                .to_string(),
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert!(result.score > 0.3);
    }

    #[tokio::test]
    async fn empty_output_is_trivially_entailed() {
        let check = EntailmentCheck::new("http://127.0.0.1:1/predict");
        let input = CheckInput {
            ai_output: String::new(),
            context: "some context".to_string(),
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert_eq!(result.score, 1.0);
    }
}
