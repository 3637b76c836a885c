//! # Claim Extraction Check
//!
//! Extracts discrete factual claims from the AI output and checks each one
//! against the source context, producing `source_contradiction` and
//! `fabricated_claim` corrections for claims the context does not support.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::adapters::{Check, CheckInput};
use crate::models::{CheckName, CheckResult, Correction, CorrectionSeverity};
use crate::rpc::RpcClient;

const MAJORITY_UNVERIFIED_RATIO: f64 = 0.5;

#[derive(Serialize)]
struct ClaimRequest<'a> {
    ai_output: &'a str,
    source_context: &'a str,
    entailment_url: &'a str,
}

#[derive(Deserialize, Clone)]
struct ClaimDetail {
    text: String,
    status: String,
    #[serde(default)]
    expected: Option<String>,
}

#[derive(Deserialize)]
struct ClaimResponse {
    total_claims: u32,
    verified: u32,
    #[allow(dead_code)]
    contradicted: u32,
    #[allow(dead_code)]
    unverified: u32,
    claims: Vec<ClaimDetail>,
    #[serde(default)]
    hallucinated_entities: Vec<String>,
    #[serde(default)]
    flags: Vec<String>,
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\$[\d,]+(?:\.\d+)?\s*(?:million|billion|thousand)?|\d+(?:\.\d+)?%|\d+[- ](?:year|month|day|week)s?|section\s+\d+(?:\.\d+)*",
        )
        .expect("claim entity regex must be valid")
    })
}

pub struct ClaimExtractionCheck {
    client: RpcClient,
    service_url: String,
    entailment_url: String,
}

impl ClaimExtractionCheck {
    pub fn new(service_url: impl Into<String>, entailment_url: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new(),
            service_url: service_url.into(),
            entailment_url: entailment_url.into(),
        }
    }

    fn heuristic(&self, output: &str, context: &str) -> CheckResult {
        let entities: Vec<&str> = entity_regex().find_iter(output).map(|m| m.as_str()).collect();
        if entities.is_empty() {
            return CheckResult::new(1.0, "heuristic fallback: no extractable claims")
                .with_flag("claim_extraction_unavailable");
        }

        let mut verified = 0usize;
        let mut corrections = Vec::new();
        for entity in &entities {
            if context.contains(entity) {
                verified += 1;
            } else {
                corrections.push(Correction::FabricatedClaim {
                    claim: entity.to_string(),
                    severity: CorrectionSeverity::Medium,
                });
            }
        }

        let total = entities.len();
        let score = verified as f64 / total as f64;
        let mut result = CheckResult::new(score, "heuristic fallback").with_flag("claim_extraction_unavailable");
        for correction in corrections {
            result = result.with_correction(correction);
        }
        if verified < total {
            result = result.with_flag("unverified_claims");
        }
        if (total - verified) as f64 / total as f64 > MAJORITY_UNVERIFIED_RATIO {
            result = result.with_flag("majority_unverified");
        }
        result
    }
}

#[async_trait]
impl Check for ClaimExtractionCheck {
    fn name(&self) -> CheckName {
        CheckName::ClaimExtraction
    }

    async fn evaluate(&self, input: &CheckInput) -> CheckResult {
        let request = ClaimRequest {
            ai_output: &input.ai_output,
            source_context: &input.context,
            entailment_url: &self.entailment_url,
        };

        let response = match self
            .client
            .post_json::<_, ClaimResponse>(&self.service_url, &request)
            .await
        {
            Ok(r) => r,
            Err(_) => return self.heuristic(&input.ai_output, &input.context),
        };

        let score = if response.total_claims == 0 {
            1.0
        } else {
            response.verified as f64 / response.total_claims as f64
        };

        let mut result = CheckResult::new(score, "claim extraction scored").with_flags(response.flags);

        for claim in &response.claims {
            match claim.status.as_str() {
                "contradicted" => {
                    result = result.with_correction(Correction::SourceContradiction {
                        found: claim.text.clone(),
                        expected: claim.expected.clone().unwrap_or_default(),
                        severity: CorrectionSeverity::High,
                    });
                }
                "unverified" => {
                    result = result.with_correction(Correction::FabricatedClaim {
                        claim: claim.text.clone(),
                        severity: CorrectionSeverity::Medium,
                    });
                }
                _ => {}
            }
        }
        for entity in response.hallucinated_entities {
            result = result.with_correction(Correction::FabricatedClaim {
                claim: entity,
                severity: CorrectionSeverity::High,
            });
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn heuristic_flags_numbers_absent_from_context() {
        let check = ClaimExtractionCheck::new(
            "http://127.0.0.1:1/extract",
            "http://127.0.0.1:1/predict",
        );
        let input = CheckInput {
            ai_output: "Revenue grew 23% to $847 million.".to_string(),
            context: "Revenue grew 17.2% to $782.3 million.".to_string(),
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert!(result.flags.contains(&"unverified_claims".to_string()));
        assert!(!result.corrections.is_empty());
    }

    #[tokio::test]
    async fn heuristic_with_no_claims_is_fully_verified() {
        let check = ClaimExtractionCheck::new(
            "http://127.0.0.1:1/extract",
            "http://127.0.0.1:1/predict",
        );
        let input = CheckInput {
            ai_output: "The team had a productive meeting.".to_string(),
            context: "".to_string(),
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert_eq!(result.score, 1.0);
    }
}
