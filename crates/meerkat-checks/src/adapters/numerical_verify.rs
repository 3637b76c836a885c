//! # Numerical Verification Check
//!
//! Extracts numeric spans from the AI output (dosages, lab values, financial
//! figures, generic quantities) and checks each against the source context.
//! Large deviations become `error` corrections; smaller, clinically-plausible
//! deviations become `discrepancy` corrections that, in the healthcare
//! domain, must be routed to a human (`requires_clinical_review = true`).

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::adapters::{Check, CheckInput};
use crate::models::{CheckName, CheckResult, Correction, CorrectionSeverity, Domain, NumericalSubtype};
use crate::rpc::RpcClient;

const ERROR_RATIO_HIGH: f64 = 5.0;
const ERROR_RATIO_LOW: f64 = 0.2;
const HEURISTIC_TOLERANCE: f64 = 0.02;

#[derive(Serialize)]
struct NumericalRequest<'a> {
    ai_output: &'a str,
    source_context: &'a str,
    domain: &'a str,
}

#[derive(Deserialize)]
struct NumericalMismatch {
    found: String,
    expected: String,
    ratio: f64,
    category: String,
}

#[derive(Deserialize)]
struct NumericalResponse {
    #[serde(default)]
    mismatches: Vec<NumericalMismatch>,
    #[serde(default)]
    ungrounded_numbers: Vec<String>,
    #[serde(default)]
    flags: Vec<String>,
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+(?:,\d{3})*(?:\.\d+)?\s*(?:mg|mcg|ml|units|iu|meq|mmol/l|mg/dl|%|\$)?")
            .expect("numeric span regex must be valid")
    })
}

fn parse_numeric(raw: &str) -> Option<f64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    digits.parse::<f64>().ok()
}

fn is_dosage_or_lab(category: &str) -> bool {
    matches!(category, "dosage" | "lab_value")
}

fn severity_for(ratio: f64, category: &str) -> CorrectionSeverity {
    if is_dosage_or_lab(category) && is_error(ratio) {
        return CorrectionSeverity::Critical;
    }
    let deviation = (ratio - 1.0).abs();
    if deviation >= 4.0 {
        CorrectionSeverity::High
    } else if deviation >= 1.0 {
        CorrectionSeverity::Medium
    } else {
        CorrectionSeverity::Low
    }
}

fn is_error(ratio: f64) -> bool {
    ratio >= ERROR_RATIO_HIGH || ratio <= ERROR_RATIO_LOW
}

fn domain_label(domain: Domain) -> &'static str {
    match domain {
        Domain::Legal => "legal",
        Domain::Financial => "financial",
        Domain::Healthcare => "healthcare",
        Domain::General => "general",
    }
}

pub struct NumericalVerifyCheck {
    client: RpcClient,
    service_url: String,
}

impl NumericalVerifyCheck {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new(),
            service_url: service_url.into(),
        }
    }

    fn heuristic(&self, output: &str, context: &str, domain: Domain) -> CheckResult {
        let output_numbers: Vec<f64> = number_regex()
            .find_iter(output)
            .filter_map(|m| parse_numeric(m.as_str()))
            .collect();
        let context_numbers: Vec<f64> = number_regex()
            .find_iter(context)
            .filter_map(|m| parse_numeric(m.as_str()))
            .collect();

        if output_numbers.is_empty() {
            return CheckResult::new(1.0, "heuristic fallback: no numeric spans")
                .with_flag("numerical_verify_unavailable");
        }

        let mut ungrounded = 0usize;
        let mut result = CheckResult::new(1.0, "heuristic fallback").with_flag("numerical_verify_unavailable");

        for value in &output_numbers {
            let grounded = context_numbers
                .iter()
                .any(|c| (*c - *value).abs() <= c.abs() * HEURISTIC_TOLERANCE);
            if !grounded {
                ungrounded += 1;
                result = result.with_correction(Correction::NumericalDistortion {
                    found: value.to_string(),
                    expected: "no matching source figure".to_string(),
                    severity: if domain == Domain::Healthcare {
                        CorrectionSeverity::High
                    } else {
                        CorrectionSeverity::Medium
                    },
                    subtype: NumericalSubtype::Discrepancy,
                    requires_clinical_review: domain == Domain::Healthcare,
                });
            }
        }

        let total = output_numbers.len();
        let score = ((total - ungrounded) as f64 / total as f64).clamp(0.0, 1.0);
        let mut result = CheckResult { score, ..result };
        if ungrounded > 0 {
            result = result.with_flag("ungrounded_numbers");
        }
        result
    }
}

#[async_trait]
impl Check for NumericalVerifyCheck {
    fn name(&self) -> CheckName {
        CheckName::NumericalVerify
    }

    async fn evaluate(&self, input: &CheckInput) -> CheckResult {
        let request = NumericalRequest {
            ai_output: &input.ai_output,
            source_context: &input.context,
            domain: domain_label(input.domain),
        };

        let response = match self
            .client
            .post_json::<_, NumericalResponse>(&self.service_url, &request)
            .await
        {
            Ok(r) => r,
            Err(_) => return self.heuristic(&input.ai_output, &input.context, input.domain),
        };

        if response.mismatches.is_empty() && response.ungrounded_numbers.is_empty() {
            return CheckResult::new(1.0, "numerical verification: no mismatches").with_flags(response.flags);
        }

        let mut result = CheckResult::new(1.0, "numerical verification scored").with_flags(response.flags);
        let mut penalty = 0.0;
        let mut any_critical = false;
        let mut any_mismatch = false;
        let mut any_warning = false;

        for mismatch in &response.mismatches {
            any_mismatch = true;
            let severity = severity_for(mismatch.ratio, &mismatch.category);
            let subtype = if is_error(mismatch.ratio) {
                NumericalSubtype::Error
            } else {
                NumericalSubtype::Discrepancy
            };
            let requires_clinical_review =
                input.domain == Domain::Healthcare && is_dosage_or_lab(&mismatch.category);

            penalty += match severity {
                CorrectionSeverity::Critical => 0.4,
                CorrectionSeverity::High => 0.25,
                CorrectionSeverity::Medium => 0.15,
                CorrectionSeverity::Low => 0.05,
            };
            if severity == CorrectionSeverity::Critical {
                any_critical = true;
            } else {
                any_warning = true;
            }

            result = result.with_correction(Correction::NumericalDistortion {
                found: mismatch.found.clone(),
                expected: mismatch.expected.clone(),
                severity,
                subtype,
                requires_clinical_review,
            });
        }

        if !response.ungrounded_numbers.is_empty() {
            result = result.with_flag("ungrounded_numbers");
            penalty += response.ungrounded_numbers.len() as f64 * 0.05;
        }

        if any_critical {
            result = result.with_flag("critical_numerical_mismatch");
        }
        if any_mismatch {
            result = result.with_flag("numerical_distortion");
        }
        if any_warning && !any_critical {
            result = result.with_flag("numerical_warning");
        }

        let score = (1.0 - penalty).clamp(0.0, 1.0);
        CheckResult { score, ..result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn heuristic_flags_number_absent_from_context() {
        let check = NumericalVerifyCheck::new("http://127.0.0.1:1/verify-numbers");
        let input = CheckInput {
            ai_output: "Administer 500mg every 6 hours.".to_string(),
            context: "Administer 50mg every 6 hours.".to_string(),
            domain: Domain::Healthcare,
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert!(result.flags.contains(&"ungrounded_numbers".to_string()));
        assert!(result
            .corrections
            .iter()
            .any(|c| c.requires_clinical_review()));
    }

    #[tokio::test]
    async fn heuristic_with_no_numbers_is_fully_verified() {
        let check = NumericalVerifyCheck::new("http://127.0.0.1:1/verify-numbers");
        let input = CheckInput {
            ai_output: "The patient is resting comfortably.".to_string(),
            context: "".to_string(),
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert_eq!(result.score, 1.0);
    }
}
