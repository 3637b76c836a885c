//! # Implicit Preference Check
//!
//! Scores whether the AI output shows undisclosed directional bias toward
//! one of two parties it discusses (e.g. favoring one vendor, one party to
//! a dispute, one candidate) beyond what the source material supports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::{Check, CheckInput};
use crate::models::{CheckName, CheckResult};
use crate::rpc::RpcClient;

const MILD_PREFERENCE_THRESHOLD: f64 = 0.75;

const STRONG_BIAS_WORDS: &[&str] = &["must", "always", "clearly superior", "never", "undeniably"];
const MILD_BIAS_WORDS: &[&str] = &["recommend", "better", "preferable", "ideal"];

#[derive(Serialize)]
struct PreferenceRequest<'a> {
    output: &'a str,
    domain: &'a str,
    context: &'a str,
}

#[derive(Deserialize)]
struct PreferenceResponse {
    score: f64,
    bias_detected: bool,
    #[allow(dead_code)]
    details: String,
    #[serde(default)]
    flags: Vec<String>,
}

pub struct ImplicitPreferenceCheck {
    client: RpcClient,
    service_url: String,
}

impl ImplicitPreferenceCheck {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            client: RpcClient::new(),
            service_url: service_url.into(),
        }
    }

    fn heuristic(&self, output: &str) -> CheckResult {
        let lower = output.to_ascii_lowercase();
        let strong = STRONG_BIAS_WORDS.iter().filter(|w| lower.contains(*w)).count();
        let mild = MILD_BIAS_WORDS.iter().filter(|w| lower.contains(*w)).count();
        let score = (1.0 - strong as f64 * 0.15 - mild as f64 * 0.05).clamp(0.0, 1.0);

        let mut result = CheckResult::new(score, "heuristic fallback").with_flag("implicit_preference_unavailable");
        if strong > 0 {
            result = result.with_flag("strong_bias");
        } else if score < MILD_PREFERENCE_THRESHOLD {
            result = result.with_flag("mild_preference");
        }
        result
    }
}

#[async_trait]
impl Check for ImplicitPreferenceCheck {
    fn name(&self) -> CheckName {
        CheckName::ImplicitPreference
    }

    async fn evaluate(&self, input: &CheckInput) -> CheckResult {
        let request = PreferenceRequest {
            output: &input.ai_output,
            domain: domain_label(input.domain),
            context: &input.context,
        };

        let response = match self
            .client
            .post_json::<_, PreferenceResponse>(&self.service_url, &request)
            .await
        {
            Ok(r) => r,
            Err(_) => return self.heuristic(&input.ai_output),
        };

        let mut result = CheckResult::new(response.score, "implicit preference scored")
            .with_flags(response.flags);
        if response.bias_detected {
            result = result.with_flag("strong_bias");
        } else if response.score < MILD_PREFERENCE_THRESHOLD {
            result = result.with_flag("mild_preference");
        }
        result
    }
}

fn domain_label(domain: crate::models::Domain) -> &'static str {
    use crate::models::Domain;
    match domain {
        Domain::Legal => "legal",
        Domain::Financial => "financial",
        Domain::Healthcare => "healthcare",
        Domain::General => "general",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn heuristic_flags_strong_bias_language() {
        let check = ImplicitPreferenceCheck::new("http://127.0.0.1:1/analyze");
        let input = CheckInput {
            ai_output: "Vendor A is clearly superior and you must always choose them.".to_string(),
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert!(result.flags.contains(&"strong_bias".to_string()));
    }

    #[tokio::test]
    async fn heuristic_neutral_text_has_no_bias_flags() {
        let check = ImplicitPreferenceCheck::new("http://127.0.0.1:1/analyze");
        let input = CheckInput {
            ai_output: "Both vendors offer comparable service-level agreements.".to_string(),
            ..Default::default()
        };
        let result = check.evaluate(&input).await;
        assert!(!result.flags.contains(&"strong_bias".to_string()));
        assert!(!result.flags.contains(&"mild_preference".to_string()));
    }
}
