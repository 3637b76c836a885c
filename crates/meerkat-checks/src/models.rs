//! # Core Types for the Verify Pipeline
//!
//! Defines the check taxonomy, the structured result each check adapter
//! returns, the tagged-variant corrections a remediation builder consumes,
//! and the fused verdict returned to the caller.
//!
//! Corrections and verdict status are sum types, not string-typed
//! polymorphism, so the remediation builder can match exhaustively.

use serde::{Deserialize, Serialize};

/// The five governance dimensions a verify call may evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    Entailment,
    SemanticEntropy,
    ImplicitPreference,
    ClaimExtraction,
    NumericalVerify,
}

impl CheckName {
    pub const ALL: [CheckName; 5] = [
        CheckName::Entailment,
        CheckName::SemanticEntropy,
        CheckName::ImplicitPreference,
        CheckName::ClaimExtraction,
        CheckName::NumericalVerify,
    ];

    /// Default fusion weight, normalized at fusion time over the realized
    /// (not declared) weight sum so a disabled check never deflates trust.
    pub fn default_weight(self) -> f64 {
        match self {
            CheckName::Entailment => 0.30,
            CheckName::NumericalVerify => 0.20,
            CheckName::SemanticEntropy => 0.20,
            CheckName::ImplicitPreference => 0.15,
            CheckName::ClaimExtraction => 0.15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckName::Entailment => "entailment",
            CheckName::SemanticEntropy => "semantic_entropy",
            CheckName::ImplicitPreference => "implicit_preference",
            CheckName::ClaimExtraction => "claim_extraction",
            CheckName::NumericalVerify => "numerical_verify",
        }
    }

    pub fn parse(name: &str) -> Option<CheckName> {
        match name {
            "entailment" => Some(CheckName::Entailment),
            "semantic_entropy" => Some(CheckName::SemanticEntropy),
            "implicit_preference" => Some(CheckName::ImplicitPreference),
            "claim_extraction" => Some(CheckName::ClaimExtraction),
            "numerical_verify" => Some(CheckName::NumericalVerify),
            _ => None,
        }
    }
}

/// The result one check adapter produces for one verify call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Score in `[0, 1]`; higher is better.
    pub score: f64,
    pub flags: Vec<String>,
    pub detail: String,
    #[serde(default)]
    pub corrections: Vec<Correction>,
}

impl CheckResult {
    pub fn new(score: f64, detail: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            flags: Vec::new(),
            detail: detail.into(),
            corrections: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags.extend(flags);
        self
    }

    #[must_use]
    pub fn with_correction(mut self, correction: Correction) -> Self {
        self.corrections.push(correction);
        self
    }
}

/// Severity ranking for corrections, `low < medium < high < critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Whether a numerical mismatch is a hard error or an in-range clinical
/// adjustment (e.g. a prescriber-intended dosage change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericalSubtype {
    Error,
    Discrepancy,
}

/// A structured directive a check emits, instructing the agent how to fix
/// a specific defect. Tagged by `type` so the remediation builder can
/// match exhaustively instead of sniffing strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Correction {
    SourceContradiction {
        found: String,
        expected: String,
        severity: CorrectionSeverity,
    },
    FabricatedClaim {
        claim: String,
        severity: CorrectionSeverity,
    },
    NumericalDistortion {
        found: String,
        expected: String,
        severity: CorrectionSeverity,
        subtype: NumericalSubtype,
        #[serde(default)]
        requires_clinical_review: bool,
    },
}

impl Correction {
    pub fn severity(&self) -> CorrectionSeverity {
        match self {
            Correction::SourceContradiction { severity, .. }
            | Correction::FabricatedClaim { severity, .. }
            | Correction::NumericalDistortion { severity, .. } => *severity,
        }
    }

    pub fn requires_clinical_review(&self) -> bool {
        matches!(
            self,
            Correction::NumericalDistortion {
                requires_clinical_review: true,
                ..
            }
        )
    }

    pub fn is_discrepancy_subtype(&self) -> bool {
        matches!(
            self,
            Correction::NumericalDistortion {
                subtype: NumericalSubtype::Discrepancy,
                ..
            }
        )
    }

    /// Free text searched for medication-keyword healthcare overrides.
    pub fn text(&self) -> &str {
        match self {
            Correction::SourceContradiction { found, .. } => found,
            Correction::FabricatedClaim { claim, .. } => claim,
            Correction::NumericalDistortion { found, .. } => found,
        }
    }
}

/// Domain hint carried on a tenant and optionally on a verify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Legal,
    Financial,
    Healthcare,
    General,
}

impl Default for Domain {
    fn default() -> Self {
        Domain::General
    }
}

/// Source of grounding evidence used for a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    Grounded,
    KnowledgeBase,
    SelfConsistency,
}

/// The fused status of a verify call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerifyStatus {
    Pass,
    Flag,
    Block,
}

/// One knowledge-base chunk that matched the AI output above the
/// tenant's relevance floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbMatch {
    pub chunk_id: String,
    pub document_name: String,
    /// Rounded to 1e-3.
    pub relevance_score: f64,
    /// First 100 characters of the chunk's content.
    pub content_preview: String,
}

/// The action the remediation builder recommends for a non-PASS verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemediationAction {
    ProceedWithWarning,
    RetryWithCorrection,
    AbortAction,
    RequestHumanReview,
}

/// The remediation bundle attached to a non-PASS verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remediation {
    pub message: String,
    pub agent_instruction: String,
    pub corrections: Vec<Correction>,
    pub suggested_action: RemediationAction,
}

/// The full, fused result of one verify call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyVerdict {
    /// 0-100.
    pub trust_score: u8,
    pub status: VerifyStatus,
    pub checks: Vec<(CheckName, CheckResult)>,
    pub flags: Vec<String>,
    pub human_review_required: bool,
    pub verification_mode: VerificationMode,
    pub knowledge_base_used: bool,
    pub knowledge_base_matches: Vec<KbMatch>,
    pub remediation: Option<Remediation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_name_round_trips_through_parse() {
        for name in CheckName::ALL {
            assert_eq!(CheckName::parse(name.as_str()), Some(name));
        }
    }

    #[test]
    fn correction_severity_orders_critical_highest() {
        assert!(CorrectionSeverity::Critical > CorrectionSeverity::High);
        assert!(CorrectionSeverity::High > CorrectionSeverity::Medium);
        assert!(CorrectionSeverity::Medium > CorrectionSeverity::Low);
    }

    #[test]
    fn numerical_distortion_reports_clinical_review() {
        let correction = Correction::NumericalDistortion {
            found: "100mg".to_string(),
            expected: "50mg".to_string(),
            severity: CorrectionSeverity::Critical,
            subtype: NumericalSubtype::Discrepancy,
            requires_clinical_review: true,
        };
        assert!(correction.requires_clinical_review());
        assert!(correction.is_discrepancy_subtype());
    }

    #[test]
    fn check_result_clamps_score() {
        let result = CheckResult::new(1.5, "test");
        assert_eq!(result.score, 1.0);
    }
}
