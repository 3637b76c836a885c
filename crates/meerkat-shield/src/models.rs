//! # Core Types for the Shield Engine
//!
//! Defines the threat taxonomy, severity/action enums, and the structured
//! finding and verdict types produced by a shield scan.
//!
//! ## Threat Model
//!
//! The type system encodes a nine-attack taxonomy covering direct and
//! indirect prompt injection, jailbreaks, data exfiltration, credential
//! harvesting, privilege escalation, social engineering, tool manipulation,
//! and encoding-based evasion. Each [`ThreatType`] carries a default
//! severity and default suggested action; the scanner may elevate severity
//! based on per-category pattern weight, but never silently downgrades it.
//!
//! ## Design Principles
//!
//! 1. **Tagged variants** — findings and the verdict's sanitized/unsanitized
//!    shape are sum types, not string-typed polymorphism, so remediation
//!    can match exhaustively.
//! 2. **Serializable** — all types derive Serde traits for audit trails.

use serde::{Deserialize, Serialize};

/// Attack classes the shield engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    DirectInjection,
    IndirectInjection,
    Jailbreak,
    DataExfiltration,
    CredentialHarvesting,
    PrivilegeEscalation,
    SocialEngineering,
    ToolManipulation,
    EncodingAttack,
}

impl ThreatType {
    /// Default severity for this threat type, absent per-category elevation.
    pub fn default_severity(self) -> Severity {
        match self {
            ThreatType::DirectInjection => Severity::Critical,
            ThreatType::IndirectInjection => Severity::Critical,
            ThreatType::Jailbreak => Severity::High,
            ThreatType::DataExfiltration => Severity::Critical,
            ThreatType::CredentialHarvesting => Severity::Critical,
            ThreatType::PrivilegeEscalation => Severity::High,
            ThreatType::SocialEngineering => Severity::Medium,
            ThreatType::ToolManipulation => Severity::High,
            ThreatType::EncodingAttack => Severity::High,
        }
    }

    /// Default suggested action for this threat type in isolation.
    pub fn default_action(self) -> SuggestedAction {
        match self {
            ThreatType::DirectInjection => SuggestedAction::ProceedWithSanitized,
            ThreatType::IndirectInjection => SuggestedAction::QuarantineFullMessage,
            ThreatType::Jailbreak => SuggestedAction::QuarantineFullMessage,
            ThreatType::DataExfiltration => SuggestedAction::QuarantineFullMessage,
            ThreatType::CredentialHarvesting => SuggestedAction::QuarantineFullMessage,
            ThreatType::PrivilegeEscalation => SuggestedAction::ProceedWithSanitized,
            ThreatType::SocialEngineering => SuggestedAction::RequestHumanReview,
            ThreatType::ToolManipulation => SuggestedAction::QuarantineFullMessage,
            ThreatType::EncodingAttack => SuggestedAction::QuarantineFullMessage,
        }
    }

    /// Whether this threat type belongs to the "always quarantine" set.
    pub fn always_quarantine(self) -> bool {
        matches!(
            self,
            ThreatType::IndirectInjection
                | ThreatType::Jailbreak
                | ThreatType::DataExfiltration
                | ThreatType::CredentialHarvesting
                | ThreatType::ToolManipulation
                | ThreatType::EncodingAttack
        )
    }

    /// Human-readable label used in sanitized-output placeholders and messages.
    pub fn label(self) -> &'static str {
        match self {
            ThreatType::DirectInjection => "direct injection",
            ThreatType::IndirectInjection => "indirect injection",
            ThreatType::Jailbreak => "jailbreak attempt",
            ThreatType::DataExfiltration => "data exfiltration",
            ThreatType::CredentialHarvesting => "credential harvesting",
            ThreatType::PrivilegeEscalation => "privilege escalation",
            ThreatType::SocialEngineering => "social engineering",
            ThreatType::ToolManipulation => "tool manipulation",
            ThreatType::EncodingAttack => "encoding attack",
        }
    }
}

/// Severity levels, ordered `None < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// The action the shield engine recommends for the message as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedAction {
    ProceedWithSanitized,
    QuarantineFullMessage,
    RequestHumanReview,
}

/// What happened to a specific section or span once a threat was found in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionTaken {
    Removed,
    Quarantined,
    Flagged,
}

/// A single structured threat finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatFinding {
    #[serde(rename = "type")]
    pub threat_type: ThreatType,
    pub severity: Severity,
    /// `"section i of n"` or `"full input"`.
    pub location: String,
    pub matched_pattern: String,
    /// Truncated to 200 characters.
    pub original_text: String,
    pub action_taken: ActionTaken,
}

impl ThreatFinding {
    pub fn truncate_text(text: &str) -> String {
        const MAX: usize = 200;
        if text.chars().count() <= MAX {
            text.to_string()
        } else {
            text.chars().take(MAX).collect()
        }
    }
}

/// Agent-executable remediation bundle attached to a non-safe verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldRemediation {
    pub message: String,
    pub agent_instruction: String,
}

/// The full result of scanning one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldVerdict {
    pub safe: bool,
    pub threat_level: Severity,
    pub threats: Vec<ThreatFinding>,
    /// Only non-null when `suggested_action == ProceedWithSanitized`.
    pub sanitized_input: Option<String>,
    pub suggested_action: SuggestedAction,
    /// Only present when `safe` is `false`.
    pub remediation: Option<ShieldRemediation>,
}

impl ShieldVerdict {
    pub fn threat_level_from(threats: &[ThreatFinding]) -> Severity {
        threats
            .iter()
            .map(|t| t.severity)
            .max()
            .unwrap_or(Severity::None)
    }
}

/// Scan sensitivity, widening which categories are applied at section level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_severity_and_action_cover_all_variants() {
        for t in [
            ThreatType::DirectInjection,
            ThreatType::IndirectInjection,
            ThreatType::Jailbreak,
            ThreatType::DataExfiltration,
            ThreatType::CredentialHarvesting,
            ThreatType::PrivilegeEscalation,
            ThreatType::SocialEngineering,
            ThreatType::ToolManipulation,
            ThreatType::EncodingAttack,
        ] {
            let _ = t.default_severity();
            let _ = t.default_action();
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::None < Severity::Low);
    }

    #[test]
    fn truncate_text_respects_limit() {
        let long = "a".repeat(500);
        let truncated = ThreatFinding::truncate_text(&long);
        assert_eq!(truncated.chars().count(), 200);
    }

    #[test]
    fn truncate_text_keeps_short_text_whole() {
        assert_eq!(ThreatFinding::truncate_text("hello"), "hello");
    }
}
