//! # Verify Remediation Builder
//!
//! Turns a fused, non-PASS [`VerifyVerdict`](crate::models::VerifyVerdict)
//! into a concrete instruction for the calling agent: retry with specific
//! corrections, proceed with a warning, abort, or hand off to a human.
//! Healthcare dose discrepancies always win the healthcare override,
//! regardless of what the raw status/correction mix would otherwise pick.

use crate::models::{
    Correction, CorrectionSeverity, Domain, Remediation, RemediationAction, VerificationMode, VerifyStatus,
};

const MEDICATION_KEYWORDS: &[&str] = &["mg", "mcg", "ml", "units", "iu", "meq", "dose", "medication"];

/// Everything the remediation builder needs beyond the corrections
/// themselves.
#[derive(Debug, Clone, Copy)]
pub struct RemediationContext {
    pub domain: Domain,
    pub attempts_remaining: u32,
    pub verification_mode: VerificationMode,
    pub status: VerifyStatus,
}

pub fn build(context: &RemediationContext, corrections: &[Correction], flags: &[String]) -> Option<Remediation> {
    if context.status == VerifyStatus::Pass {
        return None;
    }

    if context.attempts_remaining == 0 {
        return Some(exhausted_attempts(corrections));
    }

    if healthcare_override_applies(context.domain, corrections) {
        return Some(healthcare_dose_review(corrections));
    }

    let action = match context.status {
        VerifyStatus::Block if !corrections.is_empty() => RemediationAction::RetryWithCorrection,
        VerifyStatus::Block => RemediationAction::AbortAction,
        VerifyStatus::Flag if highest_severity(corrections) <= CorrectionSeverity::Medium => {
            RemediationAction::ProceedWithWarning
        }
        _ => RemediationAction::RetryWithCorrection,
    };

    let agent_instruction = agent_instruction(&action, corrections);
    let mut message = summary_message(&action, corrections, flags);
    if context.verification_mode == VerificationMode::SelfConsistency {
        message = format!(
            "Limited verification: no source context provided. Connect a knowledge base for full \
             grounded verification. {message}"
        );
    }

    Some(Remediation {
        message,
        agent_instruction,
        corrections: corrections.to_vec(),
        suggested_action: action,
    })
}

fn exhausted_attempts(corrections: &[Correction]) -> Remediation {
    Remediation {
        message: "Retry attempts exhausted without reaching an acceptable trust score.".to_string(),
        agent_instruction:
            "Escalate to a human reviewer. Do not attempt further automated correction of this output."
                .to_string(),
        corrections: corrections.to_vec(),
        suggested_action: RemediationAction::RequestHumanReview,
    }
}

fn healthcare_override_applies(domain: Domain, corrections: &[Correction]) -> bool {
    domain == Domain::Healthcare
        && corrections.iter().any(|c| {
            c.requires_clinical_review()
                || c.is_discrepancy_subtype()
                || (matches!(c, Correction::FabricatedClaim { .. }) && mentions_medication(c.text()))
        })
}

fn mentions_medication(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    MEDICATION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn healthcare_dose_review(corrections: &[Correction]) -> Remediation {
    Remediation {
        message: "MEDICATION DOSE DISCREPANCY: a numerical finding in this output requires clinical review \
                  before it can be released."
            .to_string(),
        agent_instruction:
            "Do not release this output. Route to a licensed prescriber to verify the stated dose against \
             the patient's chart before any further action is taken."
                .to_string(),
        corrections: corrections.to_vec(),
        suggested_action: RemediationAction::RequestHumanReview,
    }
}

fn highest_severity(corrections: &[Correction]) -> CorrectionSeverity {
    corrections
        .iter()
        .map(Correction::severity)
        .max()
        .unwrap_or(CorrectionSeverity::Low)
}

fn agent_instruction(action: &RemediationAction, corrections: &[Correction]) -> String {
    let mut paragraphs = Vec::new();

    for correction in corrections {
        let paragraph = match correction {
            Correction::SourceContradiction { found, expected, .. } => format!(
                "CONTRADICTION: the output states \"{found}\", which contradicts the source material's \
                 \"{expected}\". Revise the output to match the source or remove the claim."
            ),
            Correction::FabricatedClaim { claim, .. } => format!(
                "UNVERIFIED CLAIM: \"{claim}\" could not be verified against the source material. Remove \
                 it or cite the specific source passage that supports it."
            ),
            Correction::NumericalDistortion {
                found,
                expected,
                subtype,
                requires_clinical_review,
                ..
            } => {
                if *requires_clinical_review {
                    format!(
                        "DOSE DISCREPANCY: the output states \"{found}\" against a source value of \
                         \"{expected}\". This cannot be auto-corrected; route to a prescriber for review."
                    )
                } else {
                    use crate::models::NumericalSubtype;
                    let label = match subtype {
                        NumericalSubtype::Error => "NUMERICAL ERROR",
                        NumericalSubtype::Discrepancy => "NUMERICAL DISCREPANCY",
                    };
                    format!(
                        "{label}: the output states \"{found}\" where the source supports \"{expected}\". \
                         Correct the figure to match the source."
                    )
                }
            }
        };
        paragraphs.push(paragraph);
    }

    if matches!(action, RemediationAction::ProceedWithWarning) && corrections.is_empty() {
        paragraphs.push(
            "BIAS: the output leans toward one side of the discussion beyond what the source material \
             supports. Rephrase neutrally or explicitly attribute the preference to its source."
                .to_string(),
        );
    }

    paragraphs.join("\n\n")
}

fn summary_message(action: &RemediationAction, corrections: &[Correction], flags: &[String]) -> String {
    match action {
        RemediationAction::ProceedWithWarning => {
            "Output may proceed with a caveat; verification raised low-severity concerns.".to_string()
        }
        RemediationAction::RetryWithCorrection => format!(
            "Output requires correction before release ({} issue(s) found).",
            corrections.len().max(flags.len())
        ),
        RemediationAction::AbortAction => {
            "Output failed verification with no specific corrections to apply; abort this action."
                .to_string()
        }
        RemediationAction::RequestHumanReview => {
            "Output requires human review before release.".to_string()
        }
    }
}
