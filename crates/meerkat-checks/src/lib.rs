//! # Meerkat Checks - Egress Verification Pipeline
//!
//! Governs AI output before it reaches a caller. Five independent checks
//! score an output against its source context:
//!
//! - **entailment** - is the output logically supported by the context?
//! - **semantic_entropy** - is the output reproducible across resampled
//!   completions, or an artifact of one unlucky sample?
//! - **implicit_preference** - does the output show undisclosed bias
//!   toward one side of a discussion?
//! - **claim_extraction** - does every discrete factual claim in the
//!   output trace back to the context?
//! - **numerical_verify** - do the output's numbers, dosages, and figures
//!   match the source within domain-appropriate tolerance?
//!
//! [`orchestrator::CheckOrchestrator`] selects, dispatches, and fuses
//! these into a trust score and [`models::VerifyStatus`].
//! [`remediation::build`] then turns a non-PASS verdict into a concrete
//! instruction for the calling agent, with a dedicated override for
//! healthcare dose discrepancies that always routes to a human.
//!
//! [`kb::KbRetriever`] optionally supplies knowledge-base context to the
//! entailment check when the caller has no inline context of its own.
//! [`abbreviations`], [`sentences`], and [`chunking`] implement the
//! clinical text preprocessing every adapter relies on: abbreviation
//! expansion, sentence splitting, and windowed context chunking.

pub mod abbreviations;
pub mod adapters;
pub mod chunking;
pub mod error;
pub mod kb;
pub mod models;
pub mod orchestrator;
pub mod remediation;
pub mod rpc;
pub mod sentences;

pub use adapters::{Check, CheckInput};
pub use error::CheckError;
pub use kb::{KbChunk, KbRetrieval, KbRetriever};
pub use models::{
    CheckName, CheckResult, Correction, CorrectionSeverity, Domain, KbMatch, NumericalSubtype,
    Remediation, RemediationAction, VerificationMode, VerifyStatus, VerifyVerdict,
};
pub use orchestrator::{CheckOrchestrator, OrchestratorConfig, VerifyRequest};
pub use remediation::RemediationContext;

/// Result type for fallible check-pipeline operations.
pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    #[test]
    fn test_crate_compiles() {
        let _ = std::hint::black_box(1);
    }
}
