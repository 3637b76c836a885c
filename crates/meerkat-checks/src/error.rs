//! Error types for the check orchestrator and its adapters.

use thiserror::Error;

/// Errors that can occur while running the verify pipeline.
///
/// Adapter-level failures (network, timeout, non-OK status) are *not*
/// represented here — they degrade to a heuristic fallback inside the
/// adapter itself and never reach the orchestrator as an error. This enum
/// covers only conditions the pipeline cannot route around.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("unknown check name: {0}")]
    UnknownCheck(String),

    #[error("knowledge-base query failed: {0}")]
    KnowledgeBaseQuery(String),

    #[error("invalid verify request: {0}")]
    InvalidRequest(String),

    #[error("internal check-orchestrator error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_check_display_names_the_check() {
        let err = CheckError::UnknownCheck("made_up_check".to_string());
        assert!(err.to_string().contains("made_up_check"));
    }
}
