//! Error types for the Meerkat gateway.
//!
//! Check-adapter failures (internal-upstream) never reach this enum — each
//! adapter degrades to its heuristic and tags its own flags. Everything
//! here is either a request the caller got wrong, or a storage failure the
//! caller must be told about rather than receiving an uncounted verdict.

use thiserror::Error;

use meerkat_checks::CheckError;
use meerkat_store::StoreError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication required: {0}")]
    Authentication(String),

    #[error("access denied: {0}")]
    Authorization(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for GatewayError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(message) => GatewayError::NotFound(message),
            StoreError::AccessDenied(message) => GatewayError::Authorization(message),
            StoreError::Conflict(message) => GatewayError::Conflict(message),
            StoreError::Validation(message) => GatewayError::Validation(message),
            StoreError::QuotaExceeded(message) => GatewayError::Quota(message),
            StoreError::Database(_) | StoreError::Serialization(_) => GatewayError::Internal(error.to_string()),
        }
    }
}

/// A check-pipeline error only ever surfaces here for programmer errors
/// (an unknown check name, an empty check set) — never for a degraded
/// adapter, which already resolved itself to a heuristic result.
impl From<CheckError> for GatewayError {
    fn from(error: CheckError) -> Self {
        match error {
            CheckError::UnknownCheck(_) | CheckError::InvalidRequest(_) => GatewayError::Validation(error.to_string()),
            CheckError::KnowledgeBaseQuery(_) | CheckError::Internal(_) => GatewayError::Internal(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_store_error_maps_to_not_found_gateway_error() {
        let error: GatewayError = StoreError::NotFound("session ses_1".to_string()).into();
        assert!(matches!(error, GatewayError::NotFound(_)));
    }

    #[test]
    fn quota_exceeded_maps_through() {
        let error: GatewayError = StoreError::QuotaExceeded("cap reached".to_string()).into();
        assert!(matches!(error, GatewayError::Quota(_)));
    }
}
