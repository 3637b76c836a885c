//! Configuration types for the Meerkat gateway.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the gateway facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Storage configuration.
    pub store: StoreConfig,

    /// Check-adapter remote service endpoints.
    pub services: ServiceConfig,

    /// Global settings.
    pub global: GlobalConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            services: ServiceConfig::default(),
            global: GlobalConfig::default(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the gateway's sled database. `None` opens a temporary,
    /// non-persistent store (used by tests and one-shot CLI invocations).
    pub db_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: Some(PathBuf::from("./meerkat_gateway.db")),
        }
    }
}

/// Remote model-service endpoints each check adapter calls before falling
/// back to its heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub entailment_url: String,
    pub semantic_entropy_url: String,
    pub implicit_preference_url: String,
    pub claim_extraction_url: String,
    pub numerical_verify_url: String,
    pub embedding_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            entailment_url: "http://localhost:9001/entailment".to_string(),
            semantic_entropy_url: "http://localhost:9002/semantic-entropy".to_string(),
            implicit_preference_url: "http://localhost:9003/implicit-preference".to_string(),
            claim_extraction_url: "http://localhost:9004/claim-extraction".to_string(),
            numerical_verify_url: "http://localhost:9005/numerical-verify".to_string(),
            embedding_url: "http://localhost:9006/embed".to_string(),
        }
    }
}

/// Global gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Fail-closed mode: an upstream storage failure surfaces as an error
    /// rather than a partial verdict. Check-service failures never reach
    /// this setting — they degrade to a heuristic fallback inside the
    /// adapter itself.
    pub fail_closed: bool,

    /// Per-remote-service concurrency cap, enforced inside each adapter's
    /// RPC client.
    pub remote_concurrency_limit: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            fail_closed: true,
            remote_concurrency_limit: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.global.fail_closed);
        assert_eq!(config.global.remote_concurrency_limit, 8);
    }

    #[test]
    fn test_config_serialization() {
        let config = GatewayConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.services.entailment_url, config.services.entailment_url);
    }
}
