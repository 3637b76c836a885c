//! # Meerkat Store - Gateway Persistence
//!
//! Sled-backed storage for everything the gateway needs to remember between
//! requests: tenants and their plans, bearer credentials, per-tenant verify
//! policies, session state, and the append-only verification and threat
//! audit logs. Knowledge-base chunks used by [`meerkat_checks::KbRetriever`]
//! also live here.
//!
//! ## Layout
//!
//! - [`storage`] - the raw `sled` tree wrapper; one tree per record kind.
//! - [`models`] - the persisted record types and `StoreError`.
//! - [`session`] - the session lifecycle state machine (§ session rules:
//!   shared shield/verify namespace, attempt counting, `full_pipeline`
//!   upgrade).
//! - [`policy`] - policy resolution (`config_id` precedence) and quota
//!   bookkeeping, including the `X-Meerkat-*` header values and the
//!   paid-invoice reset.
//! - [`audit`] - audit id minting (`aud_`/`aud_shd_`) and the append-only
//!   verification/threat log.
//!
//! No module here runs a background task; every transition is driven by the
//! shield/verify request handler that calls into it.

pub mod audit;
pub mod models;
pub mod policy;
pub mod session;
pub mod storage;

pub use audit::{new_threat_audit_id, new_verification_audit_id, AuditLog};
pub use models::{
    Credential, CredentialStatus, KbChunkRecord, Plan, Policy as StoredPolicy, Session, SessionType, StoreError,
    Tenant, ThreatActionTaken, ThreatRecord, VerificationRecord,
};
pub use policy::{PolicyStore, QuotaStatus, QuotaStore};
pub use session::{new_session_id, SessionStore};
pub use storage::Storage;

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    #[test]
    fn test_crate_compiles() {
        let _ = crate::Storage::temporary().unwrap();
    }
}
