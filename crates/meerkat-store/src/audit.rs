//! # Audit Log
//!
//! Mints audit identifiers and writes immutable verification/threat
//! records. Verification audits begin `aud_`; threat (shield) audits begin
//! `aud_shd_`; both continue with a compact UTC date and an 8-hex-digit
//! random suffix.

use chrono::Utc;
use rand::Rng;

use crate::models::{StoreError, ThreatRecord, VerificationRecord};
use crate::storage::Storage;

const VERIFICATION_PREFIX: &str = "aud_";
const THREAT_PREFIX: &str = "aud_shd_";

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    let value: u32 = rng.gen();
    format!("{value:08x}")
}

pub fn new_verification_audit_id() -> String {
    format!("{VERIFICATION_PREFIX}{}{}", Utc::now().format("%Y%m%d"), random_suffix())
}

pub fn new_threat_audit_id() -> String {
    format!("{THREAT_PREFIX}{}{}", Utc::now().format("%Y%m%d"), random_suffix())
}

/// Thin facade over [`Storage`] for the audit log. Writes are the only
/// operation this module exposes beyond lookup — verification and threat
/// records are immutable once persisted.
pub struct AuditLog<'a> {
    storage: &'a Storage,
}

impl<'a> AuditLog<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn record_verification(&self, record: &VerificationRecord) -> Result<(), StoreError> {
        self.storage.insert_verification(record)
    }

    pub fn record_threat(&self, record: &ThreatRecord) -> Result<(), StoreError> {
        self.storage.insert_threat(record)
    }

    pub fn get_verification(&self, audit_id: &str) -> Result<VerificationRecord, StoreError> {
        self.storage
            .get_verification(audit_id)?
            .ok_or_else(|| StoreError::NotFound(format!("verification audit {audit_id}")))
    }

    pub fn get_threat(&self, audit_id: &str) -> Result<ThreatRecord, StoreError> {
        self.storage
            .get_threat(audit_id)?
            .ok_or_else(|| StoreError::NotFound(format!("threat audit {audit_id}")))
    }

    pub fn verifications_for_session(&self, session_id: &str) -> Result<Vec<VerificationRecord>, StoreError> {
        self.storage.verifications_for_session(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_audit_ids_share_a_prefix_and_are_unique() {
        let a = new_verification_audit_id();
        let b = new_verification_audit_id();
        assert!(a.starts_with(VERIFICATION_PREFIX));
        assert!(b.starts_with(VERIFICATION_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn threat_audit_ids_use_the_distinct_prefix() {
        let id = new_threat_audit_id();
        assert!(id.starts_with(THREAT_PREFIX));
        assert!(!id.starts_with("aud_2"));
    }
}
