//! # Persistent Storage Layer
//!
//! A `sled` embedded database wrapper, one named tree per table, following
//! the same `open`/`temporary`/typed-accessor shape used throughout this
//! codebase's storage layers. All records are stored as JSON; audit
//! records (verifications, threats) are insert-only — nothing in this
//! module exposes a way to mutate or delete them.

use std::path::Path;

use crate::models::{
    Credential, KbChunkRecord, Policy, Session, StoreError, Tenant, ThreatRecord, VerificationRecord,
};

const TENANTS: &str = "tenants";
const CREDENTIALS: &str = "credentials";
const POLICIES: &str = "policies";
const SESSIONS: &str = "sessions";
const VERIFICATIONS: &str = "verifications";
const THREATS: &str = "threats";
const KB_CHUNKS: &str = "kb_chunks";

#[derive(Clone)]
pub struct Storage {
    db: sled::Db,
    tenants: sled::Tree,
    credentials: sled::Tree,
    policies: sled::Tree,
    sessions: sled::Tree,
    verifications: sled::Tree,
    threats: sled::Tree,
    kb_chunks: sled::Tree,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory storage, lost when dropped. Used by tests and by
    /// `meerkat-cli` for one-shot local invocations.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            tenants: db.open_tree(TENANTS)?,
            credentials: db.open_tree(CREDENTIALS)?,
            policies: db.open_tree(POLICIES)?,
            sessions: db.open_tree(SESSIONS)?,
            verifications: db.open_tree(VERIFICATIONS)?,
            threats: db.open_tree(THREATS)?,
            kb_chunks: db.open_tree(KB_CHUNKS)?,
            db,
        })
    }

    pub fn put_tenant(&self, tenant: &Tenant) -> Result<(), StoreError> {
        self.tenants.insert(tenant.id.as_bytes(), serde_json::to_vec(tenant)?)?;
        Ok(())
    }

    pub fn get_tenant(&self, id: &str) -> Result<Option<Tenant>, StoreError> {
        get_json(&self.tenants, id.as_bytes())
    }

    /// Credentials are keyed by their SHA-256 hash, never by prefix — the
    /// only lookup path this storage layer exposes.
    pub fn put_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        self.credentials.insert(credential.hash, serde_json::to_vec(credential)?)?;
        Ok(())
    }

    pub fn get_credential_by_hash(&self, hash: &[u8; 32]) -> Result<Option<Credential>, StoreError> {
        get_json(&self.credentials, hash)
    }

    pub fn put_policy(&self, policy: &Policy) -> Result<(), StoreError> {
        self.policies.insert(policy.id.as_bytes(), serde_json::to_vec(policy)?)?;
        Ok(())
    }

    pub fn get_policy(&self, id: &str) -> Result<Option<Policy>, StoreError> {
        get_json(&self.policies, id.as_bytes())
    }

    pub fn put_session(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert(session.id.as_bytes(), serde_json::to_vec(session)?)?;
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        get_json(&self.sessions, id.as_bytes())
    }

    /// Verifications are append-only; callers must not overwrite an
    /// existing audit id.
    pub fn insert_verification(&self, record: &VerificationRecord) -> Result<(), StoreError> {
        self.verifications
            .insert(record.audit_id.as_bytes(), serde_json::to_vec(record)?)?;
        Ok(())
    }

    pub fn get_verification(&self, audit_id: &str) -> Result<Option<VerificationRecord>, StoreError> {
        get_json(&self.verifications, audit_id.as_bytes())
    }

    /// All verifications linked to a session, for `?include=session`.
    pub fn verifications_for_session(&self, session_id: &str) -> Result<Vec<VerificationRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.verifications.iter() {
            let (_, value) = entry?;
            let record: VerificationRecord = serde_json::from_slice(&value)?;
            if record.session_id == session_id {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    /// All verifications for a tenant, for dashboard aggregation. A full-tree
    /// scan, same tradeoff as [`Storage::kb_chunks_for_tenant`].
    pub fn verifications_for_tenant(&self, tenant_id: &str) -> Result<Vec<VerificationRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.verifications.iter() {
            let (_, value) = entry?;
            let record: VerificationRecord = serde_json::from_slice(&value)?;
            if record.tenant_id == tenant_id {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// All threat records for a tenant, for dashboard aggregation.
    pub fn threats_for_tenant(&self, tenant_id: &str) -> Result<Vec<ThreatRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.threats.iter() {
            let (_, value) = entry?;
            let record: ThreatRecord = serde_json::from_slice(&value)?;
            if record.tenant_id == tenant_id {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn insert_threat(&self, record: &ThreatRecord) -> Result<(), StoreError> {
        self.threats.insert(record.audit_id.as_bytes(), serde_json::to_vec(record)?)?;
        Ok(())
    }

    pub fn get_threat(&self, audit_id: &str) -> Result<Option<ThreatRecord>, StoreError> {
        get_json(&self.threats, audit_id.as_bytes())
    }

    pub fn put_kb_chunk(&self, chunk: &KbChunkRecord) -> Result<(), StoreError> {
        self.kb_chunks.insert(chunk.chunk_id.as_bytes(), serde_json::to_vec(chunk)?)?;
        Ok(())
    }

    /// All chunks owned by a tenant. A full-tree scan is acceptable for an
    /// embedded KV store at the knowledge-base sizes this gateway targets;
    /// a dedicated per-tenant tree would be the next optimization.
    pub fn kb_chunks_for_tenant(&self, tenant_id: &str) -> Result<Vec<KbChunkRecord>, StoreError> {
        let mut chunks = Vec::new();
        for entry in self.kb_chunks.iter() {
            let (_, value) = entry?;
            let chunk: KbChunkRecord = serde_json::from_slice(&value)?;
            if chunk.tenant_id == tenant_id {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }
}

fn get_json<T: serde::de::DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> Result<Option<T>, StoreError> {
    match tree.get(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("tenants", &self.tenants.len())
            .field("sessions", &self.sessions.len())
            .field("verifications", &self.verifications.len())
            .field("threats", &self.threats.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Plan;
    use chrono::Utc;

    #[test]
    fn tenant_round_trips() {
        let storage = Storage::temporary().unwrap();
        let tenant = Tenant::new("t1", "Acme Corp", Plan::Starter, Utc::now());
        storage.put_tenant(&tenant).unwrap();
        let loaded = storage.get_tenant("t1").unwrap().unwrap();
        assert_eq!(loaded.display_name, "Acme Corp");
    }

    #[test]
    fn credential_lookup_is_by_hash_only() {
        let storage = Storage::temporary().unwrap();
        let hash = Credential::hash_key("super-secret-key");
        let credential = Credential {
            prefix: "sk_live_abcd".to_string(),
            hash,
            tenant_id: "t1".to_string(),
            status: crate::models::CredentialStatus::Active,
            last_used_at: None,
        };
        storage.put_credential(&credential).unwrap();
        let loaded = storage.get_credential_by_hash(&hash).unwrap().unwrap();
        assert_eq!(loaded.tenant_id, "t1");
    }

    #[test]
    fn missing_record_is_none() {
        let storage = Storage::temporary().unwrap();
        assert!(storage.get_session("ses_missing").unwrap().is_none());
    }

    #[test]
    fn kb_chunks_filtered_by_tenant() {
        let storage = Storage::temporary().unwrap();
        storage
            .put_kb_chunk(&KbChunkRecord {
                chunk_id: "c1".to_string(),
                tenant_id: "t1".to_string(),
                document_id: "d1".to_string(),
                document_name: "handbook.md".to_string(),
                content: "content".to_string(),
                embedding: vec![0.1, 0.2],
            })
            .unwrap();
        storage
            .put_kb_chunk(&KbChunkRecord {
                chunk_id: "c2".to_string(),
                tenant_id: "t2".to_string(),
                document_id: "d2".to_string(),
                document_name: "other.md".to_string(),
                content: "content".to_string(),
                embedding: vec![0.3, 0.4],
            })
            .unwrap();
        let chunks = storage.kb_chunks_for_tenant("t1").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "c1");
    }
}
