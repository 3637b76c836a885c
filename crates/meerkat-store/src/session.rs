//! # Session Lifecycle
//!
//! A session groups repeated attempts at verifying or sanitizing a single
//! logical AI output. Shield and Verify calls share the same session
//! namespace: a session first opened by one endpoint and later touched by
//! the other is upgraded to [`SessionType::FullPipeline`].
//!
//! Session transitions are owned exclusively by the shield/verify request
//! handlers that call into [`SessionStore`] — there is no background daemon
//! that advances or expires sessions.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{Session, SessionType, StoreError};
use crate::storage::Storage;

pub fn new_session_id() -> String {
    format!("ses_{}", Uuid::new_v4().simple())
}

pub struct SessionStore<'a> {
    storage: &'a Storage,
}

impl<'a> SessionStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Accept one shield or verify call against an optional caller-supplied
    /// session id, returning the session to attach to this attempt.
    ///
    /// - No session id: a fresh session is created, starting at attempt 1.
    /// - A session id: the session must exist, belong to `tenant_id`, not
    ///   already be resolved, and have `attempt_count < max_retries`. On
    ///   success its `attempt_count` is incremented and `latest_audit_id`
    ///   updated; if this attempt arrives from the other endpoint than the
    ///   session's current type, it is upgraded to `full_pipeline`.
    pub fn begin(
        &self,
        kind: SessionType,
        tenant_id: &str,
        session_id: Option<&str>,
        max_retries: u32,
        audit_id: &str,
        initial_status: impl Into<String>,
    ) -> Result<Session, StoreError> {
        match session_id {
            None => {
                let session = Session {
                    id: new_session_id(),
                    tenant_id: tenant_id.to_string(),
                    session_type: kind,
                    first_audit_id: audit_id.to_string(),
                    latest_audit_id: audit_id.to_string(),
                    attempt_count: 1,
                    initial_status: initial_status.into(),
                    final_status: None,
                    resolved: false,
                    created_at: Utc::now(),
                    resolved_at: None,
                };
                self.storage.put_session(&session)?;
                Ok(session)
            }
            Some(id) => {
                let mut session = self
                    .storage
                    .get_session(id)?
                    .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
                if session.tenant_id != tenant_id {
                    return Err(StoreError::AccessDenied(format!("session {id} belongs to another tenant")));
                }
                if session.resolved {
                    return Err(StoreError::Conflict(format!("session {id} is already resolved")));
                }
                if session.attempt_count >= max_retries {
                    return Err(StoreError::Conflict("Maximum retries reached".to_string()));
                }
                session.attempt_count += 1;
                session.latest_audit_id = audit_id.to_string();
                if session.session_type != kind {
                    session.session_type = SessionType::FullPipeline;
                }
                self.storage.put_session(&session)?;
                Ok(session)
            }
        }
    }

    /// Mark a session resolved, either because verification passed or
    /// because the retry cap was reached. No further attempts will be
    /// accepted against it.
    pub fn resolve(&self, session: &mut Session, final_status: impl Into<String>) -> Result<(), StoreError> {
        session.resolved = true;
        session.final_status = Some(final_status.into());
        session.resolved_at = Some(Utc::now());
        self.storage.put_session(session)
    }

    pub fn get(&self, id: &str) -> Result<Session, StoreError> {
        self.storage
            .get_session(id)?
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_requested_type_and_attempt_one() {
        let storage = Storage::temporary().unwrap();
        let store = SessionStore::new(&storage);
        let session = store.begin(SessionType::Verify, "t1", None, 3, "aud_1", "PASS").unwrap();
        assert_eq!(session.session_type, SessionType::Verify);
        assert_eq!(session.attempt_count, 1);
        assert!(session.id.starts_with("ses_"));
    }

    #[test]
    fn resuming_from_the_other_endpoint_upgrades_to_full_pipeline() {
        let storage = Storage::temporary().unwrap();
        let store = SessionStore::new(&storage);
        let session = store.begin(SessionType::Shield, "t1", None, 3, "aud_shd_1", "safe").unwrap();
        let upgraded = store
            .begin(SessionType::Verify, "t1", Some(&session.id), 3, "aud_2", "PASS")
            .unwrap();
        assert_eq!(upgraded.session_type, SessionType::FullPipeline);
        assert_eq!(upgraded.attempt_count, 2);
    }

    #[test]
    fn cross_tenant_session_access_is_denied() {
        let storage = Storage::temporary().unwrap();
        let store = SessionStore::new(&storage);
        let session = store.begin(SessionType::Verify, "t1", None, 3, "aud_1", "PASS").unwrap();
        let result = store.begin(SessionType::Verify, "t2", Some(&session.id), 3, "aud_2", "PASS");
        assert!(matches!(result, Err(StoreError::AccessDenied(_))));
    }

    #[test]
    fn resolved_session_rejects_further_attempts() {
        let storage = Storage::temporary().unwrap();
        let store = SessionStore::new(&storage);
        let mut session = store.begin(SessionType::Verify, "t1", None, 3, "aud_1", "PASS").unwrap();
        store.resolve(&mut session, "PASS").unwrap();
        let result = store.begin(SessionType::Verify, "t1", Some(&session.id), 3, "aud_2", "PASS");
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn attempt_cap_is_enforced_as_a_conflict() {
        let storage = Storage::temporary().unwrap();
        let store = SessionStore::new(&storage);
        let session = store.begin(SessionType::Verify, "t1", None, 2, "aud_1", "BLOCK").unwrap();
        let session = store.begin(SessionType::Verify, "t1", Some(&session.id), 2, "aud_2", "BLOCK").unwrap();
        assert_eq!(session.attempt_count, 2);
        let result = store.begin(SessionType::Verify, "t1", Some(&session.id), 2, "aud_3", "BLOCK");
        match result {
            Err(StoreError::Conflict(message)) => assert_eq!(message, "Maximum retries reached"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
