//! # Compliance Dashboard Aggregation
//!
//! Backs `GET /v1/dashboard?period=24h|7d|30d|90d`: totals, average trust
//! score, compliance ratio, the most frequent flags, and a trend versus the
//! immediately preceding window of the same length.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use meerkat_checks::VerifyStatus;
use meerkat_store::Storage;

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardPeriod {
    Day,
    Week,
    Month,
    Quarter,
}

impl DashboardPeriod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "24h" => Some(Self::Day),
            "7d" => Some(Self::Week),
            "30d" => Some(Self::Month),
            "90d" => Some(Self::Quarter),
            _ => None,
        }
    }

    fn duration(self) -> Duration {
        match self {
            Self::Day => Duration::hours(24),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
            Self::Quarter => Duration::days(90),
        }
    }
}

/// `trend` flips once the compliance ratio moves more than five percentage
/// points against the prior window of equal length.
const TREND_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub period: String,
    pub total_verifications: u64,
    pub total_shield_scans: u64,
    pub average_trust_score: f64,
    /// Fraction of verifications that resolved to `PASS`.
    pub compliance_ratio: f64,
    pub top_flags: Vec<(String, u64)>,
    pub trend: Trend,
}

pub fn build(storage: &Storage, tenant_id: &str, period: DashboardPeriod, now: DateTime<Utc>) -> Result<DashboardSummary, GatewayError> {
    let window = period.duration();
    let current_start = now - window;
    let prior_start = current_start - window;

    let verifications = storage.verifications_for_tenant(tenant_id)?;
    let threats = storage.threats_for_tenant(tenant_id)?;

    let current: Vec<_> = verifications.iter().filter(|r| r.created_at >= current_start && r.created_at <= now).collect();
    let prior: Vec<_> = verifications
        .iter()
        .filter(|r| r.created_at >= prior_start && r.created_at < current_start)
        .collect();

    let total_shield_scans = threats.iter().filter(|t| t.created_at >= current_start && t.created_at <= now).count() as u64;

    let average_trust_score = average_trust(&current);
    let compliance_ratio = compliance_ratio(&current);
    let prior_compliance_ratio = compliance_ratio(&prior);

    let trend = if current.is_empty() || prior.is_empty() {
        Trend::Stable
    } else if compliance_ratio - prior_compliance_ratio > TREND_THRESHOLD {
        Trend::Improving
    } else if prior_compliance_ratio - compliance_ratio > TREND_THRESHOLD {
        Trend::Worsening
    } else {
        Trend::Stable
    };

    let mut flag_counts: HashMap<String, u64> = HashMap::new();
    for record in &current {
        for flag in &record.flags {
            *flag_counts.entry(flag.clone()).or_insert(0) += 1;
        }
    }
    let mut top_flags: Vec<(String, u64)> = flag_counts.into_iter().collect();
    top_flags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_flags.truncate(5);

    Ok(DashboardSummary {
        period: period_label(period),
        total_verifications: current.len() as u64,
        total_shield_scans,
        average_trust_score,
        compliance_ratio,
        top_flags,
        trend,
    })
}

fn average_trust(records: &[&meerkat_store::VerificationRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: u64 = records.iter().map(|r| r.trust_score as u64).sum();
    (sum as f64 / records.len() as f64 * 100.0).round() / 100.0
}

fn compliance_ratio(records: &[&meerkat_store::VerificationRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let passed = records.iter().filter(|r| r.status == VerifyStatus::Pass).count();
    passed as f64 / records.len() as f64
}

fn period_label(period: DashboardPeriod) -> String {
    match period {
        DashboardPeriod::Day => "24h",
        DashboardPeriod::Week => "7d",
        DashboardPeriod::Month => "30d",
        DashboardPeriod::Quarter => "90d",
    }
    .to_string()
}
