//! # Meerkat Core - Governance Gateway Facade
//!
//! Wires the ingress defense layer ([`meerkat_shield`]), the egress
//! verification pipeline ([`meerkat_checks`]), and gateway persistence
//! ([`meerkat_store`]) into the two operations a caller actually drives:
//!
//! - `shield` - inspect an inbound message before it reaches a model or
//!   tool.
//! - `verify` - check an AI output against its source context before it
//!   reaches a caller.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         MEERKAT GATEWAY                        │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                       ┌─────────────────┐                      │
//! │                       │     Gateway     │ ← unified facade     │
//! │                       └────────┬────────┘                      │
//! │                                │                                │
//! │        ┌───────────────────────┼───────────────────────┐        │
//! │        ▼                      ▼                        ▼        │
//! │ ┌─────────────┐       ┌──────────────┐        ┌─────────────┐  │
//! │ │   Shield    │       │    Verify     │        │    Store    │  │
//! │ │  (ingress)  │       │  (egress)     │        │  (sessions, │  │
//! │ │             │       │               │        │ policy, aud)│  │
//! │ └─────────────┘       └──────────────┘        └─────────────┘  │
//! │                                                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meerkat_core::{Gateway, GatewayConfig};
//!
//! let gateway = Gateway::new(GatewayConfig::default())?;
//! let tenant = gateway.authenticate("sk_live_...")?;
//! let outcome = gateway.shield(&tenant.id, shield_call).await?;
//! ```
//!
//! ## Notes
//!
//! - Check-adapter RPC failures never surface as [`GatewayError`] - each
//!   adapter degrades to its own heuristic fallback and tags the result.
//!   Only storage failures and caller mistakes (bad credentials, unknown
//!   audit ids, an exhausted retry budget) reach this layer's error type.
//! - Rate limiting and the check-adapter client pool are process-local,
//!   in-memory state, reconstructed from nothing on restart.

mod checks;
mod config;
mod dashboard;
mod error;
mod gateway;
mod rate_limit;

pub use checks::CheckRegistry;
pub use config::{GatewayConfig, GlobalConfig, ServiceConfig, StoreConfig};
pub use dashboard::{DashboardPeriod, DashboardSummary, Trend};
pub use error::GatewayError;
pub use gateway::{AuditView, Gateway, ShieldCall, ShieldOutcome, VerifyCall, VerifyOutcome};
pub use rate_limit::RateLimiter;

/// Core result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
