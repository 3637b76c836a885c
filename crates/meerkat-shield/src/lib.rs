//! # Meerkat Shield - Ingress Defense Layer
//!
//! Shield is the first line of defense in the Meerkat governance gateway.
//! It inspects every inbound message before it reaches a model or tool,
//! looking for prompt injection, jailbreaks, data exfiltration, credential
//! harvesting, privilege escalation, social engineering, tool manipulation,
//! indirect injection, and encoding-based evasion.
//!
//! ## Pipeline
//!
//! 1. **Global checks** ([`global_checks`]) run against the whole input —
//!    base64 payloads, invisible Unicode, homoglyph mixing, embedded system
//!    markers, hidden HTML, overlong input. Any hit short-circuits straight
//!    to `QUARANTINE_FULL_MESSAGE`.
//! 2. **Section splitting** ([`sections`]) breaks surviving input into
//!    independently-scanned spans so one bad paragraph doesn't condemn an
//!    otherwise-safe message.
//! 3. **Pattern scanning** ([`patterns`]) walks each section against the
//!    threat-category library in fixed priority order, with whole-input
//!    weighted-sum elevation once a category's matched weight crosses its
//!    threshold.
//! 4. **The engine** ([`engine`]) fuses all of the above into a
//!    [`models::ShieldVerdict`] and, for non-safe verdicts, a remediation
//!    bundle ([`remediation`]) describing what happened and what an agent
//!    should do about it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meerkat_shield::{ShieldEngine, ShieldConfig, Sensitivity};
//!
//! let engine = ShieldEngine::new(ShieldConfig::new(Sensitivity::Medium));
//! let verdict = engine.scan("Can you help me summarize this document?");
//! if verdict.safe {
//!     println!("input is safe to process");
//! } else {
//!     println!("{:?}: {:?}", verdict.suggested_action, verdict.threat_level);
//! }
//! ```

pub mod engine;
pub mod global_checks;
pub mod models;
pub mod patterns;
pub mod remediation;
pub mod sections;

pub use engine::{ShieldConfig, ShieldEngine};
pub use models::{Sensitivity, Severity, ShieldVerdict, SuggestedAction, ThreatFinding, ThreatType};
