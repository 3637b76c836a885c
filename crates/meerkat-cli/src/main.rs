//! Meerkat governance gateway CLI - local shield/verify invocations against
//! an embedded gateway database, for operators and scripted checks that
//! don't need the full HTTP surface.

use clap::{Parser, Subcommand, ValueEnum};
use meerkat_checks::Domain;
use meerkat_core::{DashboardPeriod, Gateway, GatewayConfig, ShieldCall, VerifyCall};
use meerkat_shield::Sensitivity;
use meerkat_store::{Plan, Tenant};
use std::path::PathBuf;

const LOCAL_TENANT_ID: &str = "local";

#[derive(Parser)]
#[command(name = "meerkat")]
#[command(about = "Meerkat governance gateway - ingress shield and egress verify, from the command line")]
struct Cli {
    /// Path to the gateway's embedded database. Defaults to ./meerkat_gateway.db.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an inbound message for prompt injection, exfiltration, and other threats.
    Shield {
        #[arg(long)]
        input: String,
        #[arg(long, value_enum, default_value = "medium")]
        sensitivity: SensitivityArg,
        #[arg(long)]
        session: Option<String>,
    },
    /// Check an AI output against its source context for trustworthiness.
    Verify {
        #[arg(long)]
        input: String,
        #[arg(long)]
        output: String,
        #[arg(long)]
        context: Option<String>,
        #[arg(long, value_enum, default_value = "general")]
        domain: DomainArg,
        #[arg(long)]
        session: Option<String>,
    },
    /// Show aggregate compliance metrics for a time window.
    Dashboard {
        #[arg(long, default_value = "24h")]
        period: String,
    },
    /// Print the resolved policy for the local tenant.
    Configure,
}

#[derive(Clone, Copy, ValueEnum)]
enum SensitivityArg {
    Low,
    Medium,
    High,
}

impl From<SensitivityArg> for Sensitivity {
    fn from(value: SensitivityArg) -> Self {
        match value {
            SensitivityArg::Low => Sensitivity::Low,
            SensitivityArg::Medium => Sensitivity::Medium,
            SensitivityArg::High => Sensitivity::High,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DomainArg {
    Legal,
    Financial,
    Healthcare,
    General,
}

impl From<DomainArg> for Domain {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::Legal => Domain::Legal,
            DomainArg::Financial => Domain::Financial,
            DomainArg::Healthcare => Domain::Healthcare,
            DomainArg::General => Domain::General,
        }
    }
}

fn open_gateway(db: Option<PathBuf>) -> anyhow::Result<Gateway> {
    let mut config = GatewayConfig::default();
    if let Some(path) = db {
        config.store.db_path = Some(path);
    }
    let gateway = Gateway::new(config)?;
    ensure_local_tenant(&gateway)?;
    Ok(gateway)
}

/// The CLI operates as a single unmetered tenant, auto-provisioned on first use.
fn ensure_local_tenant(gateway: &Gateway) -> anyhow::Result<()> {
    if gateway.storage().get_tenant(LOCAL_TENANT_ID)?.is_none() {
        gateway
            .storage()
            .put_tenant(&Tenant::new(LOCAL_TENANT_ID, "Local CLI Tenant", Plan::Enterprise, chrono::Utc::now()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let gateway = open_gateway(cli.db)?;

    match cli.command {
        Commands::Shield { input, sensitivity, session } => {
            let outcome = gateway
                .shield(
                    LOCAL_TENANT_ID,
                    ShieldCall {
                        input,
                        sensitivity: Some(sensitivity.into()),
                        session_id: session,
                    },
                )
                .await?;
            println!(
                "{}",
                serde_json::json!({
                    "safe": outcome.safe,
                    "threat_level": format!("{:?}", outcome.threat_level),
                    "audit_id": outcome.audit_id,
                    "session_id": outcome.session_id,
                    "threats": outcome.threats.len(),
                    "sanitized_input": outcome.sanitized_input,
                })
            );
        }
        Commands::Verify { input, output, context, domain, session } => {
            let outcome = gateway
                .verify(
                    LOCAL_TENANT_ID,
                    VerifyCall {
                        input,
                        output,
                        context,
                        domain: Some(domain.into()),
                        session_id: session,
                        ..Default::default()
                    },
                )
                .await?;
            println!(
                "{}",
                serde_json::json!({
                    "trust_score": outcome.trust_score,
                    "status": format!("{:?}", outcome.status),
                    "audit_id": outcome.audit_id,
                    "attempt": outcome.attempt,
                    "session_id": outcome.session_id,
                    "verification_mode": format!("{:?}", outcome.verification_mode),
                    "recommendations": outcome.recommendations,
                })
            );
        }
        Commands::Dashboard { period } => {
            let period = DashboardPeriod::parse(&period)
                .ok_or_else(|| anyhow::anyhow!("unknown period '{period}', expected one of 24h, 7d, 30d, 90d"))?;
            let summary = gateway.dashboard(LOCAL_TENANT_ID, period)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Configure => {
            let policy = gateway.get_policy(LOCAL_TENANT_ID, None)?;
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
    }

    Ok(())
}
