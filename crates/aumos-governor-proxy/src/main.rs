// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! AumOS governor proxy service.
//!
//! Starts the fail-closed tool-call boundary over one governed kernel:
//!
//! ```bash
//! # Default BALANCED posture, audit log in the working directory
//! aumos-governor-proxy
//!
//! # Explicit policy file and audit location
//! aumos-governor-proxy --policy policies.yaml --audit-path /var/lib/aumos/audit.jsonl
//!
//! # Environment overrides
//! GOVERNANCE_AUDIT_PATH=/tmp/audit.jsonl GOVERNANCE_CONTRACTS_ENABLED=1 aumos-governor-proxy
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aumos_governor_core::audit::{AuditRecorder, AuditSink};
use aumos_governor_core::{Kernel, Profile};
use aumos_governor_proxy::{create_router, ProxyState, ToolBackend};
use aumos_governor_std::{audit_path_from_env, load_policy, JsonlAuditLog};

/// AumOS runtime governor — HTTP enforcement proxy.
#[derive(Parser, Debug)]
#[command(name = "aumos-governor-proxy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to.
    #[arg(long, env = "GOVERNANCE_PROXY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "GOVERNANCE_PROXY_PORT", default_value_t = 8000)]
    port: u16,

    /// Agent identifier recorded on every audit entry.
    #[arg(long, default_value = "agent-proxy")]
    agent_id: String,

    /// Named preset profile (conservative, balanced, aggressive).
    #[arg(long, default_value = "balanced")]
    profile: String,

    /// YAML policy file; overrides --profile when set.
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Audit chain location (GOVERNANCE_AUDIT_PATH wins when set).
    #[arg(long, default_value = "governor-audit.jsonl")]
    audit_path: PathBuf,

    /// Log filter (trace, debug, info, warn, error).
    #[arg(long, env = "GOVERNANCE_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log)))
        .with(fmt::layer())
        .init();

    // Profile: policy file wins over the named preset.
    let profile = match &args.policy {
        Some(path) => load_policy(path)?,
        None => Profile::preset(&args.profile)
            .ok_or_else(|| anyhow::anyhow!("unknown profile preset: {}", args.profile))?,
    };
    tracing::info!(profile = %profile.name, max_steps = profile.max_steps, "profile loaded");

    let kernel = Kernel::new(&args.agent_id, profile)?;

    // Audit chain: reopened logs continue where the file left off.
    let audit_path = audit_path_from_env(&args.audit_path);
    let log = JsonlAuditLog::open(&audit_path)?;
    let next_seq = log.entries_written();
    let head_hash = log.head_hash().to_owned();
    tracing::info!(path = %audit_path.display(), entries = next_seq, "audit chain open");
    let recorder = AuditRecorder::resume(
        Box::new(log) as Box<dyn AuditSink + Send>,
        next_seq,
        head_hash,
    );

    let state = Arc::new(ProxyState::new(kernel, recorder, ToolBackend::with_builtins()));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    tracing::info!(%addr, "governor proxy listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
