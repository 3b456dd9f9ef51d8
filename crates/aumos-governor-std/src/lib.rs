// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # aumos-governor-std
//!
//! `std`-only collaborators for `aumos-governor-core`:
//!
//! * [`JsonlAuditLog`] — durable, append-only JSONL sink for the audit
//!   chain, one canonical record per line, flushed before acknowledging.
//! * [`load_policy`] — YAML policy files → validated [`Profile`]s, with
//!   unknown keys rejected.
//! * [`AutoGovernor`] — wraps a tool call, synthesizes signals from observed
//!   execution facts, and steps the kernel, keeping the kernel itself
//!   clock-ignorant.
//!
//! The `governor-audit` binary verifies audit chains from the command line
//! (exit 0 valid, 1 invalid, 2 I/O error).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aumos_governor_core::{Kernel, Profile, Signals};
//! use aumos_governor_std::JsonlAuditLog;
//!
//! let log = JsonlAuditLog::open("/var/lib/aumos/governor-audit.jsonl")
//!     .expect("failed to open audit log");
//! let mut recorder = log.into_recorder();
//!
//! let mut kernel = Kernel::new("agent-001", Profile::balanced()).unwrap();
//! kernel
//!     .step_audited("search", &serde_json::json!({"q": "logs"}),
//!                   Signals::new(0.5, 0.1, 0.0), &mut recorder)
//!     .expect("audit write failed");
//! ```

pub mod adapter;
pub mod audit;
pub mod policy;

pub use adapter::{AutoGovernor, GovernedCallError};
pub use audit::{audit_path_from_env, JsonlAuditLog};
pub use policy::{load_policy, parse_policy, PolicyError};
