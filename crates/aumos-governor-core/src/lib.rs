// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # aumos-governor-core
//!
//! Core runtime-governor kernel for the AumOS agent governance protocol.
//!
//! The governor sits between an autonomous agent loop and its execution
//! surface. For every action the agent intends to take, the kernel evaluates
//! abstract progress/risk signals, advances bounded internal budgets, and
//! returns a binary decision — GO or HALT — with a typed failure
//! classification when halting. Halts are terminal, deterministic, and
//! guaranteed to arrive in finite time under sustained non-progress.
//!
//! This crate is `no_std`-compatible (requires `alloc`). Enable the `std`
//! feature (on by default) for the multi-agent coordinator and the
//! environment-variable contract toggle.
//!
//! ## Architecture
//!
//! ```text
//! Signals ──▶ eval::evaluate ──▶ mechanics::advance ──▶ Kernel::step
//!                                                          │
//!                                      ┌───────────────────┴──────────┐
//!                                      ▼                              ▼
//!                               audit::AuditRecorder          enforce::enforce
//!                               (hash-chained log)            (GO/HALT boundary)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use aumos_governor_core::{Kernel, Profile, Signals};
//!
//! let mut kernel = Kernel::new("agent-001", Profile::balanced()).unwrap();
//!
//! let decision = kernel.step(Signals::new(0.5, 0.2, 0.1));
//! assert!(!decision.halted);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod audit;
pub mod contracts;
pub mod enforce;
pub mod eval;
pub mod kernel;
pub mod mechanics;
pub mod profile;
pub mod types;

// Multi-agent coordination — shared budget pools and cascade propagation.
// Gated on "std" because the shared ledgers are mutex-serialized.
#[cfg(feature = "std")]
pub mod coordinator;

// Re-export the most commonly used items at the crate root so consumers can
// write `use aumos_governor_core::Kernel;` instead of the fully qualified
// path.
pub use audit::{AuditEntry, AuditError, AuditRecorder, AuditSink, MemoryAuditLog};
pub use contracts::ContractEnforcer;
pub use enforce::{allow, enforce, BlockedError};
pub use kernel::Kernel;
pub use profile::{Profile, ProfileError};
pub use types::{Budgets, Decision, FailureKind, Pressures, Signals};

#[cfg(feature = "std")]
pub use coordinator::{BudgetPool, CascadeDetector, Coordinator, PoolResource};
