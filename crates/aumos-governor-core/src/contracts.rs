// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Runtime invariant checker for the kernel.
//!
//! When enabled, [`ContractEnforcer`] re-checks the kernel's safety
//! guarantees on every step:
//!
//! * **Budget monotonicity** — effort never increases, consumed risk never
//!   decreases, persistence gains are bounded by the profile's recovery rate.
//! * **Halt irreversibility** — a halted kernel never reports running again
//!   outside of an explicit reset.
//!
//! The third kernel guarantee — the kernel never invokes an action handler —
//! holds structurally: [`crate::Kernel`] owns no handler registry and no
//! execution surface, so there is nothing for a runtime check to probe.
//!
//! A violation is a critical error: the kernel transitions to HALTED with
//! failure `EXTERNAL` carrying the violation text.
//!
//! Enforcement is toggled by `GOVERNANCE_CONTRACTS_ENABLED=1`, read exactly
//! once per process and frozen; a kernel never re-reads the environment
//! mid-run.

use alloc::format;
use alloc::string::String;

use crate::profile::Profile;
use crate::types::Budgets;

/// Raised when a kernel contract is violated.
///
/// Should never occur in correct operation — it indicates the governor
/// itself has entered an invalid state.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractViolation {
    /// Name of the violated contract.
    pub contract: &'static str,
    /// What was observed.
    pub message: String,
}

impl core::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "contract violation [{}]: {}", self.contract, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ContractViolation {}

/// Per-kernel contract checker, constructed enabled or disabled once.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{Budgets, ContractEnforcer, Profile};
///
/// let enforcer = ContractEnforcer::enabled();
/// let before = Budgets::initial();
/// let mut after = before;
/// after.effort = 0.9;
/// assert!(enforcer
///     .check_budget_monotonicity(&before, &after, &Profile::balanced())
///     .is_ok());
///
/// after.effort = 1.5;
/// assert!(enforcer
///     .check_budget_monotonicity(&before, &after, &Profile::balanced())
///     .is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ContractEnforcer {
    enabled: bool,
}

impl ContractEnforcer {
    /// An enforcer that checks on every step.
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    /// An enforcer that never checks.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Build from the frozen process-wide environment toggle.
    ///
    /// `GOVERNANCE_CONTRACTS_ENABLED=1` enables; anything else disables.
    #[cfg(feature = "std")]
    pub fn from_env() -> Self {
        Self {
            enabled: contracts_enabled_from_env(),
        }
    }

    /// Whether this enforcer performs checks.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Contract: budgets never recover outside of a privileged reset.
    ///
    /// Exploration is exempt — it is a capacity meter fed by novelty, and
    /// the SAFETY predicate, not monotonicity, bounds it.
    pub fn check_budget_monotonicity(
        &self,
        before: &Budgets,
        after: &Budgets,
        profile: &Profile,
    ) -> Result<(), ContractViolation> {
        if !self.enabled {
            return Ok(());
        }
        if after.effort > before.effort {
            return Err(ContractViolation {
                contract: "BUDGET_NEVER_INCREASES",
                message: format!(
                    "effort increased from {:.6} to {:.6}",
                    before.effort, after.effort
                ),
            });
        }
        if after.consumed_risk() < before.consumed_risk() {
            return Err(ContractViolation {
                contract: "BUDGET_NEVER_INCREASES",
                message: format!(
                    "consumed risk decreased from {:.6} to {:.6}",
                    before.consumed_risk(),
                    after.consumed_risk()
                ),
            });
        }
        let persistence_ceiling = before.persistence + profile.persistence_gain;
        if after.persistence > persistence_ceiling {
            return Err(ContractViolation {
                contract: "BUDGET_NEVER_INCREASES",
                message: format!(
                    "persistence rose from {:.6} to {:.6}, above the per-step ceiling {:.6}",
                    before.persistence, after.persistence, persistence_ceiling
                ),
            });
        }
        Ok(())
    }

    /// Contract: HALTED → RUNNING only happens through `reset()`.
    pub fn check_halt_irreversibility(
        &self,
        was_halted: bool,
        is_halted: bool,
    ) -> Result<(), ContractViolation> {
        if !self.enabled {
            return Ok(());
        }
        if was_halted && !is_halted {
            return Err(ContractViolation {
                contract: "HALT_IS_TERMINAL",
                message: String::from("kernel reversed from HALTED to running without reset"),
            });
        }
        Ok(())
    }
}

/// Read `GOVERNANCE_CONTRACTS_ENABLED` once and freeze the answer for the
/// lifetime of the process.
#[cfg(feature = "std")]
pub fn contracts_enabled_from_env() -> bool {
    use std::sync::OnceLock;
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| {
        std::env::var("GOVERNANCE_CONTRACTS_ENABLED")
            .map(|value| value == "1")
            .unwrap_or(false)
    })
}
