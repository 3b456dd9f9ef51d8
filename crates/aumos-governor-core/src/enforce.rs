// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! In-process enforcement boundary.
//!
//! One predicate, shared by the in-process wrapper and the HTTP proxy:
//! `allow(decision) == !decision.halted`. The wrapper never executes the
//! action body before the check, and never catches or swallows errors the
//! action itself produces — those belong to the caller.

use alloc::string::String;

use crate::types::{Decision, FailureKind};

/// The shared enforcement predicate.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{allow, Budgets, Decision, FailureKind};
///
/// assert!(allow(&Decision::go(1, Budgets::initial())));
/// assert!(!allow(&Decision::halt(
///     2,
///     Budgets::initial(),
///     FailureKind::Exhaustion,
///     "effort 0.0000 <= min_effort 0.0000".into(),
/// )));
/// ```
pub fn allow(decision: &Decision) -> bool {
    !decision.halted
}

/// Typed refusal raised when an action is attempted against a HALT decision.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedError {
    /// The failure class of the halt that blocked execution.
    pub failure: FailureKind,
    /// The halt reason, verbatim from the decision.
    pub reason: String,
    /// The step the blocking decision was produced at.
    pub step: u64,
}

impl BlockedError {
    /// Build from a HALT decision.
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            failure: decision.failure.unwrap_or(FailureKind::External),
            reason: decision
                .reason
                .clone()
                .unwrap_or_else(|| String::from("halted")),
            step: decision.step,
        }
    }
}

impl core::fmt::Display for BlockedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "action blocked at step {}: {} ({})",
            self.step, self.failure, self.reason
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BlockedError {}

/// Run `action` only if `decision` permits it.
///
/// On HALT the action closure is never invoked and a [`BlockedError`]
/// carrying the failure and reason comes back. On GO the closure runs and
/// its result — including any error value it returns — passes through
/// untouched.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{enforce, Budgets, Decision, FailureKind};
///
/// let go = Decision::go(1, Budgets::initial());
/// let ran = enforce(&go, || 2 + 2).unwrap();
/// assert_eq!(ran, 4);
///
/// let halt = Decision::halt(2, Budgets::initial(), FailureKind::Overrisk,
///                           "consumed risk 0.8100 exceeded max_risk 0.8000".into());
/// let blocked: Result<(), _> = enforce(&halt, || unreachable!("must not execute"));
/// assert_eq!(blocked.unwrap_err().failure, FailureKind::Overrisk);
/// ```
pub fn enforce<T, F>(decision: &Decision, action: F) -> Result<T, BlockedError>
where
    F: FnOnce() -> T,
{
    if allow(decision) {
        Ok(action())
    } else {
        Err(BlockedError::from_decision(decision))
    }
}
