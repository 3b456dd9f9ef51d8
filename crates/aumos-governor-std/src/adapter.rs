// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Auto-signal capture around arbitrary tool calls.
//!
//! [`AutoGovernor`] is the thin adapter for hosts that cannot produce
//! explicit signals: it runs the wrapped call, observes execution facts —
//! wall time, success or failure, output size — and synthesizes a
//! [`Signals`] record before stepping the kernel. The kernel itself stays
//! clock-ignorant; wall time only ever enters through the synthesized
//! urgency component.
//!
//! The governed call is blocked up front when the kernel is already halted.
//! A halt produced *by* this call's observation lands on the next call —
//! the action has already run by the time its signals exist.

use std::time::{Duration, Instant};

use serde::Serialize;

use aumos_governor_core::{BlockedError, Decision, Kernel, Signals};

/// Reward synthesized for a call that returned `Ok`.
const SUCCESS_REWARD: f64 = 0.6;
/// Output bytes that count as fully novel.
const NOVELTY_SATURATION_BYTES: f64 = 1024.0;

/// Error surface of a governed call.
#[derive(Debug, thiserror::Error)]
pub enum GovernedCallError<E> {
    /// The kernel was already halted; the call never ran.
    #[error("call blocked by governor: {0}")]
    Blocked(#[from] BlockedError),
    /// The call ran and failed; its error passes through untouched.
    #[error("governed call failed: {0}")]
    Action(E),
}

/// Wraps a kernel and synthesizes signals from observed execution.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{Kernel, Profile};
/// use aumos_governor_std::AutoGovernor;
///
/// let kernel = Kernel::new("agent-001", Profile::balanced()).unwrap();
/// let mut governor = AutoGovernor::new(kernel);
///
/// let value: u32 = governor
///     .call(|| Ok::<_, std::io::Error>(41 + 1))
///     .unwrap();
/// assert_eq!(value, 42);
/// assert_eq!(governor.kernel().step_index(), 1);
/// ```
pub struct AutoGovernor {
    kernel: Kernel,
    slow_call_threshold: Duration,
    last_decision: Option<Decision>,
}

impl AutoGovernor {
    /// Govern `kernel` with the default 30-second slow-call threshold.
    pub fn new(kernel: Kernel) -> Self {
        Self::with_slow_call_threshold(kernel, Duration::from_secs(30))
    }

    /// Govern `kernel`, treating calls at or beyond `threshold` as maximal
    /// urgency.
    pub fn with_slow_call_threshold(kernel: Kernel, threshold: Duration) -> Self {
        Self {
            kernel,
            slow_call_threshold: threshold,
            last_decision: None,
        }
    }

    /// Borrow the governed kernel.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The decision produced by the most recent observed call.
    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    /// Release the kernel.
    pub fn into_kernel(self) -> Kernel {
        self.kernel
    }

    /// Run `action` under governance.
    ///
    /// Blocks before execution when the kernel is halted. Otherwise runs
    /// the action, synthesizes signals from what was observed, and steps
    /// the kernel. The action's own error is returned untouched inside
    /// [`GovernedCallError::Action`].
    pub fn call<T, E, F>(&mut self, action: F) -> Result<T, GovernedCallError<E>>
    where
        T: Serialize,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(terminal) = self.kernel.terminal_decision() {
            return Err(GovernedCallError::Blocked(BlockedError::from_decision(
                terminal,
            )));
        }

        let started = Instant::now();
        let outcome = action();
        let elapsed = started.elapsed();

        let signals = self.synthesize(&outcome, elapsed);
        let decision = self.kernel.step(signals);
        self.last_decision = Some(decision);

        outcome.map_err(GovernedCallError::Action)
    }

    fn synthesize<T: Serialize, E>(
        &self,
        outcome: &Result<T, E>,
        elapsed: Duration,
    ) -> Signals {
        let (reward, output_bytes) = match outcome {
            Ok(value) => {
                let bytes = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
                (SUCCESS_REWARD, bytes as f64)
            }
            Err(_) => (0.0, 0.0),
        };
        let novelty = (output_bytes / NOVELTY_SATURATION_BYTES).min(1.0);
        let urgency = (elapsed.as_secs_f64() / self.slow_call_threshold.as_secs_f64()).min(1.0);
        Signals::new(reward, novelty, urgency)
    }
}
