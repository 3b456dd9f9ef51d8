// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! The governance kernel — a deterministic RUNNING/HALTED state machine.
//!
//! One [`Kernel`] governs one agent. Each call to [`Kernel::step`] evaluates
//! the submitted signals, advances pressures and budgets, classifies halt
//! predicates in a fixed priority order, and returns a [`Decision`]. The
//! first HALT is terminal: every later `step()` returns the cached terminal
//! decision unchanged until a privileged [`Kernel::reset`].
//!
//! ## Halt priority
//!
//! Evaluated in this order; the first match wins, which keeps reason
//! attribution stable when several predicates trip on the same step:
//!
//! 1. `SAFETY`         — exploration above `max_exploration`
//! 2. `OVERRISK`       — consumed risk above `max_risk`
//! 3. `EXHAUSTION`     — effort at or below `min_effort`
//! 4. `STAGNATION`     — full history window of sub-ceiling rewards with
//!    steady effort drain
//! 5. `EXTERNAL`       — step cap reached
//! 6. `TRUST_COLLAPSE` — sustained near-zero trust
//!
//! ## Commit discipline
//!
//! Successor state is computed out of place and swapped in only after the
//! decision (and, for [`Kernel::step_audited`], its audit entry) is final.
//! A cancelled or failed step leaves no trace: full commit or full rollback.
//!
//! The kernel never suspends, never reads a clock, and never invokes an
//! action handler — execution belongs to the enforcement boundary.

use alloc::format;
use alloc::string::String;

use crate::audit::{AuditError, AuditRecorder, AuditSink};
use crate::contracts::ContractEnforcer;
use crate::eval::evaluate;
use crate::mechanics::{advance, Dynamics};
use crate::profile::{Profile, ProfileError};
use crate::types::{Budgets, Decision, FailureKind, Pressures, Signals};

/// Deterministic per-agent governor.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{Kernel, Profile, Signals};
///
/// let mut kernel = Kernel::new("agent-001", Profile::balanced()).unwrap();
///
/// // Productive steps keep the kernel running.
/// let decision = kernel.step(Signals::new(0.6, 0.2, 0.1));
/// assert!(!decision.halted);
///
/// // Zero progress eventually halts it, and the halt is terminal.
/// let last = loop {
///     let d = kernel.step(Signals::new(0.0, 0.0, 0.1));
///     if d.halted {
///         break d;
///     }
/// };
/// assert_eq!(kernel.step(Signals::new(1.0, 0.0, 0.0)), last);
/// ```
pub struct Kernel {
    agent_id: String,
    profile: Profile,
    dynamics: Dynamics,
    step_index: u64,
    low_trust_streak: u32,
    terminal: Option<Decision>,
    contracts: ContractEnforcer,
}

/// A fully computed successor state, not yet committed.
struct Candidate {
    step_index: u64,
    dynamics: Dynamics,
    low_trust_streak: u32,
    decision: Decision,
}

impl Kernel {
    /// Construct a kernel for `agent_id` with a validated profile.
    ///
    /// Contract enforcement follows the process-wide
    /// `GOVERNANCE_CONTRACTS_ENABLED` toggle (std builds; disabled in
    /// `no_std`). A malformed profile is rejected here — the step loop
    /// never sees one.
    pub fn new(agent_id: &str, profile: Profile) -> Result<Self, ProfileError> {
        #[cfg(feature = "std")]
        let contracts = ContractEnforcer::from_env();
        #[cfg(not(feature = "std"))]
        let contracts = ContractEnforcer::disabled();
        Self::with_contracts(agent_id, profile, contracts)
    }

    /// Construct a kernel with an explicit contract enforcer.
    pub fn with_contracts(
        agent_id: &str,
        profile: Profile,
        contracts: ContractEnforcer,
    ) -> Result<Self, ProfileError> {
        profile.validate()?;
        let dynamics = Dynamics::initial(&profile);
        Ok(Self {
            agent_id: agent_id.into(),
            profile,
            dynamics,
            step_index: 0,
            low_trust_streak: 0,
            terminal: None,
            contracts,
        })
    }

    /// Stable identifier of the governed agent.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// The immutable profile this kernel was built with.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Current budget snapshot.
    pub fn budgets(&self) -> Budgets {
        self.dynamics.budgets
    }

    /// Current pressure snapshot.
    pub fn pressures(&self) -> Pressures {
        self.dynamics.pressures
    }

    /// Number of steps evaluated so far.
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    /// `true` once the kernel has reached its terminal halt.
    pub fn is_halted(&self) -> bool {
        self.terminal.is_some()
    }

    /// The cached terminal decision, if halted.
    pub fn terminal_decision(&self) -> Option<&Decision> {
        self.terminal.as_ref()
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Evaluate one intended action and return the decision.
    ///
    /// A halted kernel is a no-op: the terminal decision comes back
    /// unchanged.
    pub fn step(&mut self, signals: Signals) -> Decision {
        if let Some(terminal) = &self.terminal {
            return terminal.clone();
        }
        let candidate = self.compute(signals);
        self.commit(candidate)
    }

    /// Evaluate one intended action and append its audit entry atomically.
    ///
    /// The successor state is committed only after the recorder has made the
    /// entry durable; an audit failure rolls the step back completely and
    /// the caller sees the error. A halted kernel still records an entry
    /// for the repeated terminal decision — every decision the boundary
    /// acts on corresponds to exactly one audit record.
    pub fn step_audited<S: AuditSink>(
        &mut self,
        action: &str,
        params: &serde_json::Value,
        signals: Signals,
        recorder: &mut AuditRecorder<S>,
    ) -> Result<Decision, AuditError> {
        if let Some(terminal) = self.terminal.clone() {
            recorder.log(&self.agent_id, action, params, signals, &terminal)?;
            return Ok(terminal);
        }
        let candidate = self.compute(signals);
        recorder.log(&self.agent_id, action, params, signals, &candidate.decision)?;
        Ok(self.commit(candidate))
    }

    /// Force a terminal halt without running the mechanics.
    ///
    /// Used by the coordinator for cascade halts and pool denials.
    /// Idempotent: an already-halted kernel returns its cached decision.
    pub fn preempt(&mut self, failure: FailureKind, reason: String) -> Decision {
        if let Some(terminal) = &self.terminal {
            return terminal.clone();
        }
        self.step_index += 1;
        let decision = Decision::halt(self.step_index, self.dynamics.budgets, failure, reason);
        self.terminal = Some(decision.clone());
        decision
    }

    /// Privileged HALTED → RUNNING transition: restores initial budgets,
    /// zero pressures, empty history, step zero. The only way back.
    pub fn reset(&mut self) {
        self.dynamics = Dynamics::initial(&self.profile);
        self.step_index = 0;
        self.low_trust_streak = 0;
        self.terminal = None;
    }

    /// The amounts a shared-pool pre-flight would draw for these signals:
    /// `(effort, risk)`.
    pub fn project_draws(&self, signals: Signals) -> (f64, f64) {
        let eff = evaluate(signals, &self.profile);
        let effort = self.profile.effort_drain_base
            + self.profile.effort_drain_per_frustration * self.dynamics.pressures.frustration;
        let risk = self.profile.risk_gain_per_novelty * eff.novelty
            + self.profile.risk_gain_per_urgency * eff.urgency;
        (effort, risk)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn compute(&self, signals: Signals) -> Candidate {
        let step_index = self.step_index + 1;
        let eff = evaluate(signals, &self.profile);

        let low_trust_streak = if eff.trust < self.profile.trust_epsilon {
            self.low_trust_streak + 1
        } else {
            0
        };
        let trust_collapsed = low_trust_streak >= self.profile.trust_collapse_window;

        let mut dynamics = self.dynamics.clone();
        advance(&mut dynamics, eff, &self.profile);

        let decision = self.classify(step_index, &dynamics, trust_collapsed);

        Candidate {
            step_index,
            dynamics,
            low_trust_streak,
            decision,
        }
    }

    fn classify(&self, step_index: u64, dynamics: &Dynamics, trust_collapsed: bool) -> Decision {
        let budgets = dynamics.budgets;
        let profile = &self.profile;

        // An arithmetic fault is fatal to the step: never retried, never
        // allowed to leak NaN into later comparisons.
        if !budgets.is_finite() || !dynamics.pressures.is_finite() {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::External,
                String::from("arithmetic fault: non-finite pressure or budget after update"),
            );
        }

        // Contract checks run on the candidate, before any commit.
        if let Err(violation) =
            self.contracts
                .check_budget_monotonicity(&self.dynamics.budgets, &budgets, profile)
        {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::External,
                format!("{violation}"),
            );
        }

        if budgets.exploration > profile.max_exploration {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::Safety,
                format!(
                    "exploration {:.4} exceeded max_exploration {:.4}",
                    budgets.exploration, profile.max_exploration
                ),
            );
        }
        if budgets.consumed_risk() > profile.max_risk {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::Overrisk,
                format!(
                    "consumed risk {:.4} exceeded max_risk {:.4}",
                    budgets.consumed_risk(),
                    profile.max_risk
                ),
            );
        }
        if budgets.effort <= profile.min_effort {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::Exhaustion,
                format!(
                    "effort {:.4} <= min_effort {:.4}",
                    budgets.effort, profile.min_effort
                ),
            );
        }
        if dynamics.history.is_full()
            && dynamics.history.mean_reward() < profile.stagnation_reward_ceiling
            && dynamics.history.mean_drain() > profile.stagnation_effort_floor
        {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::Stagnation,
                format!(
                    "stagnation: mean reward {:.4} below ceiling {:.4} with mean drain {:.4} over {} steps",
                    dynamics.history.mean_reward(),
                    profile.stagnation_reward_ceiling,
                    dynamics.history.mean_drain(),
                    profile.stagnation_window
                ),
            );
        }
        if step_index >= profile.max_steps {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::External,
                format!(
                    "step cap reached: step {} >= max_steps {}",
                    step_index, profile.max_steps
                ),
            );
        }
        if trust_collapsed {
            return Decision::halt(
                step_index,
                budgets,
                FailureKind::TrustCollapse,
                format!(
                    "trust below {:.4} for {} consecutive steps",
                    profile.trust_epsilon, profile.trust_collapse_window
                ),
            );
        }

        Decision::go(step_index, budgets)
    }

    fn commit(&mut self, candidate: Candidate) -> Decision {
        let Candidate {
            step_index,
            dynamics,
            low_trust_streak,
            decision,
        } = candidate;

        // A candidate must not revive a halted kernel; reset() is the only
        // way back. Checked at the commit point, paired with the budget
        // monotonicity check in classify().
        let decision = match self
            .contracts
            .check_halt_irreversibility(self.terminal.is_some(), decision.halted)
        {
            Ok(()) => decision,
            Err(violation) => Decision::halt(
                step_index,
                dynamics.budgets,
                FailureKind::External,
                format!("{violation}"),
            ),
        };

        self.step_index = step_index;
        self.dynamics = dynamics;
        self.low_trust_streak = low_trust_streak;
        if decision.halted {
            self.terminal = Some(decision.clone());
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{verify_entries, MemoryAuditLog};

    fn kernel() -> Kernel {
        Kernel::with_contracts("agent-test", Profile::balanced(), ContractEnforcer::disabled())
            .unwrap()
    }

    #[test]
    fn step_index_is_strictly_increasing() {
        let mut k = kernel();
        for expected in 1..=5 {
            let d = k.step(Signals::new(0.6, 0.1, 0.0));
            assert_eq!(d.step, expected);
            assert!(!d.halted);
        }
    }

    #[test]
    fn halt_is_terminal_and_cached() {
        let mut k = Kernel::with_contracts(
            "agent-test",
            Profile {
                max_steps: 2,
                ..Profile::balanced()
            },
            ContractEnforcer::disabled(),
        )
        .unwrap();
        assert!(!k.step(Signals::new(0.5, 0.0, 0.0)).halted);
        let halt = k.step(Signals::new(0.5, 0.0, 0.0));
        assert!(halt.halted);
        assert_eq!(halt.failure, Some(FailureKind::External));
        // Every further step returns the identical terminal decision.
        for _ in 0..3 {
            assert_eq!(k.step(Signals::new(1.0, 0.0, 0.0)), halt);
        }
        assert_eq!(k.step_index(), 2);
    }

    #[test]
    fn reset_is_the_only_way_back() {
        let mut k = Kernel::with_contracts(
            "agent-test",
            Profile {
                max_steps: 1,
                ..Profile::balanced()
            },
            ContractEnforcer::disabled(),
        )
        .unwrap();
        assert!(k.step(Signals::idle()).halted);
        assert!(k.is_halted());
        k.reset();
        assert!(!k.is_halted());
        assert_eq!(k.step_index(), 0);
        assert_eq!(k.budgets(), Budgets::initial());
        assert!(!k.step(Signals::new(0.5, 0.0, 0.0)).halted);
    }

    #[test]
    fn preempt_halts_without_mechanics() {
        let mut k = kernel();
        let budgets_before = k.budgets();
        let d = k.preempt(FailureKind::External, String::from("cascade from peer:OVERRISK"));
        assert!(d.halted);
        assert_eq!(d.budgets, budgets_before);
        assert_eq!(d.step, 1);
        // Idempotent.
        let again = k.preempt(FailureKind::Overrisk, String::from("ignored"));
        assert_eq!(again, d);
    }

    #[test]
    fn arithmetic_fault_halts_external() {
        let mut k = Kernel::with_contracts(
            "agent-test",
            Profile {
                frustration_gain: f64::MAX,
                effort_drain_per_frustration: 0.0,
                ..Profile::balanced()
            },
            ContractEnforcer::disabled(),
        )
        .unwrap();
        // First step leaves frustration at f64::MAX (finite); the second
        // overflows it to infinity, which must be caught, not compared.
        let first = k.step(Signals::idle());
        assert!(!first.halted);
        let second = k.step(Signals::idle());
        assert!(second.halted);
        assert_eq!(second.failure, Some(FailureKind::External));
        assert!(second.reason.as_deref().unwrap().contains("arithmetic"));
    }

    #[test]
    fn safety_takes_priority_over_external() {
        // Exploration cap and step cap trip on the same step; SAFETY is
        // classified first.
        let profile = Profile {
            max_steps: 1,
            max_exploration: 0.5,
            exploration_gain: 0.5,
            exploration_overflow: 0.5,
            exploration_decay: 0.0,
            ..Profile::balanced()
        };
        let mut k =
            Kernel::with_contracts("agent-test", profile, ContractEnforcer::disabled()).unwrap();
        let d = k.step(Signals::new(0.5, 1.0, 0.0));
        assert!(d.halted);
        assert_eq!(d.failure, Some(FailureKind::Safety));
    }

    #[test]
    fn audited_step_commits_with_the_entry() {
        let mut k = kernel();
        let mut recorder = AuditRecorder::with_clock(MemoryAuditLog::new(), || 7);
        let d = k
            .step_audited(
                "search",
                &serde_json::json!({"q": "logs"}),
                Signals::new(0.4, 0.1, 0.0),
                &mut recorder,
            )
            .unwrap();
        assert!(!d.halted);
        assert_eq!(recorder.entries_written(), 1);
        let entries = recorder.sink().entries();
        assert_eq!(entries[0].step, 1);
        assert_eq!(entries[0].agent_id, "agent-test");
        assert!(verify_entries(entries).valid);
    }

    #[test]
    fn audited_step_records_repeated_terminal_decisions() {
        let mut k = Kernel::with_contracts(
            "agent-test",
            Profile {
                max_steps: 1,
                ..Profile::balanced()
            },
            ContractEnforcer::disabled(),
        )
        .unwrap();
        let mut recorder = AuditRecorder::with_clock(MemoryAuditLog::new(), || 7);
        let params = serde_json::json!({});
        let first = k
            .step_audited("a", &params, Signals::idle(), &mut recorder)
            .unwrap();
        let second = k
            .step_audited("b", &params, Signals::idle(), &mut recorder)
            .unwrap();
        assert!(first.halted);
        assert_eq!(first, second);
        assert_eq!(recorder.entries_written(), 2);
    }

    #[test]
    fn enabled_contracts_accept_well_behaved_mechanics() {
        let mut k =
            Kernel::with_contracts("agent-test", Profile::balanced(), ContractEnforcer::enabled())
                .unwrap();
        let mut terminal = None;
        for _ in 0..200 {
            let d = k.step(Signals::new(0.5, 0.2, 0.1));
            assert_ne!(
                d.reason.as_deref().map(|r| r.contains("contract violation")),
                Some(true)
            );
            if d.halted {
                terminal = Some(d);
                break;
            }
        }
        let terminal = terminal.expect("balanced profile halts within its step cap");
        // Replays of the terminal decision never trip the irreversibility
        // check on the legitimate path.
        for _ in 0..3 {
            assert_eq!(k.step(Signals::new(0.9, 0.0, 0.0)), terminal);
        }
    }

    #[test]
    fn halt_reversal_candidate_is_forced_to_external() {
        let mut k =
            Kernel::with_contracts("agent-test", Profile::balanced(), ContractEnforcer::enabled())
                .unwrap();
        k.preempt(FailureKind::Overrisk, String::from("shared pool denied risk"));
        assert!(k.is_halted());

        // step() replays the cached terminal decision before ever building a
        // candidate, so drive the commit checkpoint directly with a running
        // candidate — exactly what a kernel-internal bug would hand it.
        let candidate = k.compute(Signals::new(0.9, 0.0, 0.0));
        assert!(!candidate.decision.halted);
        let committed = k.commit(candidate);

        assert!(committed.halted);
        assert_eq!(committed.failure, Some(FailureKind::External));
        assert!(committed
            .reason
            .as_deref()
            .unwrap()
            .contains("HALT_IS_TERMINAL"));
        assert!(k.is_halted());
    }
}
