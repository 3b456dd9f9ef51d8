// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Shared data types used across all governor sub-systems.
//!
//! All wire-visible types implement [`Clone`], [`Debug`], [`serde::Serialize`],
//! and [`serde::Deserialize`]. Struct fields are declared in lexicographic
//! order on purpose: the audit chain hashes the `serde_json` rendering of
//! these types, and declaration order is what fixes the canonical byte form.

use alloc::string::String;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Per-step input signals describing the agent's last observed step.
///
/// All values live in `[0, 1]`. Out-of-range values are saturated — not
/// rejected — at evaluation time, so a caller can pass raw measurements.
///
/// `trust` defaults to `1.0` when omitted (both in [`Signals::new`] and on
/// the wire). A NaN trust is treated as `0.0` at evaluation time: an
/// unverifiable source must never unlock budget headroom.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::Signals;
///
/// let s = Signals::new(0.5, 0.2, 0.1);
/// assert_eq!(s.trust, 1.0);
///
/// let distrusted = Signals::new(0.5, 0.2, 0.1).with_trust(0.0);
/// assert_eq!(distrusted.trust, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Signals {
    /// Newly discovered information.
    #[serde(default)]
    pub novelty: f64,
    /// Observed progress toward the goal.
    #[serde(default)]
    pub reward: f64,
    /// Credibility of the signal source.
    #[serde(default = "default_trust")]
    pub trust: f64,
    /// External time/deadline pressure.
    #[serde(default)]
    pub urgency: f64,
}

fn default_trust() -> f64 {
    1.0
}

impl Signals {
    /// Build a signal record with full trust.
    pub fn new(reward: f64, novelty: f64, urgency: f64) -> Self {
        Self {
            novelty,
            reward,
            trust: 1.0,
            urgency,
        }
    }

    /// Replace the trust component.
    pub fn with_trust(mut self, trust: f64) -> Self {
        self.trust = trust;
        self
    }

    /// A zeroed record with full trust — the "nothing happened" observation.
    pub fn idle() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Signals after clamping and trust gating — the only form the mechanics
/// ever see. Produced exclusively by [`crate::eval::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveSignals {
    /// `novelty * gate(trust)`.
    pub novelty: f64,
    /// `reward * gate(trust)`.
    pub reward: f64,
    /// Clamped trust after NaN fail-closing.
    pub trust: f64,
    /// Urgency passes ungated — negative feedback must not be dampened.
    pub urgency: f64,
}

// ---------------------------------------------------------------------------
// Pressures
// ---------------------------------------------------------------------------

/// Unbounded-above stress accumulators, clamped at zero below.
///
/// Pressures drive budget decay; they are internal state and never gate an
/// action directly.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pressures {
    /// Grows with low reward, decays with reward.
    pub frustration: f64,
    /// Leaky integral of urgency over time.
    pub urgency_acc: f64,
    /// Grows when novelty is high with low reward.
    pub uncertainty: f64,
}

impl Pressures {
    /// `true` when every accumulator is a finite number.
    pub fn is_finite(&self) -> bool {
        self.frustration.is_finite()
            && self.urgency_acc.is_finite()
            && self.uncertainty.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

/// Bounded `[0, 1]` resources gating continued action.
///
/// `risk` has inverse sense: it starts at `1.0` and decreases as risk is
/// consumed; the consumed amount is `1.0 - risk`. The governor halts when
/// consumed risk exceeds the profile's `max_risk`.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::Budgets;
///
/// let b = Budgets::initial();
/// assert_eq!(b.effort, 1.0);
/// assert_eq!(b.consumed_risk(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Budgets {
    /// Fuel for continued action.
    pub effort: f64,
    /// Capacity to pursue novelty.
    pub exploration: f64,
    /// Willingness to continue through failure.
    pub persistence: f64,
    /// Remaining risk allowance (inverse sense).
    pub risk: f64,
}

impl Budgets {
    /// Budgets at kernel construction and after [`crate::Kernel::reset`].
    ///
    /// Exploration starts at the midpoint so that the SAFETY cap measures
    /// accumulated novelty-seeking rather than the starting allocation.
    pub fn initial() -> Self {
        Self {
            effort: 1.0,
            exploration: 0.5,
            persistence: 1.0,
            risk: 1.0,
        }
    }

    /// Risk consumed so far: `1.0 - risk`.
    pub fn consumed_risk(&self) -> f64 {
        1.0 - self.risk
    }

    /// `true` when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.effort.is_finite()
            && self.exploration.is_finite()
            && self.persistence.is_finite()
            && self.risk.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Failure classification
// ---------------------------------------------------------------------------

/// Typed classification attached to every HALT decision.
///
/// Serializes as the upper-case wire strings used throughout the audit log
/// and the HTTP surface.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::FailureKind;
///
/// assert_eq!(FailureKind::Overrisk.as_str(), "OVERRISK");
/// assert_eq!(FailureKind::from_str("STAGNATION"), Some(FailureKind::Stagnation));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Exploration exceeded the configured cap.
    Safety,
    /// Consumed risk exceeded `max_risk`.
    Overrisk,
    /// Effort depleted to or below `min_effort`.
    Exhaustion,
    /// Cycle detected: a full window of sub-ceiling rewards with steady drain.
    Stagnation,
    /// Step cap reached, arithmetic fault, contract violation, or cascade.
    External,
    /// Sustained near-zero trust in the signal source.
    TrustCollapse,
}

impl FailureKind {
    /// The wire string for this failure kind.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Safety => "SAFETY",
            FailureKind::Overrisk => "OVERRISK",
            FailureKind::Exhaustion => "EXHAUSTION",
            FailureKind::Stagnation => "STAGNATION",
            FailureKind::External => "EXTERNAL",
            FailureKind::TrustCollapse => "TRUST_COLLAPSE",
        }
    }

    /// Parse a wire string back into a [`FailureKind`].
    ///
    /// Returns `None` for anything that is not one of the six wire strings.
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "SAFETY" => Some(FailureKind::Safety),
            "OVERRISK" => Some(FailureKind::Overrisk),
            "EXHAUSTION" => Some(FailureKind::Exhaustion),
            "STAGNATION" => Some(FailureKind::Stagnation),
            "EXTERNAL" => Some(FailureKind::External),
            "TRUST_COLLAPSE" => Some(FailureKind::TrustCollapse),
            _ => None,
        }
    }
}

impl core::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// The kernel's per-step output: GO or HALT with a typed failure.
///
/// Decisions are plain data. Two kernels with identical profiles fed the
/// same signal sequence produce equal decision sequences — `PartialEq` is
/// derived so the determinism guarantee is directly assertable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Budget snapshot after the step (frozen at the halting step).
    pub budgets: Budgets,
    /// Failure classification; always present when `halted` is `true`.
    pub failure: Option<FailureKind>,
    /// `true` means the boundary must refuse to execute.
    pub halted: bool,
    /// Human-readable explanation naming the violated threshold and the
    /// observed value. `None` on GO.
    pub reason: Option<String>,
    /// Step index this decision was produced at.
    pub step: u64,
}

impl Decision {
    /// Build a GO decision.
    pub fn go(step: u64, budgets: Budgets) -> Self {
        Self {
            budgets,
            failure: None,
            halted: false,
            reason: None,
            step,
        }
    }

    /// Build a HALT decision.
    pub fn halt(step: u64, budgets: Budgets, failure: FailureKind, reason: String) -> Self {
        Self {
            budgets,
            failure: Some(failure),
            halted: true,
            reason: Some(reason),
            step,
        }
    }
}
