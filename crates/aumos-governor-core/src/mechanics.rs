// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Deterministic update rules for pressures, budgets, and history.
//!
//! [`advance`] applies the per-step update in a fixed order — swapping any
//! two steps changes results, so the order below is part of the contract:
//!
//! 1. frustration
//! 2. urgency accumulator
//! 3. uncertainty
//! 4. effort (drained by the frustration computed in step 1)
//! 5. risk
//! 6. persistence
//! 7. exploration
//! 8. history push
//!
//! No randomness, no wall-clock reads, 64-bit float arithmetic throughout.
//! Threshold comparisons elsewhere use exact equality against configured
//! values; nothing here introduces tolerances.

use alloc::collections::VecDeque;

use crate::profile::Profile;
use crate::types::{Budgets, EffectiveSignals, Pressures};

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Ring buffer of the last `stagnation_window` effective rewards and effort
/// drains. Used solely by the stagnation detector.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    window: usize,
    rewards: VecDeque<f64>,
    drains: VecDeque<f64>,
}

impl History {
    /// Create an empty history with the given window.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            rewards: VecDeque::with_capacity(window),
            drains: VecDeque::with_capacity(window),
        }
    }

    /// Record one step, dropping the oldest sample beyond the window.
    pub fn push(&mut self, reward: f64, drain: f64) {
        if self.rewards.len() == self.window {
            self.rewards.pop_front();
            self.drains.pop_front();
        }
        self.rewards.push_back(reward);
        self.drains.push_back(drain);
    }

    /// `true` once a full window of samples has accumulated.
    pub fn is_full(&self) -> bool {
        self.rewards.len() == self.window
    }

    /// Mean effective reward over the recorded samples.
    pub fn mean_reward(&self) -> f64 {
        mean(&self.rewards)
    }

    /// Mean per-step effort drain over the recorded samples.
    pub fn mean_drain(&self) -> f64 {
        mean(&self.drains)
    }

    /// Discard all samples.
    pub fn clear(&mut self) {
        self.rewards.clear();
        self.drains.clear();
    }
}

fn mean(samples: &VecDeque<f64>) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

// ---------------------------------------------------------------------------
// Advance
// ---------------------------------------------------------------------------

/// One step's worth of mutable kernel state, advanced out of place.
#[derive(Debug, Clone, PartialEq)]
pub struct Dynamics {
    pub pressures: Pressures,
    pub budgets: Budgets,
    pub history: History,
}

impl Dynamics {
    /// Fresh dynamics for a profile: zero pressures, initial budgets,
    /// empty history.
    pub fn initial(profile: &Profile) -> Self {
        Self {
            pressures: Pressures::default(),
            budgets: Budgets::initial(),
            history: History::new(profile.stagnation_window),
        }
    }
}

/// Apply the fixed-order update to `dynamics` in place.
///
/// Callers that need commit/rollback semantics clone first and swap after —
/// the kernel does exactly that.
pub fn advance(dynamics: &mut Dynamics, eff: EffectiveSignals, profile: &Profile) {
    let p = &mut dynamics.pressures;
    let b = &mut dynamics.budgets;

    // 1. Frustration: grows with missing reward, placated by reward.
    p.frustration = (p.frustration
        + profile.frustration_gain * (1.0 - eff.reward)
        - profile.frustration_decay * eff.reward)
        .max(0.0);

    // 2. Urgency accumulator: leaky integral of urgency.
    p.urgency_acc = p.urgency_acc * (1.0 - profile.urgency_decay) + eff.urgency;

    // 3. Uncertainty: unrewarded novelty accumulates, reward burns it down.
    p.uncertainty = (p.uncertainty
        + profile.uncertainty_gain * eff.novelty * (1.0 - eff.reward)
        - profile.uncertainty_decay * eff.reward)
        .max(0.0);

    // 4. Effort: drained by the frustration just computed.
    let previous_effort = b.effort;
    b.effort = (b.effort
        - profile.effort_drain_base
        - profile.effort_drain_per_frustration * p.frustration)
        .max(0.0);

    // 5. Risk: consumed by novelty and urgency (lower risk = more consumed).
    b.risk = (b.risk
        - profile.risk_gain_per_novelty * eff.novelty
        - profile.risk_gain_per_urgency * eff.urgency)
        .max(0.0);

    // 6. Persistence: eroded by frustration, restored by reward, bounded.
    b.persistence = (b.persistence - profile.persistence_loss * p.frustration
        + profile.persistence_gain * eff.reward)
        .clamp(0.0, 1.0);

    // 7. Exploration: novelty feeds it; flat decay; overflow headroom above
    //    the cap so the SAFETY predicate can observe the excursion.
    b.exploration = (b.exploration + profile.exploration_gain * eff.novelty
        - profile.exploration_decay)
        .clamp(0.0, profile.max_exploration + profile.exploration_overflow);

    // 8. History.
    dynamics
        .history
        .push(eff.reward, previous_effort - b.effort);
}
