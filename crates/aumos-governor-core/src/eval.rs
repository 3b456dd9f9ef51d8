// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Signal evaluation: clamping and trust gating.
//!
//! [`evaluate`] is a pure function from raw [`Signals`] to
//! [`EffectiveSignals`]. Out-of-range inputs are saturated into `[0, 1]`,
//! never rejected. Reward and novelty are gated by trust; urgency passes
//! ungated so that negative feedback reaches the mechanics even from a
//! distrusted source. NaN anywhere evaluates as `0.0` — a value the caller
//! could not measure must never widen budget headroom.

use crate::profile::Profile;
use crate::types::{EffectiveSignals, Signals};

/// Saturate a raw signal into `[0, 1]`, mapping NaN to `0.0`.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Transform raw signals into effective pressure inputs.
///
/// The trust gate factor is `clamp(1 - trust_dampening * (1 - trust), 0, 1)`;
/// with the preset dampening of `1.0` this reduces to plain multiplication
/// by trust.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{eval::evaluate, Profile, Signals};
///
/// let profile = Profile::balanced();
///
/// // A fully distrusted source: reward and novelty are gated to zero,
/// // urgency passes.
/// let eff = evaluate(Signals::new(1.0, 1.0, 0.7).with_trust(0.0), &profile);
/// assert_eq!(eff.reward, 0.0);
/// assert_eq!(eff.novelty, 0.0);
/// assert_eq!(eff.urgency, 0.7);
/// ```
pub fn evaluate(signals: Signals, profile: &Profile) -> EffectiveSignals {
    let reward = clamp_unit(signals.reward);
    let novelty = clamp_unit(signals.novelty);
    let urgency = clamp_unit(signals.urgency);
    let trust = clamp_unit(signals.trust);

    let gate = clamp_unit(1.0 - profile.trust_dampening * (1.0 - trust));

    EffectiveSignals {
        novelty: novelty * gate,
        reward: reward * gate,
        trust,
        urgency,
    }
}
