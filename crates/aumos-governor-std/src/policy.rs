// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! YAML policy files → validated [`Profile`]s.
//!
//! A policy file is a mapping with three sections, each optional, keyed
//! exactly as below; unknown keys anywhere are rejected (fail-closed):
//!
//! ```yaml
//! limits:     { max_steps: 100, max_risk: 0.8, min_effort: 0.0, max_exploration: 1.0 }
//! stagnation: { window: 10, effort_floor: 0.005, reward_ceiling: 0.05 }
//! rates:      { effort_drain_base: 0.01, risk_gain_per_novelty: 0.05 }
//! ```
//!
//! Missing keys fall back to the BALANCED preset, and the assembled profile
//! must pass [`Profile::validate`] before it is handed out.

use std::path::Path;

use serde::Deserialize;

use aumos_governor_core::{Profile, ProfileError};

/// Errors loading or validating a policy file.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The file could not be read.
    #[error("failed to read policy file \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The YAML did not match the policy schema (includes unknown keys).
    #[error("failed to parse policy: {source}")]
    Yaml {
        #[source]
        source: serde_yaml::Error,
    },
    /// The assembled profile failed validation.
    #[error("policy produced an invalid profile: {source}")]
    Invalid {
        #[source]
        source: ProfileError,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    #[serde(default)]
    limits: Limits,
    #[serde(default)]
    stagnation: Stagnation,
    #[serde(default)]
    rates: Rates,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Limits {
    max_steps: Option<u64>,
    max_risk: Option<f64>,
    min_effort: Option<f64>,
    max_exploration: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Stagnation {
    window: Option<usize>,
    effort_floor: Option<f64>,
    reward_ceiling: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Rates {
    effort_drain_base: Option<f64>,
    effort_drain_per_frustration: Option<f64>,
    frustration_gain: Option<f64>,
    frustration_decay: Option<f64>,
    urgency_decay: Option<f64>,
    uncertainty_gain: Option<f64>,
    uncertainty_decay: Option<f64>,
    risk_gain_per_novelty: Option<f64>,
    risk_gain_per_urgency: Option<f64>,
    persistence_loss: Option<f64>,
    persistence_gain: Option<f64>,
    exploration_gain: Option<f64>,
    exploration_decay: Option<f64>,
    exploration_overflow: Option<f64>,
    trust_dampening: Option<f64>,
    trust_epsilon: Option<f64>,
    trust_collapse_window: Option<u32>,
}

/// Load a policy file from disk and assemble a validated profile.
///
/// # Errors
///
/// [`PolicyError::Io`] when the file cannot be read, [`PolicyError::Yaml`]
/// for schema violations (unknown keys included), [`PolicyError::Invalid`]
/// when the resulting profile fails validation.
pub fn load_policy<P: AsRef<Path>>(path: P) -> Result<Profile, PolicyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_policy(&text)
}

/// Parse policy YAML already in memory.
pub fn parse_policy(yaml: &str) -> Result<Profile, PolicyError> {
    let file: PolicyFile =
        serde_yaml::from_str(yaml).map_err(|source| PolicyError::Yaml { source })?;

    let base = Profile::balanced();
    let profile = Profile {
        name: "policy".into(),
        max_steps: file.limits.max_steps.unwrap_or(base.max_steps),
        max_risk: file.limits.max_risk.unwrap_or(base.max_risk),
        min_effort: file.limits.min_effort.unwrap_or(base.min_effort),
        max_exploration: file.limits.max_exploration.unwrap_or(base.max_exploration),
        stagnation_window: file.stagnation.window.unwrap_or(base.stagnation_window),
        stagnation_effort_floor: file
            .stagnation
            .effort_floor
            .unwrap_or(base.stagnation_effort_floor),
        stagnation_reward_ceiling: file
            .stagnation
            .reward_ceiling
            .unwrap_or(base.stagnation_reward_ceiling),
        effort_drain_base: file.rates.effort_drain_base.unwrap_or(base.effort_drain_base),
        effort_drain_per_frustration: file
            .rates
            .effort_drain_per_frustration
            .unwrap_or(base.effort_drain_per_frustration),
        frustration_gain: file.rates.frustration_gain.unwrap_or(base.frustration_gain),
        frustration_decay: file.rates.frustration_decay.unwrap_or(base.frustration_decay),
        urgency_decay: file.rates.urgency_decay.unwrap_or(base.urgency_decay),
        uncertainty_gain: file.rates.uncertainty_gain.unwrap_or(base.uncertainty_gain),
        uncertainty_decay: file.rates.uncertainty_decay.unwrap_or(base.uncertainty_decay),
        risk_gain_per_novelty: file
            .rates
            .risk_gain_per_novelty
            .unwrap_or(base.risk_gain_per_novelty),
        risk_gain_per_urgency: file
            .rates
            .risk_gain_per_urgency
            .unwrap_or(base.risk_gain_per_urgency),
        persistence_loss: file.rates.persistence_loss.unwrap_or(base.persistence_loss),
        persistence_gain: file.rates.persistence_gain.unwrap_or(base.persistence_gain),
        exploration_gain: file.rates.exploration_gain.unwrap_or(base.exploration_gain),
        exploration_decay: file.rates.exploration_decay.unwrap_or(base.exploration_decay),
        exploration_overflow: file
            .rates
            .exploration_overflow
            .unwrap_or(base.exploration_overflow),
        trust_dampening: file.rates.trust_dampening.unwrap_or(base.trust_dampening),
        trust_epsilon: file.rates.trust_epsilon.unwrap_or(base.trust_epsilon),
        trust_collapse_window: file
            .rates
            .trust_collapse_window
            .unwrap_or(base.trust_collapse_window),
    };

    profile
        .validate()
        .map_err(|source| PolicyError::Invalid { source })?;
    Ok(profile)
}
