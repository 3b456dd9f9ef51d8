// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Prometheus observability for the proxy.
//!
//! One registry per proxy process: a step counter, a halts-by-reason
//! counter, and one gauge per budget. Rendered by the `GET /metrics`
//! endpoint in the standard text exposition format.

use aumos_governor_core::Decision;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Registry of governor metrics.
pub struct GovernorMetrics {
    registry: Registry,
    steps_total: IntCounter,
    halts_total: IntCounterVec,
    effort: Gauge,
    risk: Gauge,
    persistence: Gauge,
    exploration: Gauge,
}

impl GovernorMetrics {
    /// Create and register the full metric set.
    pub fn new() -> Self {
        let registry = Registry::new();

        let steps_total =
            IntCounter::new("governance_steps_total", "Total governor steps evaluated")
                .expect("valid metric definition");
        let halts_total = IntCounterVec::new(
            Opts::new("governance_halts_total", "Halt decisions served, by reason"),
            &["reason"],
        )
        .expect("valid metric definition");
        let effort = Gauge::new("governance_effort", "Current effort budget [0,1]")
            .expect("valid metric definition");
        let risk = Gauge::new("governance_risk", "Current remaining risk budget [0,1]")
            .expect("valid metric definition");
        let persistence = Gauge::new(
            "governance_persistence",
            "Current persistence budget [0,1]",
        )
        .expect("valid metric definition");
        let exploration = Gauge::new(
            "governance_exploration",
            "Current exploration budget [0,1]",
        )
        .expect("valid metric definition");

        for collector in [
            Box::new(steps_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(halts_total.clone()),
            Box::new(effort.clone()),
            Box::new(risk.clone()),
            Box::new(persistence.clone()),
            Box::new(exploration.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric names are unique within the registry");
        }

        Self {
            registry,
            steps_total,
            halts_total,
            effort,
            risk,
            persistence,
            exploration,
        }
    }

    /// Record one served decision.
    pub fn record_decision(&self, decision: &Decision) {
        self.steps_total.inc();
        self.effort.set(decision.budgets.effort);
        self.risk.set(decision.budgets.risk);
        self.persistence.set(decision.budgets.persistence);
        self.exploration.set(decision.budgets.exploration);
        if decision.halted {
            let reason = decision
                .failure
                .map(|failure| failure.as_str())
                .unwrap_or("UNKNOWN");
            self.halts_total.with_label_values(&[reason]).inc();
        }
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for GovernorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aumos_governor_core::{Budgets, FailureKind};

    #[test]
    fn records_steps_and_budgets() {
        let metrics = GovernorMetrics::new();
        let mut budgets = Budgets::initial();
        budgets.effort = 0.75;
        metrics.record_decision(&Decision::go(1, budgets));

        let text = metrics.render();
        assert!(text.contains("governance_steps_total 1"));
        assert!(text.contains("governance_effort 0.75"));
    }

    #[test]
    fn counts_halts_by_reason() {
        let metrics = GovernorMetrics::new();
        let halt = Decision::halt(
            3,
            Budgets::initial(),
            FailureKind::Overrisk,
            "consumed risk 0.81 exceeded max_risk 0.8".into(),
        );
        metrics.record_decision(&halt);
        metrics.record_decision(&halt);

        let text = metrics.render();
        assert!(text.contains("governance_halts_total{reason=\"OVERRISK\"} 2"));
    }
}
