// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # Basic Runtime Governor Example
//!
//! Walks one governed agent through a productive phase, a stalled phase,
//! and the resulting terminal halt — with every decision recorded on the
//! hash chain. Run with:
//!
//! ```bash
//! cargo run --example basic
//! ```

use aumos_governor_core::{
    audit::{verify_entries, AuditRecorder, MemoryAuditLog},
    enforce, Kernel, Profile, Signals,
};

fn main() {
    println!("AumOS Runtime Governor — Basic Example\n");

    // -----------------------------------------------------------------------
    // 1. Construct the kernel
    // -----------------------------------------------------------------------
    let mut kernel = Kernel::new("agent-demo-001", Profile::balanced())
        .expect("preset profiles always validate");
    let mut recorder = AuditRecorder::new(MemoryAuditLog::new());

    // -----------------------------------------------------------------------
    // 2. A productive phase: steady reward keeps every budget healthy
    // -----------------------------------------------------------------------
    for step in 1..=5 {
        let signals = Signals::new(0.6, 0.2, 0.1);
        let decision = kernel
            .step_audited("fetch_page", &serde_json::json!({"step": step}), signals, &mut recorder)
            .expect("in-memory audit sink never fails");
        println!(
            "  step {:>2}: GO={} effort={:.3} consumed_risk={:.3}",
            decision.step,
            !decision.halted,
            decision.budgets.effort,
            decision.budgets.consumed_risk()
        );
    }

    // -----------------------------------------------------------------------
    // 3. The agent stalls: zero reward drains effort until the halt
    // -----------------------------------------------------------------------
    println!("\nAgent stops making progress:");
    let halt = loop {
        let decision = kernel
            .step_audited("retry_fetch", &serde_json::json!({}), Signals::new(0.0, 0.0, 0.2), &mut recorder)
            .expect("in-memory audit sink never fails");
        println!(
            "  step {:>2}: GO={} effort={:.3}",
            decision.step,
            !decision.halted,
            decision.budgets.effort
        );
        if decision.halted {
            break decision;
        }
    };
    println!(
        "\nHALT: {} — {}",
        halt.failure.map(|f| f.as_str()).unwrap_or("?"),
        halt.reason.as_deref().unwrap_or("")
    );

    // -----------------------------------------------------------------------
    // 4. The boundary refuses to execute anything further
    // -----------------------------------------------------------------------
    let blocked = enforce(&halt, || "this never runs");
    println!("enforce() after halt: {:?}", blocked.unwrap_err().failure);

    // -----------------------------------------------------------------------
    // 5. The audit chain stands up to verification
    // -----------------------------------------------------------------------
    let check = verify_entries(recorder.sink().entries());
    println!(
        "\nAudit chain: {} entries, valid={}, head={}...",
        recorder.entries_written(),
        check.valid,
        &recorder.head_hash()[..16]
    );
}
