// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Tamper-evidence tests over the durable JSONL audit log: a governed run
//! is recorded, the file is verified, then a single byte of a recorded
//! decision is flipped and the verification names the tampered record.

use aumos_governor_core::{ContractEnforcer, Kernel, Profile, Signals};
use aumos_governor_std::JsonlAuditLog;

/// Drive a kernel to its exhaustion halt with every decision recorded.
fn run_exhaustion_scenario(path: &std::path::Path) -> u64 {
    let mut kernel =
        Kernel::with_contracts("agent-tamper", Profile::balanced(), ContractEnforcer::disabled())
            .unwrap();
    let mut recorder = JsonlAuditLog::open(path).unwrap().into_recorder();

    let mut steps = 0;
    for _ in 0..50 {
        let decision = kernel
            .step_audited(
                "retry_fetch",
                &serde_json::json!({"attempt": steps}),
                Signals::new(0.0, 0.0, 0.1),
                &mut recorder,
            )
            .unwrap();
        steps += 1;
        if decision.halted {
            break;
        }
    }
    recorder.entries_written()
}

#[test]
fn untampered_run_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let written = run_exhaustion_scenario(&path);
    assert!(written > 1);

    let check = JsonlAuditLog::verify_file(&path).unwrap();
    assert!(check.valid);
    assert_eq!(check.error_seq, None);
}

#[test]
fn flipped_decision_byte_is_detected_at_its_seq() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let written = run_exhaustion_scenario(&path);

    // Flip the halted flag inside one mid-chain record.
    let tampered_seq = (written / 2).max(1);
    let text = std::fs::read_to_string(&path).unwrap();
    let mutated: Vec<String> = text
        .lines()
        .enumerate()
        .map(|(index, line)| {
            if index as u64 == tampered_seq {
                line.replacen("\"halted\":false", "\"halted\":true", 1)
            } else {
                line.to_string()
            }
        })
        .collect();
    let mutated_text = mutated.join("\n") + "\n";
    assert_ne!(text, mutated_text, "tampering must actually change a byte");
    std::fs::write(&path, mutated_text).unwrap();

    let check = JsonlAuditLog::verify_file(&path).unwrap();
    assert!(!check.valid);
    assert_eq!(check.error_seq, Some(tampered_seq));
}

#[test]
fn inserted_record_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    run_exhaustion_scenario(&path);

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = text.lines().collect();
    // Replay the first record in the middle of the chain.
    let duplicate = lines[0];
    lines.insert(2, duplicate);
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    let check = JsonlAuditLog::verify_file(&path).unwrap();
    assert!(!check.valid);
    assert_eq!(check.error_seq, Some(0));
}

#[test]
fn truncated_chain_tail_still_verifies_as_prefix() {
    // Dropping a suffix leaves a valid prefix — tamper evidence covers
    // rewrites and removals inside the chain, while the head hash pins the
    // expected length externally.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    run_exhaustion_scenario(&path);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    std::fs::write(&path, lines[..lines.len() - 1].join("\n") + "\n").unwrap();

    let check = JsonlAuditLog::verify_file(&path).unwrap();
    assert!(check.valid);
}
