// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Hash-chained, append-only audit log.
//!
//! Every kernel decision is recorded as one [`AuditEntry`]. Entries are
//! chained: `prev_hash` of entry *n* equals `entry_hash` of entry *n − 1*,
//! and the genesis entry's `prev_hash` is the 64-zero string. `entry_hash`
//! is the SHA-256 digest of the entry's canonical JSON with the
//! `entry_hash` field removed, so modifying any field of any entry breaks
//! the chain from that point on.
//!
//! Canonical form: struct fields are declared in lexicographic key order and
//! `serde_json` maps are sorted, so `serde_json::to_string` *is* the
//! canonical byte form — one record per line, keys sorted, no extra
//! whitespace.
//!
//! The log is **recording only**: there is no API to rewrite or remove an
//! entry. Persistence is pluggable through [`AuditSink`]; an entry that the
//! sink could not make durable is never acknowledged.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Budgets, Decision, FailureKind, Signals};

/// `prev_hash` of the first entry in every chain.
pub fn genesis_hash() -> String {
    "0".repeat(64)
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// The decision fields frozen into an audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionSnapshot {
    /// Budgets after the recorded step.
    pub budgets: Budgets,
    /// Failure classification when halted.
    pub failure: Option<FailureKind>,
    /// Whether the decision was HALT.
    pub halted: bool,
    /// Human-readable halt reason.
    pub reason: Option<String>,
}

impl DecisionSnapshot {
    /// Freeze a [`Decision`] into its audit form.
    pub fn of(decision: &Decision) -> Self {
        Self {
            budgets: decision.budgets,
            failure: decision.failure,
            halted: decision.halted,
            reason: decision.reason.clone(),
        }
    }
}

/// One immutable record of a governance decision.
///
/// Field declaration order matches lexicographic key order — that order is
/// load-bearing for the canonical byte form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditEntry {
    /// Name of the action the agent intended to take.
    pub action: String,
    /// Stable identifier of the governed agent.
    pub agent_id: String,
    /// Decision snapshot at the recorded step.
    pub decision: DecisionSnapshot,
    /// SHA-256 hex digest of this entry's canonical bytes (minus this field).
    pub entry_hash: String,
    /// Present only on the supplementary record appended when a permitted
    /// action later failed upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
    /// SHA-256 hex digest of the canonical serialization of the tool params.
    pub params_hash: String,
    /// `entry_hash` of the preceding record; 64 zeros on the genesis record.
    pub prev_hash: String,
    /// Strictly monotone sequence number, starting at 0.
    pub seq: u64,
    /// Raw signals submitted for the recorded step.
    pub signals: Signals,
    /// Kernel step index the decision was produced at.
    pub step: u64,
    /// Unix epoch milliseconds at which the record was appended.
    pub timestamp: u64,
}

/// Borrowed view hashed in place of the full entry: every field except
/// `entry_hash`, in the same canonical order.
#[derive(Serialize)]
struct HashableEntry<'a> {
    action: &'a str,
    agent_id: &'a str,
    decision: &'a DecisionSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_error: Option<&'a String>,
    params_hash: &'a str,
    prev_hash: &'a str,
    seq: u64,
    signals: &'a Signals,
    step: u64,
    timestamp: u64,
}

/// Recompute the hash an entry should carry.
pub fn compute_entry_hash(entry: &AuditEntry) -> Result<String, AuditError> {
    let hashable = HashableEntry {
        action: &entry.action,
        agent_id: &entry.agent_id,
        decision: &entry.decision,
        execution_error: entry.execution_error.as_ref(),
        params_hash: &entry.params_hash,
        prev_hash: &entry.prev_hash,
        seq: entry.seq,
        signals: &entry.signals,
        step: entry.step,
        timestamp: entry.timestamp,
    };
    let canonical = serde_json::to_string(&hashable)
        .map_err(|error| AuditError::Serialize(format!("{error}")))?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// SHA-256 hex digest of the canonical serialization of tool params.
pub fn params_hash(params: &serde_json::Value) -> Result<String, AuditError> {
    let canonical = serde_json::to_string(params)
        .map_err(|error| AuditError::Serialize(format!("{error}")))?;
    Ok(sha256_hex(canonical.as_bytes()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while recording or verifying audit entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The entry could not be serialized to its canonical form.
    Serialize(String),
    /// The sink could not make the entry durable.
    Sink(String),
}

impl core::fmt::Display for AuditError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuditError::Serialize(detail) => write!(f, "audit serialization failed: {detail}"),
            AuditError::Sink(detail) => write!(f, "audit sink failed: {detail}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AuditError {}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Pluggable persistence for audit entries.
///
/// `append` must make the entry durable before returning `Ok` — an entry
/// that is not durable is never acknowledged, and the kernel rolls the
/// step back on `Err`.
pub trait AuditSink {
    /// Persist one entry at the end of the log.
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError>;
}

impl<S: AuditSink + ?Sized> AuditSink for alloc::boxed::Box<S> {
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        (**self).append(entry)
    }
}

/// Volatile in-memory sink for tests and embedded use.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditLog {
    entries: Vec<AuditEntry>,
}

impl MemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries, in append order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Single-writer head of an audit chain.
///
/// Owns the sink, the next sequence number, the chain head hash, and the
/// millisecond clock. Exactly one recorder writes a given log; concurrent
/// writers are a configuration error.
///
/// # Examples
///
/// ```rust
/// use aumos_governor_core::{
///     audit::{verify_entries, AuditRecorder, MemoryAuditLog},
///     Budgets, Decision, Signals,
/// };
///
/// let mut recorder = AuditRecorder::with_clock(MemoryAuditLog::new(), || 42);
///
/// let decision = Decision::go(1, Budgets::initial());
/// recorder
///     .log("agent-001", "search", &serde_json::json!({"q": "rust"}),
///          Signals::new(0.5, 0.1, 0.0), &decision)
///     .unwrap();
///
/// let check = verify_entries(recorder.sink().entries());
/// assert!(check.valid);
/// ```
pub struct AuditRecorder<S> {
    sink: S,
    seq: u64,
    prev_hash: String,
    clock: fn() -> u64,
}

impl<S: AuditSink> AuditRecorder<S> {
    /// Start a fresh chain on `sink` using the system clock.
    pub fn new(sink: S) -> Self {
        Self::with_clock(sink, current_time_ms)
    }

    /// Start a fresh chain with an injected clock — used by tests and by
    /// hosts that need reproducible timestamps.
    pub fn with_clock(sink: S, clock: fn() -> u64) -> Self {
        Self {
            sink,
            seq: 0,
            prev_hash: genesis_hash(),
            clock,
        }
    }

    /// Resume an existing chain: `next_seq` entries already exist and the
    /// last of them carries `head_hash`.
    pub fn resume(sink: S, next_seq: u64, head_hash: String) -> Self {
        Self::resume_with_clock(sink, next_seq, head_hash, current_time_ms)
    }

    /// [`AuditRecorder::resume`] with an injected clock.
    pub fn resume_with_clock(sink: S, next_seq: u64, head_hash: String, clock: fn() -> u64) -> Self {
        Self {
            sink,
            seq: next_seq,
            prev_hash: head_hash,
            clock,
        }
    }

    /// Append one decision record.
    ///
    /// The entry is durable when this returns `Ok`; on `Err` nothing was
    /// acknowledged and the chain head is unchanged.
    pub fn log(
        &mut self,
        agent_id: &str,
        action: &str,
        params: &serde_json::Value,
        signals: Signals,
        decision: &Decision,
    ) -> Result<AuditEntry, AuditError> {
        self.append_entry(agent_id, action, params, signals, decision, None)
    }

    /// Append the supplementary record for a permitted action whose
    /// execution failed upstream. Carries the original decision unchanged
    /// plus the execution error text.
    pub fn log_execution_error(
        &mut self,
        agent_id: &str,
        action: &str,
        params: &serde_json::Value,
        signals: Signals,
        decision: &Decision,
        error: String,
    ) -> Result<AuditEntry, AuditError> {
        self.append_entry(agent_id, action, params, signals, decision, Some(error))
    }

    fn append_entry(
        &mut self,
        agent_id: &str,
        action: &str,
        params: &serde_json::Value,
        signals: Signals,
        decision: &Decision,
        execution_error: Option<String>,
    ) -> Result<AuditEntry, AuditError> {
        let mut entry = AuditEntry {
            action: action.into(),
            agent_id: agent_id.into(),
            decision: DecisionSnapshot::of(decision),
            entry_hash: String::new(),
            execution_error,
            params_hash: params_hash(params)?,
            prev_hash: self.prev_hash.clone(),
            seq: self.seq,
            signals,
            step: decision.step,
            timestamp: (self.clock)(),
        };
        entry.entry_hash = compute_entry_hash(&entry)?;

        // Durability first: the chain head only advances once the sink has
        // acknowledged the write.
        self.sink.append(&entry)?;
        self.prev_hash = entry.entry_hash.clone();
        self.seq += 1;
        Ok(entry)
    }

    /// Hash of the most recently acknowledged entry (genesis hash when
    /// the chain is empty).
    pub fn head_hash(&self) -> &str {
        &self.prev_hash
    }

    /// Number of entries acknowledged so far.
    pub fn entries_written(&self) -> u64 {
        self.seq
    }

    /// Borrow the underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Outcome of a chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    /// `true` iff every hash matches and every link holds.
    pub valid: bool,
    /// Sequence number of the first offending entry, when invalid.
    pub error_seq: Option<u64>,
    /// What was wrong, when invalid.
    pub error: Option<String>,
}

impl ChainVerification {
    fn ok() -> Self {
        Self {
            valid: true,
            error_seq: None,
            error: None,
        }
    }

    fn broken(seq: u64, error: String) -> Self {
        Self {
            valid: false,
            error_seq: Some(seq),
            error: Some(error),
        }
    }
}

/// Walk a chain in order, recomputing every hash and link.
///
/// Returns the lowest tampered sequence number on failure. An empty chain
/// is valid.
pub fn verify_entries(entries: &[AuditEntry]) -> ChainVerification {
    let mut expected_prev = genesis_hash();
    for entry in entries {
        if entry.prev_hash != expected_prev {
            return ChainVerification::broken(
                entry.seq,
                format!(
                    "prev_hash mismatch at seq {}: expected {}.., found {}..",
                    entry.seq,
                    &expected_prev[..16.min(expected_prev.len())],
                    &entry.prev_hash[..16.min(entry.prev_hash.len())]
                ),
            );
        }
        match compute_entry_hash(entry) {
            Ok(recomputed) if recomputed == entry.entry_hash => {}
            Ok(_) => {
                return ChainVerification::broken(
                    entry.seq,
                    format!("entry_hash mismatch at seq {}", entry.seq),
                );
            }
            Err(error) => {
                return ChainVerification::broken(
                    entry.seq,
                    format!("entry at seq {} not hashable: {error}", entry.seq),
                );
            }
        }
        expected_prev = entry.entry_hash.clone();
    }
    ChainVerification::ok()
}

/// Return current Unix epoch milliseconds (0 in `no_std` builds — inject a
/// clock through [`AuditRecorder::with_clock`] there).
fn current_time_ms() -> u64 {
    #[cfg(feature = "std")]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
    #[cfg(not(feature = "std"))]
    {
        0
    }
}
