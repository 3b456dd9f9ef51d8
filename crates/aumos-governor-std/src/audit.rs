// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! JSONL file persistence for the audit chain.
//!
//! [`JsonlAuditLog`] appends one canonical record per line and flushes
//! before acknowledging — an entry that is not on disk is never reported as
//! written, which is what lets the kernel treat an audit failure as a full
//! step rollback.
//!
//! The file is owned by exactly one writer process; concurrent writers are
//! a configuration error, not a supported mode.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use aumos_governor_core::audit::{
    genesis_hash, verify_entries, AuditEntry, AuditError, AuditRecorder, AuditSink,
    ChainVerification,
};

/// Errors opening, reading, or replaying an audit file.
#[derive(Debug, thiserror::Error)]
pub enum AuditFileError {
    /// The file could not be opened, read, or written.
    #[error("audit file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An existing record could not be parsed back.
    #[error("audit file {path} line {line}: malformed record: {detail}")]
    Malformed {
        path: PathBuf,
        line: usize,
        detail: String,
    },
}

/// Append-only JSONL [`AuditSink`].
///
/// Opening an existing file replays it to recover the chain head, so a
/// restarted process continues the same chain instead of forking it.
///
/// # Examples
///
/// ```rust,no_run
/// use aumos_governor_std::JsonlAuditLog;
///
/// let log = JsonlAuditLog::open("governor-audit.jsonl").unwrap();
/// assert_eq!(log.entries_written(), 0);
/// ```
pub struct JsonlAuditLog {
    path: PathBuf,
    file: File,
    next_seq: u64,
    head_hash: String,
}

impl JsonlAuditLog {
    /// Open `path` for appending, creating it when absent. An existing file
    /// is replayed to recover the sequence counter and head hash.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuditFileError> {
        let path = path.as_ref().to_path_buf();

        let mut next_seq = 0u64;
        let mut head_hash = genesis_hash();
        if path.exists() {
            let entries = Self::load_entries(&path)?;
            if let Some(last) = entries.last() {
                next_seq = last.seq + 1;
                head_hash = last.entry_hash.clone();
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditFileError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file,
            next_seq,
            head_hash,
        })
    }

    /// Entries already on disk when the log was opened, plus those appended
    /// since.
    pub fn entries_written(&self) -> u64 {
        self.next_seq
    }

    /// The file this log appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash of the newest record on disk (genesis hash for an empty file).
    pub fn head_hash(&self) -> &str {
        &self.head_hash
    }

    /// Consume the log into an [`AuditRecorder`] that continues the chain
    /// where the file left off.
    pub fn into_recorder(self) -> AuditRecorder<JsonlAuditLog> {
        let next_seq = self.next_seq;
        let head_hash = self.head_hash.clone();
        AuditRecorder::resume(self, next_seq, head_hash)
    }

    /// Read every record from an audit file.
    pub fn load_entries<P: AsRef<Path>>(path: P) -> Result<Vec<AuditEntry>, AuditFileError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| AuditFileError::Io {
            path: path.clone(),
            source,
        })?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| AuditFileError::Io {
                path: path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry =
                serde_json::from_str(&line).map_err(|error| AuditFileError::Malformed {
                    path: path.clone(),
                    line: index + 1,
                    detail: error.to_string(),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Verify a whole audit file.
    ///
    /// I/O failures come back as `Err` (the CLI maps them to exit 2); a
    /// readable but broken chain — including an unparseable record — comes
    /// back as an invalid [`ChainVerification`] naming the offending
    /// sequence number (exit 1).
    pub fn verify_file<P: AsRef<Path>>(path: P) -> Result<ChainVerification, std::io::Error> {
        match Self::load_entries(path) {
            Ok(entries) => Ok(verify_entries(&entries)),
            Err(AuditFileError::Io { source, .. }) => Err(source),
            Err(AuditFileError::Malformed { line, detail, .. }) => Ok(ChainVerification {
                valid: false,
                error_seq: Some(line.saturating_sub(1) as u64),
                error: Some(detail),
            }),
        }
    }
}

impl AuditSink for JsonlAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = serde_json::to_string(entry)
            .map_err(|error| AuditError::Serialize(error.to_string()))?;

        // Durable before acknowledged: the write and the flush both gate the
        // Ok. A failure here leaves the kernel step uncommitted.
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.write_all(b"\n"))
            .and_then(|_| self.file.flush())
            .map_err(|error| AuditError::Sink(error.to_string()))?;

        self.next_seq = entry.seq + 1;
        self.head_hash = entry.entry_hash.clone();
        Ok(())
    }
}

/// Resolve the audit file location: `GOVERNANCE_AUDIT_PATH` when set,
/// otherwise `default`.
pub fn audit_path_from_env<P: AsRef<Path>>(default: P) -> PathBuf {
    std::env::var_os("GOVERNANCE_AUDIT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| default.as_ref().to_path_buf())
}
