//! The file-backed audit log: an append-only, hash-chained JSONL store.
//!
//! All writes go through a single mutex-guarded section that computes the
//! hash, appends the line, flushes, and advances `last_hash`. Two entries
//! can therefore never claim the same predecessor, whatever the number of
//! concurrent callers.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use warden_contracts::{
    audit::{AuditEntry, PendingEntry},
    error::{GovernanceError, GovernanceResult},
};
use warden_core::{config::AuditConfig, traits::AuditSink};

use crate::{
    chain::hash_entry,
    sanitize::sanitize,
    segment::{self, CURRENT_SEGMENT},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct WriterState {
    /// `None` after a failed rotation or append, until the next append
    /// reopens the segment.
    writer: Option<BufWriter<File>>,
    /// Hash of the last entry in the active segment; `None` for a fresh one.
    last_hash: Option<String>,
    /// Bytes in the active segment.
    size: u64,
    next_sequence: u64,
}

// ── Public log ────────────────────────────────────────────────────────────────

/// Append-only audit log rooted at one directory.
pub struct AuditLog {
    dir: PathBuf,
    max_segment_bytes: u64,
    state: Mutex<WriterState>,
}

impl AuditLog {
    /// Open (or create) the log in `dir`.
    ///
    /// If an active segment already exists its last entry is read back so
    /// new entries chain onto it.
    pub fn open(dir: impl AsRef<Path>, max_segment_bytes: u64) -> GovernanceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| GovernanceError::AuditWriteFailed {
            reason: format!("failed to create audit directory '{}': {}", dir.display(), e),
        })?;

        let current = dir.join(CURRENT_SEGMENT);
        let last_hash = if current.exists() { read_last_hash(&dir)? } else { None };
        let next_sequence = segment::next_sequence(&segment::list_archives(&dir)?);
        let (writer, size) = segment::open_append(&current)?;

        info!(dir = %dir.display(), size, "audit log opened");

        Ok(Self {
            dir,
            max_segment_bytes,
            state: Mutex::new(WriterState {
                writer: Some(writer),
                last_hash,
                size,
                next_sequence,
            }),
        })
    }

    pub fn from_config(config: &AuditConfig) -> GovernanceResult<Self> {
        Self::open(&config.directory, config.max_segment_bytes)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hash of the most recent entry in the active segment.
    pub fn last_hash(&self) -> Option<String> {
        self.lock().last_hash.clone()
    }

    /// Stamp, sanitize, chain, and persist one entry. Returns what was written.
    ///
    /// Rotates first if the active segment has grown past
    /// `max_segment_bytes`; the entry then opens a fresh chain.
    pub fn append(&self, pending: PendingEntry) -> GovernanceResult<AuditEntry> {
        let mut state = self.lock();

        if state.size > self.max_segment_bytes {
            self.rotate(&mut state)?;
        }

        let mut entry = AuditEntry {
            entry_type: pending.entry_type,
            timestamp: Utc::now(),
            agent_id: pending.agent_id,
            action: pending.action,
            context: sanitize(pending.context),
            decision: sanitize(pending.decision),
            previous_hash: state.last_hash.clone(),
            hash: String::new(),
        };
        entry.hash = hash_entry(&entry);

        let line = serde_json::to_string(&entry).map_err(|e| GovernanceError::AuditWriteFailed {
            reason: format!("failed to serialize entry: {e}"),
        })?;

        let mut writer = match state.writer.take() {
            Some(writer) => writer,
            None => {
                let (writer, size) = segment::open_append(&self.dir.join(CURRENT_SEGMENT))?;
                state.size = size;
                writer
            }
        };
        let record = format!("{line}\n");
        if let Err(e) = writer.write_all(record.as_bytes()).and_then(|_| writer.flush()) {
            // The writer is dropped; reopening terminates any torn line.
            warn!(segment = CURRENT_SEGMENT, error = %e, "audit append failed");
            return Err(GovernanceError::AuditWriteFailed {
                reason: format!("failed to append to {CURRENT_SEGMENT}: {e}"),
            });
        }
        state.writer = Some(writer);

        state.size += record.len() as u64;
        state.last_hash = Some(entry.hash.clone());

        debug!(
            entry_type = %entry.entry_type,
            agent_id = %entry.agent_id,
            action = %entry.action,
            hash = %entry.hash,
            "audit entry appended"
        );

        Ok(entry)
    }

    /// Archive the active segment and start a fresh, unchained one.
    fn rotate(&self, state: &mut WriterState) -> GovernanceResult<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| GovernanceError::AuditWriteFailed {
                reason: format!("failed to flush before rotation: {e}"),
            })?;
        }

        let archived = segment::archive_name(state.next_sequence, Utc::now());
        fs::rename(self.dir.join(CURRENT_SEGMENT), self.dir.join(&archived)).map_err(|e| {
            GovernanceError::AuditWriteFailed {
                reason: format!("failed to archive {CURRENT_SEGMENT} as {archived}: {e}"),
            }
        })?;

        state.next_sequence += 1;
        state.last_hash = None;
        state.size = 0;
        state.writer = Some(segment::open_append(&self.dir.join(CURRENT_SEGMENT))?.0);

        info!(segment = %archived, "audit segment rotated");
        Ok(())
    }

    /// Poisoning is ignored: `last_hash` only advances after a successful flush.
    pub(crate) fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── AuditSink impl ────────────────────────────────────────────────────────────

impl AuditSink for AuditLog {
    fn record(&self, entry: PendingEntry) -> GovernanceResult<()> {
        self.append(entry).map(|_| ())
    }
}

/// The stored `hash` of the last entry in the active segment.
fn read_last_hash(dir: &Path) -> GovernanceResult<Option<String>> {
    let unavailable = |reason: String| GovernanceError::AuditUnavailable {
        segment: CURRENT_SEGMENT.to_string(),
        reason,
    };

    let file = File::open(dir.join(CURRENT_SEGMENT)).map_err(|e| unavailable(e.to_string()))?;
    let mut last_line: Option<String> = None;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| unavailable(e.to_string()))?;
        if !line.trim().is_empty() {
            last_line = Some(line);
        }
    }

    match last_line {
        None => Ok(None),
        Some(line) => serde_json::from_str::<AuditEntry>(&line)
            .map(|entry| Some(entry.hash))
            .map_err(|e| unavailable(format!("cannot recover chain head: {e}"))),
    }
}
