//! Read side of the audit log: segment listing, queries, chain verification.
//!
//! `AuditReader` works on a directory without opening a writer: it never
//! creates files and never needs to recover the chain head, so a segment
//! whose last line is corrupt can still be verified. `AuditLog` exposes the
//! same operations and takes its writer lock for the duration of a scan so a
//! rotation can never move a segment out from under it.

use std::path::{Path, PathBuf};

use tracing::warn;

use warden_contracts::{
    audit::{AuditEntry, ChainVerification, QueryFilter},
    error::{GovernanceError, GovernanceResult},
};

use crate::{chain::verify_lines, log::AuditLog, segment};

// ── Read-only reader ──────────────────────────────────────────────────────────

/// Read-only view over an existing audit directory.
#[derive(Debug, Clone)]
pub struct AuditReader {
    dir: PathBuf,
}

impl AuditReader {
    /// Returns `GovernanceError::AuditUnavailable` if `dir` is not an
    /// existing directory. Nothing is created.
    pub fn open(dir: impl AsRef<Path>) -> GovernanceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(GovernanceError::AuditUnavailable {
                segment: dir.display().to_string(),
                reason: "no such audit directory".to_string(),
            });
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn segments(&self) -> GovernanceResult<Vec<String>> {
        segment::list_segments(&self.dir)
    }

    pub fn query(&self, filter: &QueryFilter) -> GovernanceResult<Vec<AuditEntry>> {
        query_dir(&self.dir, filter)
    }

    pub fn verify_chain(&self, segment_name: &str) -> GovernanceResult<ChainVerification> {
        verify_segment(&self.dir, segment_name)
    }

    pub fn verify_current(&self) -> GovernanceResult<ChainVerification> {
        self.verify_chain(segment::CURRENT_SEGMENT)
    }

    pub fn verify_all(&self) -> GovernanceResult<Vec<ChainVerification>> {
        self.segments()?
            .iter()
            .map(|name| self.verify_chain(name))
            .collect()
    }
}

// ── Locked access through the writer ──────────────────────────────────────────

impl AuditLog {
    /// Every segment name, archived segments first, in chronological order.
    pub fn segments(&self) -> GovernanceResult<Vec<String>> {
        let _state = self.lock();
        segment::list_segments(self.dir())
    }

    /// Entries matching `filter` across every segment, oldest first.
    ///
    /// Malformed lines are skipped. A missing log directory or an unreadable
    /// segment is an error, never an empty result.
    pub fn query(&self, filter: &QueryFilter) -> GovernanceResult<Vec<AuditEntry>> {
        let _state = self.lock();
        query_dir(self.dir(), filter)
    }

    /// Replay one segment's hash chain.
    ///
    /// Returns `Err(AuditUnavailable)` when the segment cannot be read; a
    /// readable segment always yields a `ChainVerification`, valid or not.
    pub fn verify_chain(&self, segment_name: &str) -> GovernanceResult<ChainVerification> {
        let _state = self.lock();
        verify_segment(self.dir(), segment_name)
    }

    /// Verify the active segment.
    pub fn verify_current(&self) -> GovernanceResult<ChainVerification> {
        self.verify_chain(segment::CURRENT_SEGMENT)
    }

    /// Verify every segment independently, in chronological order.
    pub fn verify_all(&self) -> GovernanceResult<Vec<ChainVerification>> {
        let names = self.segments()?;
        names.iter().map(|name| self.verify_chain(name)).collect()
    }
}

// ── Directory scans ───────────────────────────────────────────────────────────

fn query_dir(dir: &Path, filter: &QueryFilter) -> GovernanceResult<Vec<AuditEntry>> {
    let mut matched = Vec::new();

    for name in segment::list_segments(dir)? {
        for (line_no, line) in segment::read_lines(dir, &name)?.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) if filter.matches(&entry) => matched.push(entry),
                Ok(_) => {}
                Err(e) => {
                    warn!(segment = %name, line = line_no + 1, error = %e, "skipping malformed audit line");
                }
            }
        }
    }

    Ok(matched)
}

fn verify_segment(dir: &Path, segment_name: &str) -> GovernanceResult<ChainVerification> {
    segment::validate_name(segment_name)?;
    let lines = segment::read_lines(dir, segment_name)?;
    let result = verify_lines(segment_name, lines);
    if !result.valid {
        warn!(
            segment = %segment_name,
            index = ?result.broken_at_index,
            error = ?result.error,
            "audit chain verification failed"
        );
    }
    Ok(result)
}
