//! On-disk segment layout.
//!
//! A log directory holds one active segment, `current.jsonl`, plus any
//! number of archived segments named `segment-{seq:06}-{UTC timestamp}.jsonl`.
//! The zero-padded sequence makes lexical order chronological.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use warden_contracts::error::{GovernanceError, GovernanceResult};

/// File name of the active segment.
pub const CURRENT_SEGMENT: &str = "current.jsonl";

const ARCHIVE_PREFIX: &str = "segment-";
const SEGMENT_SUFFIX: &str = ".jsonl";

pub(crate) fn archive_name(sequence: u64, at: DateTime<Utc>) -> String {
    format!(
        "{ARCHIVE_PREFIX}{sequence:06}-{}{SEGMENT_SUFFIX}",
        at.format("%Y%m%dT%H%M%S%.3fZ")
    )
}

fn is_archive(name: &str) -> bool {
    name.starts_with(ARCHIVE_PREFIX) && name.ends_with(SEGMENT_SUFFIX)
}

/// Archived segment names in chronological order.
pub(crate) fn list_archives(dir: &Path) -> GovernanceResult<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| GovernanceError::AuditUnavailable {
        segment: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| is_archive(name))
        .collect();
    names.sort();
    Ok(names)
}

/// Archived segments first, then the active segment if it exists.
pub(crate) fn list_segments(dir: &Path) -> GovernanceResult<Vec<String>> {
    let mut names = list_archives(dir)?;
    if dir.join(CURRENT_SEGMENT).exists() {
        names.push(CURRENT_SEGMENT.to_string());
    }
    Ok(names)
}

/// Sequence number the next archive should take.
pub(crate) fn next_sequence(archives: &[String]) -> u64 {
    archives
        .last()
        .and_then(|name| name.strip_prefix(ARCHIVE_PREFIX))
        .and_then(|rest| rest.split('-').next())
        .and_then(|seq| seq.parse::<u64>().ok())
        .map_or(1, |seq| seq + 1)
}

/// Segment names are bare file names; anything that could escape the log
/// directory is refused.
pub(crate) fn validate_name(segment: &str) -> GovernanceResult<()> {
    if segment.is_empty() || segment.contains(&['/', '\\'][..]) || segment.contains("..") {
        return Err(GovernanceError::AuditUnavailable {
            segment: segment.to_string(),
            reason: "invalid segment name".to_string(),
        });
    }
    Ok(())
}

/// Every line of a segment, blank lines included.
pub(crate) fn read_lines(dir: &Path, segment: &str) -> GovernanceResult<Vec<String>> {
    let unavailable = |e: std::io::Error| GovernanceError::AuditUnavailable {
        segment: segment.to_string(),
        reason: e.to_string(),
    };

    let file = File::open(dir.join(segment)).map_err(unavailable)?;
    BufReader::new(file)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(unavailable)
}

/// Open the segment at `path` for appending. Returns the writer and the
/// segment's size in bytes.
///
/// A segment that does not end in a newline holds a torn write; it is
/// terminated first so the next entry starts on its own line.
pub(crate) fn open_append(path: &Path) -> GovernanceResult<(BufWriter<File>, u64)> {
    let failed = |e: std::io::Error| GovernanceError::AuditWriteFailed {
        reason: format!("failed to open '{}': {}", path.display(), e),
    };

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(failed)?;
    let mut size = file.metadata().map_err(failed)?.len();

    if size > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(size - 1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(failed)?;
        if last[0] != b'\n' {
            file.write_all(b"\n").map_err(failed)?;
            size += 1;
        }
    }

    Ok((BufWriter::new(file), size))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn archive_names_sort_chronologically() {
        let t = Utc::now();
        let mut names = vec![
            archive_name(10, t + Duration::seconds(5)),
            archive_name(2, t + Duration::seconds(1)),
            archive_name(1, t),
        ];
        names.sort();
        assert!(names[0].starts_with("segment-000001-"));
        assert!(names[1].starts_with("segment-000002-"));
        assert!(names[2].starts_with("segment-000010-"));
        assert!(names.iter().all(|n| is_archive(n)));
        assert!(!is_archive(CURRENT_SEGMENT));
    }

    #[test]
    fn next_sequence_follows_last_archive() {
        assert_eq!(next_sequence(&[]), 1);
        let names = vec![archive_name(1, Utc::now()), archive_name(7, Utc::now())];
        assert_eq!(next_sequence(&names), 8);
    }

    #[test]
    fn open_append_terminates_a_torn_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CURRENT_SEGMENT);
        fs::write(&path, "{\"complete\":1}\n{\"torn\":").unwrap();

        let (mut writer, size) = open_append(&path).unwrap();
        writer.write_all(b"{\"next\":2}\n").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let lines = read_lines(dir.path(), CURRENT_SEGMENT).unwrap();
        assert_eq!(lines, vec!["{\"complete\":1}", "{\"torn\":", "{\"next\":2}"]);
        assert_eq!(size, fs::metadata(&path).unwrap().len() - 11);
    }

    #[test]
    fn open_append_leaves_clean_segments_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CURRENT_SEGMENT);

        let (_, size) = open_append(&path).unwrap();
        assert_eq!(size, 0);

        fs::write(&path, "{}\n").unwrap();
        let (_, size) = open_append(&path).unwrap();
        assert_eq!(size, 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn path_like_names_are_refused() {
        assert!(validate_name(CURRENT_SEGMENT).is_ok());
        for bad in ["", "../etc/passwd", "a/b.jsonl", "..", "a\\b"] {
            assert!(validate_name(bad).is_err(), "{bad}");
        }
    }
}
