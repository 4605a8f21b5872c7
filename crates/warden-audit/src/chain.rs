//! Hash-chain primitives: hashing and per-segment chain verification.
//!
//! Every field that contributes to an entry's hash is listed explicitly so
//! nothing is accidentally omitted. Each field is length-prefixed so that
//! moving bytes between adjacent fields changes the digest.
//!
//! Hash input layout (in order, each as `len: u64 LE` then bytes):
//!   1. `type` wire name
//!   2. `timestamp` as RFC 3339 with automatic sub-second precision
//!   3. `agentId`
//!   4. `action`
//!   5. compact JSON of `decision`
//!   6. `previousHash`, or the empty string for the first entry of a segment
//!
//! `context` is not hashed.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use warden_contracts::audit::{AuditEntry, ChainVerification};

/// Compute the SHA-256 hash for one entry. Returns 64 lowercase hex chars.
///
/// The entry's own `hash` field is ignored.
pub fn hash_entry(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();
    let timestamp = entry.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    let decision = entry.decision.to_string();

    for field in [
        entry.entry_type.to_string().as_str(),
        timestamp.as_str(),
        entry.agent_id.as_str(),
        entry.action.as_str(),
        decision.as_str(),
        entry.previous_hash.as_deref().unwrap_or(""),
    ] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }

    hex::encode(hasher.finalize())
}

/// Replay the raw lines of one segment.
///
/// Checks, in order, for every non-blank line:
///
/// 1. **Well-formedness**: the line parses as an `AuditEntry`. A corrupt
///    line is itself the tamper signal.
/// 2. **Linkage**: `previousHash` equals the preceding entry's `hash`
///    (`null` for the first entry).
/// 3. **Hash correctness**: `hash` matches the value recomputed from the
///    entry's own fields.
///
/// Stops at the first failure. An empty segment is valid.
pub fn verify_lines<I>(segment: &str, lines: I) -> ChainVerification
where
    I: IntoIterator<Item = String>,
{
    let mut expected_prev: Option<String> = None;
    let mut index = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let entry: AuditEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(e) => {
                return ChainVerification::broken(segment, index, format!("malformed entry: {e}"))
            }
        };

        if entry.previous_hash != expected_prev {
            return ChainVerification::broken(
                segment,
                index,
                format!(
                    "broken linkage: expected previousHash {}, found {}",
                    expected_prev.as_deref().unwrap_or("null"),
                    entry.previous_hash.as_deref().unwrap_or("null"),
                ),
            );
        }

        let recomputed = hash_entry(&entry);
        if entry.hash != recomputed {
            return ChainVerification::broken(
                segment,
                index,
                format!("hash mismatch: stored {}, recomputed {}", entry.hash, recomputed),
            );
        }

        expected_prev = Some(entry.hash);
        index += 1;
    }

    ChainVerification::intact(segment, index)
}
