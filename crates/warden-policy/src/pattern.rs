//! Action pattern matching.
//!
//! A pattern matches an action when it is:
//! - identical to the action,
//! - the bare wildcard `*`,
//! - `prefix*` and the action starts with `prefix`, or
//! - `*suffix` and the action ends with `suffix`.
//!
//! Only one wildcard position is honoured. The trailing form is tested
//! first, so `*:*` means "starts with `*:`".

pub const WILDCARD: &str = "*";

/// Return true if `pattern` matches `action`.
pub fn matches(pattern: &str, action: &str) -> bool {
    if pattern == action || pattern == WILDCARD {
        return true;
    }
    if pattern.len() > 1 {
        if let Some(prefix) = pattern.strip_suffix('*') {
            return action.starts_with(prefix);
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            return action.ends_with(suffix);
        }
    }
    false
}
