//! Role name resolution from an explicit name, a prefix, or nothing at all.

use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use crate::types::{NameSource, RoleIdentity};

/// Prefix used when neither a name nor a prefix is configured.
pub const DEFAULT_NAME_PREFIX: &str = "terraform-";

/// Length of the generated suffix appended to a prefix.
pub const UNIQUE_SUFFIX_LENGTH: usize = 26;

// Last suffix handed out, as a number. Keeps suffixes strictly increasing
// even when the clock does not move between calls.
static LAST_SUFFIX: Mutex<u128> = Mutex::new(0);

/// A 26-digit suffix that sorts in creation order and is unique within the
/// process: a UTC timestamp down to the nanosecond followed by a 3-digit
/// sequence.
pub fn unique_suffix() -> String {
    let stamp: u128 = Utc::now()
        .format("%Y%m%d%H%M%S%f")
        .to_string()
        .parse()
        .unwrap_or_default();
    let candidate = stamp * 1000;

    let mut last = LAST_SUFFIX.lock().unwrap_or_else(|e| e.into_inner());
    let next = if candidate > *last { candidate } else { *last + 1 };
    *last = next;

    format!("{next:0width$}", width = UNIQUE_SUFFIX_LENGTH)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Pick the role name: an explicit name wins unchanged, otherwise the prefix
/// (or [`DEFAULT_NAME_PREFIX`]) plus a [`unique_suffix`].
pub fn resolve_name(name: Option<&str>, name_prefix: Option<&str>) -> String {
    RoleIdentity::resolve(name, name_prefix).name
}

/// Recover the prefix a generated name was built from.
///
/// Returns `None` when the name is too short to carry a generated suffix.
pub fn prefix_from_name(name: &str) -> Option<String> {
    let len = name.chars().count();
    if len <= UNIQUE_SUFFIX_LENGTH {
        return None;
    }
    Some(name.chars().take(len - UNIQUE_SUFFIX_LENGTH).collect())
}

impl RoleIdentity {
    pub fn resolve(name: Option<&str>, name_prefix: Option<&str>) -> Self {
        let identity = match (non_empty(name), non_empty(name_prefix)) {
            (Some(name), _) => RoleIdentity {
                name: name.to_string(),
                name_prefix: None,
                source: NameSource::Explicit,
            },
            (None, Some(prefix)) => RoleIdentity {
                name: format!("{prefix}{}", unique_suffix()),
                name_prefix: Some(prefix.to_string()),
                source: NameSource::Prefixed,
            },
            (None, None) => RoleIdentity {
                name: format!("{DEFAULT_NAME_PREFIX}{}", unique_suffix()),
                name_prefix: Some(DEFAULT_NAME_PREFIX.to_string()),
                source: NameSource::Generated,
            },
        };

        debug!(
            event = "Resolve",
            phase = "Name",
            name = identity.name,
            source = %identity.source
        );
        identity
    }

    /// Rebuild an identity from a stored name, e.g. on import or refresh.
    ///
    /// Only names that carry a generated suffix have a prefix to recover.
    pub fn from_stored(name: impl Into<String>, source: NameSource) -> Self {
        let name = name.into();
        let name_prefix = if source.has_generated_suffix() {
            prefix_from_name(&name)
        } else {
            None
        };
        RoleIdentity {
            name,
            name_prefix,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;
    use yare::parameterized;

    static PREFIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^prefix_[0-9]{26}$").unwrap());
    static GENERATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^terraform-[0-9]{26}$").unwrap());

    #[test]
    fn test_explicit_name_wins() {
        assert_eq!(resolve_name(Some("explicit"), Some("prefix_")), "explicit");
        assert_eq!(resolve_name(Some("explicit"), None), "explicit");
    }

    #[test]
    fn test_prefix_gets_suffix() {
        let name = resolve_name(None, Some("prefix_"));
        assert!(PREFIXED.is_match(&name), "{name}");
        let name = resolve_name(Some(""), Some("prefix_"));
        assert!(PREFIXED.is_match(&name), "{name}");
    }

    #[test]
    fn test_default_prefix() {
        let name = resolve_name(None, None);
        assert!(GENERATED.is_match(&name), "{name}");
        let name = resolve_name(Some(""), Some(""));
        assert!(GENERATED.is_match(&name), "{name}");
    }

    #[test]
    fn test_suffixes_are_unique_and_sorted() {
        let suffixes: Vec<String> = (0..500).map(|_| unique_suffix()).collect();
        for pair in suffixes.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert!(suffixes.iter().all(|s| s.len() == UNIQUE_SUFFIX_LENGTH));
    }

    #[parameterized(
        generated = { "test_role_12345678901234567890123456", Some("test_role_") },
        exactly_suffix = { "12345678901234567890123456", None },
        short = { "short_name", None },
        empty = { "", None },
        one_char_prefix = { "x12345678901234567890123456", Some("x") },
    )]
    fn test_prefix_from_name(name: &str, expected: Option<&str>) {
        assert_eq!(prefix_from_name(name).as_deref(), expected);
    }

    #[test]
    fn test_identity_round_trip_through_stored_name() {
        let identity = RoleIdentity::resolve(None, Some("app-"));
        assert_eq!(identity.source, NameSource::Prefixed);

        let restored = RoleIdentity::from_stored(identity.name.clone(), identity.source);
        assert_eq!(restored, identity);
    }

    #[test]
    fn test_explicit_stored_name_has_no_prefix() {
        // Long enough to look generated, but the user typed it.
        let name = "my_service_role_12345678901234567890123456";
        let restored = RoleIdentity::from_stored(name, NameSource::Explicit);
        assert_eq!(restored.name_prefix, None);
    }

    #[test]
    fn test_generated_identity_records_default_prefix() {
        let identity = RoleIdentity::resolve(None, None);
        assert_eq!(identity.source, NameSource::Generated);
        assert_eq!(identity.name_prefix.as_deref(), Some(DEFAULT_NAME_PREFIX));
        assert_eq!(identity.to_string(), format!("{} (generated)", identity.name));
    }
}
