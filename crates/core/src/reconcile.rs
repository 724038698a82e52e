//! Comparing a time entry description with a proposed replacement.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescriptionDiff {
    pub changed: bool,
    pub current: String,
    pub suggested: String,
}

/// Exact comparison; a missing value compares as the empty string.
pub fn diff(current: Option<&str>, suggested: Option<&str>) -> DescriptionDiff {
    let current = current.unwrap_or_default();
    let suggested = suggested.unwrap_or_default();
    DescriptionDiff {
        changed: current != suggested,
        current: current.to_string(),
        suggested: suggested.to_string(),
    }
}

/// The description to write, or `None` when applying would change nothing.
pub fn replacement(current: Option<&str>, suggested: &str) -> Option<String> {
    let diff = diff(current, Some(suggested));
    diff.changed.then_some(diff.suggested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_is_plain_inequality() {
        let pairs = [
            (Some("a"), Some("a"), false),
            (Some("a"), Some("b"), true),
            (Some("a"), Some("a "), true),
            (Some("A"), Some("a"), true),
            (None, None, false),
            (Some(""), None, false),
            (None, Some(""), false),
            (None, Some("Replaced gasket"), true),
        ];
        for (current, suggested, expected) in pairs {
            assert_eq!(
                diff(current, suggested).changed,
                expected,
                "{current:?} vs {suggested:?}"
            );
        }
    }

    #[test]
    fn diff_echoes_both_sides() {
        let d = diff(Some("Fixed pump"), Some("Replaced gasket"));
        assert_eq!(d.current, "Fixed pump");
        assert_eq!(d.suggested, "Replaced gasket");
    }

    #[test]
    fn applied_value_is_a_fixed_point() {
        let new = replacement(Some("Fixed pump"), "Replaced gasket").unwrap();
        assert!(!diff(Some(&new), Some(&new)).changed);
        assert_eq!(replacement(Some("same"), "same"), None);
    }
}
