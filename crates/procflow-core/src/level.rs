//! History level policy
//!
//! The capture granularity is a totally ordered setting. Every capture site
//! consults [`should_capture`] before buffering anything, so a `None`
//! configuration produces zero historic rows and zero jobs rather than rows
//! that are filtered out later.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered capture-granularity setting: `None < Activity < Audit < Full`.
///
/// A level implies capture of everything the lower levels capture, plus more.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum HistoryLevel {
    /// No historic data is captured at all
    None = 0,
    /// Process, activity, and variable instances
    Activity = 1,
    /// Additionally task instances (the default)
    #[default]
    Audit = 2,
    /// Additionally fine-grained variable-update detail records
    Full = 3,
}

impl fmt::Display for HistoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            HistoryLevel::None => "none",
            HistoryLevel::Activity => "activity",
            HistoryLevel::Audit => "audit",
            HistoryLevel::Full => "full",
        };
        write!(f, "{key}")
    }
}

impl FromStr for HistoryLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(HistoryLevel::None),
            "activity" => Ok(HistoryLevel::Activity),
            "audit" => Ok(HistoryLevel::Audit),
            "full" => Ok(HistoryLevel::Full),
            other => Err(crate::Error::config(format!(
                "Unknown history level: {other}"
            ))),
        }
    }
}

/// Categories of capture events, each with a minimum required level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureCategory {
    /// Process instance start/end/delete
    ProcessInstance,
    /// Activity instance start/end
    ActivityInstance,
    /// Current-value variable snapshots
    VariableInstance,
    /// Task instance create/update/end
    TaskInstance,
    /// Identity links (involvement, candidates)
    IdentityLink,
    /// Task log entries
    TaskLog,
    /// Fine-grained variable-update detail records
    VariableDetail,
}

impl CaptureCategory {
    /// The minimum configured level at which this category is captured
    pub fn required_level(&self) -> HistoryLevel {
        match self {
            CaptureCategory::ProcessInstance
            | CaptureCategory::ActivityInstance
            | CaptureCategory::VariableInstance => HistoryLevel::Activity,
            CaptureCategory::TaskInstance
            | CaptureCategory::IdentityLink
            | CaptureCategory::TaskLog => HistoryLevel::Audit,
            CaptureCategory::VariableDetail => HistoryLevel::Full,
        }
    }

    /// All categories, in required-level order
    pub fn all() -> [CaptureCategory; 7] {
        [
            CaptureCategory::ProcessInstance,
            CaptureCategory::ActivityInstance,
            CaptureCategory::VariableInstance,
            CaptureCategory::TaskInstance,
            CaptureCategory::IdentityLink,
            CaptureCategory::TaskLog,
            CaptureCategory::VariableDetail,
        ]
    }
}

/// Pure capture guard: is `category` worth persisting at `configured`?
///
/// No side effects and no failure modes; compares the category's minimum
/// required level against the configured level using the total order.
pub fn should_capture(category: CaptureCategory, configured: HistoryLevel) -> bool {
    configured >= category.required_level()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_level_total_order() {
        assert!(HistoryLevel::None < HistoryLevel::Activity);
        assert!(HistoryLevel::Activity < HistoryLevel::Audit);
        assert!(HistoryLevel::Audit < HistoryLevel::Full);
    }

    #[test]
    fn test_none_captures_nothing() {
        for category in CaptureCategory::all() {
            assert!(!should_capture(category, HistoryLevel::None));
        }
    }

    #[test]
    fn test_full_captures_everything() {
        for category in CaptureCategory::all() {
            assert!(should_capture(category, HistoryLevel::Full));
        }
    }

    #[test]
    fn test_audit_adds_tasks_but_not_details() {
        assert!(should_capture(
            CaptureCategory::TaskInstance,
            HistoryLevel::Audit
        ));
        assert!(should_capture(
            CaptureCategory::VariableInstance,
            HistoryLevel::Audit
        ));
        assert!(!should_capture(
            CaptureCategory::VariableDetail,
            HistoryLevel::Audit
        ));
    }

    #[test]
    fn test_activity_excludes_tasks() {
        assert!(should_capture(
            CaptureCategory::ActivityInstance,
            HistoryLevel::Activity
        ));
        assert!(!should_capture(
            CaptureCategory::TaskInstance,
            HistoryLevel::Activity
        ));
    }

    #[test]
    fn test_capture_set_is_monotone_in_level() {
        let levels = [
            HistoryLevel::None,
            HistoryLevel::Activity,
            HistoryLevel::Audit,
            HistoryLevel::Full,
        ];
        for pair in levels.windows(2) {
            for category in CaptureCategory::all() {
                if should_capture(category, pair[0]) {
                    assert!(should_capture(category, pair[1]));
                }
            }
        }
    }

    #[test]
    fn test_level_parse_and_display() {
        let actual: HistoryLevel = "AUDIT".parse().unwrap();
        assert_eq!(actual, HistoryLevel::Audit);
        assert_eq!(actual.to_string(), "audit");

        let err = "everything".parse::<HistoryLevel>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown history level: everything"
        );
    }

    #[test]
    fn test_default_level_is_audit() {
        let actual = HistoryLevel::default();
        assert_eq!(actual, HistoryLevel::Audit);
    }
}
