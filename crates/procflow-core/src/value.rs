//! Typed variable values
//!
//! Variables are stored in an entity-attribute-value layout; the value side
//! is a closed tagged variant with one comparison rule per operator, so the
//! compiler checks exhaustiveness instead of runtime type inspection.

use crate::DateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A typed variable value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum VariableValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime),
    Bytes(Vec<u8>),
    Null,
}

impl VariableValue {
    /// Stable type name, used in diagnostics and the wire format
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableValue::String(_) => "string",
            VariableValue::Long(_) => "long",
            VariableValue::Double(_) => "double",
            VariableValue::Boolean(_) => "boolean",
            VariableValue::Date(_) => "date",
            VariableValue::Bytes(_) => "bytes",
            VariableValue::Null => "null",
        }
    }

    /// Whether this value carries a string
    pub fn is_string(&self) -> bool {
        matches!(self, VariableValue::String(_))
    }

    /// Borrow the string content, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Typed equality. `Long` and `Double` compare numerically across
    /// variants; everything else requires the same variant.
    pub fn equals(&self, other: &VariableValue) -> bool {
        match (self, other) {
            (VariableValue::Long(a), VariableValue::Double(b)) => (*a as f64) == *b,
            (VariableValue::Double(a), VariableValue::Long(b)) => *a == (*b as f64),
            (a, b) => a == b,
        }
    }

    /// Case-insensitive equality; only meaningful for strings, any other
    /// pairing is not equal.
    pub fn equals_ignore_case(&self, other: &VariableValue) -> bool {
        match (self, other) {
            (VariableValue::String(a), VariableValue::String(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }

    /// Native ordering: lexicographic for strings, numeric across
    /// `Long`/`Double`, chronological for dates, per-value for booleans.
    /// Values of incomparable types yield `None`.
    pub fn compare(&self, other: &VariableValue) -> Option<Ordering> {
        match (self, other) {
            (VariableValue::String(a), VariableValue::String(b)) => Some(a.cmp(b)),
            (VariableValue::Long(a), VariableValue::Long(b)) => Some(a.cmp(b)),
            (VariableValue::Double(a), VariableValue::Double(b)) => a.partial_cmp(b),
            (VariableValue::Long(a), VariableValue::Double(b)) => (*a as f64).partial_cmp(b),
            (VariableValue::Double(a), VariableValue::Long(b)) => a.partial_cmp(&(*b as f64)),
            (VariableValue::Boolean(a), VariableValue::Boolean(b)) => Some(a.cmp(b)),
            (VariableValue::Date(a), VariableValue::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// SQL-style `LIKE` matching with `%` and `_` wildcards. Only string
    /// values ever match; a non-string stored value yields `false`.
    pub fn matches_like(&self, pattern: &str, ignore_case: bool) -> bool {
        match self {
            VariableValue::String(s) => {
                if ignore_case {
                    like_match(&s.to_lowercase(), &pattern.to_lowercase())
                } else {
                    like_match(s, pattern)
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::String(s) => write!(f, "{s}"),
            VariableValue::Long(v) => write!(f, "{v}"),
            VariableValue::Double(v) => write!(f, "{v}"),
            VariableValue::Boolean(v) => write!(f, "{v}"),
            VariableValue::Date(v) => write!(f, "{}", v.to_rfc3339()),
            VariableValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            VariableValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        VariableValue::String(s.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        VariableValue::String(s)
    }
}

impl From<i32> for VariableValue {
    fn from(v: i32) -> Self {
        VariableValue::Long(v as i64)
    }
}

impl From<i64> for VariableValue {
    fn from(v: i64) -> Self {
        VariableValue::Long(v)
    }
}

impl From<f64> for VariableValue {
    fn from(v: f64) -> Self {
        VariableValue::Double(v)
    }
}

impl From<bool> for VariableValue {
    fn from(v: bool) -> Self {
        VariableValue::Boolean(v)
    }
}

impl From<DateTime> for VariableValue {
    fn from(v: DateTime) -> Self {
        VariableValue::Date(v)
    }
}

impl From<Vec<u8>> for VariableValue {
    fn from(v: Vec<u8>) -> Self {
        VariableValue::Bytes(v)
    }
}

/// Wildcard matcher: `%` matches any run, `_` matches exactly one character.
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_at(&text, &pattern)
}

fn like_match_at(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => {
            // Greedy run: try every split point, including the empty one
            (0..=text.len()).any(|skip| like_match_at(&text[skip..], &pattern[1..]))
        }
        Some('_') => !text.is_empty() && like_match_at(&text[1..], &pattern[1..]),
        Some(c) => text.first() == Some(c) && like_match_at(&text[1..], &pattern[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_typed_equality() {
        assert!(VariableValue::from("abc").equals(&VariableValue::from("abc")));
        assert!(!VariableValue::from("abc").equals(&VariableValue::from(123i64)));
        assert!(VariableValue::from(123i64).equals(&VariableValue::from(123.0)));
        assert!(!VariableValue::from(true).equals(&VariableValue::from(1i64)));
    }

    #[test]
    fn test_equals_ignore_case_only_strings() {
        assert!(VariableValue::from("HeLLo").equals_ignore_case(&VariableValue::from("hello")));
        assert!(!VariableValue::from(1i64).equals_ignore_case(&VariableValue::from(1i64)));
    }

    #[test]
    fn test_compare_native_orderings() {
        let actual = VariableValue::from("abc").compare(&VariableValue::from("abd"));
        assert_eq!(actual, Some(Ordering::Less));

        let actual = VariableValue::from(7i64).compare(&VariableValue::from(6.5));
        assert_eq!(actual, Some(Ordering::Greater));

        let earlier = chrono::Utc::now();
        let later = earlier + chrono::Duration::seconds(1);
        let actual = VariableValue::from(earlier).compare(&VariableValue::from(later));
        assert_eq!(actual, Some(Ordering::Less));

        // Incomparable types
        let actual = VariableValue::from("abc").compare(&VariableValue::from(1i64));
        assert_eq!(actual, None);
    }

    #[test]
    fn test_like_wildcards() {
        let fixture = VariableValue::from("invoice-2024-001");
        assert!(fixture.matches_like("invoice-%", false));
        assert!(fixture.matches_like("%2024%", false));
        assert!(fixture.matches_like("invoice-____-001", false));
        assert!(!fixture.matches_like("receipt-%", false));
    }

    #[test]
    fn test_like_ignore_case() {
        let fixture = VariableValue::from("Azerty");
        assert!(fixture.matches_like("azeRTY", true));
        assert!(fixture.matches_like("a%", true));
        assert!(!fixture.matches_like("azeRTY", false));
    }

    #[test]
    fn test_like_on_non_string_never_matches() {
        assert!(!VariableValue::from(123i64).matches_like("%", false));
        assert!(!VariableValue::Null.matches_like("%", true));
    }

    #[test]
    fn test_serde_round_trip() {
        let fixture = VariableValue::from(42i64);
        let json = serde_json::to_string(&fixture).unwrap();
        let back: VariableValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fixture);
        assert_eq!(fixture.type_name(), "long");
    }
}
