use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate identifier for historic entities and jobs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(String);

impl Id {
    /// Create an ID from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the owned string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generate a fresh unique ID
pub fn new_id() -> Id {
    Id(uuid::Uuid::new_v4().to_string())
}

/// Generate a fresh unique ID with a readable prefix, e.g. `job_<uuid>`
pub fn new_id_with_prefix(prefix: &str) -> Id {
    Id(format!("{}_{}", prefix, uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_id_round_trip() {
        let fixture = Id::new("hpi-42");
        let actual = fixture.as_str();
        let expected = "hpi-42";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_id_display() {
        let fixture = Id::from("task-7");
        let actual = format!("{fixture}");
        let expected = "task-7";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_new_id_is_unique() {
        let first = new_id();
        let second = new_id();
        assert!(first != second);
    }

    #[test]
    fn test_new_id_with_prefix() {
        let actual = new_id_with_prefix("job");
        assert!(actual.as_str().starts_with("job_"));
    }

    #[test]
    fn test_id_serde() {
        let fixture = Id::new("act-1");
        let actual = serde_json::to_string(&fixture).unwrap();
        let expected = "\"act-1\"";
        assert_eq!(actual, expected);

        let back: Id = serde_json::from_str(&actual).unwrap();
        assert_eq!(back, fixture);
    }
}
