//! # procflow Core
//!
//! Foundational types for the procflow historic-data subsystem. The other
//! crates build on the abstractions defined here.
//!
//! ## Key Components
//!
//! - **History level policy**: ordered capture-granularity setting and the
//!   pure `should_capture` guard
//! - **Variable values**: closed tagged variant with per-operator comparison
//!   rules
//! - **Scope keys**: entity-attribute-value addressing for variables
//! - **Identifiers**: unique ID generation
//! - **Errors**: shared error type and result alias

pub mod error;
pub mod id;
pub mod level;
pub mod scope;
pub mod value;

// Re-export commonly used types
pub use error::{Error, Result};
pub use id::{Id, new_id, new_id_with_prefix};
pub use level::{CaptureCategory, HistoryLevel, should_capture};
pub use scope::{ScopeType, VariableScopeKey};
pub use value::VariableValue;

/// Common type aliases for convenience
pub type DateTime = chrono::DateTime<chrono::Utc>;
pub type Json = serde_json::Value;
