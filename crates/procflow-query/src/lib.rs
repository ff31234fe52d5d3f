//! # procflow Query
//!
//! The composable historic query engine: fluent per-entity builders that
//! accumulate predicates as a conjunction, with flat or-groups for
//! disjunctions, evaluated against the historic store.
//!
//! ## Key Components
//!
//! - **Builders**: `HistoricProcessInstanceQuery`,
//!   `HistoricTaskInstanceQuery`, `HistoricActivityInstanceQuery`,
//!   `TaskLogEntryQuery`
//! - **Engine**: generic filtering, ordering, bounds-safe pagination, and
//!   variable hydration over any `Queryable` entity
//! - **Requests**: JSON request/response objects translated onto the
//!   builders

pub mod activity;
pub mod ast;
pub(crate) mod builder;
pub mod engine;
pub mod error;
pub mod process;
pub mod request;
pub mod task;
pub mod tasklog;

// Re-export public API
pub use activity::{ActivityInstanceField, HistoricActivityInstanceQuery};
pub use ast::{FieldOp, Predicate, QueryNode, VariableOperator, VariablePredicate};
pub use engine::{OrderBy, QueryContext, QueryRow, Queryable};
pub use error::{QueryError, Result};
pub use process::{HistoricProcessInstanceQuery, ProcessInstanceField};
pub use request::{
    query_historic_process_instances, query_historic_task_instances, DataResponse,
    HistoricProcessInstanceQueryRequest, HistoricTaskInstanceQueryRequest, QueryVariable,
};
pub use task::{HistoricTaskInstanceQuery, TaskInstanceField};
pub use tasklog::TaskLogEntryQuery;
