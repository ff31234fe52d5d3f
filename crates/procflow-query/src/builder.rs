//! Shared builder state
//!
//! Every entity query owns one of these. Predicates accumulate: each call
//! adds a conjunct, or extends the currently open or-group. The open group
//! is tracked here so `or()`/`end_or()` misuse fails the same way on every
//! builder.

use crate::ast::{FieldOp, Predicate, QueryNode};
use crate::engine::OrderBy;
use crate::error::{QueryError, Result};
use procflow_core::{Id, VariableValue};

pub(crate) struct BuilderCore<F> {
    nodes: Vec<QueryNode<F>>,
    open_or: Option<Vec<Predicate<F>>>,
    pub order: OrderBy<F>,
    pub include_process_variables: bool,
    pub include_task_local_variables: bool,
}

impl<F> Default for BuilderCore<F> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            open_or: None,
            order: OrderBy::default(),
            include_process_variables: false,
            include_task_local_variables: false,
        }
    }
}

impl<F> BuilderCore<F> {
    /// Add one predicate: to the open or-group when there is one, as its
    /// own conjunct otherwise
    pub fn add(&mut self, predicate: Predicate<F>) {
        match self.open_or.as_mut() {
            Some(group) => group.push(predicate),
            None => self.nodes.push(QueryNode::And(predicate)),
        }
    }

    pub fn field(&mut self, field: F, op: FieldOp) {
        self.add(Predicate::Field { field, op });
    }

    /// Open an or-group
    pub fn begin_or(&mut self) -> Result<()> {
        if self.open_or.is_some() {
            return Err(QueryError::illegal_argument(
                "Nested or-groups are not supported",
            ));
        }
        self.open_or = Some(Vec::new());
        Ok(())
    }

    /// Close the open or-group, sealing it as one conjunct
    pub fn end_or(&mut self) -> Result<()> {
        match self.open_or.take() {
            Some(group) => {
                self.nodes.push(QueryNode::Or(group));
                Ok(())
            }
            None => Err(QueryError::illegal_argument(
                "end_or() called without an open or-group",
            )),
        }
    }

    /// The finished conjunct list; fails when an or-group is still open
    pub fn nodes(&self) -> Result<&[QueryNode<F>]> {
        if self.open_or.is_some() {
            return Err(QueryError::illegal_argument(
                "or-group was opened but never closed",
            ));
        }
        Ok(&self.nodes)
    }

    pub fn order_by(&mut self, field: F) {
        self.order.field = Some(field);
        self.order.ascending = true;
    }

    pub fn ascending(&mut self) {
        self.order.ascending = true;
    }

    pub fn descending(&mut self) {
        self.order.ascending = false;
    }
}

/// Validate an id set argument, distinguishing a null set from an empty
/// one in the failure message
pub(crate) fn require_id_set(ids: Option<Vec<Id>>, label: &str) -> Result<Vec<VariableValue>> {
    match ids {
        None => Err(QueryError::illegal_argument(format!("Set of {label} is null"))),
        Some(ids) if ids.is_empty() => {
            Err(QueryError::illegal_argument(format!("Set of {label} is empty")))
        }
        Some(ids) => Ok(ids
            .into_iter()
            .map(|id| VariableValue::from(id.into_string()))
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_predicates_route_into_open_group() {
        let mut fixture: BuilderCore<u8> = BuilderCore::default();
        fixture.field(0, FieldOp::IsNull);
        fixture.begin_or().unwrap();
        fixture.field(1, FieldOp::IsNull);
        fixture.field(2, FieldOp::IsNotNull);
        fixture.end_or().unwrap();

        let nodes = fixture.nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], QueryNode::And(_)));
        assert!(matches!(&nodes[1], QueryNode::Or(group) if group.len() == 2));
    }

    #[test]
    fn test_nested_or_rejected() {
        let mut fixture: BuilderCore<u8> = BuilderCore::default();
        fixture.begin_or().unwrap();
        let actual = fixture.begin_or().unwrap_err();
        assert_eq!(actual.to_string(), "Nested or-groups are not supported");
    }

    #[test]
    fn test_unmatched_end_or_rejected() {
        let mut fixture: BuilderCore<u8> = BuilderCore::default();
        assert!(fixture.end_or().is_err());
    }

    #[test]
    fn test_unclosed_group_fails_at_execution() {
        let mut fixture: BuilderCore<u8> = BuilderCore::default();
        fixture.begin_or().unwrap();
        assert!(fixture.nodes().is_err());
    }

    #[test]
    fn test_require_id_set_messages() {
        let actual = require_id_set(None, "process instance ids").unwrap_err();
        assert_eq!(actual.to_string(), "Set of process instance ids is null");

        let actual = require_id_set(Some(Vec::new()), "process instance ids").unwrap_err();
        assert_eq!(actual.to_string(), "Set of process instance ids is empty");

        let actual = require_id_set(Some(vec![Id::from("proc-1")]), "process instance ids");
        assert_eq!(actual.unwrap().len(), 1);
    }
}
