//! Predicate AST
//!
//! A query is a conjunction of nodes. A plain node carries one predicate;
//! an or-group node carries a list of predicates of which at least one must
//! hold. Or-groups never nest, so the tree is always exactly two levels
//! deep and evaluation stays a flat pass.

use crate::error::{QueryError, Result};
use procflow_core::VariableValue;
use std::cmp::Ordering;

/// Comparison applied to one entity column
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Equals(VariableValue),
    NotEquals(VariableValue),
    EqualsIgnoreCase(String),
    Like(String),
    LikeIgnoreCase(String),
    GreaterThan(VariableValue),
    GreaterThanOrEqual(VariableValue),
    LessThan(VariableValue),
    LessThanOrEqual(VariableValue),
    /// Membership in a non-empty id set
    In(Vec<VariableValue>),
    IsNull,
    IsNotNull,
}

impl FieldOp {
    /// Evaluate against the column value. An absent column only ever
    /// satisfies `IsNull`; this mirrors SQL three-valued comparisons where
    /// `NULL <> x` is not true.
    pub fn matches(&self, value: Option<&VariableValue>) -> bool {
        match self {
            FieldOp::IsNull => value.is_none(),
            FieldOp::IsNotNull => value.is_some(),
            _ => {
                let Some(value) = value else { return false };
                match self {
                    FieldOp::Equals(target) => value.equals(target),
                    FieldOp::NotEquals(target) => !value.equals(target),
                    FieldOp::EqualsIgnoreCase(target) => {
                        value.equals_ignore_case(&VariableValue::from(target.as_str()))
                    }
                    FieldOp::Like(pattern) => value.matches_like(pattern, false),
                    FieldOp::LikeIgnoreCase(pattern) => value.matches_like(pattern, true),
                    FieldOp::GreaterThan(target) => {
                        value.compare(target) == Some(Ordering::Greater)
                    }
                    FieldOp::GreaterThanOrEqual(target) => {
                        matches!(value.compare(target), Some(Ordering::Greater | Ordering::Equal))
                    }
                    FieldOp::LessThan(target) => value.compare(target) == Some(Ordering::Less),
                    FieldOp::LessThanOrEqual(target) => {
                        matches!(value.compare(target), Some(Ordering::Less | Ordering::Equal))
                    }
                    FieldOp::In(targets) => targets.iter().any(|t| value.equals(t)),
                    // Handled in the outer match
                    FieldOp::IsNull | FieldOp::IsNotNull => false,
                }
            }
        }
    }
}

/// Comparison operator on a variable row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableOperator {
    Equals,
    NotEquals,
    EqualsIgnoreCase,
    NotEqualsIgnoreCase,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    LikeIgnoreCase,
}

impl VariableOperator {
    /// Whether the operator is only defined for string values
    pub fn requires_string(&self) -> bool {
        matches!(
            self,
            VariableOperator::EqualsIgnoreCase
                | VariableOperator::NotEqualsIgnoreCase
                | VariableOperator::Like
                | VariableOperator::LikeIgnoreCase
        )
    }
}

/// Predicate against the variable table, joined on the entity's scope
#[derive(Debug, Clone, PartialEq)]
pub struct VariablePredicate {
    /// `None` means any variable name; only supported with `Equals`
    pub name: Option<String>,
    pub operator: VariableOperator,
    pub value: VariableValue,
    /// Match task-local rows instead of process-global ones
    pub local: bool,
}

impl VariablePredicate {
    /// Validate and build a variable predicate. Rejections happen here, at
    /// construction, never during evaluation.
    pub fn new(
        name: Option<String>,
        operator: VariableOperator,
        value: Option<VariableValue>,
        local: bool,
    ) -> Result<Self> {
        if name.is_none() && operator != VariableOperator::Equals {
            return Err(QueryError::illegal_argument("name is null"));
        }
        let Some(value) = value else {
            return Err(QueryError::illegal_argument("value is null"));
        };
        if operator.requires_string() && !value.is_string() {
            return Err(QueryError::illegal_argument(format!(
                "Only string values are supported for this operator, got {}",
                value.type_name()
            )));
        }
        Ok(Self {
            name,
            operator,
            value,
            local,
        })
    }

    /// Whether one stored value satisfies the comparison
    pub fn value_matches(&self, stored: &VariableValue) -> bool {
        match self.operator {
            VariableOperator::Equals => stored.equals(&self.value),
            VariableOperator::NotEquals => !stored.equals(&self.value),
            VariableOperator::EqualsIgnoreCase => stored.equals_ignore_case(&self.value),
            VariableOperator::NotEqualsIgnoreCase => {
                stored.is_string() && !stored.equals_ignore_case(&self.value)
            }
            VariableOperator::GreaterThan => stored.compare(&self.value) == Some(Ordering::Greater),
            VariableOperator::GreaterThanOrEqual => matches!(
                stored.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            VariableOperator::LessThan => stored.compare(&self.value) == Some(Ordering::Less),
            VariableOperator::LessThanOrEqual => matches!(
                stored.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            VariableOperator::Like => match self.value.as_str() {
                Some(pattern) => stored.matches_like(pattern, false),
                None => false,
            },
            VariableOperator::LikeIgnoreCase => match self.value.as_str() {
                Some(pattern) => stored.matches_like(pattern, true),
                None => false,
            },
        }
    }
}

/// One predicate in a query. Generic over the entity's field enum.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F> {
    /// Comparison on an entity column
    Field { field: F, op: FieldOp },
    /// Comparison against a variable row in the entity's scope
    Variable(VariablePredicate),
    /// A variable with this name exists in the entity's scope
    VariableExists { name: String, local: bool },
    /// No variable with this name exists in the entity's scope
    VariableNotExists { name: String, local: bool },
    /// The user appears in an identity link of the entity's scope
    InvolvedUser(String),
    /// The group appears in a candidate identity link of the entity's scope
    CandidateGroup(String),
}

/// One conjunct of the query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode<F> {
    /// The predicate must hold
    And(Predicate<F>),
    /// At least one of the predicates must hold
    Or(Vec<Predicate<F>>),
}
