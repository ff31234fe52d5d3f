//! Query evaluation
//!
//! The builders collect an AST; this module runs it. Evaluation is a flat
//! pass over a store snapshot: every conjunct must hold, an or-group holds
//! when any of its predicates does. Variable predicates join on the
//! entity's scope, identity-link predicates on its involvement records.

use crate::ast::{Predicate, QueryNode, VariablePredicate};
use crate::error::{QueryError, Result};
use procflow_core::{Id, VariableValue};
use procflow_history::{HistoricIdentityLink, HistoricVariableInstance, HistoryStore};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Candidate-type identity links back the candidate-group predicate
const CANDIDATE_LINK_TYPE: &str = "candidate";

/// An entity the generic engine can filter, order, and hydrate
pub trait Queryable: Clone + Send + Sync {
    /// The entity's orderable/filterable columns
    type Field: Copy + Send + Sync;

    fn id(&self) -> &Id;

    /// Column value, `None` for a null column
    fn field_value(&self, field: Self::Field) -> Option<VariableValue>;

    /// Scope for process-global variable and involvement predicates
    fn process_instance_id(&self) -> &Id;

    /// Scope for task-local variable predicates; `None` when the entity has
    /// no task scope
    fn task_id(&self) -> Option<&Id>;
}

/// Snapshot of the join tables a query may need
pub struct QueryContext {
    variables: Vec<HistoricVariableInstance>,
    identity_links: Vec<HistoricIdentityLink>,
}

impl QueryContext {
    /// Load the snapshot from the store
    pub async fn load(store: &dyn HistoryStore) -> procflow_core::Result<Self> {
        Ok(Self {
            variables: store.variables().await?,
            identity_links: store.identity_links().await?,
        })
    }

    /// Variable rows in the entity's scope. Local predicates see the
    /// task-local rows of the entity's task; global predicates see the
    /// process-global rows of the entity's process instance.
    fn scope_variables<'a, E: Queryable>(
        &'a self,
        entity: &'a E,
        local: bool,
    ) -> impl Iterator<Item = &'a HistoricVariableInstance> {
        self.variables.iter().filter(move |row| {
            if local {
                row.is_task_local() && row.key.task_id.as_ref() == entity.task_id()
            } else {
                !row.is_task_local() && row.scope_id() == entity.process_instance_id()
            }
        })
    }

    /// Identity links in the entity's scope: the task's links for a
    /// task-scoped entity, the process instance's links otherwise
    fn scope_links<'a, E: Queryable>(
        &'a self,
        entity: &'a E,
    ) -> impl Iterator<Item = &'a HistoricIdentityLink> {
        self.identity_links.iter().filter(move |link| match entity.task_id() {
            Some(task_id) => link.task_id.as_ref() == Some(task_id),
            None => &link.process_instance_id == entity.process_instance_id(),
        })
    }
}

fn variable_matches<E: Queryable>(
    entity: &E,
    predicate: &VariablePredicate,
    ctx: &QueryContext,
) -> bool {
    ctx.scope_variables(entity, predicate.local).any(|row| {
        let name_matches = match &predicate.name {
            Some(name) => row.name() == name,
            None => true,
        };
        name_matches && predicate.value_matches(&row.value)
    })
}

fn predicate_matches<E: Queryable>(
    entity: &E,
    predicate: &Predicate<E::Field>,
    ctx: &QueryContext,
) -> bool {
    match predicate {
        Predicate::Field { field, op } => op.matches(entity.field_value(*field).as_ref()),
        Predicate::Variable(vp) => variable_matches(entity, vp, ctx),
        Predicate::VariableExists { name, local } => ctx
            .scope_variables(entity, *local)
            .any(|row| row.name() == name),
        Predicate::VariableNotExists { name, local } => !ctx
            .scope_variables(entity, *local)
            .any(|row| row.name() == name),
        Predicate::InvolvedUser(user) => ctx
            .scope_links(entity)
            .any(|link| link.user_id.as_deref() == Some(user.as_str())),
        Predicate::CandidateGroup(group) => ctx.scope_links(entity).any(|link| {
            link.link_type == CANDIDATE_LINK_TYPE
                && link.group_id.as_deref() == Some(group.as_str())
        }),
    }
}

fn node_matches<E: Queryable>(entity: &E, node: &QueryNode<E::Field>, ctx: &QueryContext) -> bool {
    match node {
        QueryNode::And(p) => predicate_matches(entity, p, ctx),
        // An empty or-group constrains nothing
        QueryNode::Or(group) => {
            group.is_empty() || group.iter().any(|p| predicate_matches(entity, p, ctx))
        }
    }
}

/// Requested result ordering; `field: None` means the stable default
/// ordering by entity id
pub struct OrderBy<F> {
    pub field: Option<F>,
    pub ascending: bool,
}

impl<F> Default for OrderBy<F> {
    fn default() -> Self {
        Self {
            field: None,
            ascending: true,
        }
    }
}

/// Filter, dedupe, and order a snapshot of entities
pub fn evaluate<E: Queryable>(
    entities: Vec<E>,
    nodes: &[QueryNode<E::Field>],
    order: &OrderBy<E::Field>,
    ctx: &QueryContext,
) -> Vec<E> {
    let mut seen: HashSet<Id> = HashSet::new();
    let mut matched: Vec<E> = entities
        .into_iter()
        .filter(|e| nodes.iter().all(|n| node_matches(e, n, ctx)))
        .filter(|e| seen.insert(e.id().clone()))
        .collect();

    matched.sort_by(|a, b| {
        let by_field = match order.field {
            Some(field) => compare_field_values(
                a.field_value(field).as_ref(),
                b.field_value(field).as_ref(),
            ),
            None => Ordering::Equal,
        };
        // Id tiebreak keeps the ordering total and pagination stable
        by_field.then_with(|| a.id().cmp(b.id()))
    });
    if !order.ascending {
        matched.reverse();
    }
    matched
}

/// Nulls sort last; incomparable values fall back to equal and let the id
/// tiebreak decide
fn compare_field_values(a: Option<&VariableValue>, b: Option<&VariableValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

/// Bounds-safe page slice: out-of-range pages are empty or truncated,
/// never an error
pub fn page<E>(rows: Vec<E>, first_result: usize, max_results: usize) -> Vec<E> {
    rows.into_iter().skip(first_result).take(max_results).collect()
}

/// Reduce an ordered result to zero or one row
pub fn single_result<E>(mut rows: Vec<E>) -> Result<Option<E>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        _ => Err(QueryError::NonUniqueResult),
    }
}

/// One result row, optionally hydrated with its variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRow<E> {
    #[serde(flatten)]
    pub entity: E,
    /// Present only when hydration was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, VariableValue>>,
}

/// Attach the entity's variables. With both flags set, task-local values
/// shadow process-global ones of the same name; globals only fill in names
/// with no local row.
pub fn hydrate<E: Queryable>(
    entity: E,
    ctx: &QueryContext,
    include_process_variables: bool,
    include_task_local_variables: bool,
) -> QueryRow<E> {
    if !include_process_variables && !include_task_local_variables {
        return QueryRow {
            entity,
            variables: None,
        };
    }

    let mut variables = BTreeMap::new();
    if include_process_variables {
        for row in ctx.scope_variables(&entity, false) {
            variables.insert(row.name().to_string(), row.value.clone());
        }
    }
    if include_task_local_variables {
        // Inserted second so local values win on name collisions
        for row in ctx.scope_variables(&entity, true) {
            variables.insert(row.name().to_string(), row.value.clone());
        }
    }
    QueryRow {
        entity,
        variables: Some(variables),
    }
}
