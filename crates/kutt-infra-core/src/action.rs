//! Preview plans: what changes between two snapshots of a stack

use crate::resource::Urn;
use crate::state::{ResourceState, StackState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Represents a planned action for a declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Type of action to perform
    pub action_type: ActionType,

    pub urn: Urn,

    /// Resource type token
    pub resource_type: String,

    /// Description of the action
    pub description: String,

    /// Input keys whose value changed (updates only)
    pub changed_keys: Vec<String>,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in execution order
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Diff a freshly settled snapshot against the previously saved one
    ///
    /// Creates, updates and no-ops follow registration order, so owners and
    /// dependencies come first. Deletes follow, children before owners.
    pub fn between(previous: Option<&StackState>, current: &StackState) -> Self {
        let mut actions = Vec::new();

        for resource in &current.resources {
            let planned = match previous.and_then(|p| p.get_resource(&resource.urn)) {
                None => action(ActionType::Create, resource, Vec::new()),
                Some(old) => {
                    let changed = changed_keys(old, resource);
                    if changed.is_empty() {
                        action(ActionType::NoOp, resource, changed)
                    } else {
                        action(ActionType::Update, resource, changed)
                    }
                }
            };
            actions.push(planned);
        }

        if let Some(previous) = previous {
            let kept: HashSet<&Urn> = current.resources.iter().map(|r| &r.urn).collect();
            actions.extend(
                previous
                    .resources
                    .iter()
                    .rev()
                    .filter(|r| !kept.contains(&r.urn))
                    .map(|r| action(ActionType::Delete, r, Vec::new())),
            );
        }

        Self::new(actions)
    }

    /// Delete every resource of a stack, children before owners
    pub fn destroy(state: &StackState) -> Self {
        Self::new(
            state
                .resources
                .iter()
                .rev()
                .map(|r| action(ActionType::Delete, r, Vec::new()))
                .collect(),
        )
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

fn action(action_type: ActionType, resource: &ResourceState, changed_keys: Vec<String>) -> Action {
    let description = match action_type {
        ActionType::Create => format!("create {} {}", resource.resource_type, resource.name),
        ActionType::Update => format!(
            "update {} {} ({})",
            resource.resource_type,
            resource.name,
            changed_keys.join(", ")
        ),
        ActionType::Delete => format!("delete {} {}", resource.resource_type, resource.name),
        ActionType::NoOp => format!("{} {} is up to date", resource.resource_type, resource.name),
    };
    Action {
        action_type,
        urn: resource.urn.clone(),
        resource_type: resource.resource_type.clone(),
        description,
        changed_keys,
    }
}

fn changed_keys(old: &ResourceState, new: &ResourceState) -> Vec<String> {
    let empty = serde_json::Map::new();
    let old_inputs = old.inputs.as_object().unwrap_or(&empty);
    let new_inputs = new.inputs.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = old_inputs.keys().chain(new_inputs.keys()).collect();
    keys.into_iter()
        .filter(|key| old_inputs.get(*key) != new_inputs.get(*key))
        .cloned()
        .collect()
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
