//! Action types for region provisioning

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use twinstack_core::StackRole;

/// Represents a planned action against one control-plane resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action within a plan
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Kind of resource the action targets
    pub resource_kind: ResourceKind,

    /// Resource identifier (name, or tag value for tag-found resources)
    pub resource_id: String,

    /// Description of the action
    pub description: String,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_kind: ResourceKind,
        resource_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let resource_id = resource_id.into();
        Self {
            id: format!("{}-{}:{}", action_type, resource_kind, resource_id),
            action_type,
            resource_kind,
            resource_id,
            description: description.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Delete every resource matching the target
    Delete,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Delete => write!(f, "delete"),
        }
    }
}

/// Kind of control-plane resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    KeyPair,
    SecurityGroup,
    Instance,
    Image,
    LoadBalancer,
    LaunchConfiguration,
    AutoScalingGroup,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::KeyPair => "key-pair",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::Instance => "instance",
            ResourceKind::Image => "image",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::LaunchConfiguration => "launch-configuration",
            ResourceKind::AutoScalingGroup => "autoscaling-group",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Actions not attempted because an earlier create failed
    pub skipped: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }

    pub fn add_skipped(&mut self, action_id: String, reason: String) {
        self.skipped.push(ActionResult {
            action_id,
            success: false,
            message: reason,
            error: None,
        });
    }

    /// Merge another region's result into this one
    pub fn merge(&mut self, other: ApplyResult) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
        self.skipped.extend(other.skipped);
        self.duration_ms += other.duration_ms;
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message, or the skip reason
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Ordered actions for one region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Region role the plan belongs to
    pub role: StackRole,

    /// Region name
    pub region: String,

    /// List of actions to perform, in order
    pub actions: Vec<Action>,
}

impl Plan {
    /// Action IDs are prefixed with their position so repeated targets stay unique
    pub fn new(role: StackRole, region: impl Into<String>, mut actions: Vec<Action>) -> Self {
        for (index, action) in actions.iter_mut().enumerate() {
            action.id = format!("{:02}-{}", index + 1, action.id);
        }
        Self {
            role,
            region: region.into(),
            actions,
        }
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
            delete: self.actions_by_type(ActionType::Delete).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub delete: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to create, {} to delete", self.create, self.delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_id() {
        let action = Action::new(
            ActionType::Delete,
            ResourceKind::AutoScalingGroup,
            "shop-asg",
            "remove group",
        );
        assert_eq!(action.id, "delete-autoscaling-group:shop-asg");
    }

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(
            StackRole::Database,
            "us-east-2",
            vec![
                Action::new(ActionType::Delete, ResourceKind::Instance, "db", ""),
                Action::new(ActionType::Create, ResourceKind::KeyPair, "db", ""),
                Action::new(ActionType::Create, ResourceKind::Instance, "db", ""),
            ],
        );
        let summary = plan.summary();
        assert_eq!(summary, PlanSummary { create: 2, delete: 1 });
        assert_eq!(summary.to_string(), "2 to create, 1 to delete");
        assert_eq!(plan.actions[2].id, "03-create-instance:db");
    }

    #[test]
    fn test_skipped_is_not_success() {
        let mut result = ApplyResult::new();
        result.add_success("a".into(), "ok".into());
        assert!(result.is_success());
        result.add_skipped("b".into(), "earlier create failed".into());
        assert!(!result.is_success());
    }
}
