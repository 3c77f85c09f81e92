//! Plan builders
//!
//! Clearing always runs first so a repeated `up` starts from nothing: the
//! app tier removes its scaling layer before the instances and network
//! pieces it depends on.

use crate::action::{Action, ActionType, Plan, ResourceKind};
use serde_json::json;
use twinstack_core::{Deployment, RegionStack, Tag};

/// Delete everything a previous run may have left in the region
pub fn plan_clear(stack: &RegionStack) -> Plan {
    Plan::new(stack.role, &stack.region, clear_actions(stack))
}

/// Clear the region, then create its resources
pub fn plan_provision(stack: &RegionStack) -> Plan {
    let mut actions = clear_actions(stack);
    actions.extend(create_actions(stack));
    Plan::new(stack.role, &stack.region, actions)
}

/// Clear plans for both regions, app first
pub fn plan_teardown(deployment: &Deployment) -> Vec<Plan> {
    vec![plan_clear(&deployment.app), plan_clear(&deployment.database)]
}

fn clear_actions(stack: &RegionStack) -> Vec<Action> {
    let mut actions = Vec::new();

    if let Some(asg) = &stack.autoscaling {
        actions.push(delete(
            ResourceKind::AutoScalingGroup,
            &asg.name,
            format!("Delete autoscaling group {}", asg.name),
        ));
    }
    if let Some(lb) = &stack.load_balancer {
        actions.push(delete(
            ResourceKind::LoadBalancer,
            &lb.name,
            format!("Delete load balancer {}", lb.name),
        ));
    }
    if let Some(lc) = &stack.launch_configuration {
        actions.push(delete(
            ResourceKind::LaunchConfiguration,
            &lc.name,
            format!("Delete launch configuration {}", lc.name),
        ));
    }
    if let Some(image) = &stack.image {
        actions.push(delete(
            ResourceKind::Image,
            &image.name,
            format!("Deregister image {}", image.name),
        ));
    }

    actions.push(delete_tagged(
        ResourceKind::Instance,
        &stack.instance.tag,
        "Terminate instances",
    ));
    actions.push(delete_tagged(
        ResourceKind::SecurityGroup,
        &stack.security_group.tag,
        "Delete security groups",
    ));
    actions.push(delete_tagged(
        ResourceKind::KeyPair,
        &stack.key_pair.tag,
        "Delete key pairs",
    ));

    actions
}

fn create_actions(stack: &RegionStack) -> Vec<Action> {
    let mut actions = vec![
        create(
            ResourceKind::KeyPair,
            &stack.key_pair.name,
            format!(
                "Create key pair {} (.ssh/{})",
                stack.key_pair.name, stack.key_pair.file_name
            ),
        ),
        create(
            ResourceKind::SecurityGroup,
            &stack.security_group.name,
            format!(
                "Create security group {} ({} ingress rules)",
                stack.security_group.name,
                stack.security_group.ingress.len()
            ),
        ),
        create(
            ResourceKind::Instance,
            &stack.instance.tag.value,
            format!(
                "Launch {} from {}",
                stack.instance.instance_type, stack.instance.image_id
            ),
        ),
    ];

    if let Some(image) = &stack.image {
        actions.push(create(
            ResourceKind::Image,
            &image.name,
            format!("Create image {} from the instance", image.name),
        ));
        actions.push(delete_tagged(
            ResourceKind::Instance,
            &stack.instance.tag,
            "Terminate template instance",
        ));
    }
    if let Some(lb) = &stack.load_balancer {
        actions.push(create(
            ResourceKind::LoadBalancer,
            &lb.name,
            format!(
                "Create load balancer {} ({} {} -> {})",
                lb.name, lb.protocol, lb.port, lb.instance_port
            ),
        ));
    }
    if let Some(lc) = &stack.launch_configuration {
        actions.push(create(
            ResourceKind::LaunchConfiguration,
            &lc.name,
            format!("Create launch configuration {}", lc.name),
        ));
    }
    if let Some(asg) = &stack.autoscaling {
        actions.push(create(
            ResourceKind::AutoScalingGroup,
            &asg.name,
            format!(
                "Create autoscaling group {} (min {}, max {}, desired {})",
                asg.name, asg.min_size, asg.max_size, asg.desired_capacity
            ),
        ));
    }

    actions
}

fn create(kind: ResourceKind, id: &str, description: String) -> Action {
    Action::new(ActionType::Create, kind, id, description)
}

fn delete(kind: ResourceKind, id: &str, description: String) -> Action {
    Action::new(ActionType::Delete, kind, id, description)
}

fn delete_tagged(kind: ResourceKind, tag: &Tag, what: &str) -> Action {
    Action::new(
        ActionType::Delete,
        kind,
        &tag.value,
        format!("{} tagged {}={}", what, tag.key, tag.value),
    )
    .with_detail("filter", json!({ "name": tag.filter_name(), "value": tag.value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinstack_core::{StackRole, parse_deployment_str};

    fn deployment() -> Deployment {
        parse_deployment_str(
            r#"
            region "database" {
                name "us-east-2"
                image "ami-db"
            }
            region "app" {
                name "us-east-1"
                image "ami-app"
                image-name "shop-image"
                load-balancer "shop-lb"
                launch-configuration "shop-lc"
                autoscaling "shop-asg"
            }
            "#,
            "shop".to_string(),
        )
        .unwrap()
    }

    fn steps(plan: &Plan) -> Vec<(ActionType, ResourceKind)> {
        plan.actions
            .iter()
            .map(|a| (a.action_type, a.resource_kind))
            .collect()
    }

    #[test]
    fn test_database_provision_order() {
        use ActionType::*;
        use ResourceKind::*;

        let plan = plan_provision(&deployment().database);
        assert_eq!(plan.role, StackRole::Database);
        assert_eq!(plan.region, "us-east-2");
        assert_eq!(
            steps(&plan),
            vec![
                (Delete, Instance),
                (Delete, SecurityGroup),
                (Delete, KeyPair),
                (Create, KeyPair),
                (Create, SecurityGroup),
                (Create, Instance),
            ]
        );
    }

    #[test]
    fn test_app_provision_order() {
        use ActionType::*;
        use ResourceKind::*;

        let plan = plan_provision(&deployment().app);
        assert_eq!(
            steps(&plan),
            vec![
                (Delete, AutoScalingGroup),
                (Delete, LoadBalancer),
                (Delete, LaunchConfiguration),
                (Delete, Image),
                (Delete, Instance),
                (Delete, SecurityGroup),
                (Delete, KeyPair),
                (Create, KeyPair),
                (Create, SecurityGroup),
                (Create, Instance),
                (Create, Image),
                (Delete, Instance),
                (Create, LoadBalancer),
                (Create, LaunchConfiguration),
                (Create, AutoScalingGroup),
            ]
        );
        assert_eq!(plan.summary().create, 7);
    }

    #[test]
    fn test_teardown_runs_app_first() {
        let plans = plan_teardown(&deployment());
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].role, StackRole::App);
        assert_eq!(plans[1].role, StackRole::Database);
        assert!(
            plans
                .iter()
                .flat_map(|p| &p.actions)
                .all(|a| a.action_type == ActionType::Delete)
        );
    }

    #[test]
    fn test_tagged_delete_carries_filter() {
        let plan = plan_clear(&deployment().database);
        let terminate = &plan.actions[0];
        assert_eq!(terminate.resource_id, "shop-database-instance");
        assert_eq!(
            terminate.details["filter"]["name"],
            serde_json::json!("tag:Name")
        );
    }

    #[test]
    fn test_action_ids_unique() {
        let plan = plan_provision(&deployment().app);
        let mut ids: Vec<_> = plan.actions.iter().map(|a| a.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), plan.actions.len());
    }
}
