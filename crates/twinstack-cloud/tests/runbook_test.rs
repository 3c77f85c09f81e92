//! Runbook behaviour against an in-memory control plane

mod common;

use common::FakePlane;
use serde_json::json;
use std::time::Duration;
use twinstack_cloud::{
    ApplyEvent, GlobalState, InstanceState, Poller, Provisioner, ResourceKind, ResourceState,
    plan_clear, plan_provision, resource_key,
};
use twinstack_core::{Deployment, parse_deployment_str};

fn deployment() -> Deployment {
    parse_deployment_str(
        r#"
        project "shop"
        region "database" {
            name "us-east-2"
            image "ami-db"
        }
        region "app" {
            name "us-east-1"
            image "ami-app"
            image-name "shop-image"
            load-balancer "shop-lb" port=8080
            launch-configuration "shop-lc"
            autoscaling "shop-asg" min=2 max=3 desired=2
        }
        "#,
        "unused".to_string(),
    )
    .unwrap()
}

fn poller() -> Poller {
    Poller::new(Duration::from_secs(10), Some(20))
}

fn seeded_app_plane() -> FakePlane {
    let plane = FakePlane::new("us-east-1");
    plane.seed_previous_run("shop-app", "shop-image", "shop-lb", "shop-lc", "shop-asg");
    plane
}

#[tokio::test(start_paused = true)]
async fn database_provision_from_empty_region() {
    let deployment = deployment();
    let plane = FakePlane::new("us-east-2");
    let keys = tempfile::tempdir().unwrap();

    let mut provisioner = Provisioner::new(&plane, &deployment.database, poller())
        .with_key_dir(keys.path())
        .with_user_data(Some("#!/bin/bash\necho db".to_string()));
    let result = provisioner.apply(&plan_provision(&deployment.database)).await;

    assert!(result.is_success(), "failed: {:?}", result.failed);
    assert_eq!(
        plane.mutations(),
        vec!["create_key_pair", "create_security_group", "run_instance"]
    );

    let context = provisioner.context();
    assert!(context.public_ip.is_some());
    assert_eq!(context.key_pair_name.as_deref(), Some("shop-database"));

    let key_file = keys.path().join("database_instance");
    assert_eq!(context.key_file.as_deref(), Some(key_file.as_path()));
    assert_eq!(
        std::fs::read_to_string(&key_file).unwrap(),
        "PRIVATE KEY FOR shop-database"
    );

    let cloud = plane.cloud.lock().unwrap();
    assert_eq!(
        cloud.instances[0].user_data.as_deref(),
        Some("#!/bin/bash\necho db")
    );
    // default database ingress: ssh + postgres
    let ports: Vec<u16> = cloud.security_groups[0].2.iter().map(|r| r.from_port).collect();
    assert_eq!(ports, vec![22, 5432]);
}

#[tokio::test(start_paused = true)]
async fn app_provision_replaces_previous_run() {
    let deployment = deployment();
    let plane = seeded_app_plane();
    let keys = tempfile::tempdir().unwrap();

    let mut provisioner =
        Provisioner::new(&plane, &deployment.app, poller()).with_key_dir(keys.path());
    let result = provisioner.apply(&plan_provision(&deployment.app)).await;

    assert!(result.is_success(), "failed: {:?}", result.failed);
    assert_eq!(
        plane.mutations(),
        vec![
            "delete_auto_scaling_group",
            "delete_load_balancer",
            "delete_launch_configuration",
            "deregister_image",
            "terminate_instances",
            "delete_security_group",
            "delete_key_pair",
            "create_key_pair",
            "create_security_group",
            "run_instance",
            "create_image",
            "terminate_instances",
            "create_load_balancer",
            "create_launch_configuration",
            "create_auto_scaling_group",
        ]
    );

    let context = provisioner.context();
    let image_id = context.image_id.clone().unwrap();
    assert_eq!(
        context.load_balancer_dns.as_deref(),
        Some("shop-lb-1.us-east-1.elb.example")
    );
    // template instance is gone once the image exists
    assert!(context.instance_id.is_none());

    let cloud = plane.cloud.lock().unwrap();
    assert!(
        cloud
            .instances
            .iter()
            .all(|i| i.state == InstanceState::Terminated)
    );
    assert_eq!(cloud.images.len(), 1);
    assert_eq!(cloud.launch_configurations, vec![("shop-lc".to_string(), image_id)]);
    let (name, lc, lb, zones) = &cloud.auto_scaling_groups[0];
    assert_eq!((name.as_str(), lc.as_str(), lb.as_str()), ("shop-asg", "shop-lc", "shop-lb"));
    assert_eq!(zones, &vec!["us-east-1a".to_string(), "us-east-1b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn failed_create_skips_rest_of_region() {
    let deployment = deployment();
    let plane = FakePlane::new("us-east-1");
    plane.fail("create_image");
    let keys = tempfile::tempdir().unwrap();

    let mut provisioner =
        Provisioner::new(&plane, &deployment.app, poller()).with_key_dir(keys.path());
    let result = provisioner.apply(&plan_provision(&deployment.app)).await;

    assert!(!result.is_success());
    assert_eq!(result.failed.len(), 1);
    assert!(result.failed[0].action_id.contains("create-image"));
    assert_eq!(result.skipped.len(), 4);
    assert!(result.skipped[0].message.contains("create-image"));
    assert_eq!(plane.count("create_load_balancer"), 0);
    assert_eq!(plane.count("create_auto_scaling_group"), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_delete_does_not_stop_run() {
    let deployment = deployment();
    let plane = seeded_app_plane();
    plane.fail("delete_launch_configuration");
    let keys = tempfile::tempdir().unwrap();

    let mut provisioner =
        Provisioner::new(&plane, &deployment.app, poller()).with_key_dir(keys.path());
    let result = provisioner.apply(&plan_provision(&deployment.app)).await;

    assert_eq!(result.failed.len(), 1);
    assert!(result.failed[0].action_id.contains("delete-launch-configuration"));
    assert!(result.skipped.is_empty());
    assert_eq!(plane.count("create_auto_scaling_group"), 1);
}

#[tokio::test(start_paused = true)]
async fn security_group_delete_is_retried() {
    let deployment = deployment();
    let plane = seeded_app_plane();
    plane.fail_security_group_deletes(2);

    let mut provisioner = Provisioner::new(&plane, &deployment.app, poller());
    let result = provisioner.apply(&plan_clear(&deployment.app)).await;

    assert!(result.is_success(), "failed: {:?}", result.failed);
    assert_eq!(plane.count("delete_security_group"), 3);
    assert!(plane.cloud.lock().unwrap().security_groups.is_empty());
}

#[tokio::test(start_paused = true)]
async fn security_group_retry_gives_up_when_bounded() {
    let deployment = deployment();
    let plane = seeded_app_plane();
    plane.fail_security_group_deletes(100);

    let poller = Poller::new(Duration::from_secs(10), Some(3));
    let mut provisioner = Provisioner::new(&plane, &deployment.app, poller);
    let result = provisioner.apply(&plan_clear(&deployment.app)).await;

    assert_eq!(plane.count("delete_security_group"), 3);
    assert_eq!(result.failed.len(), 1);
    let error = result.failed[0].error.as_deref().unwrap();
    assert!(error.contains("Timeout"));
    assert!(error.contains("DependencyViolation"));
    // key pairs are still cleared after the failed delete
    assert!(plane.cloud.lock().unwrap().key_pairs.is_empty());
}

#[tokio::test(start_paused = true)]
async fn clearing_an_empty_region_is_a_no_op() {
    let deployment = deployment();
    let plane = FakePlane::new("us-east-1");

    let mut provisioner = Provisioner::new(&plane, &deployment.app, poller());
    let result = provisioner.apply(&plan_clear(&deployment.app)).await;

    assert!(result.is_success());
    assert!(plane.mutations().is_empty());
    assert!(
        result
            .succeeded
            .iter()
            .all(|r| r.message == "nothing to delete")
    );
}

#[tokio::test(start_paused = true)]
async fn apply_reports_events_in_order() {
    let deployment = deployment();
    let plane = FakePlane::new("us-east-2");
    plane.fail("create_security_group");
    let keys = tempfile::tempdir().unwrap();

    let mut events = Vec::new();
    let mut provisioner =
        Provisioner::new(&plane, &deployment.database, poller()).with_key_dir(keys.path());
    provisioner
        .apply_with(&plan_provision(&deployment.database), |event| {
            events.push(match event {
                ApplyEvent::Started(a) => format!("start {}", a.resource_kind),
                ApplyEvent::Succeeded(a, _) => format!("ok {}", a.resource_kind),
                ApplyEvent::Failed(a, _) => format!("fail {}", a.resource_kind),
                ApplyEvent::Skipped(a) => format!("skip {}", a.resource_kind),
            })
        })
        .await;

    assert_eq!(
        events[events.len() - 5..],
        [
            "start key-pair",
            "ok key-pair",
            "start security-group",
            "fail security-group",
            "skip instance",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn state_changes_track_what_remains() {
    let deployment = deployment();
    let plane = seeded_app_plane();
    let keys = tempfile::tempdir().unwrap();

    let mut provisioner =
        Provisioner::new(&plane, &deployment.app, poller()).with_key_dir(keys.path());
    provisioner.apply(&plan_provision(&deployment.app)).await;
    let context = provisioner.into_context();

    let mut state = GlobalState::new();
    state.apply_changes(&context.changes);

    let lb = state
        .get_resource(&resource_key("us-east-1", ResourceKind::LoadBalancer, "shop-lb"))
        .unwrap();
    assert_eq!(
        lb.get_attribute::<String>("dns_name").as_deref(),
        Some("shop-lb-1.us-east-1.elb.example")
    );
    assert!(state.find_kind("us-east-1", ResourceKind::AutoScalingGroup).is_some());
    assert!(state.find_kind("us-east-1", ResourceKind::Instance).is_none());
    assert_eq!(state.region_resources("us-east-1").len(), 6);
}

#[tokio::test(start_paused = true)]
async fn database_record_is_replaced_when_old_instance_vanished() {
    let deployment = deployment();
    let database = &deployment.database;
    let tag = database.instance.tag.value.clone();
    let key = resource_key("us-east-2", ResourceKind::Instance, &tag);

    // the previous instance was terminated outside twinstack; only its record remains
    let mut state = GlobalState::new();
    state.set_resource(
        key.clone(),
        ResourceState::new("i-0000", ResourceKind::Instance, "us-east-2")
            .with_attribute("public_ip", json!("198.51.100.99"))
            .with_attribute("tag", json!(tag)),
    );

    let plane = FakePlane::new("us-east-2");
    let keys = tempfile::tempdir().unwrap();
    let mut provisioner =
        Provisioner::new(&plane, database, poller()).with_key_dir(keys.path());
    let result = provisioner.apply(&plan_provision(database)).await;
    assert!(result.is_success(), "failed: {:?}", result.failed);
    assert_eq!(plane.count("terminate_instances"), 0);

    let context = provisioner.into_context();
    state.apply_changes(&context.changes);

    let instances: Vec<_> = state
        .region_resources("us-east-2")
        .into_iter()
        .filter(|(_, r)| r.kind == ResourceKind::Instance)
        .collect();
    assert_eq!(instances.len(), 1);
    let (recorded_key, recorded) = instances[0];
    assert_eq!(recorded_key, &key);
    assert_ne!(recorded.id, "i-0000");
    assert_eq!(
        recorded.get_attribute::<String>("public_ip"),
        context.public_ip
    );
}

#[tokio::test(start_paused = true)]
async fn clear_forgets_instance_record_without_running_instance() {
    let deployment = deployment();
    let database = &deployment.database;
    let key = resource_key("us-east-2", ResourceKind::Instance, &database.instance.tag.value);

    let mut state = GlobalState::new();
    state.set_resource(
        key.clone(),
        ResourceState::new("i-gone", ResourceKind::Instance, "us-east-2"),
    );

    let plane = FakePlane::new("us-east-2");
    let mut provisioner = Provisioner::new(&plane, database, poller());
    let result = provisioner.apply(&plan_clear(database)).await;
    assert!(result.is_success());

    state.apply_changes(&provisioner.context().changes);
    assert!(state.get_resource(&key).is_none());
}
