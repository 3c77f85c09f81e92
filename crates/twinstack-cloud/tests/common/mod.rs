//! In-memory control plane for runbook tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use twinstack_cloud::{
    AuthStatus, CloudError, ControlPlane, CreatedKeyPair, ImageState, InstanceInfo,
    InstanceState, LaunchConfigurationRequest, LoadBalancerInfo, NetworkLayout, Result,
    RunInstanceRequest,
};
use twinstack_core::{AutoScalingSpec, IngressRule, LoadBalancerSpec, SecurityGroupSpec, Tag};

#[derive(Debug, Clone)]
pub struct FakeInstance {
    pub id: String,
    pub tag: Tag,
    pub state: InstanceState,
    pub user_data: Option<String>,
    /// Describes left before the instance reports running + status ok
    pub warmup: u32,
}

#[derive(Debug, Default)]
pub struct FakeCloud {
    pub key_pairs: Vec<(String, String, Tag)>,
    pub security_groups: Vec<(String, Tag, Vec<IngressRule>)>,
    pub instances: Vec<FakeInstance>,
    pub images: Vec<(String, String, u32)>,
    pub load_balancers: Vec<LoadBalancerInfo>,
    pub launch_configurations: Vec<(String, String)>,
    pub auto_scaling_groups: Vec<(String, String, String, Vec<String>)>,
    next_id: u32,
}

impl FakeCloud {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }
}

pub struct FakePlane {
    region: String,
    pub cloud: Mutex<FakeCloud>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    /// Failures left for delete_security_group before it succeeds
    sg_delete_failures: Mutex<u32>,
}

impl FakePlane {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            cloud: Mutex::new(FakeCloud::default()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            sg_delete_failures: Mutex::new(0),
        }
    }

    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn fail_security_group_deletes(&self, times: u32) {
        *self.sg_delete_failures.lock().unwrap() = times;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that change something, in order
    pub fn mutations(&self) -> Vec<String> {
        const MUTATING: [&str; 14] = [
            "create_key_pair",
            "delete_key_pair",
            "create_security_group",
            "delete_security_group",
            "run_instance",
            "terminate_instances",
            "create_image",
            "deregister_image",
            "create_load_balancer",
            "delete_load_balancer",
            "create_launch_configuration",
            "delete_launch_configuration",
            "create_auto_scaling_group",
            "delete_auto_scaling_group",
        ];
        self.calls()
            .into_iter()
            .filter(|c| MUTATING.contains(&c.as_str()))
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| *c == method).count()
    }

    /// Leave behind everything a finished app-tier run would have created
    pub fn seed_previous_run(&self, tag_prefix: &str, image: &str, lb: &str, lc: &str, asg: &str) {
        let mut cloud = self.cloud.lock().unwrap();
        cloud.key_pairs.push((
            "key-old".to_string(),
            tag_prefix.to_string(),
            Tag::name(format!("{}-key", tag_prefix)),
        ));
        cloud.security_groups.push((
            "sg-old".to_string(),
            Tag::name(format!("{}-sg", tag_prefix)),
            Vec::new(),
        ));
        cloud.instances.push(FakeInstance {
            id: "i-old".to_string(),
            tag: Tag::name(format!("{}-instance", tag_prefix)),
            state: InstanceState::Running,
            user_data: None,
            warmup: 0,
        });
        cloud.images.push(("ami-old".to_string(), image.to_string(), 0));
        cloud.load_balancers.push(LoadBalancerInfo {
            name: lb.to_string(),
            dns_name: Some(format!("{}-old.elb.example", lb)),
        });
        cloud
            .launch_configurations
            .push((lc.to_string(), "ami-old".to_string()));
        cloud.auto_scaling_groups.push((
            asg.to_string(),
            lc.to_string(),
            lb.to_string(),
            vec!["us-east-1a".to_string()],
        ));
    }

    fn enter(&self, method: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.failing.lock().unwrap().contains(method) {
            return Err(CloudError::ApiError(format!("{} rejected", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for FakePlane {
    fn name(&self) -> &str {
        "fake"
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok(self.region.clone()))
    }

    async fn network_layout(&self) -> Result<NetworkLayout> {
        self.enter("network_layout")?;
        Ok(NetworkLayout {
            vpc_id: Some("vpc-default".to_string()),
            subnet_ids: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            availability_zones: vec![format!("{}a", self.region), format!("{}b", self.region)],
        })
    }

    async fn create_key_pair(&self, name: &str, tag: &Tag) -> Result<CreatedKeyPair> {
        self.enter("create_key_pair")?;
        let mut cloud = self.cloud.lock().unwrap();
        let id = cloud.next_id("key");
        cloud.key_pairs.push((id.clone(), name.to_string(), tag.clone()));
        Ok(CreatedKeyPair {
            key_pair_id: id,
            key_material: format!("PRIVATE KEY FOR {}", name),
        })
    }

    async fn find_key_pairs(&self, tag: &Tag) -> Result<Vec<String>> {
        self.enter("find_key_pairs")?;
        let cloud = self.cloud.lock().unwrap();
        Ok(cloud
            .key_pairs
            .iter()
            .filter(|(_, _, t)| t == tag)
            .map(|(id, _, _)| id.clone())
            .collect())
    }

    async fn delete_key_pair(&self, key_pair_id: &str) -> Result<()> {
        self.enter("delete_key_pair")?;
        self.cloud
            .lock()
            .unwrap()
            .key_pairs
            .retain(|(id, _, _)| id != key_pair_id);
        Ok(())
    }

    async fn create_security_group(
        &self,
        spec: &SecurityGroupSpec,
        vpc_id: Option<&str>,
    ) -> Result<String> {
        self.enter("create_security_group")?;
        assert_eq!(vpc_id, Some("vpc-default"));
        let mut cloud = self.cloud.lock().unwrap();
        let id = cloud.next_id("sg");
        cloud
            .security_groups
            .push((id.clone(), spec.tag.clone(), Vec::new()));
        Ok(id)
    }

    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()> {
        self.enter("authorize_ingress")?;
        let mut cloud = self.cloud.lock().unwrap();
        let group = cloud
            .security_groups
            .iter_mut()
            .find(|(id, _, _)| id == group_id)
            .ok_or_else(|| CloudError::ResourceNotFound(group_id.to_string()))?;
        group.2.extend_from_slice(rules);
        Ok(())
    }

    async fn find_security_groups(&self, tag: &Tag) -> Result<Vec<String>> {
        self.enter("find_security_groups")?;
        let cloud = self.cloud.lock().unwrap();
        Ok(cloud
            .security_groups
            .iter()
            .filter(|(_, t, _)| t == tag)
            .map(|(id, _, _)| id.clone())
            .collect())
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.enter("delete_security_group")?;
        {
            let mut failures = self.sg_delete_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(CloudError::ApiError(
                    "DependencyViolation: resource has a dependent object".to_string(),
                ));
            }
        }
        self.cloud
            .lock()
            .unwrap()
            .security_groups
            .retain(|(id, _, _)| id != group_id);
        Ok(())
    }

    async fn run_instance(&self, request: &RunInstanceRequest<'_>) -> Result<String> {
        self.enter("run_instance")?;
        let mut cloud = self.cloud.lock().unwrap();
        let id = cloud.next_id("i");
        cloud.instances.push(FakeInstance {
            id: id.clone(),
            tag: request.tag.clone(),
            state: InstanceState::Pending,
            user_data: request.user_data.map(str::to_string),
            warmup: 2,
        });
        Ok(id)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>> {
        self.enter("describe_instance")?;
        let mut cloud = self.cloud.lock().unwrap();
        let Some(instance) = cloud.instances.iter_mut().find(|i| i.id == instance_id) else {
            return Ok(None);
        };
        if instance.state == InstanceState::Pending {
            if instance.warmup == 0 {
                instance.state = InstanceState::Running;
            } else {
                instance.warmup -= 1;
            }
        }
        let running = instance.state == InstanceState::Running;
        Ok(Some(InstanceInfo {
            instance_id: instance.id.clone(),
            state: instance.state,
            status_ok: running,
            public_ip: running.then(|| format!("203.0.113.{}", instance.id.len())),
        }))
    }

    async fn find_instances(&self, tag: &Tag, state: InstanceState) -> Result<Vec<String>> {
        self.enter("find_instances")?;
        let cloud = self.cloud.lock().unwrap();
        Ok(cloud
            .instances
            .iter()
            .filter(|i| &i.tag == tag && i.state == state)
            .map(|i| i.id.clone())
            .collect())
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        self.enter("terminate_instances")?;
        let mut cloud = self.cloud.lock().unwrap();
        for instance in cloud
            .instances
            .iter_mut()
            .filter(|i| instance_ids.contains(&i.id))
        {
            instance.state = InstanceState::Terminated;
        }
        Ok(())
    }

    async fn create_image(&self, instance_id: &str, name: &str) -> Result<String> {
        self.enter("create_image")?;
        let mut cloud = self.cloud.lock().unwrap();
        if !cloud.instances.iter().any(|i| i.id == instance_id) {
            return Err(CloudError::ResourceNotFound(instance_id.to_string()));
        }
        let id = cloud.next_id("ami");
        cloud.images.push((id.clone(), name.to_string(), 1));
        Ok(id)
    }

    async fn image_state(&self, image_id: &str) -> Result<Option<ImageState>> {
        self.enter("image_state")?;
        let mut cloud = self.cloud.lock().unwrap();
        let Some(image) = cloud.images.iter_mut().find(|(id, _, _)| id == image_id) else {
            return Ok(None);
        };
        if image.2 > 0 {
            image.2 -= 1;
            return Ok(Some(ImageState::Pending));
        }
        Ok(Some(ImageState::Available))
    }

    async fn find_images(&self, name: &str) -> Result<Vec<String>> {
        self.enter("find_images")?;
        let cloud = self.cloud.lock().unwrap();
        Ok(cloud
            .images
            .iter()
            .filter(|(_, n, _)| n == name)
            .map(|(id, _, _)| id.clone())
            .collect())
    }

    async fn deregister_image(&self, image_id: &str) -> Result<()> {
        self.enter("deregister_image")?;
        self.cloud
            .lock()
            .unwrap()
            .images
            .retain(|(id, _, _)| id != image_id);
        Ok(())
    }

    async fn create_load_balancer(
        &self,
        spec: &LoadBalancerSpec,
        subnet_ids: &[String],
        _security_group_id: &str,
    ) -> Result<Option<String>> {
        self.enter("create_load_balancer")?;
        assert_eq!(subnet_ids.len(), 2);
        let dns = format!("{}-1.{}.elb.example", spec.name, self.region);
        self.cloud.lock().unwrap().load_balancers.push(LoadBalancerInfo {
            name: spec.name.clone(),
            dns_name: Some(dns.clone()),
        });
        Ok(Some(dns))
    }

    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancerInfo>> {
        self.enter("list_load_balancers")?;
        Ok(self.cloud.lock().unwrap().load_balancers.clone())
    }

    async fn delete_load_balancer(&self, name: &str) -> Result<()> {
        self.enter("delete_load_balancer")?;
        self.cloud
            .lock()
            .unwrap()
            .load_balancers
            .retain(|lb| lb.name != name);
        Ok(())
    }

    async fn create_launch_configuration(
        &self,
        request: &LaunchConfigurationRequest<'_>,
    ) -> Result<()> {
        self.enter("create_launch_configuration")?;
        assert!(request.monitoring);
        self.cloud
            .lock()
            .unwrap()
            .launch_configurations
            .push((request.name.to_string(), request.image_id.to_string()));
        Ok(())
    }

    async fn launch_configuration_exists(&self, name: &str) -> Result<bool> {
        self.enter("launch_configuration_exists")?;
        Ok(self
            .cloud
            .lock()
            .unwrap()
            .launch_configurations
            .iter()
            .any(|(n, _)| n == name))
    }

    async fn delete_launch_configuration(&self, name: &str) -> Result<()> {
        self.enter("delete_launch_configuration")?;
        self.cloud
            .lock()
            .unwrap()
            .launch_configurations
            .retain(|(n, _)| n != name);
        Ok(())
    }

    async fn create_auto_scaling_group(
        &self,
        spec: &AutoScalingSpec,
        launch_configuration: &str,
        load_balancer: &str,
        availability_zones: &[String],
    ) -> Result<()> {
        self.enter("create_auto_scaling_group")?;
        self.cloud.lock().unwrap().auto_scaling_groups.push((
            spec.name.clone(),
            launch_configuration.to_string(),
            load_balancer.to_string(),
            availability_zones.to_vec(),
        ));
        Ok(())
    }

    async fn auto_scaling_group_exists(&self, name: &str) -> Result<bool> {
        self.enter("auto_scaling_group_exists")?;
        Ok(self
            .cloud
            .lock()
            .unwrap()
            .auto_scaling_groups
            .iter()
            .any(|(n, _, _, _)| n == name))
    }

    async fn delete_auto_scaling_group(&self, name: &str) -> Result<()> {
        self.enter("delete_auto_scaling_group")?;
        self.cloud
            .lock()
            .unwrap()
            .auto_scaling_groups
            .retain(|(n, _, _, _)| n != name);
        Ok(())
    }
}
