//! Delete operations
//!
//! Each returns how many resources it removed; zero means nothing matched.

use super::Provisioner;
use crate::action::ResourceKind;
use crate::error::Result;
use crate::provider::InstanceState;
use crate::state::{StateChange, resource_key};
use tracing::{debug, info};

impl Provisioner<'_> {
    /// Force-delete the autoscaling group and wait until it is gone
    pub async fn delete_autoscaling(&mut self) -> Result<usize> {
        let stack = self.stack;
        let Some(spec) = &stack.autoscaling else {
            return Ok(0);
        };
        let plane = self.plane;
        let name = spec.name.as_str();

        if !plane.auto_scaling_group_exists(name).await? {
            debug!(group = name, "No autoscaling group to delete");
            return Ok(0);
        }

        plane.delete_auto_scaling_group(name).await?;
        self.poller
            .until(&format!("autoscaling group {} removal", name), move || async move {
                Ok(!plane.auto_scaling_group_exists(name).await?)
            })
            .await?;
        info!(group = name, "Autoscaling group deleted");

        self.forget(ResourceKind::AutoScalingGroup, name);
        Ok(1)
    }

    pub async fn delete_launch_configuration(&mut self) -> Result<usize> {
        let stack = self.stack;
        let Some(spec) = &stack.launch_configuration else {
            return Ok(0);
        };
        let name = spec.name.as_str();

        if !self.plane.launch_configuration_exists(name).await? {
            debug!(launch_configuration = name, "No launch configuration to delete");
            return Ok(0);
        }

        self.plane.delete_launch_configuration(name).await?;
        info!(launch_configuration = name, "Launch configuration deleted");

        self.forget(ResourceKind::LaunchConfiguration, name);
        Ok(1)
    }

    /// Delete the load balancer and wait until it is no longer listed
    pub async fn delete_load_balancer(&mut self) -> Result<usize> {
        let stack = self.stack;
        let Some(spec) = &stack.load_balancer else {
            return Ok(0);
        };
        let plane = self.plane;
        let name = spec.name.as_str();

        let listed = plane
            .list_load_balancers()
            .await?
            .iter()
            .any(|lb| lb.name == name);
        if !listed {
            debug!(load_balancer = name, "No load balancer to delete");
            return Ok(0);
        }

        plane.delete_load_balancer(name).await?;
        self.poller
            .until(&format!("load balancer {} removal", name), move || async move {
                Ok(!plane
                    .list_load_balancers()
                    .await?
                    .iter()
                    .any(|lb| lb.name == name))
            })
            .await?;
        info!(load_balancer = name, "Load balancer deleted");

        self.forget(ResourceKind::LoadBalancer, name);
        Ok(1)
    }

    /// Deregister every owned image with the configured name
    pub async fn delete_image(&mut self) -> Result<usize> {
        let stack = self.stack;
        let Some(spec) = &stack.image else {
            return Ok(0);
        };

        let image_ids = self.plane.find_images(&spec.name).await?;
        for image_id in &image_ids {
            self.plane.deregister_image(image_id).await?;
            info!(image = %image_id, "Image deregistered");
        }

        if !image_ids.is_empty() {
            self.forget(ResourceKind::Image, &spec.name);
        }
        Ok(image_ids.len())
    }

    /// Terminate running instances carrying the instance tag and wait until they are gone
    pub async fn delete_instances(&mut self) -> Result<usize> {
        let stack = self.stack;
        let plane = self.plane;
        let tag = &stack.instance.tag;

        // stale records go even when the instance was stopped or terminated elsewhere
        self.forget(ResourceKind::Instance, &tag.value);

        let instance_ids = plane.find_instances(tag, InstanceState::Running).await?;
        if instance_ids.is_empty() {
            debug!(tag = %tag.value, "No running instances to terminate");
            return Ok(0);
        }

        plane.terminate_instances(&instance_ids).await?;
        for instance_id in &instance_ids {
            let id = instance_id.as_str();
            self.poller
                .until(&format!("instance {} termination", id), move || async move {
                    Ok(match plane.describe_instance(id).await? {
                        Some(info) => info.state == InstanceState::Terminated,
                        None => true,
                    })
                })
                .await?;
            info!(instance = id, "Instance terminated");
        }

        if self
            .context
            .instance_id
            .as_ref()
            .is_some_and(|id| instance_ids.contains(id))
        {
            self.context.instance_id = None;
        }
        Ok(instance_ids.len())
    }

    /// Delete security groups carrying the tag, retrying while dependents detach
    pub async fn delete_security_group(&mut self) -> Result<usize> {
        let stack = self.stack;
        let plane = self.plane;
        let spec = &stack.security_group;

        let group_ids = plane.find_security_groups(&spec.tag).await?;
        for group_id in &group_ids {
            let id = group_id.as_str();
            self.poller
                .retry(&format!("security group {} deletion", id), move || {
                    plane.delete_security_group(id)
                })
                .await?;
            info!(group = id, "Security group deleted");
        }

        if !group_ids.is_empty() {
            self.forget(ResourceKind::SecurityGroup, &spec.name);
        }
        Ok(group_ids.len())
    }

    pub async fn delete_key_pairs(&mut self) -> Result<usize> {
        let stack = self.stack;
        let spec = &stack.key_pair;

        let key_pair_ids = self.plane.find_key_pairs(&spec.tag).await?;
        for key_pair_id in &key_pair_ids {
            self.plane.delete_key_pair(key_pair_id).await?;
            info!(key_pair = %key_pair_id, "Key pair deleted");
        }

        if !key_pair_ids.is_empty() {
            self.forget(ResourceKind::KeyPair, &spec.name);
        }
        Ok(key_pair_ids.len())
    }

    fn forget(&mut self, kind: ResourceKind, name: &str) {
        let key = resource_key(&self.stack.region, kind, name);
        self.context.changes.push(StateChange::Remove { key });
    }
}
