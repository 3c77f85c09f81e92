//! Create operations

use super::{Provisioner, write_private_key};
use crate::action::ResourceKind;
use crate::error::{CloudError, Result};
use crate::provider::{ImageState, InstanceState, LaunchConfigurationRequest, RunInstanceRequest};
use crate::state::{ResourceState, ResourceStatus, StateChange, resource_key};
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

impl Provisioner<'_> {
    /// Create the key pair and write its private key under the key directory
    pub async fn generate_key_pair(&mut self) -> Result<PathBuf> {
        let stack = self.stack;
        let spec = &stack.key_pair;
        let created = self.plane.create_key_pair(&spec.name, &spec.tag).await?;
        let path = write_private_key(&self.key_dir, &spec.file_name, &created.key_material).await?;
        info!(key_pair = %spec.name, file = %path.display(), "Key pair created");

        self.record(
            ResourceKind::KeyPair,
            &spec.name,
            ResourceState::new(&created.key_pair_id, ResourceKind::KeyPair, &stack.region)
                .with_status(ResourceStatus::Available)
                .with_attribute("key_file", json!(path.display().to_string())),
        );
        self.context.key_pair_name = Some(spec.name.clone());
        self.context.key_pair_id = Some(created.key_pair_id);
        self.context.key_file = Some(path.clone());
        Ok(path)
    }

    /// Create the security group in the default VPC and open its ingress ports
    pub async fn create_security_group(&mut self) -> Result<String> {
        let stack = self.stack;
        let spec = &stack.security_group;
        let layout = self.network_layout().await?;

        let group_id = self
            .plane
            .create_security_group(spec, layout.vpc_id.as_deref())
            .await?;
        if !spec.ingress.is_empty() {
            self.plane.authorize_ingress(&group_id, &spec.ingress).await?;
        }
        info!(group = %spec.name, id = %group_id, "Security group created");

        self.record(
            ResourceKind::SecurityGroup,
            &spec.name,
            ResourceState::new(&group_id, ResourceKind::SecurityGroup, &stack.region)
                .with_status(ResourceStatus::Available),
        );
        self.context.security_group_id = Some(group_id.clone());
        Ok(group_id)
    }

    /// Launch one instance, wait until its status checks pass, return its public IP
    pub async fn create_instance(&mut self) -> Result<String> {
        let stack = self.stack;
        let spec = &stack.instance;
        let key_name = Self::require(&self.context.key_pair_name, "key pair")?;
        let group_id = Self::require(&self.context.security_group_id, "security group")?;

        let request = RunInstanceRequest {
            image_id: &spec.image_id,
            instance_type: &spec.instance_type,
            key_name: &key_name,
            security_group_id: &group_id,
            tag: &spec.tag,
            user_data: self.user_data.as_deref(),
        };
        let instance_id = self.plane.run_instance(&request).await?;
        self.context.instance_id = Some(instance_id.clone());
        info!(instance = %instance_id, "Instance launched");

        let plane = self.plane;
        let id = instance_id.as_str();
        let public_ip = self
            .poller
            .until_some(&format!("instance {} status ok", id), move || async move {
                let Some(info) = plane.describe_instance(id).await? else {
                    return Ok(None);
                };
                match info.state {
                    InstanceState::Running if info.status_ok => Ok(Some(info.public_ip)),
                    InstanceState::ShuttingDown | InstanceState::Terminated => {
                        Err(CloudError::ApiError(format!(
                            "instance {} is {} while waiting for it to start",
                            id, info.state
                        )))
                    }
                    state => {
                        debug!(instance = id, %state, "Instance not ready");
                        Ok(None)
                    }
                }
            })
            .await?
            .ok_or_else(|| {
                CloudError::ApiError(format!("instance {} has no public IP", instance_id))
            })?;

        // one instance per tag: a new run replaces the previous record
        self.record(
            ResourceKind::Instance,
            &spec.tag.value,
            ResourceState::new(&instance_id, ResourceKind::Instance, &stack.region)
                .with_status(ResourceStatus::Running)
                .with_attribute("public_ip", json!(public_ip))
                .with_attribute("tag", json!(spec.tag.value)),
        );
        self.context.public_ip = Some(public_ip.clone());
        Ok(public_ip)
    }

    /// Capture an image of the running instance and wait until it is available
    pub async fn create_image(&mut self) -> Result<String> {
        let stack = self.stack;
        let spec = stack.image.as_ref().ok_or_else(|| {
            CloudError::InvalidConfig(format!("region {} has no image", stack.region))
        })?;
        let instance_id = Self::require(&self.context.instance_id, "instance")?;

        let image_id = self.plane.create_image(&instance_id, &spec.name).await?;
        info!(image = %image_id, from = %instance_id, "Image requested");

        let plane = self.plane;
        let id = image_id.as_str();
        self.poller
            .until(&format!("image {} available", id), move || async move {
                match plane.image_state(id).await? {
                    Some(ImageState::Available) => Ok(true),
                    Some(ImageState::Failed) => {
                        Err(CloudError::ApiError(format!("image {} failed", id)))
                    }
                    _ => Ok(false),
                }
            })
            .await?;

        self.record(
            ResourceKind::Image,
            &spec.name,
            ResourceState::new(&image_id, ResourceKind::Image, &stack.region)
                .with_status(ResourceStatus::Available),
        );
        self.context.image_id = Some(image_id.clone());
        Ok(image_id)
    }

    /// Create the load balancer over every default subnet and wait until it is listed
    pub async fn create_load_balancer(&mut self) -> Result<String> {
        let stack = self.stack;
        let spec = stack.load_balancer.as_ref().ok_or_else(|| {
            CloudError::InvalidConfig(format!("region {} has no load balancer", stack.region))
        })?;
        let group_id = Self::require(&self.context.security_group_id, "security group")?;
        let layout = self.network_layout().await?;

        let created_dns = self
            .plane
            .create_load_balancer(spec, &layout.subnet_ids, &group_id)
            .await?;

        let plane = self.plane;
        let name = spec.name.as_str();
        let listed = self
            .poller
            .until_some(&format!("load balancer {}", name), move || async move {
                Ok(plane
                    .list_load_balancers()
                    .await?
                    .into_iter()
                    .find(|lb| lb.name == name))
            })
            .await?;

        let dns_name = listed.dns_name.or(created_dns).ok_or_else(|| {
            CloudError::ApiError(format!("load balancer {} has no DNS name", name))
        })?;
        info!(load_balancer = %name, dns = %dns_name, "Load balancer ready");

        self.record(
            ResourceKind::LoadBalancer,
            name,
            ResourceState::new(name, ResourceKind::LoadBalancer, &stack.region)
                .with_status(ResourceStatus::Available)
                .with_attribute("dns_name", json!(dns_name))
                .with_attribute("port", json!(spec.port)),
        );
        self.context.load_balancer_dns = Some(dns_name.clone());
        Ok(dns_name)
    }

    /// Create the launch configuration from the captured image
    pub async fn create_launch_configuration(&mut self) -> Result<String> {
        let stack = self.stack;
        let spec = stack.launch_configuration.as_ref().ok_or_else(|| {
            CloudError::InvalidConfig(format!(
                "region {} has no launch configuration",
                stack.region
            ))
        })?;
        let image_id = Self::require(&self.context.image_id, "image")?;
        let key_name = Self::require(&self.context.key_pair_name, "key pair")?;
        let group_id = Self::require(&self.context.security_group_id, "security group")?;

        self.plane
            .create_launch_configuration(&LaunchConfigurationRequest {
                name: &spec.name,
                image_id: &image_id,
                instance_type: &spec.instance_type,
                key_name: &key_name,
                security_group_id: &group_id,
                monitoring: spec.monitoring,
            })
            .await?;
        info!(launch_configuration = %spec.name, image = %image_id, "Launch configuration created");

        self.record(
            ResourceKind::LaunchConfiguration,
            &spec.name,
            ResourceState::new(&spec.name, ResourceKind::LaunchConfiguration, &stack.region)
                .with_status(ResourceStatus::Available)
                .with_attribute("image_id", json!(image_id)),
        );
        Ok(format!("launch configuration {} uses {}", spec.name, image_id))
    }

    /// Create the autoscaling group in every zone and wait until it is described
    pub async fn create_autoscaling(&mut self) -> Result<String> {
        let stack = self.stack;
        let region = &stack.region;
        let spec = stack.autoscaling.as_ref().ok_or_else(|| {
            CloudError::InvalidConfig(format!("region {} has no autoscaling group", region))
        })?;
        let launch_configuration = stack.launch_configuration.as_ref().ok_or_else(|| {
            CloudError::InvalidConfig(format!("region {} has no launch configuration", region))
        })?;
        let load_balancer = stack.load_balancer.as_ref().ok_or_else(|| {
            CloudError::InvalidConfig(format!("region {} has no load balancer", region))
        })?;
        let layout = self.network_layout().await?;

        self.plane
            .create_auto_scaling_group(
                spec,
                &launch_configuration.name,
                &load_balancer.name,
                &layout.availability_zones,
            )
            .await?;

        let plane = self.plane;
        let name = spec.name.as_str();
        self.poller
            .until(&format!("autoscaling group {}", name), move || {
                plane.auto_scaling_group_exists(name)
            })
            .await?;
        info!(
            group = %name,
            min = spec.min_size,
            max = spec.max_size,
            desired = spec.desired_capacity,
            "Autoscaling group ready"
        );

        self.record(
            ResourceKind::AutoScalingGroup,
            name,
            ResourceState::new(name, ResourceKind::AutoScalingGroup, region)
                .with_status(ResourceStatus::Available)
                .with_attribute("desired_capacity", json!(spec.desired_capacity)),
        );
        Ok(format!(
            "{} instances desired ({}..{})",
            spec.desired_capacity, spec.min_size, spec.max_size
        ))
    }

    fn record(&mut self, kind: ResourceKind, name: &str, resource: ResourceState) {
        self.context.changes.push(StateChange::Put {
            key: resource_key(&self.stack.region, kind, name),
            resource,
        });
    }
}
