//! AWS control plane for twinstack
//!
//! Implements [`ControlPlane`] for one region over three SDK clients:
//!
//! - **EC2**: key pairs, security groups, instances, images, default VPC
//! - **Elastic Load Balancing (classic)**: load balancers
//! - **Auto Scaling**: launch configurations, autoscaling groups
//!
//! Credentials come from the default provider chain (environment,
//! shared config/credentials files, instance metadata).

mod autoscaling;
mod ec2;
mod elb;
pub mod error;

pub use error::AwsError;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use twinstack_cloud::{
    AuthStatus, ControlPlane, CreatedKeyPair, ImageState, InstanceInfo, InstanceState,
    LaunchConfigurationRequest, LoadBalancerInfo, NetworkLayout, Result, RunInstanceRequest,
};
use twinstack_core::{AutoScalingSpec, IngressRule, LoadBalancerSpec, SecurityGroupSpec, Tag};

/// AWS control plane bound to one region
#[derive(Debug, Clone)]
pub struct AwsControlPlane {
    region: String,
    ec2: aws_sdk_ec2::Client,
    elb: aws_sdk_elasticloadbalancing::Client,
    autoscaling: aws_sdk_autoscaling::Client,
}

impl AwsControlPlane {
    /// Build clients for `region` from the default credential chain
    pub async fn connect(region: impl Into<String>) -> Self {
        let region = region.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;
        tracing::debug!(region = %region, "AWS clients configured");

        Self {
            ec2: aws_sdk_ec2::Client::new(&config),
            elb: aws_sdk_elasticloadbalancing::Client::new(&config),
            autoscaling: aws_sdk_autoscaling::Client::new(&config),
            region,
        }
    }
}

#[async_trait]
impl ControlPlane for AwsControlPlane {
    fn name(&self) -> &str {
        "aws"
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(match self.availability_zones().await {
            Ok(zones) => AuthStatus::ok(format!("{} ({} zones)", self.region, zones.len())),
            Err(e) => AuthStatus::failed(e.to_string()),
        })
    }

    async fn network_layout(&self) -> Result<NetworkLayout> {
        let vpc_id = self.default_vpc().await?;
        let subnet_ids = match &vpc_id {
            Some(vpc) => self.subnets(vpc).await?,
            None => Vec::new(),
        };
        let availability_zones = self.availability_zones().await?;
        Ok(NetworkLayout {
            vpc_id,
            subnet_ids,
            availability_zones,
        })
    }

    async fn create_key_pair(&self, name: &str, tag: &Tag) -> Result<CreatedKeyPair> {
        Ok(self.ec2_create_key_pair(name, tag).await?)
    }

    async fn find_key_pairs(&self, tag: &Tag) -> Result<Vec<String>> {
        Ok(self.ec2_find_key_pairs(tag).await?)
    }

    async fn delete_key_pair(&self, key_pair_id: &str) -> Result<()> {
        Ok(self.ec2_delete_key_pair(key_pair_id).await?)
    }

    async fn create_security_group(
        &self,
        spec: &SecurityGroupSpec,
        vpc_id: Option<&str>,
    ) -> Result<String> {
        Ok(self.ec2_create_security_group(spec, vpc_id).await?)
    }

    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()> {
        Ok(self.ec2_authorize_ingress(group_id, rules).await?)
    }

    async fn find_security_groups(&self, tag: &Tag) -> Result<Vec<String>> {
        Ok(self.ec2_find_security_groups(tag).await?)
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        Ok(self.ec2_delete_security_group(group_id).await?)
    }

    async fn run_instance(&self, request: &RunInstanceRequest<'_>) -> Result<String> {
        Ok(self.ec2_run_instance(request).await?)
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>> {
        Ok(self.ec2_describe_instance(instance_id).await?)
    }

    async fn find_instances(&self, tag: &Tag, state: InstanceState) -> Result<Vec<String>> {
        Ok(self.ec2_find_instances(tag, state).await?)
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        Ok(self.ec2_terminate_instances(instance_ids).await?)
    }

    async fn create_image(&self, instance_id: &str, name: &str) -> Result<String> {
        Ok(self.ec2_create_image(instance_id, name).await?)
    }

    async fn image_state(&self, image_id: &str) -> Result<Option<ImageState>> {
        Ok(self.ec2_image_state(image_id).await?)
    }

    async fn find_images(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.ec2_find_images(name).await?)
    }

    async fn deregister_image(&self, image_id: &str) -> Result<()> {
        Ok(self.ec2_deregister_image(image_id).await?)
    }

    async fn create_load_balancer(
        &self,
        spec: &LoadBalancerSpec,
        subnet_ids: &[String],
        security_group_id: &str,
    ) -> Result<Option<String>> {
        Ok(self
            .elb_create_load_balancer(spec, subnet_ids, security_group_id)
            .await?)
    }

    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancerInfo>> {
        Ok(self.elb_list_load_balancers().await?)
    }

    async fn delete_load_balancer(&self, name: &str) -> Result<()> {
        Ok(self.elb_delete_load_balancer(name).await?)
    }

    async fn create_launch_configuration(
        &self,
        request: &LaunchConfigurationRequest<'_>,
    ) -> Result<()> {
        Ok(self.asg_create_launch_configuration(request).await?)
    }

    async fn launch_configuration_exists(&self, name: &str) -> Result<bool> {
        Ok(self.asg_launch_configuration_exists(name).await?)
    }

    async fn delete_launch_configuration(&self, name: &str) -> Result<()> {
        Ok(self.asg_delete_launch_configuration(name).await?)
    }

    async fn create_auto_scaling_group(
        &self,
        spec: &AutoScalingSpec,
        launch_configuration: &str,
        load_balancer: &str,
        availability_zones: &[String],
    ) -> Result<()> {
        Ok(self
            .asg_create_group(spec, launch_configuration, load_balancer, availability_zones)
            .await?)
    }

    async fn auto_scaling_group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.asg_group_exists(name).await?)
    }

    async fn delete_auto_scaling_group(&self, name: &str) -> Result<()> {
        Ok(self.asg_delete_group(name).await?)
    }
}
