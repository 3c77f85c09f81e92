//! Auto Scaling operations: launch configurations and groups

use crate::AwsControlPlane;
use crate::error::{Result, sdk};
use aws_sdk_autoscaling::types::InstanceMonitoring;
use twinstack_cloud::LaunchConfigurationRequest;
use twinstack_core::AutoScalingSpec;

impl AwsControlPlane {
    pub(crate) async fn asg_create_launch_configuration(
        &self,
        request: &LaunchConfigurationRequest<'_>,
    ) -> Result<()> {
        self.autoscaling
            .create_launch_configuration()
            .launch_configuration_name(request.name)
            .image_id(request.image_id)
            .instance_type(request.instance_type)
            .key_name(request.key_name)
            .security_groups(request.security_group_id)
            .instance_monitoring(
                InstanceMonitoring::builder()
                    .enabled(request.monitoring)
                    .build(),
            )
            .send()
            .await
            .map_err(sdk("CreateLaunchConfiguration"))?;
        Ok(())
    }

    pub(crate) async fn asg_launch_configuration_exists(&self, name: &str) -> Result<bool> {
        let output = self
            .autoscaling
            .describe_launch_configurations()
            .launch_configuration_names(name)
            .send()
            .await
            .map_err(sdk("DescribeLaunchConfigurations"))?;
        Ok(!output.launch_configurations().is_empty())
    }

    pub(crate) async fn asg_delete_launch_configuration(&self, name: &str) -> Result<()> {
        self.autoscaling
            .delete_launch_configuration()
            .launch_configuration_name(name)
            .send()
            .await
            .map_err(sdk("DeleteLaunchConfiguration"))?;
        Ok(())
    }

    pub(crate) async fn asg_create_group(
        &self,
        spec: &AutoScalingSpec,
        launch_configuration: &str,
        load_balancer: &str,
        availability_zones: &[String],
    ) -> Result<()> {
        self.autoscaling
            .create_auto_scaling_group()
            .auto_scaling_group_name(&spec.name)
            .launch_configuration_name(launch_configuration)
            .min_size(spec.min_size)
            .max_size(spec.max_size)
            .desired_capacity(spec.desired_capacity)
            .set_availability_zones(Some(availability_zones.to_vec()))
            .load_balancer_names(load_balancer)
            .send()
            .await
            .map_err(sdk("CreateAutoScalingGroup"))?;
        Ok(())
    }

    /// Groups still deleting are described too; only absence counts as gone
    pub(crate) async fn asg_group_exists(&self, name: &str) -> Result<bool> {
        let output = self
            .autoscaling
            .describe_auto_scaling_groups()
            .auto_scaling_group_names(name)
            .send()
            .await
            .map_err(sdk("DescribeAutoScalingGroups"))?;
        Ok(!output.auto_scaling_groups().is_empty())
    }

    /// Force delete: member instances are terminated with the group
    pub(crate) async fn asg_delete_group(&self, name: &str) -> Result<()> {
        self.autoscaling
            .delete_auto_scaling_group()
            .auto_scaling_group_name(name)
            .force_delete(true)
            .send()
            .await
            .map_err(sdk("DeleteAutoScalingGroup"))?;
        Ok(())
    }
}
