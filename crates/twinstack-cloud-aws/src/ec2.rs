//! EC2 operations: network, key pairs, security groups, instances, images

use crate::AwsControlPlane;
use crate::error::{Result, missing, sdk};
use aws_sdk_ec2::types::{
    Filter, ImageState as Ec2ImageState, InstanceType, IpPermission, IpRange, ResourceType,
    SummaryStatus, Tag as Ec2Tag, TagSpecification,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;
use twinstack_cloud::{CreatedKeyPair, ImageState, InstanceInfo, InstanceState, RunInstanceRequest};
use twinstack_core::{IngressRule, SecurityGroupSpec, Tag};

const INSTANCE_NOT_FOUND: &str = "InvalidInstanceID.NotFound";
const IMAGE_NOT_FOUND: &str = "InvalidAMIID.NotFound";

/// `tag:<Key>` filter matching the tag value
pub(crate) fn tag_filter(tag: &Tag) -> Filter {
    Filter::builder()
        .name(tag.filter_name())
        .values(&tag.value)
        .build()
}

fn filter(name: &str, value: &str) -> Filter {
    Filter::builder().name(name).values(value).build()
}

fn tag_specification(resource_type: ResourceType, tag: &Tag) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Ec2Tag::builder().key(&tag.key).value(&tag.value).build())
        .build()
}

fn ip_permission(rule: &IngressRule) -> IpPermission {
    IpPermission::builder()
        .ip_protocol(&rule.protocol)
        .from_port(i32::from(rule.from_port))
        .to_port(i32::from(rule.to_port))
        .ip_ranges(IpRange::builder().cidr_ip(&rule.cidr).build())
        .build()
}

fn image_state(state: &Ec2ImageState) -> ImageState {
    match state {
        Ec2ImageState::Available => ImageState::Available,
        Ec2ImageState::Pending => ImageState::Pending,
        Ec2ImageState::Failed | Ec2ImageState::Error => ImageState::Failed,
        _ => ImageState::Other,
    }
}

/// User data must reach RunInstances base64-encoded
pub(crate) fn encode_user_data(script: &str) -> String {
    STANDARD.encode(script.as_bytes())
}

impl AwsControlPlane {
    /// ID of the region's default VPC, if it has one
    pub(crate) async fn default_vpc(&self) -> Result<Option<String>> {
        let output = self
            .ec2
            .describe_vpcs()
            .filters(filter("isDefault", "true"))
            .send()
            .await
            .map_err(sdk("DescribeVpcs"))?;
        Ok(output
            .vpcs()
            .iter()
            .find_map(|vpc| vpc.vpc_id().map(str::to_string)))
    }

    pub(crate) async fn subnets(&self, vpc_id: &str) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_subnets()
            .filters(filter("vpc-id", vpc_id))
            .send()
            .await
            .map_err(sdk("DescribeSubnets"))?;
        Ok(output
            .subnets()
            .iter()
            .filter_map(|s| s.subnet_id().map(str::to_string))
            .collect())
    }

    pub(crate) async fn availability_zones(&self) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_availability_zones()
            .send()
            .await
            .map_err(sdk("DescribeAvailabilityZones"))?;
        Ok(output
            .availability_zones()
            .iter()
            .filter_map(|z| z.zone_name().map(str::to_string))
            .collect())
    }

    pub(crate) async fn ec2_create_key_pair(&self, name: &str, tag: &Tag) -> Result<CreatedKeyPair> {
        let output = self
            .ec2
            .create_key_pair()
            .key_name(name)
            .tag_specifications(tag_specification(ResourceType::KeyPair, tag))
            .send()
            .await
            .map_err(sdk("CreateKeyPair"))?;

        Ok(CreatedKeyPair {
            key_pair_id: output
                .key_pair_id()
                .ok_or_else(|| missing("CreateKeyPair", "key pair id"))?
                .to_string(),
            key_material: output
                .key_material()
                .ok_or_else(|| missing("CreateKeyPair", "key material"))?
                .to_string(),
        })
    }

    pub(crate) async fn ec2_find_key_pairs(&self, tag: &Tag) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_key_pairs()
            .filters(tag_filter(tag))
            .send()
            .await
            .map_err(sdk("DescribeKeyPairs"))?;
        Ok(output
            .key_pairs()
            .iter()
            .filter_map(|k| k.key_pair_id().map(str::to_string))
            .collect())
    }

    pub(crate) async fn ec2_delete_key_pair(&self, key_pair_id: &str) -> Result<()> {
        self.ec2
            .delete_key_pair()
            .key_pair_id(key_pair_id)
            .send()
            .await
            .map_err(sdk("DeleteKeyPair"))?;
        Ok(())
    }

    pub(crate) async fn ec2_create_security_group(
        &self,
        spec: &SecurityGroupSpec,
        vpc_id: Option<&str>,
    ) -> Result<String> {
        let output = self
            .ec2
            .create_security_group()
            .group_name(&spec.name)
            .description(&spec.description)
            .set_vpc_id(vpc_id.map(str::to_string))
            .tag_specifications(tag_specification(ResourceType::SecurityGroup, &spec.tag))
            .send()
            .await
            .map_err(sdk("CreateSecurityGroup"))?;
        Ok(output
            .group_id()
            .ok_or_else(|| missing("CreateSecurityGroup", "group id"))?
            .to_string())
    }

    pub(crate) async fn ec2_authorize_ingress(
        &self,
        group_id: &str,
        rules: &[IngressRule],
    ) -> Result<()> {
        self.ec2
            .authorize_security_group_ingress()
            .group_id(group_id)
            .set_ip_permissions(Some(rules.iter().map(ip_permission).collect()))
            .send()
            .await
            .map_err(sdk("AuthorizeSecurityGroupIngress"))?;
        Ok(())
    }

    pub(crate) async fn ec2_find_security_groups(&self, tag: &Tag) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_security_groups()
            .filters(tag_filter(tag))
            .send()
            .await
            .map_err(sdk("DescribeSecurityGroups"))?;
        Ok(output
            .security_groups()
            .iter()
            .filter_map(|g| g.group_id().map(str::to_string))
            .collect())
    }

    pub(crate) async fn ec2_delete_security_group(&self, group_id: &str) -> Result<()> {
        self.ec2
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
            .map_err(sdk("DeleteSecurityGroup"))?;
        Ok(())
    }

    pub(crate) async fn ec2_run_instance(&self, request: &RunInstanceRequest<'_>) -> Result<String> {
        let output = self
            .ec2
            .run_instances()
            .image_id(request.image_id)
            .instance_type(InstanceType::from(request.instance_type))
            .key_name(request.key_name)
            .security_group_ids(request.security_group_id)
            .min_count(1)
            .max_count(1)
            .set_user_data(request.user_data.map(encode_user_data))
            .tag_specifications(tag_specification(ResourceType::Instance, request.tag))
            .send()
            .await
            .map_err(sdk("RunInstances"))?;

        output
            .instances()
            .first()
            .and_then(|i| i.instance_id())
            .map(str::to_string)
            .ok_or_else(|| missing("RunInstances", "instance id"))
    }

    /// State, status checks and public IP of one instance
    ///
    /// A freshly launched instance may not be visible yet; that reads as None.
    pub(crate) async fn ec2_describe_instance(
        &self,
        instance_id: &str,
    ) -> Result<Option<InstanceInfo>> {
        let described = self
            .ec2
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(sdk("DescribeInstances"));
        let output = match described {
            Ok(output) => output,
            Err(e) if e.code() == Some(INSTANCE_NOT_FOUND) => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(instance) = output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .find(|i| i.instance_id() == Some(instance_id))
        else {
            return Ok(None);
        };

        let state = instance
            .state()
            .and_then(|s| s.name())
            .map(|name| name.as_str().parse().unwrap_or(InstanceState::Unknown))
            .unwrap_or(InstanceState::Unknown);
        let status_ok = state == InstanceState::Running && self.status_ok(instance_id).await?;

        Ok(Some(InstanceInfo {
            instance_id: instance_id.to_string(),
            state,
            status_ok,
            public_ip: instance.public_ip_address().map(str::to_string),
        }))
    }

    async fn status_ok(&self, instance_id: &str) -> Result<bool> {
        let output = self
            .ec2
            .describe_instance_status()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(sdk("DescribeInstanceStatus"))?;
        let ok = output.instance_statuses().iter().any(|s| {
            s.instance_status()
                .and_then(|summary| summary.status())
                .is_some_and(|status| *status == SummaryStatus::Ok)
        });
        debug!(instance = instance_id, ok, "Instance status checked");
        Ok(ok)
    }

    pub(crate) async fn ec2_find_instances(
        &self,
        tag: &Tag,
        state: InstanceState,
    ) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_instances()
            .filters(tag_filter(tag))
            .filters(filter("instance-state-name", state.as_str()))
            .send()
            .await
            .map_err(sdk("DescribeInstances"))?;
        Ok(output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(|i| i.instance_id().map(str::to_string))
            .collect())
    }

    pub(crate) async fn ec2_terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        self.ec2
            .terminate_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(sdk("TerminateInstances"))?;
        Ok(())
    }

    pub(crate) async fn ec2_create_image(&self, instance_id: &str, name: &str) -> Result<String> {
        let output = self
            .ec2
            .create_image()
            .instance_id(instance_id)
            .name(name)
            .no_reboot(true)
            .send()
            .await
            .map_err(sdk("CreateImage"))?;
        Ok(output
            .image_id()
            .ok_or_else(|| missing("CreateImage", "image id"))?
            .to_string())
    }

    pub(crate) async fn ec2_image_state(&self, image_id: &str) -> Result<Option<ImageState>> {
        let described = self
            .ec2
            .describe_images()
            .image_ids(image_id)
            .send()
            .await
            .map_err(sdk("DescribeImages"));
        let output = match described {
            Ok(output) => output,
            Err(e) if e.code() == Some(IMAGE_NOT_FOUND) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(output
            .images()
            .iter()
            .find(|i| i.image_id() == Some(image_id))
            .map(|i| i.state().map(image_state).unwrap_or(ImageState::Other)))
    }

    pub(crate) async fn ec2_find_images(&self, name: &str) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_images()
            .owners("self")
            .filters(filter("name", name))
            .send()
            .await
            .map_err(sdk("DescribeImages"))?;
        Ok(output
            .images()
            .iter()
            .filter_map(|i| i.image_id().map(str::to_string))
            .collect())
    }

    pub(crate) async fn ec2_deregister_image(&self, image_id: &str) -> Result<()> {
        self.ec2
            .deregister_image()
            .image_id(image_id)
            .send()
            .await
            .map_err(sdk("DeregisterImage"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_filter_uses_key() {
        let filter = tag_filter(&Tag::new("Stack", "shop-app-instance"));
        assert_eq!(filter.name(), Some("tag:Stack"));
        assert_eq!(filter.values(), ["shop-app-instance".to_string()]);
    }

    #[test]
    fn test_ip_permission_from_rule() {
        let permission = ip_permission(&IngressRule::tcp(5432));
        assert_eq!(permission.ip_protocol(), Some("tcp"));
        assert_eq!(permission.from_port(), Some(5432));
        assert_eq!(permission.to_port(), Some(5432));
        assert_eq!(permission.ip_ranges()[0].cidr_ip(), Some("0.0.0.0/0"));
    }

    #[test]
    fn test_user_data_is_base64() {
        assert_eq!(encode_user_data("#!/bin/bash\n"), "IyEvYmluL2Jhc2gK");
    }

    #[test]
    fn test_image_state_mapping() {
        assert_eq!(image_state(&Ec2ImageState::Available), ImageState::Available);
        assert_eq!(image_state(&Ec2ImageState::Failed), ImageState::Failed);
        assert_eq!(image_state(&Ec2ImageState::Deregistered), ImageState::Other);
    }
}
