//! Classic Elastic Load Balancing operations

use crate::AwsControlPlane;
use crate::error::{Result, build, sdk};
use aws_sdk_elasticloadbalancing::types::{Listener, Tag as ElbTag};
use twinstack_cloud::LoadBalancerInfo;
use twinstack_core::LoadBalancerSpec;

fn listener(spec: &LoadBalancerSpec) -> Result<Listener> {
    Listener::builder()
        .protocol(&spec.protocol)
        .load_balancer_port(i32::from(spec.port))
        .instance_protocol(&spec.protocol)
        .instance_port(i32::from(spec.instance_port))
        .build()
        .map_err(build("CreateLoadBalancer"))
}

impl AwsControlPlane {
    /// Create the load balancer across the given subnets and return its DNS name
    pub(crate) async fn elb_create_load_balancer(
        &self,
        spec: &LoadBalancerSpec,
        subnet_ids: &[String],
        security_group_id: &str,
    ) -> Result<Option<String>> {
        let tag = ElbTag::builder()
            .key(&spec.tag.key)
            .value(&spec.tag.value)
            .build()
            .map_err(build("CreateLoadBalancer"))?;

        let output = self
            .elb
            .create_load_balancer()
            .load_balancer_name(&spec.name)
            .listeners(listener(spec)?)
            .set_subnets(Some(subnet_ids.to_vec()))
            .security_groups(security_group_id)
            .tags(tag)
            .send()
            .await
            .map_err(sdk("CreateLoadBalancer"))?;
        Ok(output.dns_name().map(str::to_string))
    }

    pub(crate) async fn elb_list_load_balancers(&self) -> Result<Vec<LoadBalancerInfo>> {
        let output = self
            .elb
            .describe_load_balancers()
            .send()
            .await
            .map_err(sdk("DescribeLoadBalancers"))?;
        Ok(output
            .load_balancer_descriptions()
            .iter()
            .filter_map(|lb| {
                Some(LoadBalancerInfo {
                    name: lb.load_balancer_name()?.to_string(),
                    dns_name: lb.dns_name().map(str::to_string),
                })
            })
            .collect())
    }

    pub(crate) async fn elb_delete_load_balancer(&self, name: &str) -> Result<()> {
        self.elb
            .delete_load_balancer()
            .load_balancer_name(name)
            .send()
            .await
            .map_err(sdk("DeleteLoadBalancer"))?;
        Ok(())
    }
}
