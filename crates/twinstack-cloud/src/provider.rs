//! Control-plane trait definition
//!
//! One method per provider call the runbooks make. Implementations are
//! bound to a single region.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use twinstack_core::{AutoScalingSpec, IngressRule, LoadBalancerSpec, SecurityGroupSpec, Tag};

/// Control-plane abstraction for one region
///
/// Lookups take the filter tag attached at creation time and return every
/// match; deletes of missing resources are expected to surface as errors
/// and are only issued for IDs a lookup returned.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns the provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Region this control plane is bound to
    fn region(&self) -> &str;

    /// Check if credentials resolve and the region answers
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Default VPC, its subnets, and the region's availability zones
    async fn network_layout(&self) -> Result<NetworkLayout>;

    // --- key pairs ---

    async fn create_key_pair(&self, name: &str, tag: &Tag) -> Result<CreatedKeyPair>;

    /// IDs of key pairs carrying the tag
    async fn find_key_pairs(&self, tag: &Tag) -> Result<Vec<String>>;

    async fn delete_key_pair(&self, key_pair_id: &str) -> Result<()>;

    // --- security groups ---

    /// Create the group and return its ID (ingress is authorized separately)
    async fn create_security_group(
        &self,
        spec: &SecurityGroupSpec,
        vpc_id: Option<&str>,
    ) -> Result<String>;

    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()>;

    async fn find_security_groups(&self, tag: &Tag) -> Result<Vec<String>>;

    async fn delete_security_group(&self, group_id: &str) -> Result<()>;

    // --- instances ---

    /// Launch exactly one instance and return its ID
    async fn run_instance(&self, request: &RunInstanceRequest<'_>) -> Result<String>;

    /// Current state of an instance, or None if the provider no longer knows it
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<InstanceInfo>>;

    /// IDs of instances carrying the tag in the given state
    async fn find_instances(&self, tag: &Tag, state: InstanceState) -> Result<Vec<String>>;

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()>;

    // --- images ---

    /// Capture an image from an instance without rebooting it
    async fn create_image(&self, instance_id: &str, name: &str) -> Result<String>;

    async fn image_state(&self, image_id: &str) -> Result<Option<ImageState>>;

    /// IDs of images owned by this account with the given name
    async fn find_images(&self, name: &str) -> Result<Vec<String>>;

    async fn deregister_image(&self, image_id: &str) -> Result<()>;

    // --- load balancers ---

    /// Create a classic load balancer and return its DNS name
    async fn create_load_balancer(
        &self,
        spec: &LoadBalancerSpec,
        subnet_ids: &[String],
        security_group_id: &str,
    ) -> Result<Option<String>>;

    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancerInfo>>;

    async fn delete_load_balancer(&self, name: &str) -> Result<()>;

    // --- launch configurations ---

    async fn create_launch_configuration(
        &self,
        request: &LaunchConfigurationRequest<'_>,
    ) -> Result<()>;

    async fn launch_configuration_exists(&self, name: &str) -> Result<bool>;

    async fn delete_launch_configuration(&self, name: &str) -> Result<()>;

    // --- autoscaling groups ---

    async fn create_auto_scaling_group(
        &self,
        spec: &AutoScalingSpec,
        launch_configuration: &str,
        load_balancer: &str,
        availability_zones: &[String],
    ) -> Result<()>;

    async fn auto_scaling_group_exists(&self, name: &str) -> Result<bool>;

    /// Delete the group, terminating its instances
    async fn delete_auto_scaling_group(&self, name: &str) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/region information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Network layout of a region's default VPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLayout {
    pub vpc_id: Option<String>,
    pub subnet_ids: Vec<String>,
    pub availability_zones: Vec<String>,
}

/// A freshly created key pair with its private key material
#[derive(Debug, Clone)]
pub struct CreatedKeyPair {
    pub key_pair_id: String,
    pub key_material: String,
}

/// Parameters for launching one instance
#[derive(Debug, Clone)]
pub struct RunInstanceRequest<'a> {
    pub image_id: &'a str,
    pub instance_type: &'a str,
    pub key_name: &'a str,
    pub security_group_id: &'a str,
    pub tag: &'a Tag,
    /// Rendered script, not yet encoded
    pub user_data: Option<&'a str>,
}

/// Parameters for a launch configuration
#[derive(Debug, Clone)]
pub struct LaunchConfigurationRequest<'a> {
    pub name: &'a str,
    pub image_id: &'a str,
    pub instance_type: &'a str,
    pub key_name: &'a str,
    pub security_group_id: &'a str,
    pub monitoring: bool,
}

/// Instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Stopping,
    Stopped,
    Terminated,
    Unknown,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Terminated => "terminated",
            InstanceState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstanceState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "shutting-down" => InstanceState::ShuttingDown,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            "terminated" => InstanceState::Terminated,
            _ => InstanceState::Unknown,
        })
    }
}

/// Observed instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub state: InstanceState,
    /// Instance status checks report `ok`
    pub status_ok: bool,
    pub public_ip: Option<String>,
}

/// Image lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageState {
    Pending,
    Available,
    Failed,
    Other,
}

/// Listed load balancer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancerInfo {
    pub name: String,
    pub dns_name: Option<String>,
}
