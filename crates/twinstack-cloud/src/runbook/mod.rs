//! Region runbooks
//!
//! A [`Provisioner`] executes one region's [`Plan`] against a
//! [`ControlPlane`], carrying the identifiers each step produces
//! in a [`RegionContext`].
//!
//! Apply policy: a failed delete is recorded and the run moves on; a failed
//! create is recorded and the rest of the plan is skipped, since every later
//! create consumes what the failed one should have produced.

mod create;
mod delete;
mod keyfile;
mod plan;

pub use keyfile::write_private_key;
pub use plan::{plan_clear, plan_provision, plan_teardown};

use crate::action::{Action, ActionType, ApplyResult, Plan, ResourceKind};
use crate::error::{CloudError, Result};
use crate::provider::{ControlPlane, NetworkLayout};
use crate::state::StateChange;
use crate::waiter::Poller;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use twinstack_core::RegionStack;

/// Default directory for private keys, relative to the working directory
pub const KEY_DIR: &str = ".ssh";

/// Identifiers produced while running one region's plan
#[derive(Debug, Clone, Default)]
pub struct RegionContext {
    pub layout: Option<NetworkLayout>,
    pub key_pair_name: Option<String>,
    pub key_pair_id: Option<String>,
    pub key_file: Option<PathBuf>,
    pub security_group_id: Option<String>,
    pub instance_id: Option<String>,
    pub public_ip: Option<String>,
    pub image_id: Option<String>,
    pub load_balancer_dns: Option<String>,
    /// State file changes, in the order they happened
    pub changes: Vec<StateChange>,
}

/// Progress notifications emitted while a plan is applied
#[derive(Debug, Clone, Copy)]
pub enum ApplyEvent<'e> {
    Started(&'e Action),
    Succeeded(&'e Action, &'e str),
    Failed(&'e Action, &'e str),
    Skipped(&'e Action),
}

/// Executes plans for one region
pub struct Provisioner<'a> {
    plane: &'a dyn ControlPlane,
    stack: &'a RegionStack,
    poller: Poller,
    key_dir: PathBuf,
    user_data: Option<String>,
    context: RegionContext,
}

impl<'a> Provisioner<'a> {
    pub fn new(plane: &'a dyn ControlPlane, stack: &'a RegionStack, poller: Poller) -> Self {
        Self {
            plane,
            stack,
            poller,
            key_dir: PathBuf::from(KEY_DIR),
            user_data: None,
            context: RegionContext::default(),
        }
    }

    /// Directory the private key is written to
    pub fn with_key_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.key_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Rendered user data for the instance this region launches
    pub fn with_user_data(mut self, user_data: Option<String>) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn context(&self) -> &RegionContext {
        &self.context
    }

    pub fn into_context(self) -> RegionContext {
        self.context
    }

    /// Apply a plan without progress reporting
    pub async fn apply(&mut self, plan: &Plan) -> ApplyResult {
        self.apply_with(plan, |_| {}).await
    }

    /// Apply a plan, reporting each action through `report`
    pub async fn apply_with<F>(&mut self, plan: &Plan, mut report: F) -> ApplyResult
    where
        F: FnMut(ApplyEvent<'_>),
    {
        let started = Instant::now();
        let mut result = ApplyResult::new();
        let mut blocked_by: Option<String> = None;

        for action in &plan.actions {
            if let Some(failed) = &blocked_by {
                report(ApplyEvent::Skipped(action));
                result.add_skipped(action.id.clone(), format!("skipped after {} failed", failed));
                continue;
            }

            info!(
                region = %self.stack.region,
                action = %action.id,
                "{}",
                action.description
            );
            report(ApplyEvent::Started(action));

            match self.execute(action).await {
                Ok(message) => {
                    report(ApplyEvent::Succeeded(action, &message));
                    result.add_success(action.id.clone(), message);
                }
                Err(e) => {
                    let error = e.to_string();
                    warn!(region = %self.stack.region, action = %action.id, error = %error, "Action failed");
                    report(ApplyEvent::Failed(action, &error));
                    result.add_failure(action.id.clone(), error);
                    if action.action_type == ActionType::Create {
                        blocked_by = Some(action.id.clone());
                    }
                }
            }
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        result
    }

    async fn execute(&mut self, action: &Action) -> Result<String> {
        match action.action_type {
            ActionType::Create => self.execute_create(action.resource_kind).await,
            ActionType::Delete => {
                let removed = self.execute_delete(action.resource_kind).await?;
                Ok(match removed {
                    0 => "nothing to delete".to_string(),
                    n => format!("{} deleted", n),
                })
            }
        }
    }

    async fn execute_create(&mut self, kind: ResourceKind) -> Result<String> {
        match kind {
            ResourceKind::KeyPair => {
                let path = self.generate_key_pair().await?;
                Ok(format!("private key written to {}", path.display()))
            }
            ResourceKind::SecurityGroup => self.create_security_group().await,
            ResourceKind::Instance => {
                let ip = self.create_instance().await?;
                Ok(format!("public IP {}", ip))
            }
            ResourceKind::Image => self.create_image().await,
            ResourceKind::LoadBalancer => {
                let dns = self.create_load_balancer().await?;
                Ok(format!("DNS name {}", dns))
            }
            ResourceKind::LaunchConfiguration => self.create_launch_configuration().await,
            ResourceKind::AutoScalingGroup => self.create_autoscaling().await,
        }
    }

    async fn execute_delete(&mut self, kind: ResourceKind) -> Result<usize> {
        match kind {
            ResourceKind::AutoScalingGroup => self.delete_autoscaling().await,
            ResourceKind::LaunchConfiguration => self.delete_launch_configuration().await,
            ResourceKind::LoadBalancer => self.delete_load_balancer().await,
            ResourceKind::Image => self.delete_image().await,
            ResourceKind::Instance => self.delete_instances().await,
            ResourceKind::SecurityGroup => self.delete_security_group().await,
            ResourceKind::KeyPair => self.delete_key_pairs().await,
        }
    }

    /// Default VPC layout, fetched once per run
    async fn network_layout(&mut self) -> Result<NetworkLayout> {
        if let Some(layout) = &self.context.layout {
            return Ok(layout.clone());
        }
        let layout = self.plane.network_layout().await?;
        self.context.layout = Some(layout.clone());
        Ok(layout)
    }

    fn require<T: Clone>(value: &Option<T>, what: &str) -> Result<T> {
        value
            .clone()
            .ok_or_else(|| CloudError::MissingPrerequisite(what.to_string()))
    }
}
