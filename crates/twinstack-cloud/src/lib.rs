//! twinstack cloud layer
//!
//! Provider-neutral half of provisioning: the [`ControlPlane`] trait each
//! provider implements, the per-region plans and the runbook that executes
//! them, fixed-interval polling, and the local state file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  twin CLI                        │
//! │              (twin up / down)                    │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               twinstack-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Plan builders ──► Provisioner (runbook) │   │
//! │  └──────────────────┬───────────────────────┘   │
//! │  ┌──────────────┐  │  ┌──────────────┐          │
//! │  │    Poller    │  │  │  State Mgmt  │          │
//! │  └──────────────┘  │  └──────────────┘          │
//! └────────────────────┼────────────────────────────┘
//!                      │ trait ControlPlane
//!              ┌───────▼───────┐
//!              │ twinstack-    │
//!              │ cloud-aws     │
//!              └───────────────┘
//! ```

pub mod action;
pub mod error;
mod progress;
pub mod provider;
pub mod runbook;
pub mod state;
pub mod waiter;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary, ResourceKind};
pub use error::{CloudError, Result};
pub use provider::{
    AuthStatus, ControlPlane, CreatedKeyPair, ImageState, InstanceInfo, InstanceState,
    LaunchConfigurationRequest, LoadBalancerInfo, NetworkLayout, RunInstanceRequest,
};
pub use runbook::{
    ApplyEvent, KEY_DIR, Provisioner, RegionContext, plan_clear, plan_provision, plan_teardown,
    write_private_key,
};
pub use state::{
    GlobalState, ResourceState, ResourceStatus, StateChange, StateLock, StateManager,
    resource_key,
};
pub use waiter::Poller;
