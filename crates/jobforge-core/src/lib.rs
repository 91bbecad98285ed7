//! JobForge Core - CI job-topology synthesis
//!
//! Expands a declarative build configuration into:
//! - Per-branch job plans (module fan-out, parameters, steps, artifacts)
//! - The parallel aggregation phase membership and roll-up policy
//! - Declarative commit-status notification intents
//!
//! The whole pass is synchronous and deterministic; execution of the
//! resulting plans belongs to the host CI environment.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod expand;
pub mod path;
pub mod plan;
pub mod status;

// Re-export key types
pub use aggregate::{
    AggregationPlan, AggregationPlanner, ContinuationPolicy, KillPolicy, RESULT_GLOBS,
};
pub use config::{
    ConfigModel, JobDefinition, JobKind, JobTypeConfig, JobTypeName, ViewConfig,
    DEFAULT_PRIMARY_BRANCH,
};
pub use error::{ConfigError, Result};
pub use expand::{BranchTopology, FolderRequest, Topology, TopologyExpander};
pub use path::JobPath;
pub use plan::{
    JobParameter, JobPlan, JobPlanBuilder, CRON_PLACEHOLDER_BRANCH, MODULE_PARAMETER,
    TRIGGERED_BRANCH_PARAMETER,
};
pub use status::{CredentialRef, StatusCommand, StatusEvent, StatusNotifier};
