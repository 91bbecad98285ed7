//! Job plans and the per-definition plan builder.
//!
//! A [`JobPlan`] is the immutable execution record derived from one
//! (branch, job type, job definition, module) combination. Plans are
//! built once per branch at expansion time and consumed by value by the
//! emission layer; nothing mutates a plan after construction.

use crate::config::{JobDefinition, JobKind, JobTypeName};
use crate::error::Result;
use crate::path::JobPath;
use serde::Serialize;
use tracing::debug;

/// Parameter every job carries: the branch that triggered the build.
pub const TRIGGERED_BRANCH_PARAMETER: &str = "TRIGGERED_BRANCH";

/// Parameter carried only by module-expanded jobs.
pub const MODULE_PARAMETER: &str = "MODULE";

/// Branch slot used for cron-only plans.
///
/// Cron jobs are not branch-scoped in this design; the placeholder makes
/// that visible in the emitted identifier instead of inheriting whatever
/// branch an earlier expansion pass happened to process last.
pub const CRON_PLACEHOLDER_BRANCH: &str = "unscoped";

/// A build parameter exposed to the executing job.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobParameter {
    /// Parameter name.
    pub name: String,

    /// Default value.
    pub default_value: String,

    /// Human-readable description.
    pub description: String,
}

impl JobParameter {
    pub fn new(
        name: impl Into<String>,
        default_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
            description: description.into(),
        }
    }
}

/// Execution plan for one job instance.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobPlan {
    /// Fully-qualified job identifier.
    pub identifier: JobPath,

    /// Originating job type.
    pub job_type: JobTypeName,

    /// Build parameters in declaration order. Always includes
    /// `TRIGGERED_BRANCH`; includes `MODULE` iff module-expanded.
    pub parameters: Vec<JobParameter>,

    /// Label selecting the execution resource class.
    pub node_label: String,

    /// Timeout enforced by the execution environment.
    pub timeout_minutes: u32,

    /// Whether the workspace is wiped before the scm checkout.
    pub clean_repo_before_scm: bool,

    /// Workspace paths removed before the run, derived from the job type.
    pub cleanup_paths: Vec<String>,

    /// Shell command lines, executed in order.
    pub steps: Vec<String>,

    /// Glob patterns for artifacts to archive.
    pub archive_artifacts: Vec<String>,

    /// Whether test result files are published.
    pub publish_test_results: bool,

    /// Whether coverage files are published.
    pub publish_coverage: bool,

    /// Cron expression for the trigger the emission layer attaches
    /// (cron-only plans).
    pub cron_schedule: Option<String>,
}

impl JobPlan {
    /// Whether this plan is cron-distinguished.
    pub fn is_cron(&self) -> bool {
        self.job_type.kind() == JobKind::CronOnly
    }
}

/// Expands one (branch, job type, job definition) triple into job plans.
///
/// Pure and deterministic: the same inputs always produce the same plans,
/// and no side effects are performed.
pub struct JobPlanBuilder;

impl JobPlanBuilder {
    /// Build the plans for one job definition.
    ///
    /// - `ModuleExpanded`: one plan per declared module, in order.
    /// - `Singleton`: exactly one plan.
    /// - `CronOnly`: exactly one plan, `_`-prefixed, pinned to the
    ///   placeholder branch regardless of `branch`.
    pub fn build(
        project: &str,
        branch: &str,
        job_type: JobTypeName,
        definition: &JobDefinition,
    ) -> Result<Vec<JobPlan>> {
        definition.validate(job_type)?;

        let plans = match job_type.kind() {
            JobKind::ModuleExpanded => {
                let plans: Vec<JobPlan> = definition
                    .modules
                    .iter()
                    .map(|module| {
                        let path = JobPath::new(project, branch, definition.name.as_str())
                            .with_module(module.as_str());
                        let parameters = vec![
                            triggered_branch_parameter(branch),
                            JobParameter::new(
                                MODULE_PARAMETER,
                                module.as_str(),
                                "The module under test.",
                            ),
                        ];
                        Self::plan_for(path, job_type, definition, parameters)
                    })
                    .collect();
                debug!(
                    job = %definition.name,
                    modules = plans.len(),
                    "Expanded module fan-out"
                );
                plans
            }
            JobKind::Singleton => {
                let path = JobPath::new(project, branch, definition.name.as_str());
                let parameters = vec![triggered_branch_parameter(branch)];
                vec![Self::plan_for(path, job_type, definition, parameters)]
            }
            JobKind::CronOnly => {
                let path = JobPath::new(
                    project,
                    CRON_PLACEHOLDER_BRANCH,
                    format!("_{}", definition.name),
                );
                let parameters = vec![triggered_branch_parameter(CRON_PLACEHOLDER_BRANCH)];
                vec![Self::plan_for(path, job_type, definition, parameters)]
            }
        };

        Ok(plans)
    }

    fn plan_for(
        identifier: JobPath,
        job_type: JobTypeName,
        definition: &JobDefinition,
        parameters: Vec<JobParameter>,
    ) -> JobPlan {
        JobPlan {
            identifier,
            job_type,
            parameters,
            node_label: definition.node_label.clone(),
            timeout_minutes: definition.timeout_minutes,
            clean_repo_before_scm: definition.clean_repo_before_scm,
            cleanup_paths: job_type
                .cleanup_paths()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            steps: definition.steps.clone(),
            archive_artifacts: definition.archive_artifacts.clone(),
            publish_test_results: definition.publish_test_results,
            publish_coverage: definition.publish_coverage,
            cron_schedule: definition.cron_schedule.clone(),
        }
    }
}

fn triggered_branch_parameter(branch: &str) -> JobParameter {
    JobParameter::new(
        TRIGGERED_BRANCH_PARAMETER,
        branch,
        "The branch that triggered this build.",
    )
}
