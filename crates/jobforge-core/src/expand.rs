//! Branch expansion: from configuration to the full topology.
//!
//! Expansion is a single-threaded, synchronous pass. Each branch is
//! expanded independently against the immutable [`ConfigModel`]; two
//! branches never share a plan instance even when their content is
//! identical, so branches can be reconfigured or deleted in isolation.

use crate::aggregate::{AggregationPlan, AggregationPlanner};
use crate::config::{ConfigModel, JobKind, ViewConfig};
use crate::error::{ConfigError, Result};
use crate::plan::{JobPlan, JobPlanBuilder, CRON_PLACEHOLDER_BRANCH};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::info;

/// Request to create the containing folder for a branch's jobs.
///
/// Reported as data; the emission layer performs the creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRequest {
    project: String,
    branch: String,
}

impl FolderRequest {
    pub fn new(project: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            branch: branch.into(),
        }
    }

    /// Canonical rendering: `<project>/<branch>`.
    pub fn render(&self) -> String {
        format!("{}/{}", self.project, self.branch)
    }
}

impl fmt::Display for FolderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl Serialize for FolderRequest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.render())
    }
}

/// Everything derived for one branch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BranchTopology {
    /// Branch name.
    pub branch: String,

    /// Folder to create before any job is materialized.
    pub folder: FolderRequest,

    /// Job plans in config-declaration order.
    pub plans: Vec<JobPlan>,

    /// The branch's parallel aggregation phase.
    pub aggregation: AggregationPlan,
}

/// The complete synthesized topology handed to the emission layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Topology {
    /// Project identifier in `owner/repo` form.
    pub project: String,

    /// Deterministic digest over every plan identifier, for golden-file
    /// comparison and change detection.
    pub digest: String,

    /// Per-branch topologies, in branch-list order.
    pub branches: Vec<BranchTopology>,

    /// Cron-only plans, instantiated once rather than per branch.
    pub cron_plans: Vec<JobPlan>,

    /// Cosmetic views, passed through for the host's view layer.
    pub views: Vec<ViewConfig>,
}

/// Expands all job type x job definition x branch combinations.
pub struct TopologyExpander;

impl TopologyExpander {
    /// Expand every branch in `branches` into its topology.
    ///
    /// Job types and definitions are visited in config-declaration order
    /// so the output sequence is reproducible. Cron-only job types are
    /// skipped here; see [`TopologyExpander::expand_cron_only`].
    pub fn expand(config: &ConfigModel, branches: &[String]) -> Result<Vec<BranchTopology>> {
        if branches.is_empty() {
            return Err(ConfigError::EmptyBranchList);
        }

        let mut topologies = Vec::with_capacity(branches.len());
        for branch in branches {
            let mut plans = Vec::new();
            for job_type in &config.job_types {
                if job_type.name.kind() == JobKind::CronOnly {
                    continue;
                }
                for definition in &job_type.jobs {
                    plans.extend(JobPlanBuilder::build(
                        &config.project,
                        branch,
                        job_type.name,
                        definition,
                    )?);
                }
            }

            let aggregation = AggregationPlanner::plan(config, branch, &plans);
            info!(
                branch = %branch,
                plans = plans.len(),
                members = aggregation.member_identifiers.len(),
                "Expanded branch topology"
            );

            topologies.push(BranchTopology {
                branch: branch.clone(),
                folder: FolderRequest::new(config.project.as_str(), branch.as_str()),
                plans,
                aggregation,
            });
        }
        Ok(topologies)
    }

    /// Expand the cron-only job types. Invoked once per synthesis, not
    /// once per branch.
    pub fn expand_cron_only(config: &ConfigModel) -> Result<Vec<JobPlan>> {
        let mut plans = Vec::new();
        for job_type in &config.job_types {
            if job_type.name.kind() != JobKind::CronOnly {
                continue;
            }
            for definition in &job_type.jobs {
                // The branch argument is immaterial here; the builder
                // pins cron plans to the placeholder branch.
                plans.extend(JobPlanBuilder::build(
                    &config.project,
                    CRON_PLACEHOLDER_BRANCH,
                    job_type.name,
                    definition,
                )?);
            }
        }
        Ok(plans)
    }

    /// Run the full synthesis pass: branch expansion, the cron pass, and
    /// the topology digest.
    pub fn synthesize(config: &ConfigModel, branches: &[String]) -> Result<Topology> {
        let branch_topologies = Self::expand(config, branches)?;
        let cron_plans = Self::expand_cron_only(config)?;
        let digest = compute_topology_digest(&branch_topologies, &cron_plans);

        let short_digest = &digest[..12];
        info!(
            project = %config.project,
            branches = branch_topologies.len(),
            cron_plans = cron_plans.len(),
            digest = %short_digest,
            "Synthesized topology"
        );

        Ok(Topology {
            project: config.project.clone(),
            digest,
            branches: branch_topologies,
            cron_plans,
            views: config.views.clone(),
        })
    }
}

/// Deterministic digest over the ordered rendered plan identifiers.
fn compute_topology_digest(branches: &[BranchTopology], cron_plans: &[JobPlan]) -> String {
    let mut hasher = Sha256::new();
    for topology in branches {
        for plan in &topology.plans {
            hasher.update(plan.identifier.render().as_bytes());
            hasher.update(b"\0");
        }
    }
    for plan in cron_plans {
        hasher.update(plan.identifier.render().as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigModel;

    fn config_with_cron() -> ConfigModel {
        ConfigModel::from_json_str(
            r#"{
                "project": "org/repo",
                "git_url": "https://example.com/repo.git",
                "job_type": {
                    "run_trial": {
                        "unit": {
                            "modules": ["core", "net"],
                            "node_label": "big",
                            "timeout_minutes": 30
                        }
                    },
                    "omnibus": {
                        "pkg": { "node_label": "big", "timeout_minutes": 60 }
                    },
                    "cronly_jobs": {
                        "nightly": {
                            "node_label": "big",
                            "timeout_minutes": 120,
                            "cron_schedule": "0 2 * * *"
                        }
                    }
                }
            }"#,
        )
        .expect("config parse failed")
    }

    #[test]
    fn test_expand_preserves_declaration_order() {
        let config = config_with_cron();
        let topologies =
            TopologyExpander::expand(&config, &["master".to_string()]).expect("expand failed");

        assert_eq!(topologies.len(), 1);
        let leaves: Vec<String> = topologies[0]
            .plans
            .iter()
            .map(|p| p.identifier.leaf())
            .collect();
        assert_eq!(leaves, vec!["unit_core", "unit_net", "pkg"]);
    }

    #[test]
    fn test_cron_jobs_excluded_from_branch_expansion() {
        let config = config_with_cron();
        let topologies =
            TopologyExpander::expand(&config, &["master".to_string()]).expect("expand failed");
        assert!(
            topologies[0].plans.iter().all(|p| !p.is_cron()),
            "Per-branch plans must not include cron jobs"
        );
    }

    #[test]
    fn test_cron_pass_builds_once() {
        let config = config_with_cron();
        let cron_plans = TopologyExpander::expand_cron_only(&config).expect("cron pass failed");
        assert_eq!(cron_plans.len(), 1);
        assert_eq!(cron_plans[0].identifier.render(), "org/repo/unscoped/_nightly");
    }

    #[test]
    fn test_empty_branch_list_rejected() {
        let config = config_with_cron();
        let err = TopologyExpander::expand(&config, &[]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyBranchList));
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let config = config_with_cron();
        let branches = vec!["master".to_string(), "feature-x".to_string()];
        let first = TopologyExpander::synthesize(&config, &branches).expect("synthesis failed");
        let second = TopologyExpander::synthesize(&config, &branches).expect("synthesis failed");
        assert_eq!(first, second, "Same inputs must yield identical output");
    }

    #[test]
    fn test_branches_do_not_share_plan_content() {
        let config = config_with_cron();
        let branches = vec!["master".to_string(), "feature-y".to_string()];
        let topologies = TopologyExpander::expand(&config, &branches).expect("expand failed");

        assert_eq!(topologies[0].plans.len(), topologies[1].plans.len());
        for (a, b) in topologies[0].plans.iter().zip(&topologies[1].plans) {
            assert_ne!(a.identifier, b.identifier);
            assert_eq!(a.identifier.leaf(), b.identifier.leaf());
        }
    }

    #[test]
    fn test_folder_request_per_branch() {
        let config = config_with_cron();
        let topologies =
            TopologyExpander::expand(&config, &["feature-x".to_string()]).expect("expand failed");
        assert_eq!(topologies[0].folder.render(), "org/repo/feature-x");
    }

    #[test]
    fn test_digest_changes_with_branch_set() {
        let config = config_with_cron();
        let one = TopologyExpander::synthesize(&config, &["master".to_string()])
            .expect("synthesis failed");
        let two = TopologyExpander::synthesize(
            &config,
            &["master".to_string(), "feature-x".to_string()],
        )
        .expect("synthesis failed");
        assert_ne!(one.digest, two.digest);
    }
}
