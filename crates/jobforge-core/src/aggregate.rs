//! Fan-in aggregation planning for the parallel phase.
//!
//! The aggregation phase is a fan-out of every non-cron job for a
//! branch, followed by a roll-up of their test and coverage artifacts
//! into one pass/fail summary. The policies here are deliberate
//! constants: a failing member must never abort its siblings or the
//! orchestrating parent, so that every member's artifacts are still
//! collected.

use crate::config::ConfigModel;
use crate::path::JobPath;
use crate::plan::JobPlan;
use serde::Serialize;

/// Glob patterns rolled up from every member job.
pub const RESULT_GLOBS: [&str; 2] = ["**/results.xml", "**/coverage.xml"];

/// What happens to sibling members when one member fails.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationPolicy {
    /// All members run to completion regardless of failures.
    AlwaysContinue,

    /// Remaining members are abandoned on the first failure.
    FailFast,
}

/// What happens to the orchestrating parent when a member fails.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KillPolicy {
    /// The parent only reports a computed summary after the phase ends.
    NeverKillParent,

    /// The parent is hard-aborted on member failure.
    KillParentOnFailure,
}

/// Aggregation plan for one branch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AggregationPlan {
    /// Identifiers of the plans in the parallel phase, in plan order.
    pub member_identifiers: Vec<JobPath>,

    /// Always [`ContinuationPolicy::AlwaysContinue`].
    pub continuation_policy: ContinuationPolicy,

    /// Always [`KillPolicy::NeverKillParent`].
    pub kill_policy: KillPolicy,

    /// Artifact globs rolled up during fan-in.
    pub result_globs: Vec<String>,

    /// Whether the phase is auto-triggered on push. True only for the
    /// primary branch; other branches are expanded but plan-only.
    pub trigger_on_push: bool,
}

/// Derives the parallel-phase membership and roll-up policy for a branch.
pub struct AggregationPlanner;

impl AggregationPlanner {
    /// Slice a branch's plans into its aggregation plan.
    ///
    /// Membership rule: every plan belongs except cron-only ones. The
    /// aggregation phase itself is a property of the branch topology,
    /// not a plan, so it cannot appear in its own membership.
    pub fn plan(config: &ConfigModel, branch: &str, plans: &[JobPlan]) -> AggregationPlan {
        let member_identifiers = plans
            .iter()
            .filter(|plan| !plan.is_cron())
            .map(|plan| plan.identifier.clone())
            .collect();

        AggregationPlan {
            member_identifiers,
            continuation_policy: ContinuationPolicy::AlwaysContinue,
            kill_policy: KillPolicy::NeverKillParent,
            result_globs: RESULT_GLOBS.iter().map(|g| g.to_string()).collect(),
            trigger_on_push: branch == config.primary_branch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobDefinition, JobTypeName};
    use crate::plan::JobPlanBuilder;

    fn test_config(primary_branch: &str) -> ConfigModel {
        ConfigModel {
            project: "org/repo".to_string(),
            git_url: "https://example.com/repo.git".to_string(),
            primary_branch: primary_branch.to_string(),
            views: vec![],
            job_types: vec![],
        }
    }

    fn plans_for_branch(branch: &str) -> Vec<JobPlan> {
        let trial = JobDefinition {
            name: "unit".to_string(),
            modules: vec!["a".to_string(), "b".to_string()],
            node_label: "big".to_string(),
            timeout_minutes: 30,
            clean_repo_before_scm: false,
            archive_artifacts: vec![],
            publish_test_results: true,
            publish_coverage: true,
            steps: vec![],
            cron_schedule: None,
        };
        let cron = JobDefinition {
            name: "nightly".to_string(),
            modules: vec![],
            node_label: "big".to_string(),
            timeout_minutes: 60,
            clean_repo_before_scm: false,
            archive_artifacts: vec![],
            publish_test_results: false,
            publish_coverage: false,
            steps: vec![],
            cron_schedule: Some("0 2 * * *".to_string()),
        };

        let mut plans =
            JobPlanBuilder::build("org/repo", branch, JobTypeName::RunTrial, &trial)
                .expect("build failed");
        plans.extend(
            JobPlanBuilder::build("org/repo", branch, JobTypeName::CronlyJobs, &cron)
                .expect("build failed"),
        );
        plans
    }

    #[test]
    fn test_membership_excludes_cron_plans() {
        let config = test_config("master");
        let plans = plans_for_branch("master");
        let aggregation = AggregationPlanner::plan(&config, "master", &plans);

        assert_eq!(aggregation.member_identifiers.len(), 2);
        for identifier in &aggregation.member_identifiers {
            assert!(
                !identifier.job_name().starts_with('_'),
                "Cron plans must not be members: {identifier}"
            );
        }
    }

    #[test]
    fn test_membership_covers_all_non_cron_plans() {
        let config = test_config("master");
        let plans = plans_for_branch("master");
        let aggregation = AggregationPlanner::plan(&config, "master", &plans);

        let expected: Vec<_> = plans
            .iter()
            .filter(|p| !p.is_cron())
            .map(|p| p.identifier.clone())
            .collect();
        assert_eq!(aggregation.member_identifiers, expected);
    }

    #[test]
    fn test_policies_are_constants() {
        let config = test_config("master");
        for branch in ["master", "feature-x", "release/1.0"] {
            let plans = plans_for_branch(branch);
            let aggregation = AggregationPlanner::plan(&config, branch, &plans);
            assert_eq!(
                aggregation.continuation_policy,
                ContinuationPolicy::AlwaysContinue
            );
            assert_eq!(aggregation.kill_policy, KillPolicy::NeverKillParent);
            assert_eq!(
                aggregation.result_globs,
                vec!["**/results.xml", "**/coverage.xml"]
            );
        }
    }

    #[test]
    fn test_trigger_on_push_only_for_primary_branch() {
        let config = test_config("master");
        let plans = plans_for_branch("master");

        let primary = AggregationPlanner::plan(&config, "master", &plans);
        assert!(primary.trigger_on_push);

        let feature = AggregationPlanner::plan(&config, "feature-x", &plans);
        assert!(!feature.trigger_on_push);
    }
}
