//! Build configuration model and loader.
//!
//! The configuration document is consumed once at startup and treated as
//! read-only afterwards; every component receives the [`ConfigModel`] by
//! reference, never through global state. Job-type and job mappings are
//! walked in document order because declaration order becomes execution
//! and display order downstream.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Branch used when no `primary_branch` key is present in the document.
pub const DEFAULT_PRIMARY_BRANCH: &str = "master";

/// Cleanup families derived from the job type.
const TRIAL_CLEANUP: &[&str] = &["_trial_temp", ".hypothesis"];
const REPO_CLEANUP: &[&str] = &["repo"];

// ---------------------------------------------------------------------------
// Job shapes
// ---------------------------------------------------------------------------

/// Emission shape of a job definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// One job instance per declared module.
    ModuleExpanded,

    /// Exactly one job instance per branch.
    Singleton,

    /// Exactly one job instance for the whole project, trigger-driven
    /// by a cron schedule rather than by branch activity.
    CronOnly,
}

/// The closed set of job-type names a configuration may declare.
///
/// Each name maps exhaustively to a [`JobKind`] and to a cleanup family;
/// anything outside this set is a configuration-authoring mistake and is
/// rejected at parse time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobTypeName {
    RunTrial,
    RunTrialForStorageDriver,
    RunAcceptance,
    RunSphinx,
    RunClient,
    Omnibus,
    RunLint,
    CronlyJobs,
}

impl JobTypeName {
    /// Parse a job-type key from the configuration document.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "run_trial" => Ok(JobTypeName::RunTrial),
            "run_trial_for_storage_driver" => Ok(JobTypeName::RunTrialForStorageDriver),
            "run_acceptance" => Ok(JobTypeName::RunAcceptance),
            "run_sphinx" => Ok(JobTypeName::RunSphinx),
            "run_client" => Ok(JobTypeName::RunClient),
            "omnibus" => Ok(JobTypeName::Omnibus),
            "run_lint" => Ok(JobTypeName::RunLint),
            "cronly_jobs" => Ok(JobTypeName::CronlyJobs),
            other => Err(ConfigError::UnknownJobKind(other.to_string())),
        }
    }

    /// The document key for this job type.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobTypeName::RunTrial => "run_trial",
            JobTypeName::RunTrialForStorageDriver => "run_trial_for_storage_driver",
            JobTypeName::RunAcceptance => "run_acceptance",
            JobTypeName::RunSphinx => "run_sphinx",
            JobTypeName::RunClient => "run_client",
            JobTypeName::Omnibus => "omnibus",
            JobTypeName::RunLint => "run_lint",
            JobTypeName::CronlyJobs => "cronly_jobs",
        }
    }

    /// Emission shape for this job type.
    pub fn kind(&self) -> JobKind {
        match self {
            JobTypeName::RunTrial
            | JobTypeName::RunTrialForStorageDriver
            | JobTypeName::RunAcceptance => JobKind::ModuleExpanded,
            JobTypeName::RunSphinx
            | JobTypeName::RunClient
            | JobTypeName::Omnibus
            | JobTypeName::RunLint => JobKind::Singleton,
            JobTypeName::CronlyJobs => JobKind::CronOnly,
        }
    }

    /// Workspace paths removed before a new run of this job type.
    ///
    /// The trial family leaves test droppings under `_trial_temp` and
    /// `.hypothesis`; acceptance and client runs check out into `repo`.
    pub fn cleanup_paths(&self) -> &'static [&'static str] {
        match self {
            JobTypeName::RunTrial | JobTypeName::RunTrialForStorageDriver => TRIAL_CLEANUP,
            JobTypeName::RunAcceptance | JobTypeName::RunClient => REPO_CLEANUP,
            JobTypeName::RunSphinx
            | JobTypeName::Omnibus
            | JobTypeName::RunLint
            | JobTypeName::CronlyJobs => &[],
        }
    }
}

impl std::fmt::Display for JobTypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Configuration entries
// ---------------------------------------------------------------------------

/// A cosmetic view over the generated jobs. Parsed and carried through
/// to the emission layer untouched; no core logic consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewConfig {
    /// View name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Regex selecting the jobs the view shows.
    pub selection_regex: String,
}

/// One job definition under a job type.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobDefinition {
    /// Job name, unique within its job type.
    pub name: String,

    /// Modules to fan out over (module-expanded job types only).
    pub modules: Vec<String>,

    /// Label selecting the execution resource class.
    pub node_label: String,

    /// Per-job timeout enforced by the execution environment.
    pub timeout_minutes: u32,

    /// Whether the workspace is wiped before the scm checkout.
    pub clean_repo_before_scm: bool,

    /// Glob patterns for artifacts to archive (may be empty).
    pub archive_artifacts: Vec<String>,

    /// Whether test result files are published.
    pub publish_test_results: bool,

    /// Whether coverage files are published.
    pub publish_coverage: bool,

    /// Shell command lines, executed in order.
    pub steps: Vec<String>,

    /// Cron expression (cron-only job types only).
    pub cron_schedule: Option<String>,
}

impl JobDefinition {
    /// Validate this definition against its job type's shape.
    ///
    /// Fails fast: a malformed definition aborts the whole planning pass
    /// before any plan is emitted.
    pub fn validate(&self, job_type: JobTypeName) -> Result<()> {
        let definition_error = |message: &str| ConfigError::Definition {
            job_type: job_type.as_str().to_string(),
            job: self.name.clone(),
            message: message.to_string(),
        };

        match job_type.kind() {
            JobKind::ModuleExpanded => {
                if self.modules.is_empty() {
                    return Err(ConfigError::NoModules {
                        job_type: job_type.as_str().to_string(),
                        job: self.name.clone(),
                    });
                }
            }
            JobKind::Singleton | JobKind::CronOnly => {
                if !self.modules.is_empty() {
                    return Err(definition_error(
                        "declares modules but is not module-expanded",
                    ));
                }
            }
        }

        if job_type.kind() == JobKind::CronOnly {
            if self.cron_schedule.is_none() {
                return Err(ConfigError::MissingCronSchedule {
                    job_type: job_type.as_str().to_string(),
                    job: self.name.clone(),
                });
            }
        } else if self.cron_schedule.is_some() {
            return Err(definition_error(
                "declares a cron schedule but is not cron-only",
            ));
        }

        if self.node_label.is_empty() {
            return Err(ConfigError::MissingNodeLabel {
                job_type: job_type.as_str().to_string(),
                job: self.name.clone(),
            });
        }

        if self.timeout_minutes == 0 {
            return Err(ConfigError::InvalidTimeout {
                job_type: job_type.as_str().to_string(),
                job: self.name.clone(),
            });
        }

        Ok(())
    }
}

/// One job type with its job definitions, in declaration order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobTypeConfig {
    /// Job-type name.
    pub name: JobTypeName,

    /// Job definitions in declaration order.
    pub jobs: Vec<JobDefinition>,
}

// ---------------------------------------------------------------------------
// Config model
// ---------------------------------------------------------------------------

/// In-memory representation of the parsed build configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConfigModel {
    /// Project identifier in `owner/repo` form.
    pub project: String,

    /// Git clone URL of the project.
    pub git_url: String,

    /// The designated integration branch. Only this branch's aggregation
    /// phase is auto-triggered on push.
    pub primary_branch: String,

    /// Cosmetic views, in declaration order.
    pub views: Vec<ViewConfig>,

    /// Job types in declaration order.
    pub job_types: Vec<JobTypeConfig>,
}

impl ConfigModel {
    /// Load a configuration from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Load a configuration from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(content)?;
        Self::from_value(&doc)
    }

    /// Build the model from a parsed document, walking mappings in
    /// document order and validating every definition.
    pub fn from_value(doc: &Value) -> Result<Self> {
        let root = doc
            .as_object()
            .ok_or_else(|| ConfigError::Document("top-level value must be a mapping".into()))?;

        let project = require_str(root, "project")?;
        if !project.contains('/') {
            return Err(ConfigError::InvalidProject(project));
        }
        let git_url = require_str(root, "git_url")?;
        let primary_branch = optional_str(root, "primary_branch")?
            .unwrap_or_else(|| DEFAULT_PRIMARY_BRANCH.to_string());

        let views = parse_views(root)?;
        let job_types = parse_job_types(root)?;

        Ok(ConfigModel {
            project,
            git_url,
            primary_branch,
            views,
            job_types,
        })
    }
}

// ---------------------------------------------------------------------------
// Document walking
// ---------------------------------------------------------------------------

/// Serde shape of a job definition's attributes (name comes from the key).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobDefinitionDoc {
    #[serde(default)]
    modules: Vec<String>,
    #[serde(default)]
    node_label: String,
    timeout_minutes: u32,
    #[serde(default)]
    clean_repo_before_scm: bool,
    #[serde(default)]
    archive_artifacts: Vec<String>,
    #[serde(default)]
    publish_test_results: bool,
    #[serde(default)]
    publish_coverage: bool,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    cron_schedule: Option<String>,
}

/// Serde shape of a view's attributes (name comes from the key).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ViewDoc {
    description: String,
    selection_regex: String,
}

fn require_str(map: &serde_json::Map<String, Value>, key: &str) -> Result<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Document(format!("missing or non-string key '{key}'")))
}

fn optional_str(map: &serde_json::Map<String, Value>, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ConfigError::Document(format!("key '{key}' must be a string"))),
    }
}

fn parse_views(root: &serde_json::Map<String, Value>) -> Result<Vec<ViewConfig>> {
    let Some(value) = root.get("views") else {
        return Ok(Vec::new());
    };
    let entries = value
        .as_object()
        .ok_or_else(|| ConfigError::Document("'views' must be a mapping".into()))?;

    let mut views = Vec::with_capacity(entries.len());
    for (name, attrs) in entries {
        let doc: ViewDoc = serde_json::from_value(attrs.clone())
            .map_err(|e| ConfigError::Document(format!("view '{name}': {e}")))?;
        views.push(ViewConfig {
            name: name.clone(),
            description: doc.description,
            selection_regex: doc.selection_regex,
        });
    }
    Ok(views)
}

fn parse_job_types(root: &serde_json::Map<String, Value>) -> Result<Vec<JobTypeConfig>> {
    let value = root
        .get("job_type")
        .ok_or_else(|| ConfigError::Document("missing key 'job_type'".into()))?;
    let entries = value
        .as_object()
        .ok_or_else(|| ConfigError::Document("'job_type' must be a mapping".into()))?;

    let mut job_types = Vec::with_capacity(entries.len());
    for (type_name, jobs_value) in entries {
        let name = JobTypeName::parse(type_name)?;
        let jobs_map = jobs_value.as_object().ok_or_else(|| {
            ConfigError::Document(format!("job type '{type_name}' must be a mapping of jobs"))
        })?;

        let mut jobs = Vec::with_capacity(jobs_map.len());
        for (job_name, attrs) in jobs_map {
            let doc: JobDefinitionDoc =
                serde_json::from_value(attrs.clone()).map_err(|e| ConfigError::Definition {
                    job_type: type_name.clone(),
                    job: job_name.clone(),
                    message: e.to_string(),
                })?;
            let definition = JobDefinition {
                name: job_name.clone(),
                modules: doc.modules,
                node_label: doc.node_label,
                timeout_minutes: doc.timeout_minutes,
                clean_repo_before_scm: doc.clean_repo_before_scm,
                archive_artifacts: doc.archive_artifacts,
                publish_test_results: doc.publish_test_results,
                publish_coverage: doc.publish_coverage,
                steps: doc.steps,
                cron_schedule: doc.cron_schedule,
            };
            definition.validate(name)?;
            jobs.push(definition);
        }

        job_types.push(JobTypeConfig { name, jobs });
    }
    Ok(job_types)
}
