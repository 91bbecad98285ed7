//! Error types for topology synthesis.
//!
//! Every error here is fatal to the planning pass: a partial topology is
//! worse than no topology, so expansion aborts before any plan is handed
//! to the emission layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config document error: {0}")]
    Document(String),

    #[error("Unknown job type: '{0}'")]
    UnknownJobKind(String),

    #[error("Job '{job_type}/{job}': {message}")]
    Definition {
        job_type: String,
        job: String,
        message: String,
    },

    #[error("Job '{job_type}/{job}' is module-expanded but declares no modules")]
    NoModules { job_type: String, job: String },

    #[error("Job '{job_type}/{job}' has a missing or empty node label")]
    MissingNodeLabel { job_type: String, job: String },

    #[error("Job '{job_type}/{job}' must have a positive timeout")]
    InvalidTimeout { job_type: String, job: String },

    #[error("Cron job '{job_type}/{job}' has no cron schedule")]
    MissingCronSchedule { job_type: String, job: String },

    #[error("Project identifier '{0}' is not in owner/repo form")]
    InvalidProject(String),

    #[error("Branch list is empty")]
    EmptyBranchList,

    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for topology synthesis operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
