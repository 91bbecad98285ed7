//! Structured job identifiers.
//!
//! A [`JobPath`] is the identity of one planned job: project, branch,
//! job name, and the module slice for module-expanded jobs. It has
//! exactly one canonical rendering ([`JobPath::render`]); no other code
//! in the crate concatenates identifier strings.

use serde::{Serialize, Serializer};
use std::fmt;

/// Fully-qualified path of a planned job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobPath {
    project: String,
    branch: String,
    job_name: String,
    module: Option<String>,
}

impl JobPath {
    /// Create a path with no module component.
    pub fn new(
        project: impl Into<String>,
        branch: impl Into<String>,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            branch: branch.into(),
            job_name: job_name.into(),
            module: None,
        }
    }

    /// Attach a module component (module-expanded jobs only).
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Leaf name under the branch folder: `<job>` or `<job>_<module>`,
    /// with slashes in the module replaced by underscores.
    pub fn leaf(&self) -> String {
        match &self.module {
            Some(module) => format!("{}_{}", self.job_name, module.replace('/', "_")),
            None => self.job_name.clone(),
        }
    }

    /// Canonical rendering: `<project>/<branch>/<leaf>`.
    pub fn render(&self) -> String {
        format!("{}/{}/{}", self.project, self.branch, self.leaf())
    }
}

impl fmt::Display for JobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl Serialize for JobPath {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.render())
    }
}
