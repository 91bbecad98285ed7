//! Commit-status notification intents.
//!
//! The core never performs network I/O and never holds secret material.
//! [`StatusNotifier::render`] produces a declarative [`StatusCommand`];
//! its shell rendering resolves the branch tip and the credential at
//! execution time, in the target environment.

use crate::config::ConfigModel;
use crate::path::JobPath;
use serde::Serialize;
use std::fmt;

/// Lifecycle event of a build, as reported to the commit-status endpoint.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusEvent {
    Started,
    Succeeded,
    Failed,
}

impl StatusEvent {
    /// Commit-status state string for this event.
    pub fn state(&self) -> &'static str {
        match self {
            StatusEvent::Started => "pending",
            StatusEvent::Succeeded => "success",
            StatusEvent::Failed => "failure",
        }
    }

    /// Human-readable description for this event.
    pub fn description(&self) -> &'static str {
        match self {
            StatusEvent::Started => "Build started",
            StatusEvent::Succeeded => "Build succeeded",
            StatusEvent::Failed => "Build failed",
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Started => write!(f, "started"),
            StatusEvent::Succeeded => write!(f, "succeeded"),
            StatusEvent::Failed => write!(f, "failed"),
        }
    }
}

/// Reference to a credential in the execution environment's store.
///
/// Holds only the name of the environment variable the host injects;
/// the secret value itself never passes through the core.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CredentialRef {
    env_var: String,
}

impl CredentialRef {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }
}

/// Declarative intent to update a commit status.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCommand {
    /// Commit-status state (`pending`, `success`, `failure`).
    pub state: String,

    /// Human-readable description.
    pub description: String,

    /// Project identifier in `owner/repo` form.
    pub project: String,

    /// Branch whose tip receives the status.
    pub branch: String,

    /// Status context: the fully-qualified job path.
    pub context: String,

    /// Clone URL used to resolve the branch tip.
    pub git_url: String,

    /// Credential to authenticate with, by reference.
    pub credential: CredentialRef,
}

impl StatusCommand {
    /// Render the shell command the emission layer hands to the host.
    ///
    /// The branch tip is resolved by `git ls-remote` when the command
    /// runs, because the tip may move between planning and execution.
    /// The credential stays an environment-variable reference that the
    /// executing shell expands; it must never appear in a persisted log.
    pub fn to_shell(&self) -> String {
        let lines = [
            format!(
                "COMMIT=$(git ls-remote {} refs/heads/{} | cut -f1)",
                self.git_url, self.branch
            ),
            "curl --silent --show-error --output /dev/null \\".to_string(),
            "  --request POST \\".to_string(),
            format!(
                "  --header \"Authorization: token ${{{}}}\" \\",
                self.credential.env_var
            ),
            format!(
                "  --data '{{\"state\": \"{}\", \"description\": \"{}\", \"context\": \"{}\"}}' \\",
                self.state, self.description, self.context
            ),
            format!(
                "  \"https://api.github.com/repos/{}/statuses/${{COMMIT}}\"",
                self.project
            ),
        ];
        lines.join("\n")
    }
}

/// Maps lifecycle events to status-update intents. Pure; no I/O.
pub struct StatusNotifier;

impl StatusNotifier {
    /// Render the status intent for one event on one job path.
    pub fn render(
        event: StatusEvent,
        path: &JobPath,
        config: &ConfigModel,
        credential: &CredentialRef,
    ) -> StatusCommand {
        StatusCommand {
            state: event.state().to_string(),
            description: event.description().to_string(),
            project: config.project.clone(),
            branch: path.branch().to_string(),
            context: path.render(),
            git_url: config.git_url.clone(),
            credential: credential.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ConfigModel {
        ConfigModel {
            project: "clusterhq/flocker".to_string(),
            git_url: "https://github.com/clusterhq/flocker.git".to_string(),
            primary_branch: "master".to_string(),
            views: vec![],
            job_types: vec![],
        }
    }

    #[test]
    fn test_event_state_mapping() {
        assert_eq!(StatusEvent::Started.state(), "pending");
        assert_eq!(StatusEvent::Started.description(), "Build started");
        assert_eq!(StatusEvent::Succeeded.state(), "success");
        assert_eq!(StatusEvent::Succeeded.description(), "Build succeeded");
        assert_eq!(StatusEvent::Failed.state(), "failure");
        assert_eq!(StatusEvent::Failed.description(), "Build failed");
    }

    #[test]
    fn test_render_carries_path_and_project() {
        let config = test_config();
        let path = JobPath::new("clusterhq/flocker", "feature-x", "unit")
            .with_module("flocker/node");
        let credential = CredentialRef::new("STATUS_TOKEN");

        let command = StatusNotifier::render(StatusEvent::Failed, &path, &config, &credential);
        assert_eq!(command.state, "failure");
        assert_eq!(command.branch, "feature-x");
        assert_eq!(command.context, "clusterhq/flocker/feature-x/unit_flocker_node");
        assert_eq!(command.project, "clusterhq/flocker");
    }

    #[test]
    fn test_shell_resolves_commit_at_execution_time() {
        let config = test_config();
        let path = JobPath::new("clusterhq/flocker", "feature-x", "unit");
        let credential = CredentialRef::new("STATUS_TOKEN");

        let shell = StatusNotifier::render(StatusEvent::Started, &path, &config, &credential)
            .to_shell();
        assert!(
            shell.contains("$(git ls-remote https://github.com/clusterhq/flocker.git refs/heads/feature-x"),
            "Commit must be resolved when the command runs, not at render time: {shell}"
        );
        assert!(shell.contains("statuses/${COMMIT}"));
    }

    #[test]
    fn test_shell_references_credential_by_name_only() {
        let config = test_config();
        let path = JobPath::new("clusterhq/flocker", "master", "pkg");
        let credential = CredentialRef::new("STATUS_TOKEN");

        let shell = StatusNotifier::render(StatusEvent::Succeeded, &path, &config, &credential)
            .to_shell();
        assert!(
            shell.contains("${STATUS_TOKEN}"),
            "Credential must stay an environment reference: {shell}"
        );
    }

    #[test]
    fn test_shell_payload_fields() {
        let config = test_config();
        let path = JobPath::new("clusterhq/flocker", "master", "pkg");
        let credential = CredentialRef::new("STATUS_TOKEN");

        let shell = StatusNotifier::render(StatusEvent::Failed, &path, &config, &credential)
            .to_shell();
        assert!(shell.contains("\"state\": \"failure\""));
        assert!(shell.contains("\"description\": \"Build failed\""));
        assert!(shell.contains("\"context\": \"clusterhq/flocker/master/pkg\""));
    }

    #[test]
    fn test_render_is_pure() {
        let config = test_config();
        let path = JobPath::new("clusterhq/flocker", "master", "pkg");
        let credential = CredentialRef::new("STATUS_TOKEN");

        let first = StatusNotifier::render(StatusEvent::Started, &path, &config, &credential);
        let second = StatusNotifier::render(StatusEvent::Started, &path, &config, &credential);
        assert_eq!(first, second);
    }
}
