//! JobForge - CI job-topology synthesis CLI
//!
//! The `jobforge` command loads a declarative build configuration and
//! synthesizes the job topology for a set of branches.
//!
//! ## Commands
//!
//! - `plan`: synthesize the topology and emit it as JSON
//! - `validate`: parse and validate a configuration
//! - `status-command`: render the commit-status command for an event

mod telemetry;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jobforge_core::{
    ConfigModel, CredentialRef, JobPath, StatusEvent, StatusNotifier, TopologyExpander,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "jobforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CI job-topology synthesis", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the topology for a set of branches and emit it as JSON
    Plan {
        /// Path to the build configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Branch to expand (repeatable)
        #[arg(short, long = "branch", required = true)]
        branches: Vec<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse and validate a build configuration
    Validate {
        /// Path to the build configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Render the commit-status command for a lifecycle event
    StatusCommand {
        /// Path to the build configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Lifecycle event: started, succeeded or failed
        #[arg(short, long)]
        event: String,

        /// Branch the status applies to
        #[arg(short, long)]
        branch: String,

        /// Job name used as the status context
        #[arg(short, long)]
        job: String,

        /// Environment variable holding the status credential
        #[arg(long, default_value = "JOBFORGE_STATUS_TOKEN")]
        credential_env: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Plan {
            config,
            branches,
            output,
        } => cmd_plan(&config, &branches, output.as_deref()),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::StatusCommand {
            config,
            event,
            branch,
            job,
            credential_env,
        } => cmd_status_command(&config, &event, &branch, &job, &credential_env),
    }
}

/// Synthesize the topology and emit it as JSON
fn cmd_plan(config_path: &Path, branches: &[String], output: Option<&Path>) -> Result<()> {
    let config = ConfigModel::from_path(config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let topology = TopologyExpander::synthesize(&config, branches)
        .context("Topology synthesis failed")?;

    let rendered =
        serde_json::to_string_pretty(&topology).context("Failed to serialize topology")?;

    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(output = %path.display(), "Wrote topology");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Parse and validate a configuration, reporting what it declares
fn cmd_validate(config_path: &Path) -> Result<()> {
    let config = ConfigModel::from_path(config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let job_count: usize = config.job_types.iter().map(|t| t.jobs.len()).sum();
    println!(
        "OK: {} declares {} job type(s), {} job(s), {} view(s)",
        config.project,
        config.job_types.len(),
        job_count,
        config.views.len()
    );
    Ok(())
}

/// Render the commit-status command for one event on one job
fn cmd_status_command(
    config_path: &Path,
    event: &str,
    branch: &str,
    job: &str,
    credential_env: &str,
) -> Result<()> {
    let config = ConfigModel::from_path(config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let event = parse_event(event)?;
    let path = JobPath::new(config.project.as_str(), branch, job);
    let credential = CredentialRef::new(credential_env);

    let command = StatusNotifier::render(event, &path, &config, &credential);
    println!("{}", command.to_shell());
    Ok(())
}

fn parse_event(event: &str) -> Result<StatusEvent> {
    match event {
        "started" => Ok(StatusEvent::Started),
        "succeeded" => Ok(StatusEvent::Succeeded),
        "failed" => Ok(StatusEvent::Failed),
        other => bail!("Unknown event '{other}' (expected started, succeeded or failed)"),
    }
}
