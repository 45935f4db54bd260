//! Docker Compose wrapper for running ArchiveBox commands.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ArchiveError, ArchiveResult};

/// Max chars of a captured stream included in log lines.
const MAX_LOGGED_OUTPUT_LEN: usize = 2000;

/// The command-line surface of the ArchiveBox container.
#[async_trait]
pub trait ArchiveBoxCli: Send + Sync {
    /// Run `archivebox <args...>` in a throwaway container and return its stdout.
    async fn run(&self, args: &[String]) -> ArchiveResult<String>;

    /// Start the long-running ArchiveBox server container.
    async fn up(&self) -> ArchiveResult<()>;
}

/// Runs ArchiveBox via `docker compose` inside the project directory.
#[derive(Debug, Clone)]
pub struct DockerCompose {
    project_dir: PathBuf,
    service: String,
    timeout: Duration,
}

impl DockerCompose {
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>, service: impl Into<String>, timeout: Duration) -> Self {
        Self {
            project_dir: project_dir.into(),
            service: service.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.project_dir,
            &config.archivebox_service,
            config.archivebox_timeout,
        )
    }

    fn run_args(&self, args: &[String]) -> Vec<String> {
        let mut full = vec![
            "compose".to_string(),
            "run".to_string(),
            "--rm".to_string(),
            self.service.clone(),
        ];
        full.extend(args.iter().cloned());
        full
    }
}

#[async_trait]
impl ArchiveBoxCli for DockerCompose {
    async fn run(&self, args: &[String]) -> ArchiveResult<String> {
        let output = execute("docker", &self.run_args(args), Some(&self.project_dir), self.timeout).await?;
        Ok(output.stdout)
    }

    async fn up(&self) -> ArchiveResult<()> {
        let args = ["compose", "up", "-d"].map(String::from);
        execute("docker", &args, Some(&self.project_dir), self.timeout).await?;
        Ok(())
    }
}

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a program to completion, bounded by `timeout`.
///
/// # Errors
///
/// Returns `Invocation` if the program cannot be spawned or exits non-zero,
/// and `Timeout` if it does not finish in time.
pub async fn execute(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> ArchiveResult<CommandOutput> {
    let command_line = format!("{program} {}", args.join(" "));
    debug!(command = %command_line, "Running command");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| ArchiveError::Timeout {
            command: command_line.clone(),
            after: timeout,
        })?
        .map_err(|e| ArchiveError::Invocation {
            command: command_line.clone(),
            message: e.to_string(),
            stderr: String::new(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        warn!(
            command = %command_line,
            exit_code = ?output.status.code(),
            stderr = %truncate(&stderr),
            "Command failed"
        );
        return Err(ArchiveError::Invocation {
            command: command_line,
            message: output.status.to_string(),
            stderr,
        });
    }

    debug!(command = %command_line, stdout_len = stdout.len(), "Command finished");
    Ok(CommandOutput { stdout, stderr })
}

fn truncate(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() > MAX_LOGGED_OUTPUT_LEN {
        let head: String = trimmed.chars().take(MAX_LOGGED_OUTPUT_LEN).collect();
        format!(
            "{head}...[truncated {} more chars]",
            trimmed.chars().count() - MAX_LOGGED_OUTPUT_LEN
        )
    } else {
        trimmed.to_string()
    }
}
