// src/executor.rs

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::models::Job;

/// Default output template understood by spotdl.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "{title} - {artist}.{output-ext}";

/// Errors reported for a single job run.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("downloader exited with {}: {stderr}", describe_code(.code))]
    Failed { code: Option<i32>, stderr: String },
    #[error("job finished without reporting a result")]
    Abandoned,
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Text captured from a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one job to completion. Implementations are shared across all running jobs.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, ExecutorError>;
}

/// Executes jobs by spawning the `spotdl` command line downloader.
#[derive(Debug, Clone)]
pub struct SpotdlExecutor {
    program: PathBuf,
    output_template: String,
}

impl SpotdlExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }

    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    /// Build the process invocation for `job`. Every token is a separate argument,
    /// so names and paths are never interpreted by a shell.
    pub fn command(&self, job: &Job) -> Command {
        let output = job.destination.join(&self.output_template);
        let mut cmd = Command::new(&self.program);
        cmd.arg(&job.source_reference)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Default for SpotdlExecutor {
    fn default() -> Self {
        Self::new("spotdl")
    }
}

#[async_trait]
impl JobExecutor for SpotdlExecutor {
    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, ExecutorError> {
        let mut cmd = self.command(job);
        debug!(program = %self.program_name(), reference = %job.source_reference, "spawning downloader");

        let output = cmd.output().await.map_err(|source| ExecutorError::Spawn {
            program: self.program_name(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(failure(output.status, stderr));
        }
        if !stderr.trim().is_empty() {
            warn!(job = %job.display_name, "downloader stderr: {}", stderr.trim());
        }
        Ok(ExecutorOutput { stdout, stderr })
    }
}

fn failure(status: ExitStatus, stderr: String) -> ExecutorError {
    ExecutorError::Failed {
        code: status.code(),
        stderr: stderr.trim().to_string(),
    }
}
