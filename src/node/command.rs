//! External command execution
//!
//! Runs `elementsd`, `elements-cli` and `pgrep` to completion, captures
//! their output and decodes stdout. The daemon itself is spawned detached
//! and never waited on. Failures are reported as [`CommandError`] and
//! classified by the execution wrapper.

use super::execution::Outcome;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;

/// A command line to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// Exit status (`None` when terminated by a signal)
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RawOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Unclassified command failures
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{command}` exited with status {code}")]
    Failed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("`{command}` exited with status {code} and no output")]
    FailedSilently { command: String, code: i32 },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Starts OS processes
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Spawn a process and wait for it to finish
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<RawOutput>;

    /// Spawn a long-lived process and return its PID without waiting
    async fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Option<u32>>;
}

/// Runs commands on the host OS
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<RawOutput> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await?;

        Ok(RawOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Option<u32>> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        // Dropping the handle leaves the process running; tokio reaps it
        let child = cmd.spawn()?;
        Ok(child.id())
    }
}

/// Runs commands and decodes their output
#[derive(Clone)]
pub struct CommandExecutor {
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("runner", &"<dyn CommandRunner>")
            .finish()
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    /// Executor backed by real OS processes
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run a command to completion.
    ///
    /// On exit status 0 stdout is decoded as JSON when possible, otherwise
    /// returned as a string. Empty stdout yields [`Outcome::Empty`].
    pub async fn run(&self, spec: &CommandSpec) -> Result<Outcome<Value>, CommandError> {
        log::debug!("Running command: {}", spec);

        let output = self
            .runner
            .run(spec)
            .await
            .map_err(|source| CommandError::Spawn {
                command: spec.to_string(),
                source,
            })?;

        decode_output(spec, output)
    }

    /// Start a process in the background.
    ///
    /// Returns as soon as the OS has created the process, with its PID
    /// when known. Launch errors are reported like those of [`run`](Self::run).
    pub async fn spawn(&self, spec: &CommandSpec) -> Result<Outcome<Value>, CommandError> {
        log::debug!("Spawning command: {}", spec);

        let pid = self
            .runner
            .spawn(spec)
            .await
            .map_err(|source| CommandError::Spawn {
                command: spec.to_string(),
                source,
            })?;

        Ok(match pid {
            Some(pid) => Outcome::Value(Value::from(pid)),
            None => Outcome::Empty,
        })
    }
}

/// Turn a finished process into an outcome or a command failure
pub fn decode_output(spec: &CommandSpec, output: RawOutput) -> Result<Outcome<Value>, CommandError> {
    if !output.success() {
        let code = output.code.unwrap_or(-1);
        if output.stdout.trim().is_empty() && output.stderr.trim().is_empty() {
            return Err(CommandError::FailedSilently {
                command: spec.to_string(),
                code,
            });
        }
        return Err(CommandError::Failed {
            command: spec.to_string(),
            code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    let stdout = output.stdout.trim_end();
    if stdout.trim().is_empty() {
        return Ok(Outcome::Empty);
    }

    match serde_json::from_str::<Value>(stdout) {
        Ok(value) => Ok(Outcome::Value(value)),
        Err(_) => Ok(Outcome::Value(Value::String(stdout.to_string()))),
    }
}
