//! Node process management
//!
//! Handles starting, stopping, and monitoring the Elements daemon. Process
//! state is never cached: every decision re-queries the process table.

use super::command::{CommandExecutor, CommandSpec};
use super::config::{ChainConfig, NodeConfig};
use super::execution::{execute, Outcome};
use super::state::NodeStatus;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// What `ensure` does for a given `(running, new_node)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Plan {
    /// Not running, no fresh node requested
    LeaveStopped,
    /// Running, no fresh node requested
    LeaveRunning,
    /// Not running, fresh node requested
    Start,
    /// Running, fresh node requested: stop first, then start
    Restart,
}

impl Plan {
    pub fn decide(running: bool, new_node: bool) -> Self {
        match (running, new_node) {
            (false, false) => Plan::LeaveStopped,
            (true, false) => Plan::LeaveRunning,
            (false, true) => Plan::Start,
            (true, true) => Plan::Restart,
        }
    }
}

/// Result of an `ensure` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureReport {
    pub plan: Plan,
    pub working_directory: PathBuf,
    /// Validated chain configuration (only read when a fresh node was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainConfig>,
}

/// Manages the Elements daemon process
#[derive(Debug)]
pub struct DaemonManager {
    executor: CommandExecutor,
    config: NodeConfig,
    /// Serialises check-then-act lifecycle sequences. Holds the directory
    /// the daemon was last started against by this manager.
    lifecycle: Mutex<Option<PathBuf>>,
}

impl DaemonManager {
    /// Create a manager that runs real OS processes
    pub fn new(config: NodeConfig) -> Self {
        Self::with_executor(config, CommandExecutor::new())
    }

    pub fn with_executor(config: NodeConfig, executor: CommandExecutor) -> Self {
        Self {
            executor,
            config,
            lifecycle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn process_query(&self) -> CommandSpec {
        let mut spec = CommandSpec::new("pgrep");
        if let Ok(user) = std::env::var("USER") {
            if !user.is_empty() {
                spec = spec.arg("-u").arg(user);
            }
        }
        spec.arg("-x").arg(&self.config.process_name)
    }

    async fn query_process_table(&self) -> Result<Outcome<Value>> {
        let spec = self.process_query();
        execute("process check", || self.executor.run(&spec)).await
    }

    /// Check if the daemon is running by querying the process table
    pub async fn is_running(&self) -> Result<bool> {
        Ok(!self.query_process_table().await?.is_empty())
    }

    /// PIDs of running daemon processes owned by the current user
    pub async fn running_pids(&self) -> Result<Vec<u32>> {
        let text = match self.query_process_table().await? {
            Outcome::Empty => return Ok(Vec::new()),
            Outcome::Value(Value::String(s)) => s,
            Outcome::Value(other) => other.to_string(),
        };

        Ok(text
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .collect())
    }

    /// Validate the chain configuration of a working directory
    pub fn check_location(&self, working_dir: &Path) -> Result<ChainConfig> {
        match ChainConfig::read(working_dir, &self.config.chain_conf_file) {
            Ok(conf) => {
                log::info!(
                    "Initializing chain in mode {} located at {}",
                    conf.chain,
                    working_dir.display()
                );
                Ok(conf)
            }
            Err(e) => {
                log::error!("Verify that there is a chain configuration file: {}", e);
                Err(e)
            }
        }
    }

    /// Bring the daemon into the requested state.
    ///
    /// With `new_node` false nothing is changed. With `new_node` true the
    /// working directory's chain configuration is validated first; a running
    /// daemon is stopped and a fresh one is started against that directory.
    pub async fn ensure(&self, new_node: bool, working_dir: Option<&Path>) -> Result<EnsureReport> {
        let mut started = self.lifecycle.lock().await;

        let working_directory = working_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.get_working_directory());

        let chain = if new_node {
            Some(self.check_location(&working_directory)?)
        } else {
            None
        };

        let plan = Plan::decide(self.is_running().await?, new_node);
        match plan {
            Plan::LeaveStopped => {
                log::info!(
                    "Daemon is not running and no fresh node was requested; RPC operations will be unavailable"
                );
            }
            Plan::LeaveRunning => {
                log::info!("Daemon is running and no fresh node was requested");
            }
            Plan::Start => {
                self.start_unlocked(Some(&working_directory)).await?;
                *started = Some(working_directory.clone());
                log::info!("Elements daemon started");
            }
            Plan::Restart => {
                log::info!("A daemon is already running, stopping it first");
                self.stop_unlocked(started.as_deref()).await?;
                *started = None;
                self.wait_for_exit().await?;
                self.start_unlocked(Some(&working_directory)).await?;
                *started = Some(working_directory.clone());
                log::info!("Elements daemon restarted");
            }
        }

        Ok(EnsureReport {
            plan,
            working_directory,
            chain,
        })
    }

    /// Start a daemon, optionally against a custom data directory.
    ///
    /// Returns once the process exists, with its PID when known. Readiness
    /// is not awaited; see [`RpcClient::wait_until_ready`](super::rpc::RpcClient::wait_until_ready).
    pub async fn start(&self, working_dir: Option<&Path>) -> Result<Outcome<Value>> {
        let mut started = self.lifecycle.lock().await;
        let outcome = self.start_unlocked(working_dir).await?;
        *started = working_dir.map(Path::to_path_buf);
        Ok(outcome)
    }

    /// Stop the running daemon through the control CLI
    pub async fn stop(&self) -> Result<Outcome<Value>> {
        let mut started = self.lifecycle.lock().await;
        let outcome = self.stop_unlocked(started.as_deref()).await?;
        *started = None;
        Ok(outcome)
    }

    /// The command line used to start the daemon
    pub fn start_command(&self, working_dir: Option<&Path>) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.daemon_binary);

        // The daemon's own default needs no flag
        if let Some(dir) = working_dir {
            if dir != NodeConfig::default_working_dir() {
                spec = spec.arg(format!("-datadir={}", dir.display()));
            }
        }

        spec.args(self.config.custom_args())
    }

    /// The command line used to stop a daemon started against `working_dir`
    /// (the configured directory when `None`)
    pub fn stop_command(&self, working_dir: Option<&Path>) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.cli_binary);
        let dir = working_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.get_working_directory());
        if dir != NodeConfig::default_working_dir() {
            spec = spec.arg(format!("-datadir={}", dir.display()));
        }
        spec.arg("stop")
    }

    async fn start_unlocked(&self, working_dir: Option<&Path>) -> Result<Outcome<Value>> {
        let spec = self.start_command(working_dir);
        log::info!("Starting daemon: {}", spec);
        execute("daemon start", || self.executor.spawn(&spec)).await
    }

    async fn stop_unlocked(&self, working_dir: Option<&Path>) -> Result<Outcome<Value>> {
        let spec = self.stop_command(working_dir);
        log::info!("Stopping daemon: {}", spec);
        execute("daemon stop", || self.executor.run(&spec)).await
    }

    /// Wait for the stopped daemon to leave the process table
    async fn wait_for_exit(&self) -> Result<()> {
        let timeout = self.config.stop_timeout();
        let start = Instant::now();

        while self.is_running().await? {
            if start.elapsed() >= timeout {
                log::warn!(
                    "Daemon still running {}s after stop; starting anyway",
                    timeout.as_secs()
                );
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }

    /// Snapshot of the daemon for status reporting
    pub async fn status(&self) -> Result<NodeStatus> {
        let working_directory = self.config.get_working_directory();
        let pids = self.running_pids().await?;
        let chain = ChainConfig::read(&working_directory, &self.config.chain_conf_file)
            .ok()
            .map(|c| c.chain);

        Ok(NodeStatus {
            running: !pids.is_empty(),
            pids,
            working_directory: working_directory.to_string_lossy().to_string(),
            chain,
        })
    }
}
