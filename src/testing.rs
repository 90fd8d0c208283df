//! In-memory doubles for the daemon's RPC interface and process table

use crate::node::command::{CommandRunner, CommandSpec, RawOutput};
use crate::node::rpc::{RpcError, RpcTransport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One request seen by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub wallet: Option<String>,
    pub method: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct TransportState {
    canned: HashMap<String, Result<Value, RpcError>>,
    wallets: Vec<String>,
    calls: Vec<RecordedCall>,
}

/// RPC transport answering from canned responses.
///
/// `createwallet` and `listwallets` are simulated unless a canned response
/// overrides them; any other unknown method is rejected the way the
/// daemon rejects it.
#[derive(Default)]
pub struct RecordingTransport {
    state: Mutex<TransportState>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: &str, result: Value) {
        lock(&self.state)
            .canned
            .insert(method.to_string(), Ok(result));
    }

    pub fn fail(&self, method: &str, error: RpcError) {
        lock(&self.state)
            .canned
            .insert(method.to_string(), Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state).calls.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }
}

#[async_trait]
impl RpcTransport for RecordingTransport {
    async fn send(
        &self,
        wallet: Option<&str>,
        method: &str,
        params: &[Value],
    ) -> Result<Value, RpcError> {
        let mut state = lock(&self.state);
        state.calls.push(RecordedCall {
            wallet: wallet.map(str::to_string),
            method: method.to_string(),
            params: params.to_vec(),
        });

        if let Some(canned) = state.canned.get(method) {
            return canned.clone();
        }

        let protocol = |code: i64, message: String| RpcError::Protocol {
            method: method.to_string(),
            code,
            message,
        };

        match method {
            "createwallet" => {
                let name = params
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if state.wallets.contains(&name) {
                    return Err(protocol(
                        -4,
                        format!("Wallet file verification failed. Database already exists: {}", name),
                    ));
                }
                state.wallets.push(name.clone());
                Ok(json!({ "name": name, "warning": "" }))
            }
            "listwallets" => Ok(json!(state.wallets)),
            _ => Err(protocol(-32601, "Method not found".to_string())),
        }
    }
}

struct DaemonState {
    running: bool,
    stop_failure: Option<String>,
    commands: Vec<CommandSpec>,
}

/// Process table with a single fake `elementsd`.
///
/// `pgrep` reports PID 4242 while the daemon runs, spawning `elementsd`
/// starts it and `elements-cli stop` stops it.
pub struct FakeDaemon {
    state: Mutex<DaemonState>,
}

impl FakeDaemon {
    pub fn new(running: bool) -> Self {
        Self {
            state: Mutex::new(DaemonState {
                running,
                stop_failure: None,
                commands: Vec::new(),
            }),
        }
    }

    pub fn set_running(&self, running: bool) {
        lock(&self.state).running = running;
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Make `elements-cli stop` exit 1 with `message` on stderr
    pub fn fail_stop(&self, message: &str) {
        lock(&self.state).stop_failure = Some(message.to_string());
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        lock(&self.state).commands.clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.commands().into_iter().map(|c| c.program).collect()
    }

    fn answer(&self, spec: &CommandSpec) -> io::Result<RawOutput> {
        let mut state = lock(&self.state);
        state.commands.push(spec.clone());

        let exit = |code: i32, stdout: &str, stderr: &str| RawOutput {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };

        match spec.program.as_str() {
            "pgrep" if state.running => Ok(exit(0, "4242\n", "")),
            "pgrep" => Ok(exit(1, "", "")),
            "elements-cli" if spec.args.last().map(String::as_str) == Some("stop") => {
                match state.stop_failure.clone() {
                    Some(message) => Ok(exit(1, "", &message)),
                    None => {
                        state.running = false;
                        Ok(exit(0, "Elements Core stopping\n", ""))
                    }
                }
            }
            other => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: command not found", other),
            )),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeDaemon {
    async fn run(&self, spec: &CommandSpec) -> io::Result<RawOutput> {
        // Let concurrent callers interleave between process invocations
        tokio::task::yield_now().await;
        self.answer(spec)
    }

    async fn spawn(&self, spec: &CommandSpec) -> io::Result<Option<u32>> {
        tokio::task::yield_now().await;
        let mut state = lock(&self.state);
        state.commands.push(spec.clone());
        if spec.program != "elementsd" {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: command not found", spec.program),
            ));
        }
        state.running = true;
        Ok(Some(4242))
    }
}
