//! Node management module for Liquid Vault
//!
//! This module runs the Elements daemon and talks to it.
//!
//! ## Features
//!
//! - **Process Management**: Detect, start, stop and restart `elementsd`
//! - **Chain Validation**: Refuse to start without a `chain=` configuration
//! - **RPC Client**: Authenticated JSON-RPC, node-level or wallet-scoped
//! - **Execution Wrapper**: One error-classification path for RPC and CLI
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    node module                           │
//! ├─────────────────────────────────────────────────────────┤
//! │  command.rs    - External command runner and decoding    │
//! │  execution.rs  - Execution wrapper and Outcome           │
//! │  config.rs     - Configuration, credentials, chain conf  │
//! │  rpc.rs        - JSON-RPC client and transport           │
//! │  manager.rs    - Process lifecycle (ensure/start/stop)   │
//! │  state.rs      - Session store and status types          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod config;
pub mod execution;
pub mod manager;
pub mod rpc;
pub mod state;

// Re-export key types for convenience
pub use command::{CommandExecutor, CommandRunner, CommandSpec, RawOutput};
pub use config::{ChainConfig, NodeConfig, RpcCredentials};
pub use execution::{execute, execute_value, Outcome};
pub use manager::{DaemonManager, EnsureReport, Plan};
pub use rpc::{RpcClient, RpcError, RpcTransport};
pub use state::{create_session_state, NodeStatus, SessionState, SessionStore, SharedSessionState};
