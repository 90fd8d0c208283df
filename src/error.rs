//! Classified failures for every daemon interaction
//!
//! Lower layers report their own error types ([`CommandError`],
//! [`RpcError`]); the execution wrapper turns them into a [`NodeError`]
//! through the [`Classify`] trait. Nothing above the wrapper sees a raw
//! I/O, HTTP or decoding error.

use crate::node::command::CommandError;
use crate::node::rpc::RpcError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using the classified error
pub type Result<T> = std::result::Result<T, NodeError>;

/// The fixed failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    RpcProtocolError,
    RpcTransportError,
    CommandFailed,
    CommandFailedSilently,
    ConfigurationError,
    NotFound,
    UnclassifiedError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::RpcProtocolError => "RpcProtocolError",
            FailureKind::RpcTransportError => "RpcTransportError",
            FailureKind::CommandFailed => "CommandFailed",
            FailureKind::CommandFailedSilently => "CommandFailedSilently",
            FailureKind::ConfigurationError => "ConfigurationError",
            FailureKind::NotFound => "NotFound",
            FailureKind::UnclassifiedError => "UnclassifiedError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure from the core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("RPC `{method}` rejected by daemon (code {code}): {message}")]
    RpcProtocol {
        method: String,
        code: i64,
        message: String,
    },

    #[error("RPC `{method}` could not reach daemon: {detail}")]
    RpcTransport { method: String, detail: String },

    #[error("command `{command}` exited with status {code}: {output}")]
    CommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("command `{command}` exited with status {code} and no output")]
    CommandFailedSilently { command: String, code: i32 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unclassified error: {0}")]
    Unclassified(String),
}

impl NodeError {
    /// Which taxonomy bucket this error belongs to
    pub fn kind(&self) -> FailureKind {
        match self {
            NodeError::RpcProtocol { .. } => FailureKind::RpcProtocolError,
            NodeError::RpcTransport { .. } => FailureKind::RpcTransportError,
            NodeError::CommandFailed { .. } => FailureKind::CommandFailed,
            NodeError::CommandFailedSilently { .. } => FailureKind::CommandFailedSilently,
            NodeError::Configuration(_) => FailureKind::ConfigurationError,
            NodeError::NotFound(_) => FailureKind::NotFound,
            NodeError::Unclassified(_) => FailureKind::UnclassifiedError,
        }
    }

    /// Transport failures may succeed once the daemon is confirmed running
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::RpcTransport { .. })
    }

    /// Failures that are logged but never escalated to the caller
    pub fn is_benign(&self) -> bool {
        matches!(self, NodeError::CommandFailedSilently { .. })
    }

    /// The kind/detail pair handed to outer layers (e.g. an HTTP envelope)
    pub fn to_failure(&self) -> ClassifiedFailure {
        ClassifiedFailure {
            kind: self.kind(),
            detail: self.to_string(),
        }
    }
}

/// Serializable view of a [`NodeError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl From<NodeError> for ClassifiedFailure {
    fn from(e: NodeError) -> Self {
        e.to_failure()
    }
}

/// Conversion of a layer-specific failure into the taxonomy
pub trait Classify {
    fn classify(self) -> NodeError;
}

impl Classify for NodeError {
    fn classify(self) -> NodeError {
        self
    }
}

impl Classify for CommandError {
    fn classify(self) -> NodeError {
        match self {
            CommandError::Failed {
                command,
                code,
                stdout,
                stderr,
            } => {
                let output = if stderr.trim().is_empty() {
                    stdout.trim().to_string()
                } else {
                    stderr.trim().to_string()
                };
                NodeError::CommandFailed {
                    command,
                    code,
                    output,
                }
            }
            CommandError::FailedSilently { command, code } => {
                NodeError::CommandFailedSilently { command, code }
            }
            CommandError::Spawn { command, source } => {
                NodeError::Unclassified(format!("failed to run `{}`: {}", command, source))
            }
        }
    }
}

impl Classify for RpcError {
    fn classify(self) -> NodeError {
        match self {
            RpcError::Protocol {
                method,
                code,
                message,
            } => NodeError::RpcProtocol {
                method,
                code,
                message,
            },
            RpcError::Transport { method, detail } => NodeError::RpcTransport { method, detail },
            RpcError::Decode { method, detail } => NodeError::Unclassified(format!(
                "malformed response to `{}`: {}",
                method, detail
            )),
        }
    }
}

impl Classify for anyhow::Error {
    fn classify(self) -> NodeError {
        match self.downcast::<NodeError>() {
            Ok(e) => e,
            Err(other) => NodeError::Unclassified(format!("{:#}", other)),
        }
    }
}

impl Classify for std::io::Error {
    fn classify(self) -> NodeError {
        NodeError::Unclassified(self.to_string())
    }
}

impl Classify for serde_json::Error {
    fn classify(self) -> NodeError {
        NodeError::Unclassified(format!("JSON error: {}", self))
    }
}
