//! Execution wrapper
//!
//! Every RPC call and every external command passes through [`execute`].
//! It classifies failures into [`NodeError`], logs them with a severity
//! matching their kind, and swallows only `CommandFailedSilently`.

use crate::error::{Classify, NodeError, Result};
use std::future::Future;

/// Successful result of a daemon interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation produced data
    Value(T),
    /// The operation succeeded but produced nothing
    Empty,
}

impl<T> Outcome<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Empty => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Value(v) => Outcome::Value(f(v)),
            Outcome::Empty => Outcome::Empty,
        }
    }

    /// Unwrap a value the caller cannot do without
    pub fn require(self, operation: &str) -> Result<T> {
        match self {
            Outcome::Value(v) => Ok(v),
            Outcome::Empty => Err(NodeError::Unclassified(format!(
                "`{}` returned no data",
                operation
            ))),
        }
    }
}

impl<T: Default> Outcome<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

/// Invoke `call` and classify whatever it fails with.
///
/// `CommandFailedSilently` is logged at warn level and turned into
/// [`Outcome::Empty`]; every other kind is logged at error level and
/// returned.
pub async fn execute<T, E, F, Fut>(operation: &str, call: F) -> Result<Outcome<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<Outcome<T>, E>>,
    E: Classify,
{
    match call().await {
        Ok(outcome) => Ok(outcome),
        Err(raw) => {
            let err = raw.classify();
            if err.is_benign() {
                log::warn!("{} finished without output: {}", operation, err);
                Ok(Outcome::Empty)
            } else {
                log::error!("{} failed [{}]: {}", operation, err.kind(), err);
                Err(err)
            }
        }
    }
}

/// Like [`execute`], for operations that must produce a value
pub async fn execute_value<T, E, F, Fut>(operation: &str, call: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<Outcome<T>, E>>,
    E: Classify,
{
    let outcome = execute(operation, call).await?;
    outcome.require(operation).inspect_err(|e| {
        log::error!("{} failed [{}]: {}", operation, e.kind(), e);
    })
}
