//! Liquid Vault
//!
//! Runs a local Elements/Liquid daemon and drives wallet and asset
//! operations against it over JSON-RPC.
//!
//! - [`node`]: daemon lifecycle, command execution, RPC client, session store
//! - [`wallet`]: wallet handles, recovery phrases and the single-wallet
//!   token [`Pool`]
//! - [`operations`]: entry points for a host application
//!
//! Every daemon interaction goes through [`node::execute`] and fails with a
//! classified [`NodeError`].

pub mod error;
pub mod logging;
pub mod node;
pub mod operations;
pub mod sanitize;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ClassifiedFailure, FailureKind, NodeError, Result};
pub use node::{DaemonManager, NodeConfig, Outcome, RpcClient, RpcCredentials};
pub use sanitize::to_float_safe;
pub use wallet::{generate_mnemonic, Pool, Wallet, WalletMetadata};

/// Expand `~` in user-supplied paths
///
/// Unix: `~` expands to HOME. Windows: `%VAR%` environment variables.
pub fn expand_path(path: &str) -> String {
    let mut result = path.to_string();

    #[cfg(windows)]
    {
        while let Some(start) = result.find('%') {
            let Some(end) = result[start + 1..].find('%') else {
                break;
            };
            let var_name = &result[start + 1..start + 1 + end];
            match std::env::var(var_name) {
                Ok(value) => {
                    result = format!("{}{}{}", &result[..start], value, &result[start + 2 + end..]);
                }
                Err(_) => break,
            }
        }
    }

    #[cfg(not(windows))]
    {
        if let Some(home) = dirs::home_dir() {
            if result == "~" {
                result = home.to_string_lossy().to_string();
            } else if let Some(rest) = result.strip_prefix("~/") {
                result = home.join(rest).to_string_lossy().to_string();
            }
        }
    }

    result
}
