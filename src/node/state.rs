//! Session state shared by a host application
//!
//! The core never reaches into global state. A host (for example an HTTP
//! server) owns a [`SessionStore`] and passes it to the operations that need
//! the current RPC client or the wallets created during the session.

use crate::error::{NodeError, Result};
use crate::node::config::RpcCredentials;
use crate::node::rpc::RpcClient;
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Current status of the daemon (sent to callers)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    /// Whether the daemon process is running
    pub running: bool,

    /// PIDs of matching daemon processes
    pub pids: Vec<u32>,

    /// Working directory the manager is configured for
    pub working_directory: String,

    /// Chain mode read from the working directory (if readable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

/// Store for the active RPC client and the session's wallets
pub trait SessionStore: Send + Sync {
    /// Most recently registered client
    fn current_client(&self) -> Option<Arc<RpcClient>>;

    /// Client registered for exactly these credentials
    fn client_for(&self, credentials: &RpcCredentials) -> Option<Arc<RpcClient>>;

    /// Register a client, replacing any client with the same credentials
    fn upsert_client(&self, client: Arc<RpcClient>);

    /// Wallets in insertion order
    fn wallets(&self) -> Vec<Arc<Wallet>>;

    /// Append a wallet
    fn push_wallet(&self, wallet: Arc<Wallet>);

    /// Most recently added wallet whose label matches
    fn find_wallet(&self, label: &str) -> Result<Arc<Wallet>> {
        let wallets = self.wallets();
        if wallets.is_empty() {
            return Err(NodeError::NotFound(
                "no wallet has been loaded in this session".to_string(),
            ));
        }

        wallets
            .into_iter()
            .rev()
            .find(|w| w.label() == label)
            .ok_or_else(|| NodeError::NotFound(format!("wallet `{}` has not been loaded", label)))
    }
}

/// In-memory [`SessionStore`]
#[derive(Debug, Default)]
pub struct SessionState {
    clients: Mutex<Vec<Arc<RpcClient>>>,
    wallets: Mutex<Vec<Arc<Wallet>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionStore for SessionState {
    fn current_client(&self) -> Option<Arc<RpcClient>> {
        lock(&self.clients).last().cloned()
    }

    fn client_for(&self, credentials: &RpcCredentials) -> Option<Arc<RpcClient>> {
        lock(&self.clients)
            .iter()
            .rev()
            .find(|c| c.credentials() == credentials)
            .cloned()
    }

    fn upsert_client(&self, client: Arc<RpcClient>) {
        let mut clients = lock(&self.clients);
        clients.retain(|c| c.credentials() != client.credentials());
        clients.push(client);
    }

    fn wallets(&self) -> Vec<Arc<Wallet>> {
        lock(&self.wallets).clone()
    }

    fn push_wallet(&self, wallet: Arc<Wallet>) {
        log::debug!("Session wallet added: {}", wallet.label());
        lock(&self.wallets).push(wallet);
    }
}

/// Type alias for shared session state
pub type SharedSessionState = Arc<SessionState>;

/// Create a new shared session state
pub fn create_session_state() -> SharedSessionState {
    Arc::new(SessionState::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use crate::wallet::WalletMetadata;

    fn client(port: u16) -> Arc<RpcClient> {
        Arc::new(RpcClient::with_transport(
            RpcCredentials::new("u", "p", port),
            Arc::new(RecordingTransport::new()),
        )
        .unwrap())
    }

    fn wallet(client: &Arc<RpcClient>, label: &str, address: &str) -> Arc<Wallet> {
        Arc::new(Wallet::from_parts(
            client.clone(),
            label,
            WalletMetadata {
                name: label.to_string(),
                warning: None,
                address: Some(address.to_string()),
            },
        ))
    }

    #[test]
    fn test_empty_session() {
        let state = create_session_state();
        assert!(state.current_client().is_none());
        let err = state.find_wallet("vault").unwrap_err();
        assert!(matches!(err, NodeError::NotFound(_)));
    }

    #[test]
    fn test_upsert_replaces_same_credentials() {
        let state = SessionState::default();
        state.upsert_client(client(18884));
        state.upsert_client(client(18885));
        let replacement = client(18884);
        state.upsert_client(replacement.clone());

        assert!(Arc::ptr_eq(&state.current_client().unwrap(), &replacement));
        assert_eq!(lock(&state.clients).len(), 2);
        assert!(state
            .client_for(&RpcCredentials::new("u", "p", 18885))
            .is_some());
        assert!(state
            .client_for(&RpcCredentials::new("u", "other", 18885))
            .is_none());
    }

    #[test]
    fn test_latest_wallet_with_label_wins() {
        let state = SessionState::default();
        let rpc = client(18884);
        state.push_wallet(wallet(&rpc, "vault", "el1first"));
        state.push_wallet(wallet(&rpc, "other", "el1other"));
        state.push_wallet(wallet(&rpc, "vault", "el1second"));

        let found = state.find_wallet("vault").unwrap();
        assert_eq!(found.metadata().address.as_deref(), Some("el1second"));
        assert_eq!(state.wallets().len(), 3);

        let err = state.find_wallet("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
