//! Host-facing operations
//!
//! Plain async functions a host (HTTP server, CLI) calls with its own
//! [`SessionStore`] and [`DaemonManager`]. They hold no state of their own.

use crate::error::{NodeError, Result};
use crate::node::config::RpcCredentials;
use crate::node::manager::{DaemonManager, EnsureReport};
use crate::node::rpc::RpcClient;
use crate::node::state::{NodeStatus, SessionStore};
use crate::wallet::{Wallet, WalletMetadata};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// RPC client
// ============================================================================

/// Reuse the client registered for `credentials`, or build and register one.
///
/// Either way the returned client becomes the store's current client.
pub fn active_client(
    store: &dyn SessionStore,
    credentials: &RpcCredentials,
    timeout: Duration,
) -> Result<Arc<RpcClient>> {
    let client = match store.client_for(credentials) {
        Some(existing) => existing,
        None => Arc::new(RpcClient::with_timeout(credentials.clone(), timeout)?),
    };
    store.upsert_client(client.clone());
    Ok(client)
}

fn current_client(store: &dyn SessionStore) -> Result<Arc<RpcClient>> {
    store
        .current_client()
        .ok_or_else(|| NodeError::NotFound("no RPC client is active".to_string()))
}

// ============================================================================
// Wallets
// ============================================================================

/// Every wallet loaded in the daemon
pub async fn list_wallets(store: &dyn SessionStore) -> Result<Vec<String>> {
    let client = current_client(store)?;
    Wallet::list_all(&client).await
}

/// Metadata of the most recently created session wallet with `label`
pub fn labeled_wallet(store: &dyn SessionStore, label: &str) -> Result<WalletMetadata> {
    Ok(store.find_wallet(label)?.metadata().clone())
}

/// Create a wallet with the current client and add it to the session
pub async fn create_wallet(
    store: &dyn SessionStore,
    label: Option<&str>,
    with_address: bool,
) -> Result<Arc<Wallet>> {
    let client = current_client(store)?;
    let wallet = Arc::new(Wallet::create(client, label, with_address).await?);
    store.push_wallet(wallet.clone());
    Ok(wallet)
}

/// Sanitized balance of a session wallet, read through the shared handle
pub async fn wallet_balance(store: &dyn SessionStore, label: &str) -> Result<Value> {
    let wallet = store.find_wallet(label)?;
    wallet.balance_report().await
}

// ============================================================================
// Daemon
// ============================================================================

pub async fn node_status(manager: &DaemonManager) -> Result<NodeStatus> {
    manager.status().await
}

/// Start a fresh daemon against `working_dir`, restarting a running one
pub async fn start_node(manager: &DaemonManager, working_dir: Option<&Path>) -> Result<EnsureReport> {
    manager.ensure(true, working_dir).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::node::command::CommandExecutor;
    use crate::node::config::NodeConfig;
    use crate::node::manager::Plan;
    use crate::node::state::SessionState;
    use crate::testing::{FakeDaemon, RecordingTransport};
    use serde_json::json;
    use tempfile::TempDir;

    fn seeded_store(transport: &Arc<RecordingTransport>) -> SessionState {
        let store = SessionState::default();
        store.upsert_client(Arc::new(RpcClient::with_transport(
            RpcCredentials::new("u", "p", 18884),
            transport.clone(),
        )
        .unwrap()));
        store
    }

    #[test]
    fn test_active_client_reuses_matching_credentials() {
        let transport = Arc::new(RecordingTransport::new());
        let store = seeded_store(&transport);
        let seeded = store.current_client().unwrap();

        let same = active_client(&store, &RpcCredentials::new("u", "p", 18884), Duration::from_secs(5))
            .unwrap();
        assert!(Arc::ptr_eq(&same, &seeded));

        let other = active_client(&store, &RpcCredentials::new("u", "p", 18885), Duration::from_secs(5))
            .unwrap();
        assert!(!Arc::ptr_eq(&other, &seeded));
        assert!(Arc::ptr_eq(&store.current_client().unwrap(), &other));
    }

    #[tokio::test]
    async fn test_operations_need_a_client() {
        let store = SessionState::default();
        let err = list_wallets(&store).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);

        let err = create_wallet(&store, Some("vault"), false).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_created_wallets_are_registered() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond("getnewaddress", json!("el1qqvault"));
        let store = seeded_store(&transport);

        create_wallet(&store, Some("vault"), true).await.unwrap();

        let metadata = labeled_wallet(&store, "vault").unwrap();
        assert_eq!(metadata.name, "vault");
        assert_eq!(metadata.address.as_deref(), Some("el1qqvault"));
        assert_eq!(list_wallets(&store).await.unwrap(), vec!["vault".to_string()]);

        let err = labeled_wallet(&store, "ghost").unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_create_is_not_registered_twice() {
        let transport = Arc::new(RecordingTransport::new());
        let store = seeded_store(&transport);

        create_wallet(&store, Some("vault"), false).await.unwrap();
        let err = create_wallet(&store, Some("vault"), false).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::RpcProtocolError);
        assert_eq!(store.wallets().len(), 1);
    }

    #[tokio::test]
    async fn test_wallet_balance_reads_session_handle() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(
            "getbalance",
            serde_json::from_str(r#"{"bitcoin": 2.00000000}"#).unwrap(),
        );
        let store = seeded_store(&transport);
        let created = create_wallet(&store, Some("vault"), false).await.unwrap();

        assert_eq!(wallet_balance(&store, "vault").await.unwrap(), json!({ "bitcoin": 2.0 }));
        assert_eq!(transport.calls().last().unwrap().wallet.as_deref(), Some("vault"));

        // Only the store and this test hold the handle
        assert_eq!(Arc::strong_count(&created), 2);
        assert!(Arc::ptr_eq(&store.find_wallet("vault").unwrap(), &created));
    }

    #[tokio::test]
    async fn test_start_node_then_status() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("elements.conf"), "chain=liquidv1\n").unwrap();

        let daemon = Arc::new(FakeDaemon::new(false));
        let config = NodeConfig {
            working_directory: Some(dir.path().to_string_lossy().to_string()),
            ..Default::default()
        };
        let manager = DaemonManager::with_executor(config, CommandExecutor::with_runner(daemon.clone()));

        let report = start_node(&manager, None).await.unwrap();
        assert_eq!(report.plan, Plan::Start);
        assert_eq!(report.working_directory, dir.path());

        let status = node_status(&manager).await.unwrap();
        assert!(status.running);
        assert_eq!(status.chain.as_deref(), Some("liquidv1"));
    }
}
