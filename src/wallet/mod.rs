//! Wallet handles
//!
//! A [`Wallet`] is a local handle on one named wallet inside the daemon.
//! The daemon stays the source of truth: the handle caches the creation
//! response and nothing else, and every query goes back over RPC.

pub mod mnemonic;
pub mod pool;

pub use mnemonic::generate_mnemonic;
pub use pool::Pool;

use crate::error::Result;
use crate::node::execution::{execute, execute_value};
use crate::node::rpc::RpcClient;
use crate::sanitize::to_float_safe;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Daemon-side metadata captured when the wallet was created or loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMetadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    /// Receiving address fetched right after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// `createwallet` / `loadwallet` result. Newer daemons report `warnings`.
#[derive(Debug, Deserialize)]
struct WalletResponse {
    name: String,
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

impl WalletResponse {
    fn into_metadata(self) -> WalletMetadata {
        let mut messages: Vec<String> = self.warning.into_iter().collect();
        messages.extend(self.warnings);
        messages.retain(|m| !m.is_empty());

        WalletMetadata {
            name: self.name,
            warning: (!messages.is_empty()).then(|| messages.join("; ")),
            address: None,
        }
    }
}

/// Transfer and issuance calls answer either a bare txid or an object carrying one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TxidResponse {
    Plain(String),
    Detailed { txid: String },
}

impl TxidResponse {
    fn into_txid(self) -> String {
        match self {
            TxidResponse::Plain(txid) | TxidResponse::Detailed { txid } => txid,
        }
    }
}

/// Handle on one named daemon wallet.
///
/// Not `Clone`: a handle has one owner, either a [`Pool`] or an `Arc` in a
/// session store.
#[derive(Debug)]
pub struct Wallet {
    rpc: Arc<RpcClient>,
    label: String,
    metadata: WalletMetadata,
}

impl Wallet {
    /// Create a wallet on the daemon.
    ///
    /// An absent or empty label is replaced by a fresh UUID. With
    /// `with_address` a receiving address is fetched and kept in the
    /// metadata. A label that already exists fails at the daemon and is
    /// returned as an `RpcProtocolError`.
    pub async fn create(rpc: Arc<RpcClient>, label: Option<&str>, with_address: bool) -> Result<Self> {
        let label = resolve_label(label);
        log::info!("Creating wallet: {}", label);

        let response: WalletResponse = execute_value("createwallet", || {
            rpc.call_as("createwallet", vec![json!(label), json!(false), json!(false)])
        })
        .await?;
        let mut metadata = response.into_metadata();

        if with_address {
            let address: String = execute_value("getnewaddress", || {
                rpc.call_wallet_as(&label, "getnewaddress", vec![])
            })
            .await?;
            metadata.address = Some(address);
        }

        if let Some(warning) = &metadata.warning {
            log::warn!("Wallet {} created with warning: {}", label, warning);
        }

        Ok(Self {
            rpc,
            label,
            metadata,
        })
    }

    /// Load an existing daemon wallet and return a handle on it
    pub async fn load(rpc: Arc<RpcClient>, label: &str) -> Result<Self> {
        log::info!("Loading wallet: {}", label);

        let outcome = execute("loadwallet", || {
            rpc.call_as::<WalletResponse>("loadwallet", vec![json!(label)])
        })
        .await?;

        let metadata = outcome
            .map(WalletResponse::into_metadata)
            .into_option()
            .unwrap_or_else(|| WalletMetadata {
                name: label.to_string(),
                ..WalletMetadata::default()
            });

        Ok(Self::from_parts(rpc, label, metadata))
    }

    /// Build a handle from metadata obtained elsewhere
    pub fn from_parts(rpc: Arc<RpcClient>, label: impl Into<String>, metadata: WalletMetadata) -> Self {
        Self {
            rpc,
            label: label.into(),
            metadata,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn metadata(&self) -> &WalletMetadata {
        &self.metadata
    }

    pub fn rpc(&self) -> &Arc<RpcClient> {
        &self.rpc
    }

    /// Every wallet the daemon has loaded, not only this one
    pub async fn list_wallets(&self) -> Result<Vec<String>> {
        Self::list_all(&self.rpc).await
    }

    /// `listwallets` against any client
    pub async fn list_all(rpc: &RpcClient) -> Result<Vec<String>> {
        let outcome = execute("listwallets", || {
            rpc.call_as::<Vec<String>>("listwallets", vec![])
        })
        .await?;
        Ok(outcome.unwrap_or_default())
    }

    pub async fn get_balance(&self) -> Result<Value> {
        self.query("getbalance").await
    }

    pub async fn get_address(&self) -> Result<Value> {
        self.query("getaddress").await
    }

    pub async fn get_private_key(&self) -> Result<Value> {
        self.query("dumpprivkey").await
    }

    pub async fn get_public_key(&self) -> Result<Value> {
        self.query("getpubkey").await
    }

    pub async fn get_wallet_info(&self) -> Result<Value> {
        self.query("getwalletinfo").await
    }

    /// Fresh receiving address. The stored metadata is left as it was.
    pub async fn new_address(&self) -> Result<String> {
        execute_value("getnewaddress", || {
            self.rpc.call_wallet_as(&self.label, "getnewaddress", vec![])
        })
        .await
    }

    /// Balance with decimals converted for plain JSON serializers
    pub async fn balance_report(&self) -> Result<Value> {
        Ok(to_float_safe(&self.get_balance().await?))
    }

    /// Wallet info with decimals converted for plain JSON serializers
    pub async fn wallet_info_report(&self) -> Result<Value> {
        Ok(to_float_safe(&self.get_wallet_info().await?))
    }

    pub async fn send_to_address(&self, address: &str, amount: f64) -> Result<String> {
        log::info!("Sending {} to {} from wallet {}", amount, address, self.label);
        self.transaction("sendtoaddress", vec![json!(address), json!(amount)])
            .await
    }

    pub async fn send_to_many(&self, recipients: &BTreeMap<String, f64>) -> Result<String> {
        log::info!(
            "Sending to {} recipients from wallet {}",
            recipients.len(),
            self.label
        );
        self.transaction("sendmany", vec![json!(""), json!(recipients)])
            .await
    }

    /// `sendfrom` with the same address as source and destination
    pub async fn send_from_address(&self, address: &str, amount: f64) -> Result<String> {
        self.transaction("sendfrom", vec![json!(address), json!(address), json!(amount)])
            .await
    }

    /// Issue a new asset and return the issuance txid
    pub async fn issue_asset(
        &self,
        name: &str,
        quantity: u64,
        description: &str,
        divisible: bool,
    ) -> Result<String> {
        log::info!("Issuing {} x {} from wallet {}", quantity, name, self.label);
        self.transaction(
            "issue",
            vec![json!(name), json!(quantity), json!(description), json!(divisible)],
        )
        .await
    }

    /// Destroy `quantity` units of an asset and return the txid
    pub async fn burn_asset(&self, name: &str, quantity: u64) -> Result<String> {
        log::info!("Burning {} x {} from wallet {}", quantity, name, self.label);
        self.transaction("destroyamount", vec![json!(name), json!(quantity)])
            .await
    }

    async fn query(&self, method: &str) -> Result<Value> {
        let outcome = execute(method, || self.rpc.call_wallet(&self.label, method, vec![])).await?;
        Ok(outcome.unwrap_or_default())
    }

    async fn transaction(&self, method: &str, params: Vec<Value>) -> Result<String> {
        let response: TxidResponse = execute_value(method, || {
            self.rpc.call_wallet_as(&self.label, method, params)
        })
        .await?;
        Ok(response.into_txid())
    }
}

fn resolve_label(label: Option<&str>) -> String {
    match label.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}
