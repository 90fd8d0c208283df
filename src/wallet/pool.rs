//! Token vault over a single wallet

use super::Wallet;
use crate::error::Result;
use serde_json::Value;

/// Vault that owns exactly one [`Wallet`] and issues or burns tokens from it
#[derive(Debug)]
pub struct Pool {
    vault: Wallet,
}

impl Pool {
    pub fn new(vault: Wallet) -> Self {
        log::debug!("Pool opened over wallet {}", vault.label());
        Self { vault }
    }

    pub fn vault_wallet(&self) -> &Wallet {
        &self.vault
    }

    /// Give the wallet back, closing the pool
    pub fn into_wallet(self) -> Wallet {
        self.vault
    }

    pub async fn issue_token(
        &self,
        name: &str,
        quantity: u64,
        description: &str,
        divisible: bool,
    ) -> Result<String> {
        self.vault
            .issue_asset(name, quantity, description, divisible)
            .await
    }

    pub async fn burn_token(&self, name: &str, quantity: u64) -> Result<String> {
        self.vault.burn_asset(name, quantity).await
    }

    /// Sanitized balance of the vault wallet
    pub async fn balance(&self) -> Result<Value> {
        self.vault.balance_report().await
    }
}
