//! Liquid Vault - Elements daemon and token vault control
//!
//! Prints JSON results on stdout. Failures print their classified kind and
//! detail on stderr and exit with status 1.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use liquid_vault::error::Classify;
use liquid_vault::logging;
use liquid_vault::node::{create_session_state, DaemonManager, NodeConfig, RpcClient};
use liquid_vault::wallet::mnemonic;
use liquid_vault::{expand_path, generate_mnemonic, operations, Pool, Wallet, WalletMetadata};
use log::LevelFilter;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Liquid Vault - Elements node lifecycle and token vault management
#[derive(Parser)]
#[command(name = "liquid-vault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Node config file (defaults to the user config directory)
    #[arg(short, long, env = "LIQUID_VAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Env file with rpc_user, rpc_password, rpc_port and optional rpc_host
    #[arg(long, env = "LIQUID_VAULT_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, env = "LIQUID_VAULT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether the daemon is running and its chain
    Status,

    /// Bring the daemon into the requested state
    Ensure {
        /// Validate the working directory and (re)start a fresh daemon
        #[arg(long)]
        fresh: bool,

        /// Working directory (defaults to the configured one)
        #[arg(long)]
        datadir: Option<String>,
    },

    /// Stop the running daemon
    Stop,

    /// List wallets loaded in the daemon
    Wallets,

    /// Create a wallet
    CreateWallet {
        /// Wallet label (a UUID is generated when omitted)
        #[arg(long)]
        label: Option<String>,

        /// Do not fetch a receiving address
        #[arg(long)]
        no_address: bool,
    },

    /// Generate a BIP-39 recovery phrase
    Mnemonic {
        /// Entropy bits: 128, 160, 192, 224 or 256
        #[arg(long, default_value_t = mnemonic::DEFAULT_STRENGTH)]
        strength: usize,

        #[arg(long, default_value = mnemonic::DEFAULT_LANGUAGE)]
        language: String,
    },

    /// Show wallet info with decimals converted
    WalletInfo {
        #[arg(long)]
        label: String,
    },

    /// Issue a token from a vault wallet
    IssueToken {
        /// Vault wallet label
        #[arg(long)]
        label: String,

        /// Asset name
        name: String,

        quantity: u64,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        divisible: bool,
    },

    /// Burn tokens held by a vault wallet
    BurnToken {
        /// Vault wallet label
        #[arg(long)]
        label: String,

        /// Asset name
        name: String,

        quantity: u64,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = logging::init_logger(&log_dir, level) {
        eprintln!("File logging unavailable: {}", e);
    }

    match run(cli).await {
        Ok(value) => println!("{}", render(&value)),
        Err(e) => {
            let failure = e.classify().to_failure();
            eprintln!("{}", render(&serde_json::to_value(&failure).unwrap_or(Value::Null)));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

async fn run(cli: Cli) -> Result<Value> {
    let config = match &cli.config {
        Some(path) => NodeConfig::load_from(path),
        None => NodeConfig::load(),
    };
    let manager = DaemonManager::new(config.clone());

    let rpc = || -> Result<Arc<RpcClient>> {
        let credentials = config
            .rpc_credentials(cli.env_file.as_deref())
            .context("resolving RPC credentials")?;
        Ok(Arc::new(RpcClient::with_timeout(
            credentials,
            config.rpc_timeout(),
        )?))
    };

    // A handle on a wallet that is already loaded in the daemon
    let vault = |label: &str| -> Result<Wallet> {
        let metadata = WalletMetadata {
            name: label.to_string(),
            ..WalletMetadata::default()
        };
        Ok(Wallet::from_parts(rpc()?, label, metadata))
    };

    let value = match cli.command {
        Commands::Status => serde_json::to_value(operations::node_status(&manager).await?)?,
        Commands::Ensure { fresh, datadir } => {
            let datadir = datadir.map(|d| PathBuf::from(expand_path(&d)));
            serde_json::to_value(manager.ensure(fresh, datadir.as_deref()).await?)?
        }
        Commands::Stop => manager.stop().await?.unwrap_or_default(),
        Commands::Wallets => serde_json::to_value(Wallet::list_all(&*rpc()?).await?)?,
        Commands::CreateWallet { label, no_address } => {
            let session = create_session_state();
            let credentials = config.rpc_credentials(cli.env_file.as_deref())?;
            operations::active_client(&*session, &credentials, config.rpc_timeout())?;
            let wallet =
                operations::create_wallet(&*session, label.as_deref(), !no_address).await?;
            serde_json::to_value(wallet.metadata())?
        }
        Commands::Mnemonic { strength, language } => {
            serde_json::json!({ "mnemonic": generate_mnemonic(strength, &language)? })
        }
        Commands::WalletInfo { label } => vault(&label)?.wallet_info_report().await?,
        Commands::IssueToken {
            label,
            name,
            quantity,
            description,
            divisible,
        } => {
            let pool = Pool::new(vault(&label)?);
            let txid = pool
                .issue_token(&name, quantity, &description, divisible)
                .await?;
            serde_json::json!({ "txid": txid })
        }
        Commands::BurnToken {
            label,
            name,
            quantity,
        } => {
            let pool = Pool::new(vault(&label)?);
            let txid = pool.burn_token(&name, quantity).await?;
            serde_json::json!({ "txid": txid })
        }
    };

    Ok(value)
}
