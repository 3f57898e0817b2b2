use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub mod contracts;

/* =======================
ENDPOINT FAMILIES
======================= */

/// REST endpoint family, selectable by environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub clob_url: String,
    pub data_api_url: String,
}

impl Endpoints {
    pub fn production() -> Self {
        Self {
            clob_url: "https://clob.polymarket.com".to_string(),
            data_api_url: "https://data-api.polymarket.com".to_string(),
        }
    }

    pub fn staging() -> Self {
        Self {
            clob_url: "https://clob-staging.polymarket.com".to_string(),
            data_api_url: "https://data-api-staging.polymarket.com".to_string(),
        }
    }

    pub fn select(staging: bool) -> Self {
        if staging {
            Self::staging()
        } else {
            Self::production()
        }
    }
}

/* =======================
CLI ARGS
======================= */

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Use the staging endpoint family
    #[arg(long)]
    pub staging: bool,
}

/* =======================
MAIN CONFIG
======================= */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub polymarket: PolymarketConfig,
    pub wallet: WalletConfig,
    pub trading: TradingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolymarketConfig {
    pub staging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub chain_id: u64,
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Deadline for the allowance-confirmation gate, in seconds.
    pub confirmation_timeout_secs: u64,
    /// JSON file holding API credentials keyed by wallet address.
    pub api_key_store: PathBuf,
}

/* =======================
DEFAULT CONFIG
======================= */

impl Default for Config {
    fn default() -> Self {
        Self {
            polymarket: PolymarketConfig { staging: false },
            wallet: WalletConfig {
                chain_id: 137,
                rpc_url: None,
            },
            trading: TradingConfig {
                confirmation_timeout_secs: 120,
                api_key_store: PathBuf::from("api_keys.json"),
            },
        }
    }
}

/* =======================
LOAD / CREATE CONFIG
======================= */

impl Config {
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            let cfg = Config::default();
            let content = serde_json::to_string_pretty(&cfg)?;
            std::fs::write(path, content)?;
            Ok(cfg)
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::select(self.polymarket.staging || Self::staging_from_env())
    }

    /// POLYMARKET_STAGING=true switches both endpoint families.
    pub fn staging_from_env() -> bool {
        env::var("POLYMARKET_STAGING")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false)
    }
}
