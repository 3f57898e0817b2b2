use ethers::types::Address;
use std::str::FromStr;

use crate::execution::errors::EngineError;

/// Per-chain contract addresses. Absence of a chain id here means the chain
/// is unsupported.
#[derive(Debug, Clone, Copy)]
pub struct ContractConfig {
    pub collateral: Address,
    pub exchange: Address,
    pub neg_risk_exchange: Address,
    pub neg_risk_adapter: Address,
    pub conditional_tokens: Address,
}

// Polygon mainnet
const POLYGON_EXCHANGE: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";
const POLYGON_NEG_RISK_EXCHANGE: &str = "0xC5d563A36AE78145C45a50134d48A1215220f80a";
const POLYGON_NEG_RISK_ADAPTER: &str = "0xd91E80cF2E7be2e162c6513ceD06f1dD0dA35296";
const POLYGON_COLLATERAL: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";
const POLYGON_CONDITIONAL_TOKENS: &str = "0x4D97DCd97eC945f40cF65F87097ACe5EA0476045";

// Amoy testnet
const AMOY_EXCHANGE: &str = "0xdFE02Eb6733538f8Ea35D585af8DE5958AD99E40";
const AMOY_NEG_RISK_EXCHANGE: &str = "0xC5d563A36AE78145C45a50134d48A1215220f80a";
const AMOY_NEG_RISK_ADAPTER: &str = "0xd91E80cF2E7be2e162c6513ceD06f1dD0dA35296";
const AMOY_COLLATERAL: &str = "0x9c4e1703476e875070ee25b56a58b008cfb8fa78";
const AMOY_CONDITIONAL_TOKENS: &str = "0x69308FB512518e39F9b16112fA8d994F4e2Bf8bB";

fn addr(s: &str) -> Address {
    Address::from_str(s).expect("static contract address")
}

/// Resolve the contract set for a chain id.
pub fn contract_config(chain_id: u64) -> Result<ContractConfig, EngineError> {
    match chain_id {
        137 => Ok(ContractConfig {
            collateral: addr(POLYGON_COLLATERAL),
            exchange: addr(POLYGON_EXCHANGE),
            neg_risk_exchange: addr(POLYGON_NEG_RISK_EXCHANGE),
            neg_risk_adapter: addr(POLYGON_NEG_RISK_ADAPTER),
            conditional_tokens: addr(POLYGON_CONDITIONAL_TOKENS),
        }),
        80002 => Ok(ContractConfig {
            collateral: addr(AMOY_COLLATERAL),
            exchange: addr(AMOY_EXCHANGE),
            neg_risk_exchange: addr(AMOY_NEG_RISK_EXCHANGE),
            neg_risk_adapter: addr(AMOY_NEG_RISK_ADAPTER),
            conditional_tokens: addr(AMOY_CONDITIONAL_TOKENS),
        }),
        other => Err(EngineError::UnsupportedChain { chain_id: other }),
    }
}
