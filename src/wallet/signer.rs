use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature};

use crate::execution::errors::EngineError;

/// External signing capability: given a domain/schema/message payload and an
/// account, produce an EIP-712 signature. The wallet's own key handling
/// stays behind this seam.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Signature, EngineError>;
}

/// 65-byte r||s||v signature as a 0x-prefixed hex string.
pub fn signature_to_hex(sig: &Signature) -> String {
    format!("0x{}", hex::encode(sig.to_vec()))
}

// ==================================================
// LOCAL WALLET IMPLEMENTATION
// ==================================================

#[derive(Debug, Clone)]
pub struct WalletSigner {
    wallet: LocalWallet,
}

impl WalletSigner {
    pub fn new(private_key: &str, chain_id: u64) -> Result<Self, EngineError> {
        let wallet: LocalWallet = private_key
            .parse()
            .map_err(|e| EngineError::Signing(format!("bad private key: {}", e)))?;
        Ok(Self {
            wallet: wallet.with_chain_id(chain_id),
        })
    }
}

#[async_trait]
impl TypedDataSigner for WalletSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign_typed_data(&self, payload: &TypedData) -> Result<Signature, EngineError> {
        self.wallet
            .sign_typed_data(payload)
            .await
            .map_err(|e| EngineError::Signing(e.to_string()))
    }
}
