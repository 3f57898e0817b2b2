use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionRequest as EthTransactionRequest, U256};
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::execution::errors::EngineError;

/// Channel depth for confirmation fan-out; slow listeners drop old events.
const CONFIRMATION_CHANNEL_CAPACITY: usize = 64;

// ==================================================
// CAPABILITY TYPES
// ==================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    TokenMethodApprove,
    ContractInteraction,
}

/// A queued on-chain call: destination, calldata and network.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain_id: u64,
    pub kind: TransactionKind,
}

/// Returned as soon as the submission is acknowledged.
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    pub id: String,
}

/// Pushed on the notification stream once the transaction lands.
#[derive(Debug, Clone)]
pub struct TransactionConfirmation {
    pub id: String,
    pub tx_hash: Option<String>,
    pub success: bool,
}

/// External transaction capability: queue a call, get a handle back, and
/// hear about confirmation asynchronously. Broadcast, gas and nonce handling
/// live behind this seam.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, request: TransactionRequest) -> Result<TransactionHandle, EngineError>;

    /// Every receiver sees every confirmation; dropping the receiver
    /// unsubscribes.
    fn confirmations(&self) -> broadcast::Receiver<TransactionConfirmation>;
}

// ==================================================
// PROVIDER-BACKED IMPLEMENTATION
// ==================================================

/// Submits through an RPC provider and polls receipts in a background task.
/// The submit acknowledgment is the mempool acceptance, not the confirmation.
pub struct ProviderSubmitter {
    inner: Arc<SignerMiddleware<Provider<Http>, LocalWallet>>,
    confirmations: broadcast::Sender<TransactionConfirmation>,
    next_id: AtomicU64,
}

impl ProviderSubmitter {
    pub fn new(rpc_url: &str, private_key: &str, chain_id: u64) -> Result<Self, EngineError> {
        let wallet: LocalWallet = private_key
            .parse()
            .map_err(|e| EngineError::Submission(format!("bad private key: {}", e)))?;
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| EngineError::Submission(format!("bad RPC url: {}", e)))?;
        let inner = Arc::new(SignerMiddleware::new(
            provider,
            wallet.with_chain_id(chain_id),
        ));
        let (confirmations, _) = broadcast::channel(CONFIRMATION_CHANNEL_CAPACITY);

        Ok(Self {
            inner,
            confirmations,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl TransactionSubmitter for ProviderSubmitter {
    async fn submit(&self, request: TransactionRequest) -> Result<TransactionHandle, EngineError> {
        let tx = EthTransactionRequest::new()
            .from(request.from)
            .to(request.to)
            .data(request.data.clone())
            .value(request.value)
            .chain_id(request.chain_id);

        let pending = self
            .inner
            .send_transaction(tx, None)
            .await
            .map_err(|e| EngineError::Submission(e.to_string()))?;
        let tx_hash = *pending;

        let id = format!("tx-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        info!("📤 Submitted {:?} as {} ({:#x})", request.kind, id, tx_hash);

        // poll for the receipt off the submit path
        let provider = self.inner.clone();
        let sender = self.confirmations.clone();
        let handle_id = id.clone();
        tokio::spawn(async move {
            for _ in 0..60 {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                match provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        let success = receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false);
                        let _ = sender.send(TransactionConfirmation {
                            id: handle_id,
                            tx_hash: Some(format!("{:#x}", tx_hash)),
                            success,
                        });
                        return;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("⚠️ Receipt poll failed for {:#x}: {}", tx_hash, e);
                    }
                }
            }
            warn!("⚠️ Gave up polling receipt for {:#x}", tx_hash);
        });

        Ok(TransactionHandle { id })
    }

    fn confirmations(&self) -> broadcast::Receiver<TransactionConfirmation> {
        self.confirmations.subscribe()
    }
}
