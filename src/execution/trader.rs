use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::auth::store::CredentialStore;
use crate::auth::{AuthManager, AuthState, L2HeaderArgs};
use crate::client::ClobHttp;
use crate::config::contracts::{contract_config, ContractConfig};
use crate::domain::order::{CancelPayload, OrderType, TradeIntent};
use crate::domain::{Activity, ApiKeyCreds, Position};
use crate::execution::errors::EngineError;
use crate::execution::order_builder::OrderBuilder;
use crate::logging::{log_confirmation, log_submission};
use crate::wallet::allowance::AllowanceManager;
use crate::wallet::signer::TypedDataSigner;
use crate::wallet::submitter::{TransactionConfirmation, TransactionHandle, TransactionSubmitter};

struct Engines {
    builder: OrderBuilder,
    allowance: AllowanceManager,
    contracts: ContractConfig,
}

/// Sequences auth, allowances and order construction for the place, cancel
/// and redeem flows. An unsupported chain is captured at construction into a
/// sticky disabled state instead of failing late.
pub struct Trader {
    http: ClobHttp,
    auth: Arc<AuthManager>,
    submitter: Arc<dyn TransactionSubmitter>,
    confirmation_timeout: Duration,
    chain_id: u64,
    engines: Option<Engines>,
    network_error: Option<String>,
}

impl Trader {
    pub fn new(
        http: ClobHttp,
        signer: Arc<dyn TypedDataSigner>,
        store: Arc<dyn CredentialStore>,
        submitter: Arc<dyn TransactionSubmitter>,
        chain_id: u64,
        confirmation_timeout: Duration,
    ) -> Self {
        let auth = Arc::new(AuthManager::new(
            http.clone(),
            signer.clone(),
            store,
            chain_id,
        ));

        let (engines, network_error) = match contract_config(chain_id) {
            Ok(contracts) => {
                let builder = OrderBuilder::new(
                    http.clone(),
                    auth.clone(),
                    signer.clone(),
                    contracts,
                    chain_id,
                );
                let allowance = AllowanceManager::new(
                    submitter.clone(),
                    contracts,
                    signer.address(),
                    chain_id,
                );
                (
                    Some(Engines {
                        builder,
                        allowance,
                        contracts,
                    }),
                    None,
                )
            }
            Err(e) => {
                warn!("🌐 Trading disabled: {}", e);
                (None, Some(e.to_string()))
            }
        };

        Self {
            http,
            auth,
            submitter,
            confirmation_timeout,
            chain_id,
            engines,
            network_error,
        }
    }

    pub fn is_network_supported(&self) -> bool {
        self.engines.is_some()
    }

    pub fn network_error(&self) -> Option<&str> {
        self.network_error.as_deref()
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    fn engines(&self) -> Result<&Engines, EngineError> {
        self.engines.as_ref().ok_or(EngineError::UnsupportedChain {
            chain_id: self.chain_id,
        })
    }

    // ==================================================
    // CREDENTIALS
    // ==================================================

    /// Create (or transparently derive) API credentials if none are stored.
    pub async fn ensure_credentials(&self) -> Result<ApiKeyCreds, EngineError> {
        if self.auth.state()? == AuthState::CredentialsStored {
            if let Some(creds) = self.auth.credentials()? {
                return Ok(creds);
            }
        }
        self.auth.create_api_key().await
    }

    // ==================================================
    // ORDER FLOWS
    // ==================================================

    /// Simple flow — assumes allowance is already granted.
    pub async fn place_order(&self, intent: &TradeIntent) -> Result<Value, EngineError> {
        let engines = self.engines()?;
        engines.builder.place_market_order(intent, OrderType::Fok).await
    }

    /// Gated flow — grant the collateral allowance for the active exchange
    /// first and only submit the order once that transaction confirms. The
    /// wait is bounded; the listener is dropped on match or timeout.
    pub async fn place_order_gated(&self, intent: &TradeIntent) -> Result<Value, EngineError> {
        let engines = self.engines()?;

        let handle = if intent.neg_risk {
            engines.allowance.approve_collateral_neg_risk_exchange().await?
        } else {
            engines.allowance.approve_collateral_exchange(None).await?
        };
        log_submission("Allowance approval", &handle.id);
        info!("⏳ Waiting for confirmation before ordering");

        let rx = self.submitter.confirmations();
        wait_for_confirmation(rx, &handle.id, self.confirmation_timeout).await?;
        log_confirmation(&handle.id);

        engines.builder.place_market_order(intent, OrderType::Fok).await
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<Value, EngineError> {
        let body = serde_json::to_string(&CancelPayload {
            order_id: order_id.to_string(),
        })?;
        let l2 = self.auth.create_l2_headers(
            &L2HeaderArgs {
                method: "DELETE".to_string(),
                request_path: "/order".to_string(),
                body: Some(body.clone()),
            },
            None,
        )?;
        self.http.delete_order(body, l2.to_header_map()?).await
    }

    // ==================================================
    // ALLOWANCES + REDEMPTION
    // ==================================================

    pub async fn approve_allowances(&self) -> Result<Vec<TransactionHandle>, EngineError> {
        self.engines()?.allowance.approve_allowances().await
    }

    pub async fn redeem_position(
        &self,
        position: &Position,
    ) -> Result<Option<TransactionHandle>, EngineError> {
        self.engines()?.allowance.redeem_position(position).await
    }

    pub fn contracts(&self) -> Result<ContractConfig, EngineError> {
        Ok(self.engines()?.contracts)
    }

    // ==================================================
    // ACCOUNT DATA
    // ==================================================

    pub async fn positions(&self, limit: u32) -> Result<Vec<Position>, EngineError> {
        self.http.get_positions(&self.auth.address(), limit).await
    }

    pub async fn activity(&self, limit: u32) -> Result<Vec<Activity>, EngineError> {
        self.http.get_activity(&self.auth.address(), limit).await
    }
}

/// One-shot wait for a specific transaction id on the confirmation stream.
/// Returns on the first match, errors on the deadline; the receiver (and
/// with it the subscription) is dropped either way.
pub(crate) async fn wait_for_confirmation(
    mut rx: broadcast::Receiver<TransactionConfirmation>,
    tx_id: &str,
    timeout: Duration,
) -> Result<TransactionConfirmation, EngineError> {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(confirmation) if confirmation.id == tx_id => return Ok(confirmation),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EngineError::Submission(
                        "confirmation stream closed".to_string(),
                    ))
                }
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::ConfirmationTimeout {
            tx_id: tx_id.to_string(),
        }),
    }
}
