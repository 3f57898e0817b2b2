use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use ethers::types::{Address, Bytes, H256, U256};
use log::info;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::contracts::ContractConfig;
use crate::domain::Position;
use crate::execution::errors::EngineError;
use crate::logging::log_redeem_skipped;
use crate::wallet::submitter::{
    TransactionHandle, TransactionKind, TransactionRequest, TransactionSubmitter,
};

// 6-decimal USDC base units
const EXCHANGE_ALLOWANCE: u128 = 100_000_000; // 100 USDC
const NEG_RISK_ADAPTER_ALLOWANCE: u128 = 10_000_000; // 10 USDC

// ==================================================
// CALLDATA ENCODERS
// ==================================================

pub fn encode_approve(spender: Address, amount: U256) -> Result<Bytes, EngineError> {
    let erc20 = BaseContract::from(
        parse_abi(&["function approve(address spender, uint256 amount)"])
            .map_err(|e| EngineError::Validation(e.to_string()))?,
    );
    erc20
        .encode("approve", (spender, amount))
        .map_err(|e| EngineError::Validation(e.to_string()))
}

pub fn encode_erc1155_approve(operator: Address, approved: bool) -> Result<Bytes, EngineError> {
    let erc1155 = BaseContract::from(
        parse_abi(&["function setApprovalForAll(address operator, bool approved)"])
            .map_err(|e| EngineError::Validation(e.to_string()))?,
    );
    erc1155
        .encode("setApprovalForAll", (operator, approved))
        .map_err(|e| EngineError::Validation(e.to_string()))
}

pub fn encode_redeem_positions(
    collateral_token: Address,
    parent_collection_id: H256,
    condition_id: H256,
    index_sets: Vec<U256>,
) -> Result<Bytes, EngineError> {
    let ctf = BaseContract::from(
        parse_abi(&[
            "function redeemPositions(address collateralToken, bytes32 parentCollectionId, bytes32 conditionId, uint256[] indexSets)",
        ])
        .map_err(|e| EngineError::Validation(e.to_string()))?,
    );
    ctf.encode(
        "redeemPositions",
        (collateral_token, parent_collection_id, condition_id, index_sets),
    )
    .map_err(|e| EngineError::Validation(e.to_string()))
}

// ==================================================
// ALLOWANCE MANAGER
// ==================================================

/// Builds and submits the fixed set of approval/redemption calls through the
/// external transaction submitter.
pub struct AllowanceManager {
    submitter: Arc<dyn TransactionSubmitter>,
    contracts: ContractConfig,
    account: Address,
    chain_id: u64,
}

impl AllowanceManager {
    pub fn new(
        submitter: Arc<dyn TransactionSubmitter>,
        contracts: ContractConfig,
        account: Address,
        chain_id: u64,
    ) -> Self {
        Self {
            submitter,
            contracts,
            account,
            chain_id,
        }
    }

    async fn submit(
        &self,
        to: Address,
        data: Bytes,
        kind: TransactionKind,
    ) -> Result<TransactionHandle, EngineError> {
        self.submitter
            .submit(TransactionRequest {
                from: self.account,
                to,
                data,
                value: U256::zero(),
                chain_id: self.chain_id,
                kind,
            })
            .await
    }

    async fn approve_collateral(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionHandle, EngineError> {
        let data = encode_approve(spender, amount)?;
        self.submit(
            self.contracts.collateral,
            data,
            TransactionKind::TokenMethodApprove,
        )
        .await
    }

    async fn approve_conditional(&self, operator: Address) -> Result<TransactionHandle, EngineError> {
        let data = encode_erc1155_approve(operator, true)?;
        self.submit(
            self.contracts.conditional_tokens,
            data,
            TransactionKind::TokenMethodApprove,
        )
        .await
    }

    // ==================================================
    // THE SEVEN APPROVALS
    // ==================================================

    pub async fn approve_collateral_conditional_token(
        &self,
    ) -> Result<TransactionHandle, EngineError> {
        self.approve_collateral(
            self.contracts.conditional_tokens,
            U256::from(EXCHANGE_ALLOWANCE),
        )
        .await
    }

    pub async fn approve_collateral_exchange(
        &self,
        amount: Option<U256>,
    ) -> Result<TransactionHandle, EngineError> {
        self.approve_collateral(
            self.contracts.exchange,
            amount.unwrap_or_else(|| U256::from(EXCHANGE_ALLOWANCE)),
        )
        .await
    }

    pub async fn approve_conditional_exchange(&self) -> Result<TransactionHandle, EngineError> {
        self.approve_conditional(self.contracts.exchange).await
    }

    pub async fn approve_collateral_neg_risk_exchange(
        &self,
    ) -> Result<TransactionHandle, EngineError> {
        self.approve_collateral(
            self.contracts.neg_risk_exchange,
            U256::from(EXCHANGE_ALLOWANCE),
        )
        .await
    }

    pub async fn approve_neg_risk_adapter_token(&self) -> Result<TransactionHandle, EngineError> {
        self.approve_collateral(
            self.contracts.neg_risk_adapter,
            U256::from(NEG_RISK_ADAPTER_ALLOWANCE),
        )
        .await
    }

    pub async fn approve_conditional_neg_risk_exchange(
        &self,
    ) -> Result<TransactionHandle, EngineError> {
        self.approve_conditional(self.contracts.neg_risk_exchange)
            .await
    }

    pub async fn approve_conditional_neg_risk_adapter(
        &self,
    ) -> Result<TransactionHandle, EngineError> {
        self.approve_conditional(self.contracts.neg_risk_adapter)
            .await
    }

    /// Submit all seven approvals, awaiting each submission acknowledgment
    /// before issuing the next.
    pub async fn approve_allowances(&self) -> Result<Vec<TransactionHandle>, EngineError> {
        let mut handles = Vec::with_capacity(7);
        handles.push(self.approve_collateral_conditional_token().await?);
        handles.push(self.approve_collateral_exchange(None).await?);
        handles.push(self.approve_conditional_exchange().await?);
        handles.push(self.approve_collateral_neg_risk_exchange().await?);
        handles.push(self.approve_neg_risk_adapter_token().await?);
        handles.push(self.approve_conditional_neg_risk_exchange().await?);
        handles.push(self.approve_conditional_neg_risk_adapter().await?);
        info!("✅ All {} approvals submitted", handles.len());
        Ok(handles)
    }

    // ==================================================
    // REDEMPTION
    // ==================================================

    /// No-op when the position is not redeemable — logged, never thrown.
    pub async fn redeem_position(
        &self,
        position: &Position,
    ) -> Result<Option<TransactionHandle>, EngineError> {
        if !position.redeemable {
            log_redeem_skipped(&position.condition_id);
            return Ok(None);
        }

        let condition_id = H256::from_str(&position.condition_id)
            .map_err(|e| EngineError::Validation(format!("bad condition id: {}", e)))?;
        let index_sets = vec![U256::from(position.outcome_index + 1)];
        let data = encode_redeem_positions(
            self.contracts.collateral,
            H256::zero(),
            condition_id,
            index_sets,
        )?;

        let handle = self
            .submit(
                self.contracts.conditional_tokens,
                data,
                TransactionKind::ContractInteraction,
            )
            .await?;
        info!(
            "💸 Redeem submitted for condition {} as {}",
            position.condition_id, handle.id
        );
        Ok(Some(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::contracts::contract_config;
    use crate::wallet::submitter::TransactionConfirmation;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    struct RecordingSubmitter {
        requests: Mutex<Vec<TransactionRequest>>,
        confirmations: broadcast::Sender<TransactionConfirmation>,
        next_id: AtomicU64,
    }

    impl RecordingSubmitter {
        fn new() -> Self {
            let (confirmations, _) = broadcast::channel(16);
            Self {
                requests: Mutex::new(Vec::new()),
                confirmations,
                next_id: AtomicU64::new(1),
            }
        }

        fn recorded(&self) -> Vec<TransactionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TransactionSubmitter for RecordingSubmitter {
        async fn submit(
            &self,
            request: TransactionRequest,
        ) -> Result<TransactionHandle, EngineError> {
            self.requests.lock().unwrap().push(request);
            Ok(TransactionHandle {
                id: format!("tx-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            })
        }

        fn confirmations(&self) -> broadcast::Receiver<TransactionConfirmation> {
            self.confirmations.subscribe()
        }
    }

    fn manager(submitter: Arc<RecordingSubmitter>) -> AllowanceManager {
        AllowanceManager::new(
            submitter,
            contract_config(137).unwrap(),
            Address::zero(),
            137,
        )
    }

    fn spender_of(data: &Bytes) -> Address {
        // selector (4) + 12 padding bytes, then the 20-byte address
        Address::from_slice(&data[16..36])
    }

    #[test]
    fn approve_calldata_uses_the_erc20_selector() {
        let spender = contract_config(137).unwrap().exchange;
        let data = encode_approve(spender, U256::from(EXCHANGE_ALLOWANCE)).unwrap();
        assert_eq!(&data[..4], &hex::decode("095ea7b3").unwrap()[..]);
        assert_eq!(spender_of(&data), spender);
        assert_eq!(U256::from_big_endian(&data[36..68]), U256::from(EXCHANGE_ALLOWANCE));
    }

    #[test]
    fn erc1155_approve_calldata_uses_the_set_approval_selector() {
        let operator = contract_config(137).unwrap().neg_risk_adapter;
        let data = encode_erc1155_approve(operator, true).unwrap();
        assert_eq!(&data[..4], &hex::decode("a22cb465").unwrap()[..]);
        assert_eq!(spender_of(&data), operator);
        assert_eq!(data[67], 1);
    }

    #[test]
    fn redeem_calldata_encodes_the_index_set() {
        let cfg = contract_config(137).unwrap();
        let condition_id = H256::from_low_u64_be(7);
        let data =
            encode_redeem_positions(cfg.collateral, H256::zero(), condition_id, vec![U256::from(2)])
                .unwrap();
        assert_eq!(&data[..4], &hex::decode("01b7037c").unwrap()[..]);
        // args: collateral, parentCollectionId, conditionId, offset, len, element
        assert_eq!(H256::from_slice(&data[68..100]), condition_id);
        assert_eq!(U256::from_big_endian(&data[132..164]), U256::from(1)); // array length
        assert_eq!(U256::from_big_endian(&data[164..196]), U256::from(2)); // outcomeIndex + 1
    }

    #[tokio::test]
    async fn approve_allowances_issues_exactly_seven_calls_in_order() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let mgr = manager(submitter.clone());
        let cfg = contract_config(137).unwrap();

        let handles = mgr.approve_allowances().await.unwrap();
        assert_eq!(handles.len(), 7);

        let requests = submitter.recorded();
        assert_eq!(requests.len(), 7);

        // (token contract, spender/operator) pairs in submission order
        let expected = [
            (cfg.collateral, cfg.conditional_tokens),
            (cfg.collateral, cfg.exchange),
            (cfg.conditional_tokens, cfg.exchange),
            (cfg.collateral, cfg.neg_risk_exchange),
            (cfg.collateral, cfg.neg_risk_adapter),
            (cfg.conditional_tokens, cfg.neg_risk_exchange),
            (cfg.conditional_tokens, cfg.neg_risk_adapter),
        ];
        for (req, (token, spender)) in requests.iter().zip(expected) {
            assert_eq!(req.to, token);
            assert_eq!(spender_of(&req.data), spender);
            assert_eq!(req.kind, TransactionKind::TokenMethodApprove);
        }

        // adapter gets the smaller collateral allowance
        assert_eq!(
            U256::from_big_endian(&requests[4].data[36..68]),
            U256::from(NEG_RISK_ADAPTER_ALLOWANCE)
        );
    }

    fn position(redeemable: bool) -> Position {
        Position {
            proxy_wallet: String::new(),
            asset: "123".to_string(),
            condition_id: format!("0x{}", "11".repeat(32)),
            size: dec!(10),
            avg_price: dec!(0.5),
            cur_price: dec!(1),
            current_value: dec!(10),
            cash_pnl: dec!(5),
            redeemable,
            outcome_index: 1,
            negative_risk: false,
            outcome: "Yes".to_string(),
            title: String::new(),
            end_date: String::new(),
        }
    }

    #[tokio::test]
    async fn redeem_skips_non_redeemable_positions() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let mgr = manager(submitter.clone());

        let handle = mgr.redeem_position(&position(false)).await.unwrap();
        assert!(handle.is_none());
        assert!(submitter.recorded().is_empty());
    }

    #[tokio::test]
    async fn redeem_submits_a_contract_interaction() {
        let submitter = Arc::new(RecordingSubmitter::new());
        let mgr = manager(submitter.clone());
        let cfg = contract_config(137).unwrap();

        let handle = mgr.redeem_position(&position(true)).await.unwrap();
        assert!(handle.is_some());

        let requests = submitter.recorded();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].to, cfg.conditional_tokens);
        assert_eq!(requests[0].kind, TransactionKind::ContractInteraction);
        // indexSets = [outcomeIndex + 1] = [2]
        let data = &requests[0].data;
        assert_eq!(U256::from_big_endian(&data[164..196]), U256::from(2));
    }
}
