use anyhow::Result;
use async_trait::async_trait;
use ew_api_types::{TxHash, WalletAddress};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SubmitTxRequest {
    pub from: WalletAddress,
    pub to: WalletAddress,
    pub value: u128,
    /// `0x`-prefixed raw signed transaction.
    pub signed_payload: String,
    /// Hash computed locally over the signed payload.
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone)]
pub struct SubmitTxResult {
    pub tx_hash: TxHash,
    pub accepted: bool,
    /// Node-provided reason when `accepted` is false.
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TxStatusRequest {
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed { block_number: u64 },
    Reverted { block_number: u64 },
}

#[derive(Debug, Clone)]
pub struct TxStatusResult {
    pub tx_hash: TxHash,
    pub status: TxStatus,
}

#[derive(Debug, Clone)]
pub struct CallRequest {
    pub from: Option<WalletAddress>,
    pub to: WalletAddress,
    pub data: Vec<u8>,
}

/// Node interface used for balance queries and transfer submission against
/// the single configured network.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Balance in base units (wei for 18-decimal currencies).
    async fn get_balance(&self, wallet_address: &WalletAddress) -> Result<u128>;
    async fn get_transaction_count(&self, wallet_address: &WalletAddress) -> Result<u64>;
    async fn gas_price(&self) -> Result<u128>;
    async fn submit_transaction(&self, req: SubmitTxRequest) -> Result<SubmitTxResult>;
    async fn get_transaction_status(&self, req: TxStatusRequest) -> Result<TxStatusResult>;
    async fn call(&self, req: CallRequest) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T> ChainAdapter for Arc<T>
where
    T: ChainAdapter + ?Sized,
{
    async fn get_balance(&self, wallet_address: &WalletAddress) -> Result<u128> {
        (**self).get_balance(wallet_address).await
    }

    async fn get_transaction_count(&self, wallet_address: &WalletAddress) -> Result<u64> {
        (**self).get_transaction_count(wallet_address).await
    }

    async fn gas_price(&self) -> Result<u128> {
        (**self).gas_price().await
    }

    async fn submit_transaction(&self, req: SubmitTxRequest) -> Result<SubmitTxResult> {
        (**self).submit_transaction(req).await
    }

    async fn get_transaction_status(&self, req: TxStatusRequest) -> Result<TxStatusResult> {
        (**self).get_transaction_status(req).await
    }

    async fn call(&self, req: CallRequest) -> Result<Vec<u8>> {
        (**self).call(req).await
    }
}
