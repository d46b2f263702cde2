use serde::{Deserialize, Serialize};

mod network;
pub mod units;
mod wallet;

pub use network::{EDU_TESTNET, NativeCurrency, NetworkConfig, PHAROS_DEVNET};
pub use wallet::{Direction, Transaction, TransactionKind, Wallet, abbreviate};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WalletErrorKind {
    StorageUnavailable,
    NetworkUnavailable,
    InvalidAddress,
    InvalidAmount,
    InsufficientBalance,
    SubmissionFailed,
    TransferInProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletAddress(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxHash(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub direction: Direction,
    pub amount: f64,
    pub display_amount: String,
    pub description: String,
    pub timestamp: u64,
    pub hash: Option<String>,
    pub display_hash: Option<String>,
    pub explorer_url: Option<String>,
}

impl TransactionView {
    pub fn from_transaction(tx: &Transaction, network: &NetworkConfig) -> Self {
        Self {
            id: tx.id.clone(),
            kind: tx.kind,
            direction: tx.direction(),
            amount: tx.amount,
            display_amount: tx.display_amount(),
            description: tx.description.clone(),
            timestamp: tx.timestamp,
            hash: tx.hash.clone(),
            display_hash: tx.display_hash(),
            explorer_url: tx.hash.as_deref().map(|hash| network.tx_url(hash)),
        }
    }
}

/// Public projection of a wallet. Never carries the private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletView {
    pub address: String,
    pub chain_id: u64,
    pub symbol: String,
    pub balance_usd: f64,
    pub balance_native: f64,
    pub last_synced_at: Option<u64>,
    pub balance_stale: bool,
    pub explorer_url: String,
    pub transactions: Vec<TransactionView>,
}

impl WalletView {
    pub fn new(wallet: &Wallet, network: &NetworkConfig, balance_stale: bool) -> Self {
        Self {
            address: wallet.address.clone(),
            chain_id: network.chain_id,
            symbol: network.symbol().to_owned(),
            balance_usd: wallet.balance_usd,
            balance_native: wallet.balance_native,
            last_synced_at: wallet.last_synced_at,
            balance_stale: balance_stale || !wallet.is_synced(),
            explorer_url: network.address_url(&wallet.address),
            transactions: wallet
                .transactions
                .iter()
                .map(|tx| TransactionView::from_transaction(tx, network))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSendRequest {
    pub recipient_address: String,
    pub amount: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSendResponse {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub explorer_url: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<WalletErrorKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletDepositRequest {
    pub amount: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletExportResponse {
    pub address: String,
    pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLinkStatusResponse {
    pub contract_address: String,
    pub wallet_address: String,
    pub has_linked_keys: bool,
    pub link_timestamp: Option<u64>,
}
