use ew_api_types::{NetworkConfig, Transaction, TransactionKind, TxHash, Wallet, WalletErrorKind};
use ew_chain_client::ChainAdapter;
use ew_storage::WalletStorage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{error, info};

mod store;
mod sync;
mod transfer;

#[cfg(test)]
mod test_support;

pub use store::WalletStore;
pub use sync::{refresh_or_keep, update_edu_balance};
pub use transfer::{ConfirmationPolicy, TransferError, TransferOutcome, TransferStage, send_tokens};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("a transfer is already in flight for this wallet")]
    TransferInProgress,
}

impl WalletError {
    pub fn kind(&self) -> WalletErrorKind {
        match self {
            Self::StorageUnavailable(_) => WalletErrorKind::StorageUnavailable,
            Self::NetworkUnavailable(_) => WalletErrorKind::NetworkUnavailable,
            Self::InvalidAddress(_) => WalletErrorKind::InvalidAddress,
            Self::InvalidAmount(_) => WalletErrorKind::InvalidAmount,
            Self::InsufficientBalance(_) => WalletErrorKind::InsufficientBalance,
            Self::SubmissionFailed(_) => WalletErrorKind::SubmissionFailed,
            Self::TransferInProgress => WalletErrorKind::TransferInProgress,
        }
    }
}

/// Successful send as seen by the session: the hash plus the wallet after the
/// ledger append and, when it succeeded, the balance refresh.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub tx_hash: TxHash,
    pub wallet: Wallet,
    pub balance_refreshed: bool,
}

/// Wallet session for one client: store, network adapter and transfer guard.
///
/// Operations are expected to be awaited one after another by a single
/// caller; the only concurrency protection is the in-flight transfer guard.
pub struct WalletCore<K, C> {
    store: WalletStore<K>,
    chain: C,
    network: NetworkConfig,
    confirmation: ConfirmationPolicy,
    transfer_in_flight: AtomicBool,
}

impl<K, C> WalletCore<K, C>
where
    K: WalletStorage,
    C: ChainAdapter,
{
    pub fn new(storage: K, chain: C, network: NetworkConfig) -> Self {
        Self {
            store: WalletStore::new(storage),
            chain,
            network,
            confirmation: ConfirmationPolicy::default(),
            transfer_in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub async fn get_or_create_wallet(&self) -> Result<Wallet, WalletError> {
        self.store.get_or_create_wallet().await
    }

    pub async fn add_transaction(&self, wallet: &Wallet, tx: Transaction) -> Result<Wallet, WalletError> {
        self.store.add_transaction(wallet, tx).await
    }

    pub async fn update_edu_balance(&self, wallet: &Wallet) -> Result<Wallet, WalletError> {
        update_edu_balance(&self.store, &self.chain, &self.network, wallet).await
    }

    pub async fn refresh_or_keep(&self, wallet: Wallet) -> (Wallet, Option<WalletError>) {
        refresh_or_keep(&self.store, &self.chain, &self.network, wallet).await
    }

    /// Runs the transfer pipeline only; the ledger is left to the caller.
    pub async fn send_tokens(
        &self,
        wallet: &Wallet,
        recipient_address: &str,
        amount: f64,
        description: &str,
    ) -> TransferOutcome {
        send_tokens(
            &self.chain,
            &self.network,
            &self.confirmation,
            wallet,
            recipient_address,
            amount,
            description,
        )
        .await
    }

    /// Sends, records a `send` entry carrying the hash, then refreshes the
    /// balance. Overlapping calls are rejected with `TransferInProgress`.
    pub async fn send_and_record(
        &self,
        wallet: &Wallet,
        recipient_address: &str,
        amount: f64,
        description: &str,
    ) -> Result<SendReceipt, TransferError> {
        let Some(_guard) = InFlightGuard::acquire(&self.transfer_in_flight) else {
            return Err(TransferError {
                stage: TransferStage::Validating,
                error: WalletError::TransferInProgress,
            });
        };

        let tx_hash = self
            .send_tokens(wallet, recipient_address, amount, description)
            .await?;

        let entry = Transaction::new(TransactionKind::Send, amount, description, epoch_ms()).with_hash(tx_hash.0.clone());
        let recorded = match self.store.add_transaction(wallet, entry.clone()).await {
            Ok(recorded) => recorded,
            Err(err) => {
                // The transfer is on chain; losing the ledger write must not hide that.
                error!(tx_hash = %tx_hash.0, "failed to record sent transaction: {err}");
                store::append_transaction(wallet, entry)
            }
        };

        let (wallet, refresh_error) = self.refresh_or_keep(recorded).await;
        Ok(SendReceipt {
            tx_hash,
            wallet,
            balance_refreshed: refresh_error.is_none(),
        })
    }

    /// Appends a `deposit` entry for a display-only incoming amount.
    pub async fn record_deposit(&self, wallet: &Wallet, amount: f64, description: &str) -> Result<Wallet, WalletError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(WalletError::InvalidAmount(format!(
                "{amount} must be a finite number greater than zero"
            )));
        }

        let entry = Transaction::new(TransactionKind::Deposit, amount, description, epoch_ms());
        let updated = self.store.add_transaction(wallet, entry).await?;
        info!(address = %updated.address, amount, "deposit recorded");
        Ok(updated)
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedChain, UnavailableStorage};
    use ew_storage::InMemoryWalletStorage;
    use std::sync::Arc;
    use std::time::Duration;

    const RECIPIENT: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
    const WEI: u128 = 1_000_000_000_000_000_000;

    fn core(chain: ScriptedChain) -> WalletCore<InMemoryWalletStorage, ScriptedChain> {
        WalletCore::new(InMemoryWalletStorage::default(), chain, NetworkConfig::edu_testnet())
            .with_confirmation(ConfirmationPolicy::broadcast_only())
    }

    #[tokio::test]
    async fn send_appends_ledger_entry_and_refreshes() {
        let chain = ScriptedChain::with_balance(10 * WEI);
        let core = core(chain.clone());

        let wallet = core.get_or_create_wallet().await.unwrap();
        let wallet = core.update_edu_balance(&wallet).await.unwrap();
        assert_eq!(wallet.balance_native, 10.0);

        let receipt = core.send_and_record(&wallet, RECIPIENT, 5.0, "test").await.unwrap();

        assert_eq!(receipt.wallet.transactions.len(), wallet.transactions.len() + 1);
        let entry = receipt.wallet.transactions.last().unwrap();
        assert_eq!(entry.kind, TransactionKind::Send);
        assert_eq!(entry.amount, 5.0);
        assert_eq!(entry.hash.as_ref(), Some(&receipt.tx_hash.0));
        assert!(receipt.balance_refreshed);
        assert_eq!(receipt.wallet.balance_native, 5.0);
    }

    #[tokio::test]
    async fn insufficient_balance_leaves_wallet_untouched() {
        let core = core(ScriptedChain::with_balance(10 * WEI));
        let wallet = core.get_or_create_wallet().await.unwrap();
        let wallet = core.update_edu_balance(&wallet).await.unwrap();
        let before = core.get_or_create_wallet().await.unwrap();

        let err = core.send_and_record(&wallet, RECIPIENT, 11.0, "test").await.unwrap_err();

        assert_eq!(err.kind(), WalletErrorKind::InsufficientBalance);
        let after = core.get_or_create_wallet().await.unwrap();
        assert_eq!(after, before);
        assert!(after.transactions.is_empty());
    }

    #[tokio::test]
    async fn refresh_failure_after_send_keeps_recorded_entry() {
        let chain = ScriptedChain::with_balance(10 * WEI);
        let core = core(chain.clone());
        let wallet = core.get_or_create_wallet().await.unwrap();
        let wallet = core.update_edu_balance(&wallet).await.unwrap();

        chain.fail_balance_after(1);
        let receipt = core.send_and_record(&wallet, RECIPIENT, 1.0, "test").await.unwrap();

        assert!(!receipt.balance_refreshed);
        assert_eq!(receipt.wallet.balance_native, 10.0);
        assert_eq!(receipt.wallet.transactions.len(), 1);
        assert_eq!(core.get_or_create_wallet().await.unwrap().transactions.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_send_is_rejected() {
        let chain = ScriptedChain::with_balance(10 * WEI).submit_delay(Duration::from_millis(100));
        let core = Arc::new(core(chain));
        let wallet = core.get_or_create_wallet().await.unwrap();
        let wallet = core.update_edu_balance(&wallet).await.unwrap();

        let first = {
            let core = core.clone();
            let wallet = wallet.clone();
            tokio::spawn(async move { core.send_and_record(&wallet, RECIPIENT, 1.0, "first").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = core.send_and_record(&wallet, RECIPIENT, 1.0, "second").await.unwrap_err();
        assert_eq!(second.kind(), WalletErrorKind::TransferInProgress);

        assert!(first.await.unwrap().is_ok());
        // guard released once the first send resolves
        let wallet = core.get_or_create_wallet().await.unwrap();
        assert!(core.send_and_record(&wallet, RECIPIENT, 1.0, "third").await.is_ok());
    }

    #[tokio::test]
    async fn refresh_overlapping_deposit_keeps_the_entry() {
        let chain = ScriptedChain::with_balance(3 * WEI).balance_delay(Duration::from_millis(100));
        let core = Arc::new(core(chain));
        let wallet = core.get_or_create_wallet().await.unwrap();

        let refresh = {
            let core = core.clone();
            let wallet = wallet.clone();
            tokio::spawn(async move { core.refresh_or_keep(wallet).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let deposited = core.record_deposit(&wallet, 5.0, "overlap").await.unwrap();
        assert_eq!(deposited.transactions.len(), 1);

        let (refreshed, err) = refresh.await.unwrap();
        assert!(err.is_none());
        assert_eq!(refreshed.balance_native, 3.0);
        assert_eq!(refreshed.transactions, deposited.transactions);

        let persisted = core.get_or_create_wallet().await.unwrap();
        assert_eq!(persisted.transactions, deposited.transactions);
        assert_eq!(persisted.balance_native, 3.0);
    }

    #[tokio::test]
    async fn deposit_requires_positive_amount() {
        let core = core(ScriptedChain::with_balance(0));
        let wallet = core.get_or_create_wallet().await.unwrap();

        assert_eq!(
            core.record_deposit(&wallet, 0.0, "nothing").await.unwrap_err().kind(),
            WalletErrorKind::InvalidAmount
        );

        let wallet = core.record_deposit(&wallet, 250.0, "Demo deposit").await.unwrap();
        let entry = &wallet.transactions[0];
        assert_eq!(entry.kind, TransactionKind::Deposit);
        assert!(entry.signed_amount() > 0.0);
        assert!(entry.hash.is_none());
    }

    #[tokio::test]
    async fn unavailable_storage_surfaces_from_session() {
        let core = WalletCore::new(UnavailableStorage, ScriptedChain::with_balance(0), NetworkConfig::edu_testnet());
        assert_eq!(
            core.get_or_create_wallet().await.unwrap_err().kind(),
            WalletErrorKind::StorageUnavailable
        );
    }
}
