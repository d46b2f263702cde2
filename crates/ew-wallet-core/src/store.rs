use ew_api_types::{Transaction, Wallet};
use ew_crypto::EvmKeypair;
use ew_storage::{WALLET_RECORD_KEY, WalletStorage};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::WalletError;

/// Owns the single persisted wallet record.
///
/// Every mutation reloads the record and applies only its own change while
/// holding `write_lock`, so overlapping callers never overwrite each other.
pub struct WalletStore<K> {
    storage: K,
    write_lock: Mutex<()>,
}

impl<K> WalletStore<K>
where
    K: WalletStorage,
{
    pub fn new(storage: K) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<Option<Wallet>, WalletError> {
        let raw = self
            .storage
            .load_record(WALLET_RECORD_KEY)
            .await
            .map_err(|err| WalletError::StorageUnavailable(format!("read failed: {err:#}")))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut wallet: Wallet = serde_json::from_slice(&raw)
            .map_err(|err| WalletError::StorageUnavailable(format!("persisted wallet record is corrupt: {err}")))?;

        // The address is derived from the key; a record where they disagree is
        // never repaired by generating a new keypair.
        let keypair = EvmKeypair::from_private_key_hex(&wallet.private_key)
            .map_err(|err| WalletError::StorageUnavailable(format!("persisted private key is unusable: {err}")))?;
        let derived = keypair.address();
        if !derived.eq_ignore_ascii_case(&wallet.address) {
            return Err(WalletError::StorageUnavailable(format!(
                "persisted address {} does not match its private key",
                wallet.address
            )));
        }
        wallet.address = derived;

        Ok(Some(wallet))
    }

    async fn save(&self, wallet: &Wallet) -> Result<(), WalletError> {
        let value = serde_json::to_vec(wallet)
            .map_err(|err| WalletError::StorageUnavailable(format!("serialize failed: {err}")))?;
        self.storage
            .save_record(WALLET_RECORD_KEY, value)
            .await
            .map_err(|err| WalletError::StorageUnavailable(format!("write failed: {err:#}")))
    }

    /// Returns the persisted wallet, generating and persisting a fresh keypair
    /// with an empty ledger only when no record exists.
    pub async fn get_or_create_wallet(&self) -> Result<Wallet, WalletError> {
        let _write = self.write_lock.lock().await;
        if let Some(wallet) = self.load().await? {
            return Ok(wallet);
        }

        let keypair = EvmKeypair::generate();
        let wallet = Wallet::new(keypair.address(), keypair.private_key_hex());
        self.save(&wallet).await?;
        info!(address = %wallet.address, "created new wallet");
        Ok(wallet)
    }

    /// Appends `tx` to the persisted ledger of `wallet` and returns the
    /// record as stored. Entries persisted since `wallet` was read are kept.
    pub async fn add_transaction(&self, wallet: &Wallet, tx: Transaction) -> Result<Wallet, WalletError> {
        let _write = self.write_lock.lock().await;
        let current = self.current_record(wallet).await?;
        let updated = append_transaction(&current, tx);
        self.save(&updated).await?;
        Ok(updated)
    }

    /// Stores a freshly synced native balance on the persisted record,
    /// leaving its ledger as it is on disk.
    pub(crate) async fn record_balance(
        &self,
        wallet: &Wallet,
        balance_native: f64,
        synced_at: u64,
    ) -> Result<Wallet, WalletError> {
        let _write = self.write_lock.lock().await;
        let mut updated = self.current_record(wallet).await?;
        updated.balance_native = balance_native;
        updated.last_synced_at = Some(synced_at);
        self.save(&updated).await?;
        Ok(updated)
    }

    /// The persisted record for `wallet`, or `wallet` itself when nothing
    /// is stored yet. Caller must hold `write_lock`.
    async fn current_record(&self, wallet: &Wallet) -> Result<Wallet, WalletError> {
        let Some(existing) = self.load().await? else {
            return Ok(wallet.clone());
        };
        if !existing.address.eq_ignore_ascii_case(&wallet.address) {
            warn!(
                persisted = %existing.address,
                incoming = %wallet.address,
                "refusing to overwrite a different wallet"
            );
            return Err(WalletError::StorageUnavailable(
                "persisted record belongs to a different wallet".to_owned(),
            ));
        }
        Ok(existing)
    }
}

/// Pure ledger append; clamps the timestamp so insertion order stays
/// non-decreasing.
pub(crate) fn append_transaction(wallet: &Wallet, mut tx: Transaction) -> Wallet {
    if let Some(last) = wallet.transactions.last() {
        tx.timestamp = tx.timestamp.max(last.timestamp);
    }
    let mut updated = wallet.clone();
    updated.transactions.push(tx);
    updated
}
