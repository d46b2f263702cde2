use ew_api_types::{NetworkConfig, Wallet, WalletAddress, units};
use ew_chain_client::ChainAdapter;
use ew_storage::WalletStorage;
use tracing::{debug, warn};

use crate::{WalletError, WalletStore, epoch_ms};

/// Queries the on-chain native balance for `wallet` and persists the result.
///
/// Only `balance_native` and `last_synced_at` change; the ledger returned is
/// the persisted one. On any failure the caller keeps its previous value and
/// nothing is written.
pub async fn update_edu_balance<K, C>(
    store: &WalletStore<K>,
    chain: &C,
    network: &NetworkConfig,
    wallet: &Wallet,
) -> Result<Wallet, WalletError>
where
    K: WalletStorage,
    C: ChainAdapter,
{
    let balance = chain
        .get_balance(&WalletAddress(wallet.address.clone()))
        .await
        .map_err(|err| WalletError::NetworkUnavailable(format!("{err:#}")))?;

    let updated = store
        .record_balance(wallet, units::format_units(balance, network.decimals()), epoch_ms())
        .await?;
    debug!(
        address = %updated.address,
        balance = updated.balance_native,
        symbol = network.symbol(),
        "balance synchronized"
    );
    Ok(updated)
}

/// Refreshes the balance, falling back to `wallet` unchanged when the
/// refresh fails. The error, if any, is returned alongside.
pub async fn refresh_or_keep<K, C>(
    store: &WalletStore<K>,
    chain: &C,
    network: &NetworkConfig,
    wallet: Wallet,
) -> (Wallet, Option<WalletError>)
where
    K: WalletStorage,
    C: ChainAdapter,
{
    match update_edu_balance(store, chain, network, &wallet).await {
        Ok(updated) => (updated, None),
        Err(err) => {
            warn!(address = %wallet.address, "balance refresh failed: {err}. Keeping cached balance");
            (wallet, Some(err))
        }
    }
}
