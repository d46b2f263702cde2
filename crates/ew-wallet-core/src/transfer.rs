use ew_api_types::{NetworkConfig, TxHash, Wallet, WalletAddress, WalletErrorKind, units};
use ew_chain_client::{ChainAdapter, SubmitTxRequest, TxStatus, TxStatusRequest};
use ew_crypto::{EvmKeypair, LegacyTransfer, TRANSFER_GAS_LIMIT, parse_address, sign_legacy_transfer};
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::WalletError;

/// Lifecycle of a single transfer attempt. Each invocation starts fresh at
/// `Validating`; there are no retry transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Validating,
    Signing,
    Broadcasting,
    Confirmed,
    Rejected,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Signing => "signing",
            Self::Broadcasting => "broadcasting",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a transfer: the stage it was rejected from and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferError {
    pub stage: TransferStage,
    pub error: WalletError,
}

impl TransferError {
    fn at(stage: TransferStage, error: WalletError) -> Self {
        Self { stage, error }
    }

    pub fn kind(&self) -> WalletErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer rejected while {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for TransferError {}

pub type TransferOutcome = Result<TxHash, TransferError>;

#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
    /// Wait for a receipt after broadcast. When false, a successful
    /// broadcast is reported immediately.
    pub wait: bool,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            wait: true,
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl ConfirmationPolicy {
    pub fn broadcast_only() -> Self {
        Self {
            wait: false,
            ..Self::default()
        }
    }
}

/// Validates, signs, broadcasts and optionally awaits a native transfer.
///
/// Local checks run in order (address, amount, known balance) and make no
/// network calls. Every failure is returned as a value; the wallet is never
/// touched here.
pub async fn send_tokens<C>(
    chain: &C,
    network: &NetworkConfig,
    policy: &ConfirmationPolicy,
    wallet: &Wallet,
    recipient_address: &str,
    amount: f64,
    description: &str,
) -> TransferOutcome
where
    C: ChainAdapter,
{
    debug!(stage = %TransferStage::Validating, description, "transfer started");
    let (to, value) = validate(network, wallet, recipient_address, amount).map_err(|err| reject(TransferStage::Validating, err))?;

    debug!(stage = %TransferStage::Signing, "transfer validated");
    let signed = sign(chain, network, wallet, to, value)
        .await
        .map_err(|err| reject(TransferStage::Signing, err))?;

    debug!(stage = %TransferStage::Broadcasting, tx_hash = %signed.hash_hex(), "transfer signed");
    let tx_hash = broadcast(chain, wallet, recipient_address, value, &signed)
        .await
        .map_err(|err| reject(TransferStage::Broadcasting, err))?;

    if policy.wait {
        await_receipt(chain, policy, &tx_hash)
            .await
            .map_err(|err| reject(TransferStage::Broadcasting, err))?;
    }

    info!(
        stage = %TransferStage::Confirmed,
        tx_hash = %tx_hash.0,
        amount,
        symbol = network.symbol(),
        "transfer complete"
    );
    Ok(tx_hash)
}

fn reject(stage: TransferStage, error: WalletError) -> TransferError {
    warn!(stage = %TransferStage::Rejected, from = %stage, "transfer failed: {error}");
    TransferError::at(stage, error)
}

fn validate(
    network: &NetworkConfig,
    wallet: &Wallet,
    recipient_address: &str,
    amount: f64,
) -> Result<([u8; 20], u128), WalletError> {
    let to = parse_address(recipient_address.trim())
        .map_err(|err| WalletError::InvalidAddress(format!("{recipient_address}: {err}")))?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(WalletError::InvalidAmount(format!("{amount} must be a finite number greater than zero")));
    }
    let value = units::parse_units(amount, network.decimals()).map_err(WalletError::InvalidAmount)?;

    if amount > wallet.balance_native {
        return Err(WalletError::InsufficientBalance(format!(
            "{amount} {symbol} requested but balance is {balance} {symbol}",
            symbol = network.symbol(),
            balance = wallet.balance_native,
        )));
    }

    Ok((to, value))
}

async fn sign<C>(
    chain: &C,
    network: &NetworkConfig,
    wallet: &Wallet,
    to: [u8; 20],
    value: u128,
) -> Result<ew_crypto::SignedTransfer, WalletError>
where
    C: ChainAdapter,
{
    let keypair = EvmKeypair::from_private_key_hex(&wallet.private_key)
        .map_err(|err| WalletError::SubmissionFailed(format!("wallet key unusable: {err}")))?;
    if !keypair.address().eq_ignore_ascii_case(&wallet.address) {
        return Err(WalletError::SubmissionFailed(
            "wallet address does not match its private key".to_owned(),
        ));
    }

    let from = WalletAddress(wallet.address.clone());
    let network_err = |err: anyhow::Error| WalletError::NetworkUnavailable(format!("{err:#}"));
    let nonce = chain.get_transaction_count(&from).await.map_err(network_err)?;
    let gas_price = chain.gas_price().await.map_err(network_err)?;

    let transfer = LegacyTransfer {
        nonce,
        gas_price,
        gas_limit: TRANSFER_GAS_LIMIT,
        to,
        value,
        chain_id: network.chain_id,
    };

    // The cached balance may be stale; the chain balance must cover value and fee.
    let on_chain = chain.get_balance(&from).await.map_err(network_err)?;
    let required = value.saturating_add(transfer.max_fee());
    if on_chain < required {
        return Err(WalletError::InsufficientBalance(format!(
            "on-chain balance {} {symbol} does not cover {} {symbol} including fees",
            units::format_units(on_chain, network.decimals()),
            units::format_units(required, network.decimals()),
            symbol = network.symbol(),
        )));
    }

    sign_legacy_transfer(&keypair, &transfer).map_err(|err| WalletError::SubmissionFailed(format!("{err:#}")))
}

async fn broadcast<C>(
    chain: &C,
    wallet: &Wallet,
    recipient_address: &str,
    value: u128,
    signed: &ew_crypto::SignedTransfer,
) -> Result<TxHash, WalletError>
where
    C: ChainAdapter,
{
    let result = chain
        .submit_transaction(SubmitTxRequest {
            from: WalletAddress(wallet.address.clone()),
            to: WalletAddress(recipient_address.trim().to_owned()),
            value,
            signed_payload: signed.raw_hex(),
            tx_hash: TxHash(signed.hash_hex()),
        })
        .await
        .map_err(|err| WalletError::NetworkUnavailable(format!("{err:#}")))?;

    if !result.accepted {
        let reason = result
            .rejection_reason
            .unwrap_or_else(|| "node did not accept the transaction".to_owned());
        return Err(WalletError::SubmissionFailed(reason));
    }
    Ok(result.tx_hash)
}

async fn await_receipt<C>(chain: &C, policy: &ConfirmationPolicy, tx_hash: &TxHash) -> Result<(), WalletError>
where
    C: ChainAdapter,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        match chain
            .get_transaction_status(TxStatusRequest {
                tx_hash: tx_hash.clone(),
            })
            .await
        {
            Ok(status) => match status.status {
                TxStatus::Confirmed { block_number } => {
                    debug!(tx_hash = %tx_hash.0, block_number, "transfer included");
                    return Ok(());
                }
                TxStatus::Reverted { block_number } => {
                    return Err(WalletError::SubmissionFailed(format!(
                        "transaction {} reverted in block {block_number}",
                        tx_hash.0
                    )));
                }
                TxStatus::Pending => {}
            },
            Err(err) => warn!(tx_hash = %tx_hash.0, "receipt lookup failed: {err:#}"),
        }

        if Instant::now() >= deadline {
            // Already broadcast; it cannot be retracted, only no longer awaited.
            warn!(tx_hash = %tx_hash.0, "no receipt before timeout, reporting broadcast success");
            return Ok(());
        }
        sleep(policy.poll_interval).await;
    }
}
