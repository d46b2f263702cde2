use axum::{Json, extract::State};
use ew_api_types::{
    WalletDepositRequest, WalletExportResponse, WalletSendRequest, WalletSendResponse, WalletView,
};
use tracing::{info, warn};

use crate::{AppState, ApiResult, bad_request, wallet_error};

fn description_or(description: Option<String>, fallback: impl FnOnce() -> String) -> String {
    description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(fallback)
}

/// Loads (or creates) the wallet and tries a balance refresh. A failed
/// refresh still answers, with the cached balance flagged stale.
pub(crate) async fn wallet_get(State(state): State<AppState>) -> ApiResult<WalletView> {
    let wallet = state.core.get_or_create_wallet().await.map_err(wallet_error)?;
    let (wallet, refresh_error) = state.core.refresh_or_keep(wallet).await;

    Ok(Json(WalletView::new(&wallet, state.core.network(), refresh_error.is_some())))
}

pub(crate) async fn wallet_refresh(State(state): State<AppState>) -> ApiResult<WalletView> {
    let wallet = state.core.get_or_create_wallet().await.map_err(wallet_error)?;
    let wallet = state.core.update_edu_balance(&wallet).await.map_err(wallet_error)?;

    Ok(Json(WalletView::new(&wallet, state.core.network(), false)))
}

/// Transfer outcomes, failed ones included, are reported in the body with 200.
pub(crate) async fn wallet_send(
    State(state): State<AppState>,
    Json(request): Json<WalletSendRequest>,
) -> ApiResult<WalletSendResponse> {
    let wallet = state.core.get_or_create_wallet().await.map_err(wallet_error)?;
    let network = state.core.network();
    let description = description_or(request.description, || format!("{} Transfer", network.symbol()));

    let response = match state
        .core
        .send_and_record(&wallet, request.recipient_address.trim(), request.amount, &description)
        .await
    {
        Ok(receipt) => {
            if !receipt.balance_refreshed {
                warn!(tx_hash = %receipt.tx_hash.0, "balance refresh after send failed");
            }
            WalletSendResponse {
                success: true,
                explorer_url: Some(network.tx_url(&receipt.tx_hash.0)),
                tx_hash: Some(receipt.tx_hash.0),
                error: None,
                error_kind: None,
            }
        }
        Err(err) => WalletSendResponse {
            success: false,
            tx_hash: None,
            explorer_url: None,
            error: Some(err.message()),
            error_kind: Some(err.kind()),
        },
    };

    Ok(Json(response))
}

pub(crate) async fn wallet_deposit(
    State(state): State<AppState>,
    Json(request): Json<WalletDepositRequest>,
) -> ApiResult<WalletView> {
    if !request.amount.is_finite() {
        return Err(bad_request("amount must be a finite number"));
    }

    let wallet = state.core.get_or_create_wallet().await.map_err(wallet_error)?;
    let description = description_or(request.description, || "Deposit".to_owned());
    let wallet = state
        .core
        .record_deposit(&wallet, request.amount, &description)
        .await
        .map_err(wallet_error)?;

    Ok(Json(WalletView::new(&wallet, state.core.network(), false)))
}

pub(crate) async fn wallet_export(State(state): State<AppState>) -> ApiResult<WalletExportResponse> {
    let wallet = state.core.get_or_create_wallet().await.map_err(wallet_error)?;
    info!(address = %wallet.address, "private key exported");

    Ok(Json(WalletExportResponse {
        address: wallet.address,
        private_key: wallet.private_key,
    }))
}
