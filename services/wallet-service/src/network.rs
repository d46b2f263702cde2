use axum::{Json, extract::State};
use ew_api_types::{KeyLinkStatusResponse, NetworkConfig, WalletAddress};
use ew_chain_evm::key_link;
use tracing::warn;

use crate::{AppState, ApiResult, service_unavailable, wallet_error};

/// Returns the network the service signs and broadcasts against.
pub(crate) async fn network_config(State(state): State<AppState>) -> Json<NetworkConfig> {
    Json(state.core.network().clone())
}

/// Reads the key-link contract state for the local wallet. Read-only;
/// linking itself is a signed contract call the service does not submit.
pub(crate) async fn key_link_status(State(state): State<AppState>) -> ApiResult<KeyLinkStatusResponse> {
    let wallet = state.core.get_or_create_wallet().await.map_err(wallet_error)?;
    let wallet_address = WalletAddress(wallet.address.clone());

    let status = key_link::key_link_status(state.core.chain(), &state.key_link_contract, &wallet_address)
        .await
        .map_err(|err| {
            warn!(contract = %state.key_link_contract.0, "key-link status lookup failed: {err:#}");
            service_unavailable(format!("key-link status unavailable: {err:#}"))
        })?;

    Ok(Json(KeyLinkStatusResponse {
        contract_address: state.key_link_contract.0.clone(),
        wallet_address: wallet.address,
        has_linked_keys: status.has_linked_keys,
        link_timestamp: status.link_timestamp,
    }))
}
