use anyhow::Context;
use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use ew_api_types::{WalletAddress, WalletErrorKind};
use ew_chain_client::ChainAdapter;
use ew_chain_evm::EvmRpcAdapter;
use ew_storage::{RocksDbWalletStorage, WalletStorage};
use ew_wallet_core::{WalletCore, WalletError};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

mod config;
mod network;
mod wallet;

use config::ServiceConfig;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
    kind: Option<WalletErrorKind>,
}

pub(crate) type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub(crate) type Core = WalletCore<Arc<dyn WalletStorage>, Arc<dyn ChainAdapter>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) core: Arc<Core>,
    pub(crate) key_link_contract: WalletAddress,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServiceConfig::from_env()?;
    info!(
        network = %config.network.slug,
        chain_id = config.network.chain_id,
        rpc_url = %config.network.rpc_url,
        "loaded wallet-service configuration"
    );

    let storage = RocksDbWalletStorage::open_default(&config.db_path)
        .with_context(|| format!("failed to open wallet storage at {}", config.db_path))?;
    let adapter = EvmRpcAdapter::new(&config.network, config.rpc_timeout)?;

    match adapter.remote_chain_id().await {
        Ok(remote) if remote != config.network.chain_id => warn!(
            expected = config.network.chain_id,
            remote, "RPC endpoint reports a different chain id; transfers will be rejected by the node"
        ),
        Ok(_) => {}
        Err(err) => warn!("could not reach RPC endpoint {}: {err:#}", adapter.endpoint()),
    }

    let storage: Arc<dyn WalletStorage> = Arc::new(storage);
    let chain: Arc<dyn ChainAdapter> = Arc::new(adapter);
    let core = WalletCore::new(storage, chain, config.network.clone()).with_confirmation(config.confirmation.clone());

    let state = AppState {
        core: Arc::new(core),
        key_link_contract: WalletAddress(config.key_link_contract.clone()),
    };

    let app = router(state);

    info!("wallet-service listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/network", get(network::network_config))
        .route("/wallet", get(wallet::wallet_get))
        .route("/wallet/refresh", post(wallet::wallet_refresh))
        .route("/wallet/send", post(wallet::wallet_send))
        .route("/wallet/deposit", post(wallet::wallet_deposit))
        .route("/wallet/export", get(wallet::wallet_export))
        .route("/key-link/status", get(network::key_link_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        return;
    }
    info!("shutdown signal received");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "wallet-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "wallet-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
            kind: None,
        }),
    )
}

pub(crate) fn service_unavailable(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: None,
        }),
    )
}

pub(crate) fn wallet_error(err: WalletError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err.kind() {
        WalletErrorKind::StorageUnavailable | WalletErrorKind::NetworkUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        WalletErrorKind::InvalidAddress | WalletErrorKind::InvalidAmount | WalletErrorKind::InsufficientBalance => {
            StatusCode::BAD_REQUEST
        }
        WalletErrorKind::SubmissionFailed => StatusCode::BAD_GATEWAY,
        WalletErrorKind::TransferInProgress => StatusCode::CONFLICT,
    };
    (
        status,
        Json(ErrorResponse {
            kind: Some(err.kind()),
            error: err.to_string(),
        }),
    )
}
