use anyhow::{Context, Result, anyhow};
use ew_api_types::NetworkConfig;
use ew_chain_evm::key_link::KEY_LINK_CONTRACT;
use ew_wallet_core::ConfirmationPolicy;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct ServiceConfig {
    pub(crate) network: NetworkConfig,
    pub(crate) rpc_timeout: Duration,
    pub(crate) confirmation: ConfirmationPolicy,
    pub(crate) db_path: String,
    pub(crate) listen_addr: SocketAddr,
    pub(crate) key_link_contract: String,
}

impl ServiceConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = NetworkConfig::from_lookup(&lookup).map_err(|err| anyhow!(err))?;

        let rpc_timeout = Duration::from_secs(parse_or(&lookup, "EW_RPC_TIMEOUT_SECS", 15)?);
        let poll_ms = parse_or(&lookup, "EW_CONFIRM_POLL_MS", 2_000)?;
        if poll_ms == 0 {
            return Err(anyhow!("EW_CONFIRM_POLL_MS must be greater than zero"));
        }
        let confirmation = ConfirmationPolicy {
            wait: parse_bool_or(&lookup, "EW_WAIT_FOR_CONFIRMATION", true)?,
            timeout: Duration::from_secs(parse_or(&lookup, "EW_CONFIRM_TIMEOUT_SECS", 60)?),
            poll_interval: Duration::from_millis(poll_ms),
        };

        let db_path = non_empty(&lookup, "EW_DB_PATH").unwrap_or_else(|| "./data/wallet-db".to_owned());
        let listen_addr = non_empty(&lookup, "EW_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_owned())
            .parse()
            .context("EW_LISTEN_ADDR must be host:port")?;

        let key_link_contract =
            non_empty(&lookup, "EW_KEY_LINK_CONTRACT").unwrap_or_else(|| KEY_LINK_CONTRACT.to_owned());
        if !ew_crypto::is_valid_address(&key_link_contract) {
            return Err(anyhow!("EW_KEY_LINK_CONTRACT is not a valid address: {key_link_contract}"));
        }

        Ok(Self {
            network,
            rpc_timeout,
            confirmation,
            db_path,
            listen_addr,
            key_link_contract,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_or<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a non-negative integer, got {raw}")),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(other) => Err(anyhow!("{key} must be true or false, got {other}")),
    }
}
