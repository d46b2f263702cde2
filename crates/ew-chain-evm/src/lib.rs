use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use ew_api_types::{NetworkConfig, TxHash, WalletAddress};
use ew_chain_client::{
    CallRequest, ChainAdapter, SubmitTxRequest, SubmitTxResult, TxStatus, TxStatusRequest,
    TxStatusResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

pub mod key_link;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON-RPC 2.0 adapter for an EVM-compatible node over HTTP.
pub struct EvmRpcAdapter {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl EvmRpcAdapter {
    pub fn new(network: &NetworkConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build rpc http client")?;

        Ok(Self {
            endpoint: network.rpc_url.trim_end_matches('/').to_string(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Chain id reported by the node, for comparison against the configured one.
    pub async fn remote_chain_id(&self) -> Result<u64> {
        let value = self.request("eth_chainId", json!([])).await?;
        let chain_id = parse_quantity(as_str(&value, "eth_chainId")?)?;
        u64::try_from(chain_id).map_err(|_| anyhow!("eth_chainId out of range"))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        match self.send(method, params).await? {
            RpcOutcome::Result(value) => Ok(value),
            RpcOutcome::Error(err) => Err(anyhow!("{method} rpc error {}: {}", err.code, err.message)),
        }
    }

    async fn send(&self, method: &str, params: Value) -> Result<RpcOutcome> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!(method, id, "rpc request");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{method} transport"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("{method} HTTP {status}: {text}");
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .with_context(|| format!("{method} parse"))?;

        if let Some(error) = envelope.error {
            return Ok(RpcOutcome::Error(error));
        }
        Ok(RpcOutcome::Result(envelope.result.unwrap_or(Value::Null)))
    }
}

// ── JSON-RPC envelope types ──────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

enum RpcOutcome {
    Result(Value),
    Error(RpcError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

#[async_trait]
impl ChainAdapter for EvmRpcAdapter {
    async fn get_balance(&self, wallet_address: &WalletAddress) -> Result<u128> {
        let value = self
            .request("eth_getBalance", json!([wallet_address.0, "latest"]))
            .await?;
        parse_quantity(as_str(&value, "eth_getBalance")?)
    }

    async fn get_transaction_count(&self, wallet_address: &WalletAddress) -> Result<u64> {
        let value = self
            .request("eth_getTransactionCount", json!([wallet_address.0, "pending"]))
            .await?;
        let count = parse_quantity(as_str(&value, "eth_getTransactionCount")?)?;
        u64::try_from(count).map_err(|_| anyhow!("nonce out of range"))
    }

    async fn gas_price(&self) -> Result<u128> {
        let value = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(as_str(&value, "eth_gasPrice")?)
    }

    async fn submit_transaction(&self, req: SubmitTxRequest) -> Result<SubmitTxResult> {
        let outcome = self
            .send("eth_sendRawTransaction", json!([req.signed_payload]))
            .await?;

        match outcome {
            RpcOutcome::Error(err) => {
                warn!(code = err.code, "node rejected transaction {}: {}", req.tx_hash.0, err.message);
                Ok(SubmitTxResult {
                    tx_hash: req.tx_hash,
                    accepted: false,
                    rejection_reason: Some(err.message),
                })
            }
            RpcOutcome::Result(value) => {
                let tx_hash = match value.as_str() {
                    Some(remote) if !remote.is_empty() => {
                        if remote.eq_ignore_ascii_case(&req.tx_hash.0) {
                            TxHash(remote.to_owned())
                        } else {
                            // Already broadcast; keep the hash of the bytes we signed.
                            warn!(
                                remote,
                                local = %req.tx_hash.0,
                                "node returned a different transaction hash; keeping the local one"
                            );
                            req.tx_hash
                        }
                    }
                    _ => req.tx_hash,
                };
                Ok(SubmitTxResult {
                    tx_hash,
                    accepted: true,
                    rejection_reason: None,
                })
            }
        }
    }

    async fn get_transaction_status(&self, req: TxStatusRequest) -> Result<TxStatusResult> {
        let value = self
            .request("eth_getTransactionReceipt", json!([req.tx_hash.0]))
            .await?;

        if value.is_null() {
            return Ok(TxStatusResult {
                tx_hash: req.tx_hash,
                status: TxStatus::Pending,
            });
        }

        let receipt: ReceiptResponse =
            serde_json::from_value(value).context("eth_getTransactionReceipt parse")?;
        let Some(block_number) = receipt.block_number.as_deref() else {
            return Ok(TxStatusResult {
                tx_hash: req.tx_hash,
                status: TxStatus::Pending,
            });
        };
        let block_number = u64::try_from(parse_quantity(block_number)?)
            .map_err(|_| anyhow!("block number out of range"))?;

        // Pre-Byzantium receipts carry no status; treat inclusion as success.
        let reverted = receipt.status.as_deref().map(parse_quantity).transpose()? == Some(0);
        let status = if reverted {
            TxStatus::Reverted { block_number }
        } else {
            TxStatus::Confirmed { block_number }
        };

        Ok(TxStatusResult {
            tx_hash: req.tx_hash,
            status,
        })
    }

    async fn call(&self, req: CallRequest) -> Result<Vec<u8>> {
        let mut call = json!({
            "to": req.to.0,
            "data": format!("0x{}", hex::encode(&req.data)),
        });
        if let Some(from) = &req.from {
            call["from"] = Value::String(from.0.clone());
        }

        let value = self.request("eth_call", json!([call, "latest"])).await?;
        let data = as_str(&value, "eth_call")?;
        let body = data.strip_prefix("0x").unwrap_or(data);
        hex::decode(body).context("eth_call returned invalid hex")
    }
}

fn as_str<'a>(value: &'a Value, method: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| anyhow!("{method} returned non-string result: {value}"))
}

/// Parses a JSON-RPC hex quantity such as `0x1bc16d674ec80000`.
pub fn parse_quantity(quantity: &str) -> Result<u128> {
    let body = quantity
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("quantity {quantity} is missing 0x prefix"))?;
    if body.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(body, 16).with_context(|| format!("invalid quantity {quantity}"))
}
