//! Call shapes for the deployed key-link contract.
//!
//! The contract exposes `linkKeys(string,string)`, `getPrivateKey()`,
//! `getPublicKey()`, `hasLinkedKeys()`, `getLinkTimestamp()` and emits
//! `KeysLinked(address indexed wallet, string publicKey, uint256 timestamp)`.
//! Only the read-only views are invoked from this workspace.

use anyhow::{Result, anyhow};
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::U256;
use ethers_core::utils::{id, keccak256};
use ew_api_types::WalletAddress;
use ew_chain_client::{CallRequest, ChainAdapter};

pub const KEY_LINK_CONTRACT: &str = "0xcB64C452ED4E927404b1e5FA6EE643eD9E222407";
pub const KEYS_LINKED_EVENT: &str = "KeysLinked(address,string,uint256)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLinkCall {
    LinkKeys { private_key: String, public_key: String },
    GetPrivateKey,
    GetPublicKey,
    HasLinkedKeys,
    GetLinkTimestamp,
}

impl KeyLinkCall {
    pub fn signature(&self) -> &'static str {
        match self {
            Self::LinkKeys { .. } => "linkKeys(string,string)",
            Self::GetPrivateKey => "getPrivateKey()",
            Self::GetPublicKey => "getPublicKey()",
            Self::HasLinkedKeys => "hasLinkedKeys()",
            Self::GetLinkTimestamp => "getLinkTimestamp()",
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        selector(self.signature())
    }

    /// ABI-encoded calldata: selector followed by the encoded arguments.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = self.selector().to_vec();
        if let Self::LinkKeys {
            private_key,
            public_key,
        } = self
        {
            data.extend(abi::encode(&[
                Token::String(private_key.clone()),
                Token::String(public_key.clone()),
            ]));
        }
        data
    }
}

pub fn selector(signature: &str) -> [u8; 4] {
    id(signature)
}

pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature)
}

/// Topic0 of the `KeysLinked` log emitted by `linkKeys`.
pub fn keys_linked_topic() -> [u8; 32] {
    event_topic(KEYS_LINKED_EVENT)
}

fn decode_single(kind: ParamType, data: &[u8]) -> Result<Token> {
    abi::decode(&[kind], data)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("empty return data"))
}

pub fn decode_bool(data: &[u8]) -> Result<bool> {
    match decode_single(ParamType::Bool, data)? {
        Token::Bool(value) => Ok(value),
        other => Err(anyhow!("expected bool, got {other:?}")),
    }
}

pub fn decode_u64(data: &[u8]) -> Result<u64> {
    match decode_single(ParamType::Uint(256), data)? {
        Token::Uint(value) if value <= U256::from(u64::MAX) => Ok(value.low_u64()),
        Token::Uint(value) => Err(anyhow!("uint256 {value} does not fit in 64 bits")),
        other => Err(anyhow!("expected uint256, got {other:?}")),
    }
}

pub fn decode_string(data: &[u8]) -> Result<String> {
    match decode_single(ParamType::String, data)? {
        Token::String(value) => Ok(value),
        other => Err(anyhow!("expected string, got {other:?}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLinkStatus {
    pub has_linked_keys: bool,
    pub link_timestamp: Option<u64>,
}

/// Reads `hasLinkedKeys()` and, when linked, `getLinkTimestamp()` as seen by `wallet`.
pub async fn key_link_status(
    chain: &impl ChainAdapter,
    contract: &WalletAddress,
    wallet: &WalletAddress,
) -> Result<KeyLinkStatus> {
    let view = |call: KeyLinkCall| CallRequest {
        from: Some(wallet.clone()),
        to: contract.clone(),
        data: call.encode(),
    };

    let has_linked_keys = decode_bool(&chain.call(view(KeyLinkCall::HasLinkedKeys)).await?)?;
    let link_timestamp = if has_linked_keys {
        Some(decode_u64(&chain.call(view(KeyLinkCall::GetLinkTimestamp)).await?)?)
    } else {
        None
    };

    Ok(KeyLinkStatus {
        has_linked_keys,
        link_timestamp,
    })
}
