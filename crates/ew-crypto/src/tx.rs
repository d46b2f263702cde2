use anyhow::Result;
use rlp::RlpStream;

use crate::{Signer, keccak256};

/// Gas required by a plain native-currency transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Unsigned legacy (pre-1559) native transfer, replay-protected per EIP-155.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransfer {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: [u8; 20],
    pub value: u128,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub raw: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTransfer {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

impl LegacyTransfer {
    /// Maximum fee the sender can be charged for this transfer.
    pub fn max_fee(&self) -> u128 {
        self.gas_price.saturating_mul(u128::from(self.gas_limit))
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&self.chain_id);
        stream.append_empty_data();
        stream.append_empty_data();
        keccak256(&stream.out())
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to.to_vec());
        stream.append(&self.value);
        stream.append_empty_data();
    }
}

pub fn sign_legacy_transfer(signer: &impl Signer, transfer: &LegacyTransfer) -> Result<SignedTransfer> {
    let signature = signer.sign_prehash(&transfer.signing_hash())?;
    let v = u64::from(signature.recovery_id) + transfer.chain_id * 2 + 35;

    let mut stream = RlpStream::new_list(9);
    transfer.append_fields(&mut stream);
    stream.append(&v);
    stream.append(&trim_leading_zeros(&signature.r));
    stream.append(&trim_leading_zeros(&signature.s));

    let raw = stream.out().to_vec();
    let hash = keccak256(&raw);
    Ok(SignedTransfer { raw, hash })
}

fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|byte| *byte != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}
