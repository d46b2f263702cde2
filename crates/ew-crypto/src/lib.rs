use anyhow::{Result, anyhow};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

mod tx;

pub use tx::{LegacyTransfer, SignedTransfer, TRANSFER_GAS_LIMIT, sign_legacy_transfer};

/// Recoverable secp256k1 signature over a 32-byte prehash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

pub trait Signer: Send + Sync {
    fn address_bytes(&self) -> [u8; 20];
    fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature>;
}

pub struct EvmKeypair {
    signing_key: SigningKey,
}

impl EvmKeypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Loads a keypair from a 32-byte hex secret, with or without `0x`.
    pub fn from_private_key_hex(private_key: &str) -> Result<Self> {
        let trimmed = private_key.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let mut secret = hex::decode(body).map_err(|_| anyhow!("private key is not valid hex"))?;
        if secret.len() != 32 {
            secret.zeroize();
            return Err(anyhow!("private key must be 32 bytes"));
        }

        let signing_key = SigningKey::from_slice(&secret);
        secret.zeroize();

        Ok(Self {
            signing_key: signing_key.map_err(|_| anyhow!("private key is not a valid secp256k1 scalar"))?,
        })
    }

    pub fn private_key_hex(&self) -> String {
        let mut secret = self.signing_key.to_bytes();
        let encoded = format!("0x{}", hex::encode(secret.as_slice()));
        secret.as_mut_slice().zeroize();
        encoded
    }

    /// EIP-55 checksummed account address.
    pub fn address(&self) -> String {
        to_checksum_address(&self.address_bytes())
    }
}

impl Signer for EvmKeypair {
    fn address_bytes(&self) -> [u8; 20] {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let digest = keccak256(&point.as_bytes()[1..]);
        let mut address = [0_u8; 20];
        address.copy_from_slice(&digest[12..]);
        address
    }

    fn sign_prehash(&self, prehash: &[u8; 32]) -> Result<RecoverableSignature> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prehash)
            .map_err(|err| anyhow!("signing failed: {err}"))?;

        let bytes = signature.to_bytes();
        let mut r = [0_u8; 32];
        let mut s = [0_u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }
}

pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(input);
    let mut output = [0_u8; 32];
    output.copy_from_slice(&digest);
    output
}

pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let digest = keccak256(lower.as_bytes());

    let mut output = String::with_capacity(42);
    output.push_str("0x");
    for (index, ch) in lower.chars().enumerate() {
        let nibble = (digest[index / 2] >> (if index % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if ch.is_ascii_alphabetic() && nibble >= 8 {
            output.push(ch.to_ascii_uppercase());
        } else {
            output.push(ch);
        }
    }
    output
}

/// Parses a `0x`-prefixed account address.
///
/// All-lowercase and all-uppercase bodies are accepted as-is; mixed case must
/// match the EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<[u8; 20]> {
    let body = address
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("address must start with 0x"))?;

    if body.len() != 40 || !body.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(anyhow!("address must be 40 hex characters"));
    }

    let mut bytes = [0_u8; 20];
    hex::decode_to_slice(body, &mut bytes).map_err(|_| anyhow!("address is not valid hex"))?;

    let has_lower = body.chars().any(|ch| ch.is_ascii_lowercase());
    let has_upper = body.chars().any(|ch| ch.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(&bytes) != address {
        return Err(anyhow!("address checksum mismatch"));
    }

    Ok(bytes)
}

pub fn is_valid_address(address: &str) -> bool {
    parse_address(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB3_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn derives_known_address_from_private_key() {
        let keypair = EvmKeypair::from_private_key_hex(WEB3_KEY).unwrap();
        assert_eq!(keypair.address(), "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
        assert_eq!(keypair.private_key_hex(), WEB3_KEY);
    }

    #[test]
    fn accepts_key_without_prefix() {
        let keypair = EvmKeypair::from_private_key_hex(WEB3_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(keypair.address(), "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
    }

    #[test]
    fn rejects_malformed_private_keys() {
        assert!(EvmKeypair::from_private_key_hex("0x1234").is_err());
        assert!(EvmKeypair::from_private_key_hex("not-hex").is_err());
        assert!(EvmKeypair::from_private_key_hex(&format!("0x{}", "00".repeat(32))).is_err());
    }

    #[test]
    fn generated_keypair_roundtrips_through_hex() {
        let keypair = EvmKeypair::generate();
        let restored = EvmKeypair::from_private_key_hex(&keypair.private_key_hex()).unwrap();
        assert_eq!(restored.address(), keypair.address());
        assert!(is_valid_address(&keypair.address()));
    }

    #[test]
    fn checksum_matches_eip55_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let bytes = parse_address(&expected.to_lowercase()).unwrap();
            assert_eq!(to_checksum_address(&bytes), expected);
            assert!(is_valid_address(expected));
        }
    }

    #[test]
    fn address_validation_rules() {
        assert!(is_valid_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(is_valid_address("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"));
        assert!(!is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"));
        assert!(!is_valid_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!is_valid_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1bea"));
        assert!(!is_valid_address("not-an-address"));
        assert!(!is_valid_address("0xRECIPIENT"));
    }
}
