use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One locally held keypair bound to the configured network, plus its cached
/// balances and transaction ledger. This is the record persisted by the
/// wallet store.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub address: String,
    pub private_key: String,
    /// Display-only mirror balance, independent of chain state.
    #[serde(rename = "balance", default)]
    pub balance_usd: f64,
    /// Last known on-chain balance in whole native units.
    #[serde(rename = "eduBalance", default)]
    pub balance_native: f64,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Epoch ms of the last successful balance sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<u64>,
}

impl Wallet {
    pub fn new(address: String, private_key: String) -> Self {
        Self {
            address,
            private_key,
            balance_usd: 0.0,
            balance_native: 0.0,
            transactions: Vec::new(),
            last_synced_at: None,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.last_synced_at.is_some()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("balance_usd", &self.balance_usd)
            .field("balance_native", &self.balance_native)
            .field("transactions", &self.transactions.len())
            .field("last_synced_at", &self.last_synced_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Send,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// A single ledger entry. Never mutated after creation except to attach the
/// on-chain hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Transaction {
    pub fn new(kind: TransactionKind, amount: f64, description: impl Into<String>, timestamp: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            amount,
            description: description.into(),
            timestamp,
            hash: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn direction(&self) -> Direction {
        match self.kind {
            TransactionKind::Deposit => Direction::Incoming,
            TransactionKind::Send => Direction::Outgoing,
        }
    }

    /// Amount with the sign implied by the entry type.
    pub fn signed_amount(&self) -> f64 {
        match self.direction() {
            Direction::Incoming => self.amount.abs(),
            Direction::Outgoing => -self.amount.abs(),
        }
    }

    pub fn display_amount(&self) -> String {
        let sign = match self.direction() {
            Direction::Incoming => '+',
            Direction::Outgoing => '-',
        };
        format!("{sign}{}", self.amount.abs())
    }

    pub fn display_hash(&self) -> Option<String> {
        self.hash.as_deref().map(abbreviate)
    }
}

/// Shortens a hash or key to `first6...last4`.
pub fn abbreviate(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 10 {
        return value.to_owned();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_follows_transaction_kind() {
        let deposit = Transaction::new(TransactionKind::Deposit, 5.0, "top up", 1);
        let send = Transaction::new(TransactionKind::Send, 5.0, "EDU Transfer", 2);

        assert_eq!(deposit.direction(), Direction::Incoming);
        assert!(deposit.signed_amount() >= 0.0);
        assert_eq!(deposit.display_amount(), "+5");

        assert_eq!(send.direction(), Direction::Outgoing);
        assert!(send.signed_amount() <= 0.0);
        assert_eq!(send.display_amount(), "-5");
    }

    #[test]
    fn hash_is_abbreviated_but_stored_whole() {
        let hash = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        let tx = Transaction::new(TransactionKind::Send, 1.5, "EDU Transfer", 1).with_hash(hash);

        assert_eq!(tx.display_hash().as_deref(), Some("0x88df...944b"));
        assert_eq!(tx.hash.as_deref(), Some(hash));
        assert_eq!(abbreviate("0x1234"), "0x1234");
    }

    #[test]
    fn wallet_record_uses_camel_case_fields() {
        let mut wallet = Wallet::new("0xabc".to_owned(), "0xdef".to_owned());
        wallet.balance_native = 2.5;
        wallet
            .transactions
            .push(Transaction::new(TransactionKind::Deposit, 1.0, "seed", 10));

        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["privateKey"], "0xdef");
        assert_eq!(json["eduBalance"], 2.5);
        assert_eq!(json["transactions"][0]["type"], "deposit");
        assert!(json.get("lastSyncedAt").is_none());

        let back: Wallet = serde_json::from_value(json).unwrap();
        assert_eq!(back, wallet);
    }

    #[test]
    fn debug_output_redacts_private_key() {
        let wallet = Wallet::new("0xabc".to_owned(), "0xsecret".to_owned());
        let rendered = format!("{wallet:?}");
        assert!(!rendered.contains("0xsecret"));
        assert!(rendered.contains("<redacted>"));
    }
}
