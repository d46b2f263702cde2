use serde::{Deserialize, Serialize};

pub const EDU_TESTNET: &str = "edu-testnet";
pub const PHAROS_DEVNET: &str = "pharos-devnet";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Fixed description of the single EVM-compatible network the wallet talks to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub slug: String,
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub native_currency: NativeCurrency,
    pub explorer_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::edu_testnet()
    }
}

impl NetworkConfig {
    pub fn edu_testnet() -> Self {
        Self {
            slug: EDU_TESTNET.to_owned(),
            name: "EDU Chain Testnet".to_owned(),
            chain_id: 656_476,
            rpc_url: "https://rpc.open-campus-codex.gelato.digital".to_owned(),
            native_currency: NativeCurrency {
                name: "EDU".to_owned(),
                symbol: "EDU".to_owned(),
                decimals: 18,
            },
            explorer_url: "https://opencampus-codex.blockscout.com".to_owned(),
        }
    }

    pub fn pharos_devnet() -> Self {
        Self {
            slug: PHAROS_DEVNET.to_owned(),
            name: "Pharos Devnet".to_owned(),
            chain_id: 50_002,
            rpc_url: "https://devnet.dplabs-internal.com".to_owned(),
            native_currency: NativeCurrency {
                name: "Pharos".to_owned(),
                symbol: "PHR".to_owned(),
                decimals: 18,
            },
            explorer_url: "https://pharosscan.xyz".to_owned(),
        }
    }

    pub fn preset(slug: &str) -> Option<Self> {
        match slug {
            EDU_TESTNET => Some(Self::edu_testnet()),
            PHAROS_DEVNET => Some(Self::pharos_devnet()),
            _ => None,
        }
    }

    /// Builds the network from `EW_NETWORK`, `EW_RPC_URL`, `EW_CHAIN_ID` and
    /// `EW_EXPLORER_URL` as resolved by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let slug = lookup("EW_NETWORK").unwrap_or_else(|| EDU_TESTNET.to_owned());
        let mut network = Self::preset(slug.trim()).ok_or_else(|| format!("unknown network preset: {slug}"))?;

        if let Some(rpc_url) = lookup("EW_RPC_URL").filter(|v| !v.trim().is_empty()) {
            network.rpc_url = rpc_url.trim().to_owned();
        }
        if let Some(chain_id) = lookup("EW_CHAIN_ID").filter(|v| !v.trim().is_empty()) {
            network.chain_id = chain_id
                .trim()
                .parse()
                .map_err(|_| format!("EW_CHAIN_ID must be an integer, got {chain_id}"))?;
        }
        if let Some(explorer_url) = lookup("EW_EXPLORER_URL").filter(|v| !v.trim().is_empty()) {
            network.explorer_url = explorer_url.trim().to_owned();
        }

        network.explorer_url = network.explorer_url.trim_end_matches('/').to_owned();
        Ok(network)
    }

    pub fn symbol(&self) -> &str {
        &self.native_currency.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.native_currency.decimals
    }

    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{address}", self.explorer_url)
    }

    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{hash}", self.explorer_url)
    }
}
