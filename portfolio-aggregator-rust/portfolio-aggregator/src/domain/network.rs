//! Supported networks and the registry that resolves them.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Evm,
    Solana,
}

/// Chain identifiers used by the two optional data providers.
/// `None` means the provider has no listing for the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderChainSlugs {
    pub covalent: Option<&'static str>,
    pub moralis: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
    pub id: &'static str,
    pub kind: NetworkKind,
    pub rpc_endpoint: String,
    pub native_symbol: &'static str,
    pub price_id: &'static str,
    pub provider_slugs: ProviderChainSlugs,
}

impl NetworkDescriptor {
    pub fn is_solana(&self) -> bool {
        self.kind == NetworkKind::Solana
    }

    /// Environment variable that overrides this network's RPC endpoint.
    pub fn rpc_override_key(&self) -> String {
        format!("{}_RPC_URL", self.id.to_uppercase())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unsupported network: {0}")]
    NotFound(String),
}

/// Immutable table of the five supported networks, in display order.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: Vec<NetworkDescriptor>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self {
            networks: default_networks(),
        }
    }
}

impl NetworkRegistry {
    /// Builds the registry, replacing RPC endpoints found in `overrides`
    /// (keyed by network id).
    pub fn with_rpc_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut registry = Self::default();
        for network in &mut registry.networks {
            if let Some(url) = overrides.get(network.id) {
                network.rpc_endpoint = url.clone();
            }
        }
        registry
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, network_id: &str) -> Result<&NetworkDescriptor, RegistryError> {
        self.networks
            .iter()
            .find(|n| n.id == network_id)
            .ok_or_else(|| RegistryError::NotFound(network_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.networks.iter()
    }
}

fn default_networks() -> Vec<NetworkDescriptor> {
    vec![
        NetworkDescriptor {
            id: "ethereum",
            kind: NetworkKind::Evm,
            rpc_endpoint: "https://ethereum-rpc.publicnode.com".to_string(),
            native_symbol: "ETH",
            price_id: "ethereum",
            provider_slugs: ProviderChainSlugs {
                covalent: Some("eth-mainnet"),
                moralis: Some("0x1"),
            },
        },
        NetworkDescriptor {
            id: "polygon",
            kind: NetworkKind::Evm,
            rpc_endpoint: "https://polygon-rpc.com".to_string(),
            native_symbol: "MATIC",
            price_id: "matic-network",
            provider_slugs: ProviderChainSlugs {
                covalent: Some("matic-mainnet"),
                moralis: Some("0x89"),
            },
        },
        NetworkDescriptor {
            id: "bsc",
            kind: NetworkKind::Evm,
            rpc_endpoint: "https://bsc-dataseed.binance.org".to_string(),
            native_symbol: "BNB",
            price_id: "binancecoin",
            provider_slugs: ProviderChainSlugs {
                covalent: Some("bsc-mainnet"),
                moralis: Some("0x38"),
            },
        },
        NetworkDescriptor {
            id: "base",
            kind: NetworkKind::Evm,
            rpc_endpoint: "https://mainnet.base.org".to_string(),
            native_symbol: "ETH",
            price_id: "ethereum",
            provider_slugs: ProviderChainSlugs {
                covalent: Some("base-mainnet"),
                moralis: Some("0x2105"),
            },
        },
        NetworkDescriptor {
            id: "solana",
            kind: NetworkKind::Solana,
            rpc_endpoint: "https://api.mainnet-beta.solana.com".to_string(),
            native_symbol: "SOL",
            price_id: "solana",
            provider_slugs: ProviderChainSlugs {
                covalent: Some("solana-mainnet"),
                moralis: None,
            },
        },
    ]
}
