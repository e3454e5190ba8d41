use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::domain::network::NetworkRegistry;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COVALENT_BASE_URL: &str = "https://api.covalenthq.com";
pub const DEFAULT_MORALIS_BASE_URL: &str = "https://deep-index.moralis.io";
pub const DEFAULT_PRICE_BASE_URL: &str = "https://api.coingecko.com";

/// API keys of the optional data providers. A missing key disables that
/// provider without failing any request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub covalent_api_key: Option<String>,
    pub moralis_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub covalent_base_url: String,
    pub moralis_base_url: String,
    pub price_base_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            covalent_base_url: DEFAULT_COVALENT_BASE_URL.to_string(),
            moralis_base_url: DEFAULT_MORALIS_BASE_URL.to_string(),
            price_base_url: DEFAULT_PRICE_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub http_timeout_secs: u64,
    pub providers: ProviderConfig,
    pub endpoints: EndpointConfig,
    /// Network id to RPC URL.
    pub rpc_overrides: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            log_dir: None,
            http_timeout_secs: 15,
            providers: ProviderConfig::default(),
            endpoints: EndpointConfig::default(),
            rpc_overrides: HashMap::new(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match Self::optional_var(&lookup, "PORT") {
            Some(raw) => u16::from_str(&raw).map_err(|e| anyhow!("Invalid PORT '{}': {}", raw, e))?,
            None => defaults.port,
        };

        let http_timeout_secs = match Self::optional_var(&lookup, "HTTP_TIMEOUT_SECS") {
            Some(raw) => u64::from_str(&raw)
                .map_err(|e| anyhow!("Invalid HTTP_TIMEOUT_SECS '{}': {}", raw, e))?,
            None => defaults.http_timeout_secs,
        };

        let mut rpc_overrides = HashMap::new();
        for network in NetworkRegistry::default().iter() {
            if let Some(url) = Self::optional_var(&lookup, &network.rpc_override_key()) {
                rpc_overrides.insert(network.id.to_string(), url);
            }
        }

        Ok(Self {
            host: Self::var_or(&lookup, "HOST", &defaults.host),
            port,
            log_level: Self::var_or(&lookup, "LOG_LEVEL", &defaults.log_level),
            log_dir: Self::optional_var(&lookup, "LOG_DIR"),
            http_timeout_secs,
            providers: ProviderConfig {
                covalent_api_key: Self::optional_var(&lookup, "COVALENT_API_KEY"),
                moralis_api_key: Self::optional_var(&lookup, "MORALIS_API_KEY"),
            },
            endpoints: EndpointConfig {
                covalent_base_url: Self::var_or(&lookup, "COVALENT_BASE_URL", DEFAULT_COVALENT_BASE_URL),
                moralis_base_url: Self::var_or(&lookup, "MORALIS_BASE_URL", DEFAULT_MORALIS_BASE_URL),
                price_base_url: Self::var_or(&lookup, "PRICE_BASE_URL", DEFAULT_PRICE_BASE_URL),
            },
            rpc_overrides,
        })
    }

    /// Empty values count as unset.
    pub fn optional_var<F>(lookup: &F, key: &str) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn var_or<F>(lookup: &F, key: &str, fallback: &str) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::optional_var(lookup, key).unwrap_or_else(|| fallback.to_string())
    }

    pub fn is_valid_http_url(url: &str) -> bool {
        (url.starts_with("http://") || url.starts_with("https://")) && url.len() > "https://".len()
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("PORT must be non-zero".to_string());
        }

        if self.http_timeout_secs == 0 {
            errors.push("HTTP_TIMEOUT_SECS must be non-zero".to_string());
        }

        let endpoints = [
            ("COVALENT_BASE_URL", &self.endpoints.covalent_base_url),
            ("MORALIS_BASE_URL", &self.endpoints.moralis_base_url),
            ("PRICE_BASE_URL", &self.endpoints.price_base_url),
        ];
        for (name, url) in endpoints {
            if !Self::is_valid_http_url(url) {
                errors.push(format!("{name} must be an http(s) URL, got '{url}'"));
            }
        }

        for (network, url) in &self.rpc_overrides {
            if !Self::is_valid_http_url(url) {
                errors.push(format!("RPC URL for {network} must be an http(s) URL, got '{url}'"));
            }
        }

        if !errors.is_empty() {
            return Err(anyhow!("Configuration validation failed:\n{}", errors.join("\n")));
        }

        Ok(())
    }

    pub fn network_registry(&self) -> NetworkRegistry {
        NetworkRegistry::with_rpc_overrides(&self.rpc_overrides)
    }
}
