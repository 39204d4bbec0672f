// src/config.rs
// Client configuration from JSON or the environment

use std::time::Duration;

use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainConfig, ChainRegistry, BASE_CHAIN_ID},
    errors::{self, VaultError},
};

pub const API_URL_VAR: &str = "FVKRY_API_URL";
pub const BASE_RPC_VAR: &str = "BASE_RPC_URL";
pub const BASE_SEPOLIA_RPC_VAR: &str = "BASE_SEPOLIA_RPC_URL";
pub const WALLET_RPC_VAR: &str = "FVKRY_WALLET_RPC_URL";
pub const RECEIPT_POLL_VAR: &str = "FVKRY_RECEIPT_POLL_MS";
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;

fn default_receipt_poll_ms() -> u64 {
    DEFAULT_RECEIPT_POLL_MS
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    pub chains: Vec<ChainConfig>,
    pub default_chain_id: u64,
    #[serde(default)]
    pub wallet_rpc_url: Option<String>, // Unset means no wallet is attached
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
}

fn missing(name: &str) -> Error {
    errors::with_message(VaultError::MissingConfig, format!("{name} is not set"))
}

impl ClientConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            errors::with_message(VaultError::MissingConfig, format!("Invalid configuration: {e}"))
        })?;
        config.registry().resolve(config.default_chain_id)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the Base configuration from variables `lookup` provides
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| missing(name))
        };
        let api_url = required(API_URL_VAR)?;
        let base_rpc = required(BASE_RPC_VAR)?;
        let sepolia_rpc = required(BASE_SEPOLIA_RPC_VAR)?;
        let receipt_poll_ms = match lookup(RECEIPT_POLL_VAR) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                errors::with_message(
                    VaultError::MissingConfig,
                    format!("{RECEIPT_POLL_VAR} must be a whole number of milliseconds"),
                )
            })?,
            None => DEFAULT_RECEIPT_POLL_MS,
        };

        let registry = ChainRegistry::base(base_rpc, sepolia_rpc);
        Ok(Self {
            api_url,
            chains: registry
                .ids()
                .filter_map(|id| registry.resolve(id).ok().cloned())
                .collect(),
            default_chain_id: BASE_CHAIN_ID,
            wallet_rpc_url: lookup(WALLET_RPC_VAR).filter(|v| !v.trim().is_empty()),
            receipt_poll_ms,
        })
    }

    pub fn registry(&self) -> ChainRegistry {
        ChainRegistry::new(self.chains.clone(), self.default_chain_id)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BASE_SEPOLIA_CHAIN_ID;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn builds_from_environment() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://api.fvkry.test"),
            (BASE_RPC_VAR, "https://base.rpc"),
            (BASE_SEPOLIA_RPC_VAR, "https://sepolia.rpc"),
            (RECEIPT_POLL_VAR, "250"),
        ]))
        .unwrap();
        assert_eq!(config.default_chain_id, BASE_CHAIN_ID);
        assert_eq!(config.receipt_poll_interval(), Duration::from_millis(250));
        assert!(config.wallet_rpc_url.is_none());
        let registry = config.registry();
        assert_eq!(
            registry.resolve(BASE_SEPOLIA_CHAIN_ID).unwrap().rpc_url,
            "https://sepolia.rpc"
        );
    }

    #[test]
    fn missing_variables_are_named() {
        let err = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://api.fvkry.test"),
            (BASE_RPC_VAR, "https://base.rpc"),
        ]))
        .unwrap_err();
        assert!(errors::is(&err, VaultError::MissingConfig));
        assert!(errors::user_message(&err).contains(BASE_SEPOLIA_RPC_VAR));
    }

    #[test]
    fn parses_json_with_defaults() {
        let config = ClientConfig::from_json(
            r#"{
                "api_url": "http://localhost:3000",
                "chains": [{"id": 84532, "name": "Base Sepolia", "rpc_url": "http://localhost:8545", "explorer_url": "https://base-sepolia.blockscout.com"}],
                "default_chain_id": 84532
            }"#,
        )
        .unwrap();
        assert_eq!(config.receipt_poll_ms, DEFAULT_RECEIPT_POLL_MS);

        let unknown_default = ClientConfig::from_json(
            r#"{"api_url": "x", "chains": [], "default_chain_id": 1}"#,
        );
        assert!(errors::is(&unknown_default.unwrap_err(), VaultError::UnsupportedChain));
        assert!(ClientConfig::from_json("{}").is_err());
    }
}
