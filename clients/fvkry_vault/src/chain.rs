// src/chain.rs
// Chain resolution and the provider seams used to read from and write to a chain

use std::collections::BTreeMap;
use std::fmt;

use alloy_primitives::{Address, Bytes, B256, U256};
use anchor_lang::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{abi, errors::VaultError};

pub const BASE_CHAIN_ID: u64 = 8453;
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

/// Static description of a supported network
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub id: u64,
    pub name: String,
    pub rpc_url: String,
    pub explorer_url: String,
}

/// Failure reported by a wallet or RPC endpoint, before classification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderError {
    Rpc {
        code: i64,
        message: String,
        data: Option<Bytes>,
    },
    Transport(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Rpc { code, message, .. } => write!(f, "rpc error {code}: {message}"),
            ProviderError::Transport(cause) => write!(f, "transport error: {cause}"),
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A call or transaction as sent to the chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub success: bool,
}

/// Read side of a chain connection
pub trait PublicClient {
    fn chain_id(&self) -> ProviderResult<u64>;
    /// Dry-runs `call` against the latest block and returns its output
    fn call(&self, call: &CallRequest) -> ProviderResult<Bytes>;
    /// Blocks until `hash` is mined
    fn wait_for_receipt(&self, hash: B256) -> ProviderResult<Receipt>;
}

/// Write side of a chain connection, the user's wallet
pub trait WalletProvider {
    fn chain_id(&self) -> ProviderResult<u64>;
    fn request_addresses(&self) -> ProviderResult<Vec<Address>>;
    fn send_transaction(&self, call: &CallRequest) -> ProviderResult<B256>;
}

/// Builds read clients for a chain
pub trait Connector {
    fn connect(&self, chain: &ChainConfig) -> Result<Box<dyn PublicClient>>;
}

/// Supported networks keyed by chain id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainConfig>,
    default_chain_id: u64,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>, default_chain_id: u64) -> Self {
        Self {
            chains: chains.into_iter().map(|c| (c.id, c)).collect(),
            default_chain_id,
        }
    }

    /// Base mainnet and Base Sepolia on the given RPC endpoints, mainnet first
    pub fn base(mainnet_rpc: impl Into<String>, sepolia_rpc: impl Into<String>) -> Self {
        Self::new(
            vec![
                ChainConfig {
                    id: BASE_CHAIN_ID,
                    name: "Base".to_string(),
                    rpc_url: mainnet_rpc.into(),
                    explorer_url: "https://base.blockscout.com".to_string(),
                },
                ChainConfig {
                    id: BASE_SEPOLIA_CHAIN_ID,
                    name: "Base Sepolia".to_string(),
                    rpc_url: sepolia_rpc.into(),
                    explorer_url: "https://base-sepolia.blockscout.com".to_string(),
                },
            ],
            BASE_CHAIN_ID,
        )
    }

    pub fn resolve(&self, chain_id: u64) -> Result<&ChainConfig> {
        self.chains
            .get(&chain_id)
            .ok_or(error!(VaultError::UnsupportedChain))
    }

    pub fn default_chain_id(&self) -> u64 {
        self.default_chain_id
    }

    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.chains.keys().copied()
    }
}

/// The connected account and what it can sign with
pub struct WalletSession<'a> {
    pub address: Address,
    pub chain: &'a ChainConfig,
    pub wallet: &'a dyn WalletProvider,
}

/// Resolves the active chain and hands out clients bound to it
pub struct ChainResolver {
    registry: ChainRegistry,
    connector: Box<dyn Connector>,
    wallet: Option<Box<dyn WalletProvider>>,
}

impl ChainResolver {
    pub fn new(
        registry: ChainRegistry,
        connector: Box<dyn Connector>,
        wallet: Option<Box<dyn WalletProvider>>,
    ) -> Self {
        Self {
            registry,
            connector,
            wallet,
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    /// Chain the wallet reports, or the registry default when no wallet is attached
    pub fn current_chain_id(&self) -> Result<u64> {
        match &self.wallet {
            Some(wallet) => wallet.chain_id().map_err(|e| abi::classify(&e)),
            None => Ok(self.registry.default_chain_id()),
        }
    }

    pub fn current_chain(&self) -> Result<&ChainConfig> {
        self.registry.resolve(self.current_chain_id()?)
    }

    pub fn public_client(&self) -> Result<Box<dyn PublicClient>> {
        let chain = self.current_chain()?;
        self.connector.connect(chain)
    }

    /// Requests account access and returns the first authorized address
    pub fn wallet_client(&self) -> Result<WalletSession<'_>> {
        let wallet = self
            .wallet
            .as_deref()
            .ok_or(error!(VaultError::NoWallet))?;
        let chain = self.current_chain()?;
        let addresses = wallet
            .request_addresses()
            .map_err(|e| abi::classify(&e))?;
        let address = *addresses.first().ok_or(error!(VaultError::NoWallet))?;
        msg!("Connected address {} on chain {}", address, chain.id);
        Ok(WalletSession {
            address,
            chain,
            wallet,
        })
    }

    pub fn explorer_tx_url(&self, hash: B256) -> Result<String> {
        let chain = self.current_chain()?;
        Ok(format!("{}/tx/{}", chain.explorer_url.trim_end_matches('/'), hash))
    }
}
