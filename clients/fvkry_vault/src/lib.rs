// Client-side orchestration for Fvkry asset-lock vaults
use alloy_primitives::Address;
use anchor_lang::prelude::*;
use chrono::Utc;

pub mod abi;
pub mod backend;
pub mod cache;
pub mod chain;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod instructions;
pub mod rpc;
pub mod schedule;
pub mod state;
pub mod units;
pub mod validation;

pub use backend::{HttpBackend, VaultBackend};
pub use cache::{Invalidation, SnapshotCache};
pub use chain::{ChainRegistry, ChainResolver};
pub use config::ClientConfig;
pub use dashboard::{DashboardLoader, DashboardSummary};
pub use errors::VaultError;
pub use instructions::*;
pub use state::*;

use backend::{ScheduleRequest, TransactionQuery};
use rpc::{HttpConnector, JsonRpcClient};


/// Entry point tying the chain resolver, backend and snapshot cache together
pub struct VaultClient {
    resolver: ChainResolver,
    backend: Box<dyn VaultBackend>,
    cache: SnapshotCache,
    last_owner: Option<Address>,
}

impl VaultClient {
    pub fn new(resolver: ChainResolver, backend: Box<dyn VaultBackend>, cache: SnapshotCache) -> Self {
        Self {
            resolver,
            backend,
            cache,
            last_owner: None,
        }
    }

    /// Wires the HTTP backend, per-chain RPC clients and the wallet endpoint if configured
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let poll = config.receipt_poll_interval();
        let registry = config.registry();
        registry.resolve(registry.default_chain_id())?;
        let wallet = config.wallet_rpc_url.as_ref().map(|url| {
            Box::new(JsonRpcClient::new(url.clone(), reqwest::blocking::Client::new(), poll))
                as Box<dyn chain::WalletProvider>
        });
        msg!("Vault client using {}", config.api_url);
        Ok(Self::new(
            ChainResolver::new(registry, Box::new(HttpConnector::new(poll)), wallet),
            Box::new(HttpBackend::new(config.api_url.clone())),
            SnapshotCache::in_memory(),
        ))
    }

    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn resolver(&self) -> &ChainResolver {
        &self.resolver
    }

    pub fn backend(&self) -> &dyn VaultBackend {
        self.backend.as_ref()
    }

    /// Fresh context for running an instruction handler directly
    pub fn context(&self, operation: Operation) -> TxContext<'_> {
        TxContext::new(
            &self.resolver,
            self.backend.as_ref(),
            operation,
            Utc::now().timestamp(),
        )
    }

    /// Locks assets in a new vault
    pub fn create_vault(&self, args: &CreateVault) -> Result<TxOutcome> {
        instructions::create::handler(&mut self.context(Operation::CreateVault), args)
    }

    /// Adds assets to an existing vault
    pub fn add_to_vault(&self, args: &AddToVault) -> Result<TxOutcome> {
        instructions::deposit::handler(&mut self.context(Operation::AddToVault), args)
    }

    /// Withdraws unlocked assets
    pub fn withdraw(&self, args: &Withdraw) -> Result<TxOutcome> {
        instructions::withdraw::handler(&mut self.context(Operation::Withdraw), args)
    }

    /// Deletes an emptied vault
    pub fn delete_vault(&self, args: &DeleteVault) -> Result<TxOutcome> {
        instructions::close::handler(&mut self.context(Operation::DeleteVault), args)
    }

    pub fn supported_tokens(&self) -> Result<Vec<SupportedToken>> {
        self.backend.supported_tokens(self.resolver.current_chain_id()?)
    }

    /// The connected account's vaults on the current chain
    pub fn vaults(&self) -> Result<Vec<Vault>> {
        let session = self.resolver.wallet_client()?;
        let chain = self.backend.chain_data(session.chain.id)?;
        backend::load_vaults(
            self.backend.as_ref(),
            session.address,
            session.chain.id,
            chain.lock_asset_address,
        )
    }

    pub fn vault_transactions(&self, vault: &Vault) -> Result<Vec<TransactionRecord>> {
        let chain = self.backend.chain_data(vault.chain_id)?;
        self.backend.vault_transactions(&TransactionQuery {
            owner: vault.owner,
            chain_id: vault.chain_id,
            contract: chain.lock_asset_address,
            decimals: vault.decimals,
            vault_id: vault.id,
        })
    }

    /// Unlock checkpoints and status of a schedule vault, derived locally
    pub fn unlock_schedule(&self, vault: &Vault) -> Option<(Vec<UnlockDay>, UnlockStatus)> {
        schedule::vault_schedule(vault, Utc::now().timestamp())
    }

    /// The same view as the backend computes it, `None` for fixed and goal vaults
    pub fn server_schedule(&self, vault: &Vault) -> Result<Option<(Vec<UnlockDay>, UnlockStatus)>> {
        let Some(request) = ScheduleRequest::for_vault(vault) else {
            return Ok(None);
        };
        msg!("Scheduled view for vault {}", vault.id);
        self.backend
            .scheduled(&request)?
            .into_view(vault.decimals)
            .map(Some)
    }

    /// Cached summary for the connected account, without touching the backend
    pub fn cached_dashboard(&self) -> Result<Option<DashboardSummary>> {
        let owner = self.resolver.wallet_client()?.address;
        Ok(self.cache.get(cache::DASHBOARD_KEY, owner).map(|e| e.value))
    }

    /// Refreshes the dashboard snapshots for the connected account
    pub fn dashboard(&mut self) -> Result<Option<DashboardSummary>> {
        let session = self.resolver.wallet_client()?;
        let (owner, chain_id) = (session.address, session.chain.id);
        if self.last_owner.is_some_and(|previous| previous != owner) {
            self.cache.invalidate(Invalidation::OwnerChanged);
        }
        self.last_owner = Some(owner);
        DashboardLoader::new(self.backend.as_ref(), &mut self.cache).refresh(owner, chain_id, Utc::now())
    }

    /// Drops every snapshot once the wallet disconnects
    pub fn disconnect(&mut self) {
        self.cache.invalidate(Invalidation::Disconnected);
        self.last_owner = None;
    }
}
