// src/backend.rs
// REST backend that serves chain metadata, vault records and history

use alloy_primitives::{Address, U256};
use anchor_lang::prelude::*;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    errors::{self, VaultError},
    state::{
        Asset, ChainInfo, DayStatus, DurationUnit, SupportedToken, TokenInfo, TransactionRecord,
        UnlockDay, UnlockStatus, Vault, VaultKind, VaultTerms,
    },
    units::{from_base_units, from_reported},
};

/// Vault as the backend reports it, amounts in human units.
///
/// `amount` is what is still locked and `unlockedTotal` what has been released from it;
/// `unLockGoal` is a dollar figure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub vault_id: u64,
    pub owner: Address,
    pub title: String,
    #[serde(default)]
    pub asset: Option<Address>,
    pub symbol: String,
    pub decimals: u8,
    pub amount: f64,
    #[serde(default)]
    pub unlocked_total: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub vault_type: String,
    #[serde(default)]
    pub un_lock_duration: Option<u32>,
    #[serde(default)]
    pub un_lock_amount: Option<f64>,
    #[serde(default)]
    pub un_lock_goal: Option<f64>,
    #[serde(default)]
    pub slippage: u64,
    #[serde(default)]
    pub emergency: bool,
    #[serde(default, alias = "next_unlock")]
    pub next_unlock: Option<DateTime<Utc>>,
}

fn present_days(value: Option<u32>) -> Option<u32> {
    value.filter(|d| *d > 0)
}

fn present_amount(value: Option<f64>) -> Option<f64> {
    value.filter(|a| *a != 0.0)
}

fn reported(value: f64, decimals: u8) -> Result<U256> {
    from_reported(value, decimals).map_err(|_| error!(VaultError::InvalidVaultRecord))
}

impl VaultRecord {
    /// Converts to the client model, rejecting records that break vault invariants
    pub fn into_vault(self, chain_id: u64) -> Result<Vault> {
        let kind: VaultKind = self.vault_type.parse()?;
        let amount = reported(self.amount, self.decimals)?;
        let unlocked_total = reported(self.unlocked_total, self.decimals)?;
        // Released funds come out of the locked total, which has to fit in 256 bits
        require!(
            amount.checked_add(unlocked_total).is_some(),
            VaultError::InvalidVaultRecord
        );
        require!(self.end_date >= self.start_date, VaultError::InvalidVaultRecord);

        let every = present_days(self.un_lock_duration);
        let per_period = present_amount(self.un_lock_amount);
        let goal = present_amount(self.un_lock_goal);

        let terms = match kind {
            VaultKind::Fixed => {
                require!(
                    every.is_none() && per_period.is_none() && goal.is_none(),
                    VaultError::InvalidVaultRecord
                );
                VaultTerms::Fixed
            }
            VaultKind::Goal => {
                require!(
                    every.is_none() && per_period.is_none(),
                    VaultError::InvalidVaultRecord
                );
                let goal_usd = reported(goal.ok_or(error!(VaultError::InvalidVaultRecord))?, 0)?;
                require!(!goal_usd.is_zero(), VaultError::InvalidVaultRecord);
                VaultTerms::Goal { goal_usd }
            }
            VaultKind::Schedule => {
                require!(goal.is_none(), VaultError::InvalidVaultRecord);
                let every_days = every.ok_or(error!(VaultError::InvalidVaultRecord))?;
                let amount_per_period = reported(
                    per_period.ok_or(error!(VaultError::InvalidVaultRecord))?,
                    self.decimals,
                )?;
                require!(!amount_per_period.is_zero(), VaultError::InvalidVaultRecord);
                VaultTerms::Schedule {
                    every_days,
                    amount_per_period,
                }
            }
        };

        Ok(Vault {
            id: self.vault_id,
            owner: self.owner,
            chain_id,
            asset: Asset::from_address(self.asset),
            symbol: self.symbol,
            decimals: self.decimals,
            amount,
            unlocked_total,
            start_date: self.start_date.timestamp(),
            end_date: self.end_date.timestamp(),
            terms,
            required_slippage: self.slippage,
            title: self.title,
            emergency: self.emergency,
            next_unlock: self.next_unlock.map(|t| t.timestamp()),
        })
    }
}

/// Server-side schedule query for one vault
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub amount: f64,        // Released per period
    pub duration: u32,      // Days between unlocks
    pub unlock_type: String,
    pub next_unlock: DateTime<Utc>,
    pub user_address: Address,
    pub lock_title: String,
    pub lock_amount: f64,
    pub asset_symbol: String,
    pub chain_id: String,
}

fn human(value: U256, decimals: u8) -> f64 {
    from_base_units(value, decimals).parse().unwrap_or_default()
}

impl ScheduleRequest {
    /// Query for a schedule vault, `None` for other kinds
    pub fn for_vault(vault: &Vault) -> Option<Self> {
        let VaultTerms::Schedule {
            every_days,
            amount_per_period,
        } = vault.terms
        else {
            return None;
        };
        Some(Self {
            amount: human(amount_per_period, vault.decimals),
            duration: every_days,
            unlock_type: DurationUnit::Days.as_str().to_string(),
            next_unlock: DateTime::from_timestamp(vault.first_unlock()?, 0)?,
            user_address: vault.owner,
            lock_title: vault.title.clone(),
            lock_amount: human(vault.amount, vault.decimals),
            asset_symbol: vault.symbol.clone(),
            chain_id: vault.chain_id.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub unlock_days: Vec<ScheduledDay>,
    pub can_unlock_now: bool,
    pub amount_to_unlock: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledDay {
    pub date: DateTime<Utc>,
    pub status: DayStatus,
}

impl From<ScheduledDay> for UnlockDay {
    fn from(day: ScheduledDay) -> Self {
        UnlockDay {
            date: day.date.timestamp(),
            status: day.status,
        }
    }
}

impl ScheduleResponse {
    /// Same shape as the locally derived schedule, amount in base units
    pub fn into_view(self, decimals: u8) -> Result<(Vec<UnlockDay>, UnlockStatus)> {
        let amount_to_unlock = reported(self.amount_to_unlock, decimals)?;
        Ok((
            self.unlock_days.into_iter().map(UnlockDay::from).collect(),
            UnlockStatus {
                can_unlock_now: self.can_unlock_now,
                amount_to_unlock,
            },
        ))
    }
}

/// Lock summary stored by the backend after a vault is created
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub title: String,
    pub amount: String,
    pub symbol: String,
    pub duration: String,       // Lock length in days
    pub duration_type: String,
    pub lock_type: String,
    pub asset_type: String,     // "native" or "token"
    pub goal: String,
    pub token: Address,
    pub decimals: u8,
    pub chain_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LockSubmission<'a> {
    address: Address,
    lock_data: &'a LockRecord,
}

/// Identifies a vault's transaction history
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionQuery {
    pub owner: Address,
    pub chain_id: u64,
    pub contract: Address,
    pub decimals: u8,
    pub vault_id: u64,
}

/// The backend endpoints the client consumes
pub trait VaultBackend {
    fn chain_data(&self, chain_id: u64) -> Result<ChainInfo>;
    fn token_data(&self, symbol: &str, chain_id: u64) -> Result<TokenInfo>;
    fn supported_tokens(&self, chain_id: u64) -> Result<Vec<SupportedToken>>;
    fn user_vaults(&self, owner: Address, chain_id: u64, contract: Address) -> Result<Vec<VaultRecord>>;
    fn vault_transactions(&self, query: &TransactionQuery) -> Result<Vec<TransactionRecord>>;
    fn scheduled(&self, request: &ScheduleRequest) -> Result<ScheduleResponse>;
    fn record_lock(&self, address: Address, record: &LockRecord) -> Result<()>;
}

/// Fetches and converts every vault `owner` holds on `chain_id`.
///
/// Records that fail conversion are logged and left out.
pub fn load_vaults(
    backend: &dyn VaultBackend,
    owner: Address,
    chain_id: u64,
    contract: Address,
) -> Result<Vec<Vault>> {
    Ok(backend
        .user_vaults(owner, chain_id, contract)?
        .into_iter()
        .filter_map(|record| {
            let id = record.vault_id;
            record
                .into_vault(chain_id)
                .map_err(|e| msg!("Skipping vault {}: {}", id, errors::user_message(&e)))
                .ok()
        })
        .collect())
}

/// [`VaultBackend`] over HTTP
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        msg!("GET {}", path);
        self.http
            .get(self.url(path))
            .query(query)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(errors::network)?
            .json()
            .map_err(errors::network)
    }

    fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        msg!("POST {}", path);
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(errors::network)?
            .json()
            .map_err(errors::network)
    }
}

impl VaultBackend for HttpBackend {
    fn chain_data(&self, chain_id: u64) -> Result<ChainInfo> {
        self.get("/api/tokens/chain-data", &[("chainId", chain_id.to_string())])
    }

    fn token_data(&self, symbol: &str, chain_id: u64) -> Result<TokenInfo> {
        self.get(
            "/api/tokens/token-data",
            &[("symbol", symbol.to_string()), ("chainId", chain_id.to_string())],
        )
    }

    fn supported_tokens(&self, chain_id: u64) -> Result<Vec<SupportedToken>> {
        self.get("/api/tokens/supported-tokens", &[("chainId", chain_id.to_string())])
    }

    fn user_vaults(&self, owner: Address, chain_id: u64, contract: Address) -> Result<Vec<VaultRecord>> {
        self.get(
            "/api/vaults/get-user-vaults",
            &[
                ("owner", owner.to_string()),
                ("chainId", chain_id.to_string()),
                ("contractAddress", contract.to_string()),
            ],
        )
    }

    fn vault_transactions(&self, query: &TransactionQuery) -> Result<Vec<TransactionRecord>> {
        self.get(
            "/api/vaults/get-vault-transactions",
            &[
                ("owner", query.owner.to_string()),
                ("chainId", query.chain_id.to_string()),
                ("contractAddress", query.contract.to_string()),
                ("decimals", query.decimals.to_string()),
                ("vaultId", query.vault_id.to_string()),
            ],
        )
    }

    fn scheduled(&self, request: &ScheduleRequest) -> Result<ScheduleResponse> {
        self.post("/api/vaults/scheduled", request)
    }

    fn record_lock(&self, address: Address, record: &LockRecord) -> Result<()> {
        let _: serde_json::Value = self.post(
            "/api/write/lockAsset",
            &LockSubmission {
                address,
                lock_data: record,
            },
        )?;
        Ok(())
    }
}
