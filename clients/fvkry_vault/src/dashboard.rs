// src/dashboard.rs
// Dashboard roll-ups, the vault grid filter and the cached load flow

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use anchor_lang::prelude::*;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    backend::{load_vaults, VaultBackend},
    cache::{Invalidation, SnapshotCache, DASHBOARD_KEY, VAULT_KEY},
    state::{DurationUnit, Vault, VaultKind, SECONDS_PER_DAY},
};

/// Window used by the "expiring soon" filter
pub const EXPIRING_SOON_SECS: i64 = 7 * SECONDS_PER_DAY;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub fixed: usize,
    pub goal: usize,
    pub schedule: usize,
}

impl KindCounts {
    fn add(&mut self, kind: VaultKind) {
        match kind {
            VaultKind::Fixed => self.fixed += 1,
            VaultKind::Goal => self.goal += 1,
            VaultKind::Schedule => self.schedule += 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationDistribution {
    pub days: usize,
    pub weeks: usize,
    pub months: usize,
    pub years: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAverage {
    pub symbol: String,
    pub avg_days: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTotal {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub total_amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueAsset {
    pub address: Address,
    pub symbol: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingUnlock {
    pub id: u64,
    pub title: String,
    pub asset: String,
    pub unlock_date: i64,
    pub days_remaining: i64,
    pub amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    pub month: String, // YYYY-MM of the lock start
    pub count: usize,
}

/// Aggregate view over all of a user's vaults
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub user_address: Address,
    pub total_vaults: usize,
    pub avg_lock_days: f64,
    pub avg_lock_days_by_asset: Vec<AssetAverage>,
    pub asset_totals: Vec<AssetTotal>,
    pub unique_assets: Vec<UniqueAsset>,
    pub lock_type_counts: KindCounts,
    pub lock_type_by_asset: BTreeMap<String, KindCounts>,
    pub duration_distribution: DurationDistribution,
    pub upcoming_unlocks: Vec<UpcomingUnlock>,
    pub monthly_activity: Vec<MonthlyActivity>,
}

fn average(total: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn month_of(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|t| format!("{:04}-{:02}", t.year(), t.month()))
}

impl DashboardSummary {
    pub fn from_vaults(user_address: Address, vaults: &[Vault], now: i64) -> Self {
        let mut by_asset: BTreeMap<&str, Vec<&Vault>> = BTreeMap::new();
        let mut lock_type_counts = KindCounts::default();
        let mut duration_distribution = DurationDistribution::default();
        let mut months: BTreeMap<String, usize> = BTreeMap::new();

        for vault in vaults {
            by_asset.entry(vault.symbol.as_str()).or_default().push(vault);
            lock_type_counts.add(vault.kind());
            let days = u32::try_from(vault.lock_days()).unwrap_or(u32::MAX);
            match DurationUnit::classify(days) {
                DurationUnit::Days => duration_distribution.days += 1,
                DurationUnit::Weeks => duration_distribution.weeks += 1,
                DurationUnit::Months => duration_distribution.months += 1,
                DurationUnit::Years => duration_distribution.years += 1,
            }
            if let Some(month) = month_of(vault.start_date) {
                *months.entry(month).or_default() += 1;
            }
        }

        let mut avg_lock_days_by_asset = Vec::new();
        let mut asset_totals = Vec::new();
        let mut unique_assets = Vec::new();
        let mut lock_type_by_asset = BTreeMap::new();
        for (symbol, held) in &by_asset {
            let first = held[0];
            avg_lock_days_by_asset.push(AssetAverage {
                symbol: symbol.to_string(),
                avg_days: average(held.iter().map(|v| v.lock_days()).sum(), held.len()),
            });
            asset_totals.push(AssetTotal {
                symbol: symbol.to_string(),
                address: first.asset.address(),
                decimals: first.decimals,
                total_amount: held
                    .iter()
                    .fold(U256::ZERO, |acc, v| acc.saturating_add(v.amount)),
            });
            unique_assets.push(UniqueAsset {
                address: first.asset.address(),
                symbol: symbol.to_string(),
            });
            let mut counts = KindCounts::default();
            held.iter().for_each(|v| counts.add(v.kind()));
            lock_type_by_asset.insert(symbol.to_string(), counts);
        }

        let mut upcoming: Vec<&Vault> = vaults.iter().filter(|v| !v.is_expired(now)).collect();
        upcoming.sort_by_key(|v| v.end_date);
        let upcoming_unlocks = upcoming
            .into_iter()
            .map(|v| UpcomingUnlock {
                id: v.id,
                title: v.title.clone(),
                asset: v.symbol.clone(),
                unlock_date: v.end_date,
                days_remaining: (v.end_date - now + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY,
                amount: v.amount,
            })
            .collect();

        Self {
            user_address,
            total_vaults: vaults.len(),
            avg_lock_days: average(vaults.iter().map(|v| v.lock_days()).sum(), vaults.len()),
            avg_lock_days_by_asset,
            asset_totals,
            unique_assets,
            lock_type_counts,
            lock_type_by_asset,
            duration_distribution,
            upcoming_unlocks,
            monthly_activity: months
                .into_iter()
                .map(|(month, count)| MonthlyActivity { month, count })
                .collect(),
        }
    }
}

/// Criteria of the vault grid; empty fields match everything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultFilter {
    pub search: String,
    pub symbol: Option<String>,
    pub kind: Option<VaultKind>,
    pub expiring_soon: bool,
    /// Show expired vaults instead of active ones
    pub expired: bool,
}

impl VaultFilter {
    pub fn matches(&self, vault: &Vault, now: i64) -> bool {
        let term = self.search.trim().to_lowercase();
        let matches_search = term.is_empty()
            || vault.title.to_lowercase().contains(&term)
            || vault.symbol.to_lowercase().contains(&term);
        let matches_symbol = self.symbol.as_ref().map_or(true, |s| *s == vault.symbol);
        let matches_kind = self.kind.map_or(true, |k| k == vault.kind());
        let remaining = vault.end_date - now;
        let matches_expiry = !self.expiring_soon || (remaining > 0 && remaining < EXPIRING_SOON_SECS);
        matches_search
            && matches_symbol
            && matches_kind
            && matches_expiry
            && self.expired == vault.is_expired(now)
    }

    pub fn apply<'a>(&self, vaults: &'a [Vault], now: i64) -> Vec<&'a Vault> {
        vaults.iter().filter(|v| self.matches(v, now)).collect()
    }
}

/// Countdown label such as `"3d 4h 5m"`, or `"Expired"`
pub fn time_left(end_date: i64, now: i64) -> String {
    let remaining = end_date - now;
    if remaining <= 0 {
        return "Expired".to_string();
    }
    let days = remaining / SECONDS_PER_DAY;
    let hours = remaining % SECONDS_PER_DAY / 3600;
    let minutes = remaining % 3600 / 60;
    format!("{days}d {hours}h {minutes}m")
}

/// Serves cached dashboard data and refreshes it from the backend
pub struct DashboardLoader<'a> {
    backend: &'a dyn VaultBackend,
    cache: &'a mut SnapshotCache,
}

impl<'a> DashboardLoader<'a> {
    pub fn new(backend: &'a dyn VaultBackend, cache: &'a mut SnapshotCache) -> Self {
        Self { backend, cache }
    }

    /// Last summary stored for `owner`, if any
    pub fn cached(&self, owner: Address) -> Option<DashboardSummary> {
        self.cache.get(DASHBOARD_KEY, owner).map(|e| e.value)
    }

    pub fn cached_vaults(&self, owner: Address) -> Option<Vec<Vault>> {
        self.cache.get(VAULT_KEY, owner).map(|e| e.value)
    }

    /// Fetches the owner's vaults and rebuilds the snapshots.
    ///
    /// Returns `None` when the owner holds no vaults, after dropping the vault snapshot.
    pub fn refresh(
        &mut self,
        owner: Address,
        chain_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<DashboardSummary>> {
        let chain = self.backend.chain_data(chain_id)?;
        let vaults = load_vaults(self.backend, owner, chain_id, chain.lock_asset_address)?;
        if vaults.is_empty() {
            msg!("No vaults for {} on chain {}", owner, chain_id);
            self.cache.invalidate(Invalidation::NoVaults);
            return Ok(None);
        }

        let summary = DashboardSummary::from_vaults(owner, &vaults, now.timestamp());
        self.cache.put(VAULT_KEY, owner, &vaults, now);
        if self.cache.put(DASHBOARD_KEY, owner, &summary, now) {
            msg!("Dashboard for {} updated, {} vaults", owner, vaults.len());
        }
        Ok(Some(summary))
    }
}
