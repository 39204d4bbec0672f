// src/state.rs
// Data model for vaults, chains and derived unlock state

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::VaultError;

pub const NATIVE_SYMBOL: &str = "ETH";
pub const NATIVE_DECIMALS: u8 = 18;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// What a vault holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    /// Backends report native ETH either with no address or the zero address
    pub fn from_address(address: Option<Address>) -> Self {
        match address {
            Some(a) if a != Address::ZERO => Asset::Token(a),
            _ => Asset::Native,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    pub fn address(&self) -> Address {
        match self {
            Asset::Native => Address::ZERO,
            Asset::Token(a) => *a,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultKind {
    Fixed,
    Goal,
    Schedule,
}

impl VaultKind {
    /// Name the lock contract and backend use for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultKind::Fixed => "fixed",
            VaultKind::Goal => "goal",
            VaultKind::Schedule => "schedule",
        }
    }
}

impl FromStr for VaultKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(VaultKind::Fixed),
            "goal" => Ok(VaultKind::Goal),
            "schedule" | "scheduled" => Ok(VaultKind::Schedule),
            _ => err!(VaultError::UnknownVaultKind),
        }
    }
}

/// Unit a lock period is entered in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
            DurationUnit::Months => "months",
            DurationUnit::Years => "years",
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            DurationUnit::Days => 1,
            DurationUnit::Weeks => 7,
            DurationUnit::Months => 30,
            DurationUnit::Years => 365,
        }
    }

    /// Largest period accepted in this unit; keeps total lock length in a similar range
    pub fn max_periods(&self) -> u32 {
        match self {
            DurationUnit::Days => 6,
            DurationUnit::Weeks => 3,
            DurationUnit::Months => 11,
            DurationUnit::Years => 5,
        }
    }

    /// Coarsest unit a day count is a whole multiple of
    pub fn classify(days: u32) -> Self {
        if days >= 365 && days % 365 == 0 {
            DurationUnit::Years
        } else if days >= 30 && days % 30 == 0 {
            DurationUnit::Months
        } else if days >= 7 && days % 7 == 0 {
            DurationUnit::Weeks
        } else {
            DurationUnit::Days
        }
    }
}

impl FromStr for DurationUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(DurationUnit::Days),
            "week" | "weeks" => Ok(DurationUnit::Weeks),
            "month" | "months" => Ok(DurationUnit::Months),
            "year" | "years" => Ok(DurationUnit::Years),
            _ => err!(VaultError::UnknownDurationUnit),
        }
    }
}

/// Release rules of a vault; each kind only carries the fields it uses
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VaultTerms {
    Fixed,
    Goal {
        goal_usd: U256, // Whole dollars, not scaled by the asset's decimals
    },
    Schedule {
        every_days: u32,
        amount_per_period: U256,
    },
}

impl VaultTerms {
    pub fn kind(&self) -> VaultKind {
        match self {
            VaultTerms::Fixed => VaultKind::Fixed,
            VaultTerms::Goal { .. } => VaultKind::Goal,
            VaultTerms::Schedule { .. } => VaultKind::Schedule,
        }
    }
}

/// A user's locked position as seen by the client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: u64,
    pub owner: Address,
    pub chain_id: u64,
    pub asset: Asset,
    pub symbol: String,
    pub decimals: u8,
    pub amount: U256,              // Remaining balance in base units
    pub unlocked_total: U256,      // Already released, base units
    pub start_date: i64,
    pub end_date: i64,
    pub terms: VaultTerms,
    pub required_slippage: u64,
    pub title: String,
    pub emergency: bool,
    pub next_unlock: Option<i64>,  // First unlock reference for schedule vaults
}

impl Vault {
    pub fn kind(&self) -> VaultKind {
        self.terms.kind()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.end_date
    }

    pub fn can_withdraw(&self) -> bool {
        !self.amount.is_zero()
    }

    /// What was locked in total, released part included
    pub fn locked_total(&self) -> U256 {
        self.amount.saturating_add(self.unlocked_total)
    }

    /// First checkpoint of a schedule vault, one period after the start unless the backend
    /// reported one
    pub fn first_unlock(&self) -> Option<i64> {
        match self.terms {
            VaultTerms::Schedule { every_days, .. } => Some(
                self.next_unlock
                    .unwrap_or(self.start_date + i64::from(every_days) * SECONDS_PER_DAY),
            ),
            _ => None,
        }
    }

    /// Delete is allowed once emptied and expired, or on the emergency path
    pub fn can_delete(&self, now: i64) -> bool {
        self.emergency || (self.amount.is_zero() && self.is_expired(now))
    }

    pub fn lock_days(&self) -> i64 {
        (self.end_date - self.start_date).max(0) / SECONDS_PER_DAY
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_date, 0)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.end_date, 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    #[serde(rename = "poolAddress")]
    pub pool_address: Address,
    #[serde(rename = "dataProvider")]
    pub data_provider_address: Address,
    #[serde(rename = "lockAsset")]
    pub lock_asset_address: Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedToken {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// One deposit or withdrawal in a vault's history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub depositor: Address,
    pub amount: f64,
    pub withdrawn: bool,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn label(&self) -> &'static str {
        if self.withdrawn {
            "Withdrawal"
        } else {
            "Deposit"
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Past,
    Current,
    Future,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockDay {
    pub date: i64,
    pub status: DayStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockStatus {
    #[serde(rename = "canUnlockNow")]
    pub can_unlock_now: bool,
    #[serde(rename = "amountToUnlock")]
    pub amount_to_unlock: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(amount: u64, end_date: i64) -> Vault {
        Vault {
            id: 1,
            owner: Address::repeat_byte(0x11),
            chain_id: 84532,
            asset: Asset::Native,
            symbol: NATIVE_SYMBOL.to_string(),
            decimals: NATIVE_DECIMALS,
            amount: U256::from(amount),
            unlocked_total: U256::ZERO,
            start_date: 0,
            end_date,
            terms: VaultTerms::Fixed,
            required_slippage: 0,
            title: "rainy day".to_string(),
            emergency: false,
            next_unlock: None,
        }
    }

    #[test]
    fn parses_kinds_and_units_loosely() {
        assert_eq!("Fixed".parse::<VaultKind>().unwrap(), VaultKind::Fixed);
        assert_eq!("scheduled".parse::<VaultKind>().unwrap(), VaultKind::Schedule);
        assert!("weekly".parse::<VaultKind>().is_err());
        assert_eq!("Weeks".parse::<DurationUnit>().unwrap(), DurationUnit::Weeks);
        assert!("fortnights".parse::<DurationUnit>().is_err());
    }

    #[test]
    fn delete_needs_empty_and_expired() {
        let now = 10 * SECONDS_PER_DAY;
        assert!(!vault(5, now - 1).can_delete(now));
        assert!(!vault(0, now + 1).can_delete(now));
        assert!(vault(0, now - 1).can_delete(now));

        let mut flagged = vault(5, now + 1);
        flagged.emergency = true;
        assert!(flagged.can_delete(now));
    }

    #[test]
    fn first_unlock_prefers_backend_reference() {
        let mut v = vault(100, 50 * SECONDS_PER_DAY);
        assert_eq!(v.first_unlock(), None);

        v.terms = VaultTerms::Schedule {
            every_days: 10,
            amount_per_period: U256::from(10),
        };
        assert_eq!(v.first_unlock(), Some(10 * SECONDS_PER_DAY));
        v.next_unlock = Some(3 * SECONDS_PER_DAY);
        assert_eq!(v.first_unlock(), Some(3 * SECONDS_PER_DAY));

        v.unlocked_total = U256::from(60);
        assert_eq!(v.locked_total(), U256::from(160));
    }

    #[test]
    fn classifies_durations() {
        assert_eq!(DurationUnit::classify(730), DurationUnit::Years);
        assert_eq!(DurationUnit::classify(90), DurationUnit::Months);
        assert_eq!(DurationUnit::classify(21), DurationUnit::Weeks);
        assert_eq!(DurationUnit::classify(5), DurationUnit::Days);
    }

    #[test]
    fn zero_address_is_native() {
        assert_eq!(Asset::from_address(Some(Address::ZERO)), Asset::Native);
        assert_eq!(Asset::from_address(None), Asset::Native);
        let token = Address::repeat_byte(0xaa);
        assert_eq!(Asset::from_address(Some(token)), Asset::Token(token));
    }
}
