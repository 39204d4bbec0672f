// src/validation.rs
// Input checks run before any network call

use alloy_primitives::U256;
use anchor_lang::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    errors::VaultError,
    schedule::vault_schedule,
    state::{Asset, DurationUnit, Vault, VaultKind},
    units::{scale, to_base_units},
};

pub const TITLE_WORD_LIMIT: usize = 5;
/// Smallest native amount accepted, in ETH
pub const NATIVE_MINIMUM: f64 = 0.001;
/// Smallest token amount accepted, in whole tokens
pub const TOKEN_MINIMUM: f64 = 1.0;

/// Whether an amount is native ETH or a fungible token, which sets its minimum
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetClass {
    Native,
    Token,
}

impl AssetClass {
    pub fn of(asset: &Asset) -> Self {
        match asset {
            Asset::Native => AssetClass::Native,
            Asset::Token(_) => AssetClass::Token,
        }
    }

    pub fn minimum(&self) -> f64 {
        match self {
            AssetClass::Native => NATIVE_MINIMUM,
            AssetClass::Token => TOKEN_MINIMUM,
        }
    }
}

/// Raw lock form as typed by the user
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockForm {
    pub symbol: String,
    pub title: String,
    pub amount: String,
    pub kind: String,
    pub lock_period: String,
    pub duration_unit: String,
    pub unlock_every_days: String,
    pub unlock_amount: String,
    pub unlock_goal: String,
}

/// Release terms of a validated form
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockTerms {
    Fixed,
    Goal { goal_usd: U256 },
    Schedule { every_days: u32, unlock_amount: String }, // Human units of the asset
}

impl LockTerms {
    pub fn kind(&self) -> VaultKind {
        match self {
            LockTerms::Fixed => VaultKind::Fixed,
            LockTerms::Goal { .. } => VaultKind::Goal,
            LockTerms::Schedule { .. } => VaultKind::Schedule,
        }
    }
}

/// A lock form that passed every local check
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedLock {
    pub symbol: String,
    pub title: String,
    pub amount: String,
    pub lock_days: u32,
    pub duration_unit: DurationUnit,
    pub terms: LockTerms,
}

/// Result of the schedule feasibility check, in base units
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleCheck {
    pub to_unlock_total: U256,
    pub feasible: bool,
}

fn parse_number(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| error!(VaultError::InvalidAmount))?;
    require!(value.is_finite(), VaultError::InvalidAmount);
    Ok(value)
}

/// Amount must be a positive number at or above the asset's minimum
pub fn validate_amount(raw: &str, asset: AssetClass) -> Result<f64> {
    let value = parse_number(raw)?;
    require!(value > 0.0, VaultError::NonPositiveAmount);
    require!(value >= asset.minimum(), VaultError::AmountBelowMinimum);
    Ok(value)
}

/// Lock period in `unit`, returned as total days
pub fn validate_lock_period(raw: &str, unit: DurationUnit) -> Result<u32> {
    let periods: u32 = raw
        .trim()
        .parse()
        .map_err(|_| error!(VaultError::InvalidLockPeriod))?;
    require!(periods > 0, VaultError::InvalidLockPeriod);
    require!(periods <= unit.max_periods(), VaultError::LockPeriodTooLong);
    Ok(periods * unit.days())
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn remaining_title_words(title: &str) -> usize {
    TITLE_WORD_LIMIT.saturating_sub(count_words(title))
}

pub fn validate_title(title: &str) -> Result<()> {
    require!(!title.trim().is_empty(), VaultError::EmptyTitle);
    require!(count_words(title) <= TITLE_WORD_LIMIT, VaultError::TitleTooLong);
    Ok(())
}

/// Applies a keystroke-level title edit.
///
/// Edits over the word limit are refused, but an edit that shortens the text is always
/// taken so an over-long title can be trimmed back.
pub fn apply_title_edit(current: &str, proposed: &str) -> Result<String> {
    let shorter = proposed.len() < current.len();
    require!(
        shorter || count_words(proposed) <= TITLE_WORD_LIMIT,
        VaultError::TitleTooLong
    );
    Ok(proposed.to_string())
}

/// `unlock_amount × floor(lock_days / every_days)` must exceed one whole unit and stay
/// within the locked total
pub fn schedule_feasibility(
    total_amount: U256,
    unlock_amount: U256,
    lock_days: u32,
    every_days: u32,
    decimals: u8,
) -> Result<ScheduleCheck> {
    require!(every_days > 0, VaultError::InvalidUnlockSchedule);
    let periods = U256::from(lock_days / every_days);
    let to_unlock_total = unlock_amount
        .checked_mul(periods)
        .ok_or(error!(VaultError::AmountOverflow))?;
    let feasible = to_unlock_total > scale(decimals)? && to_unlock_total <= total_amount;
    Ok(ScheduleCheck {
        to_unlock_total,
        feasible,
    })
}

/// Checks the whole lock form and drops fields the chosen vault kind does not use
pub fn validate_form(form: &LockForm, asset: AssetClass, decimals: u8) -> Result<ValidatedLock> {
    let kind: VaultKind = if form.kind.trim().is_empty() {
        VaultKind::Fixed
    } else {
        form.kind.parse()?
    };
    let unit: DurationUnit = if form.duration_unit.trim().is_empty() {
        DurationUnit::Days
    } else {
        form.duration_unit.parse()?
    };

    validate_title(&form.title)?;
    validate_amount(&form.amount, asset)?;
    let lock_days = validate_lock_period(&form.lock_period, unit)?;
    let total = to_base_units(&form.amount, decimals)?;

    let terms = match kind {
        VaultKind::Fixed => LockTerms::Fixed,
        VaultKind::Goal => {
            // A dollar target, so it is never scaled by the asset's decimals
            let goal_usd = to_base_units(&form.unlock_goal, 0)
                .map_err(|_| error!(VaultError::InvalidGoal))?;
            require!(!goal_usd.is_zero(), VaultError::InvalidGoal);
            LockTerms::Goal { goal_usd }
        }
        VaultKind::Schedule => {
            let every_days: u32 = form
                .unlock_every_days
                .trim()
                .parse()
                .map_err(|_| error!(VaultError::InvalidUnlockSchedule))?;
            let unlock_amount = form.unlock_amount.trim();
            let per_period = to_base_units(unlock_amount, decimals)
                .map_err(|_| error!(VaultError::InvalidUnlockSchedule))?;
            require!(
                every_days > 0 && !per_period.is_zero(),
                VaultError::InvalidUnlockSchedule
            );
            let check = schedule_feasibility(total, per_period, lock_days, every_days, decimals)?;
            require!(check.feasible, VaultError::InfeasibleSchedule);
            LockTerms::Schedule {
                every_days,
                unlock_amount: unlock_amount.to_string(),
            }
        }
    };

    Ok(ValidatedLock {
        symbol: form.symbol.trim().to_string(),
        title: form.title.trim().to_string(),
        amount: form.amount.trim().to_string(),
        lock_days,
        duration_unit: unit,
        terms,
    })
}

/// Whether the create button is enabled for the current form state
pub fn submit_enabled(form: &LockForm, asset: AssetClass, decimals: u8) -> bool {
    validate_form(form, asset, decimals).is_ok()
}

/// Gate for adding to a lock that is still running, returning the amount in base units
pub fn validate_add(vault: &Vault, raw: &str, now: i64) -> Result<U256> {
    require!(!vault.is_expired(now), VaultError::LockExpired);
    validate_amount(raw, AssetClass::of(&vault.asset))?;
    to_base_units(raw, vault.decimals)
}

/// Gate for withdrawals, returning the requested amount in base units.
///
/// Past the end date, or on the emergency path, the whole balance is available. Before it,
/// only a schedule vault can release funds, and no more than its checkpoints have made due.
pub fn validate_withdraw(vault: &Vault, raw: &str, now: i64) -> Result<U256> {
    require!(vault.can_withdraw(), VaultError::NothingToWithdraw);
    let value = parse_number(raw)?;
    require!(value > 0.0, VaultError::NonPositiveAmount);
    let amount = to_base_units(raw, vault.decimals)?;
    require!(!amount.is_zero(), VaultError::NonPositiveAmount);
    require!(amount <= vault.amount, VaultError::ExceedsVaultBalance);

    if vault.emergency || vault.is_expired(now) {
        return Ok(amount);
    }
    let Some((_, status)) = vault_schedule(vault, now) else {
        return err!(VaultError::LockNotExpired);
    };
    require!(status.can_unlock_now, VaultError::LockNotExpired);
    require!(
        amount <= status.amount_to_unlock,
        VaultError::ExceedsUnlockedAmount
    );
    Ok(amount)
}

/// Gate for deleting a lock
pub fn ensure_deletable(vault: &Vault, now: i64) -> Result<()> {
    if vault.emergency {
        return Ok(());
    }
    require!(vault.amount.is_zero(), VaultError::VaultNotFullyWithdrawn);
    require!(vault.is_expired(now), VaultError::LockNotExpired);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors;
    use crate::state::{VaultTerms, NATIVE_SYMBOL, SECONDS_PER_DAY};
    use alloy_primitives::Address;

    fn form(kind: &str, unit: &str, period: &str) -> LockForm {
        LockForm {
            symbol: "USDC".to_string(),
            title: "house deposit".to_string(),
            amount: "100".to_string(),
            kind: kind.to_string(),
            lock_period: period.to_string(),
            duration_unit: unit.to_string(),
            ..Default::default()
        }
    }

    fn vault(amount: u64) -> Vault {
        Vault {
            id: 3,
            owner: Address::repeat_byte(0x22),
            chain_id: 8453,
            asset: Asset::Native,
            symbol: NATIVE_SYMBOL.to_string(),
            decimals: 0,
            amount: U256::from(amount),
            unlocked_total: U256::ZERO,
            start_date: 0,
            end_date: 100,
            terms: VaultTerms::Fixed,
            required_slippage: 0,
            title: "savings".to_string(),
            emergency: false,
            next_unlock: None,
        }
    }

    #[test]
    fn amount_bounds() {
        assert!(errors::is(
            &validate_amount("0", AssetClass::Native).unwrap_err(),
            VaultError::NonPositiveAmount
        ));
        assert!(errors::is(
            &validate_amount("-5", AssetClass::Native).unwrap_err(),
            VaultError::NonPositiveAmount
        ));
        assert!(errors::is(
            &validate_amount("ten", AssetClass::Token).unwrap_err(),
            VaultError::InvalidAmount
        ));
        assert!(validate_amount("0.001", AssetClass::Native).is_ok());
        assert!(errors::is(
            &validate_amount("0.0005", AssetClass::Native).unwrap_err(),
            VaultError::AmountBelowMinimum
        ));
        assert!(validate_amount("1", AssetClass::Token).is_ok());
        assert!(validate_amount("0.5", AssetClass::Token).is_err());
    }

    #[test]
    fn lock_period_caps_per_unit() {
        assert!(errors::is(
            &validate_lock_period("7", DurationUnit::Days).unwrap_err(),
            VaultError::LockPeriodTooLong
        ));
        assert_eq!(validate_lock_period("6", DurationUnit::Days).unwrap(), 6);
        assert!(validate_lock_period("6", DurationUnit::Years).is_err());
        assert_eq!(validate_lock_period("5", DurationUnit::Years).unwrap(), 1825);
        assert_eq!(validate_lock_period("3", DurationUnit::Weeks).unwrap(), 21);
        assert_eq!(validate_lock_period("11", DurationUnit::Months).unwrap(), 330);
        assert!(errors::is(
            &validate_lock_period("0", DurationUnit::Weeks).unwrap_err(),
            VaultError::InvalidLockPeriod
        ));
        assert!(validate_lock_period("1.5", DurationUnit::Weeks).is_err());
    }

    #[test]
    fn title_edits_respect_word_limit() {
        let six = "one two three four five six";
        assert!(validate_title(six).is_err());
        assert!(apply_title_edit("one two three four five", six).is_err());

        let five = "one two three four five";
        let four = apply_title_edit(five, "one two three four").unwrap();
        assert_eq!(remaining_title_words(&four), 1);
        assert!(errors::is(
            &apply_title_edit(&four, six).unwrap_err(),
            VaultError::TitleTooLong
        ));

        // Trimming an over-long title is still allowed one character at a time
        assert!(apply_title_edit("a b c d e f g", "a b c d e f ").is_ok());
        assert!(errors::is(&validate_title("   ").unwrap_err(), VaultError::EmptyTitle));
    }

    #[test]
    fn schedule_scenario_is_feasible() {
        let check = schedule_feasibility(U256::from(100), U256::from(10), 50, 10, 0).unwrap();
        assert_eq!(check.to_unlock_total, U256::from(50));
        assert!(check.feasible);

        let over = schedule_feasibility(U256::from(100), U256::from(30), 50, 10, 0).unwrap();
        assert!(!over.feasible);
        let tiny = schedule_feasibility(U256::from(100), U256::from(1), 10, 10, 0).unwrap();
        assert!(!tiny.feasible);
    }

    #[test]
    fn schedule_form_enables_submit_only_when_feasible() {
        let mut f = form("schedule", "months", "2");
        f.unlock_every_days = "10".to_string();
        f.unlock_amount = "10".to_string();
        assert!(submit_enabled(&f, AssetClass::Token, 6));
        let lock = validate_form(&f, AssetClass::Token, 6).unwrap();
        assert_eq!(lock.lock_days, 60);
        assert_eq!(
            lock.terms,
            LockTerms::Schedule {
                every_days: 10,
                unlock_amount: "10".to_string()
            }
        );

        f.unlock_amount = "20".to_string();
        assert!(!submit_enabled(&f, AssetClass::Token, 6));
        assert!(errors::is(
            &validate_form(&f, AssetClass::Token, 6).unwrap_err(),
            VaultError::InfeasibleSchedule
        ));

        f.unlock_every_days = "0".to_string();
        assert!(errors::is(
            &validate_form(&f, AssetClass::Token, 6).unwrap_err(),
            VaultError::InvalidUnlockSchedule
        ));
    }

    #[test]
    fn unused_fields_are_dropped_per_kind() {
        let mut f = form("Fixed", "weeks", "2");
        f.unlock_goal = "500".to_string();
        f.unlock_amount = "10".to_string();
        let lock = validate_form(&f, AssetClass::Token, 6).unwrap();
        assert_eq!(lock.terms, LockTerms::Fixed);
        assert_eq!(lock.lock_days, 14);

        let mut g = form("goal", "years", "1");
        assert!(errors::is(
            &validate_form(&g, AssetClass::Token, 6).unwrap_err(),
            VaultError::InvalidGoal
        ));
        g.unlock_goal = "2500".to_string();
        g.unlock_every_days = "7".to_string();
        let lock = validate_form(&g, AssetClass::Token, 6).unwrap();
        assert_eq!(
            lock.terms,
            LockTerms::Goal {
                goal_usd: U256::from(2500)
            }
        );
    }

    #[test]
    fn goal_is_whole_dollars() {
        let mut g = form("goal", "months", "3");
        for bad in ["0", "-10", "12.5", "lots"] {
            g.unlock_goal = bad.to_string();
            assert!(
                errors::is(
                    &validate_form(&g, AssetClass::Native, 18).unwrap_err(),
                    VaultError::InvalidGoal
                ),
                "{bad}"
            );
        }
        g.unlock_goal = " 1000 ".to_string();
        let lock = validate_form(&g, AssetClass::Native, 18).unwrap();
        assert_eq!(
            lock.terms,
            LockTerms::Goal {
                goal_usd: U256::from(1000)
            }
        );
    }

    #[test]
    fn withdraw_gate() {
        let expired = 500;
        assert!(errors::is(
            &validate_withdraw(&vault(0), "1", expired).unwrap_err(),
            VaultError::NothingToWithdraw
        ));
        assert!(errors::is(
            &validate_withdraw(&vault(10), "0", expired).unwrap_err(),
            VaultError::NonPositiveAmount
        ));
        assert!(errors::is(
            &validate_withdraw(&vault(10), "11", expired).unwrap_err(),
            VaultError::ExceedsVaultBalance
        ));
        assert_eq!(
            validate_withdraw(&vault(10), "10", expired).unwrap(),
            U256::from(10)
        );
    }

    #[test]
    fn withdraw_waits_for_expiry_or_schedule() {
        let running = 50;
        assert!(errors::is(
            &validate_withdraw(&vault(10), "10", running).unwrap_err(),
            VaultError::LockNotExpired
        ));
        let mut flagged = vault(10);
        flagged.emergency = true;
        assert!(validate_withdraw(&flagged, "10", running).is_ok());

        // 10 every 10 days over 50 days, first checkpoint on day 10
        let mut drip = vault(100);
        drip.end_date = 50 * SECONDS_PER_DAY;
        drip.terms = VaultTerms::Schedule {
            every_days: 10,
            amount_per_period: U256::from(10),
        };
        let day = |d: i64| d * SECONDS_PER_DAY;

        assert!(errors::is(
            &validate_withdraw(&drip, "1", day(5)).unwrap_err(),
            VaultError::LockNotExpired
        ));
        assert_eq!(
            validate_withdraw(&drip, "20", day(25)).unwrap(),
            U256::from(20)
        );
        assert!(errors::is(
            &validate_withdraw(&drip, "21", day(25)).unwrap_err(),
            VaultError::ExceedsUnlockedAmount
        ));

        drip.amount = U256::from(80);
        drip.unlocked_total = U256::from(20);
        assert!(errors::is(
            &validate_withdraw(&drip, "1", day(25)).unwrap_err(),
            VaultError::LockNotExpired
        ));
        assert!(validate_withdraw(&drip, "80", day(51)).is_ok());
    }

    #[test]
    fn add_only_while_locked() {
        assert_eq!(validate_add(&vault(10), "2", 50).unwrap(), U256::from(2));
        assert!(errors::is(
            &validate_add(&vault(10), "2", 500).unwrap_err(),
            VaultError::LockExpired
        ));
        assert!(errors::is(
            &validate_add(&vault(10), "0.0005", 50).unwrap_err(),
            VaultError::AmountBelowMinimum
        ));
    }

    #[test]
    fn delete_gate() {
        assert!(errors::is(
            &ensure_deletable(&vault(1), 500).unwrap_err(),
            VaultError::VaultNotFullyWithdrawn
        ));
        assert!(errors::is(
            &ensure_deletable(&vault(0), 50).unwrap_err(),
            VaultError::LockNotExpired
        ));
        assert!(ensure_deletable(&vault(0), 500).is_ok());

        let mut flagged = vault(1);
        flagged.emergency = true;
        assert!(ensure_deletable(&flagged, 50).is_ok());
    }
}
