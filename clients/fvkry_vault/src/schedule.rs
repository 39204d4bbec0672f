// src/schedule.rs
// Unlock checkpoints and status for scheduled vaults

use alloy_primitives::U256;
use chrono::{DateTime, NaiveDate};

use crate::state::{DayStatus, UnlockDay, UnlockStatus, Vault, VaultTerms, SECONDS_PER_DAY};

/// Most checkpoints ever materialised; a five year lock with daily unlocks needs 1826
pub const MAX_CHECKPOINTS: usize = 4096;

/// Checkpoint dates from the first unlock through `end_date`, `every_days` apart.
///
/// The iterator is finite and can be restarted by cloning or rebuilding it from the same
/// inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnlockSchedule {
    next: i64,
    end_date: i64,
    step: i64,
}

impl UnlockSchedule {
    pub fn new(first_unlock: i64, end_date: i64, every_days: u32) -> Self {
        Self {
            next: first_unlock,
            end_date,
            step: i64::from(every_days) * SECONDS_PER_DAY,
        }
    }

    /// Checkpoints classified against `now` by UTC calendar day, at most [`MAX_CHECKPOINTS`]
    pub fn checkpoints(self, now: i64) -> Vec<UnlockDay> {
        let today = utc_day(now);
        self.take(MAX_CHECKPOINTS).map(|date| UnlockDay {
            date,
            status: match utc_day(date).cmp(&today) {
                std::cmp::Ordering::Less => DayStatus::Past,
                std::cmp::Ordering::Equal => DayStatus::Current,
                std::cmp::Ordering::Greater => DayStatus::Future,
            },
        })
        .collect()
    }
}

impl Iterator for UnlockSchedule {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.step <= 0 || self.next > self.end_date {
            return None;
        }
        let date = self.next;
        match date.checked_add(self.step) {
            Some(next) => self.next = next,
            None => self.step = 0,
        }
        Some(date)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.step <= 0 || self.next > self.end_date {
            return (0, Some(0));
        }
        let span = i128::from(self.end_date) - i128::from(self.next);
        match usize::try_from(span / i128::from(self.step) + 1) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

fn utc_day(timestamp: i64) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// Compares due periods against what has already been released.
///
/// Every past or current checkpoint releases `amount_per_period`; whatever of that is not
/// yet covered by `unlocked_total` is available now, capped at the remaining `balance`.
pub fn unlock_status(
    days: &[UnlockDay],
    amount_per_period: U256,
    unlocked_total: U256,
    balance: U256,
) -> UnlockStatus {
    let due_periods = days
        .iter()
        .filter(|d| d.status != DayStatus::Future)
        .count();
    let due = amount_per_period.saturating_mul(U256::from(due_periods));
    let amount_to_unlock = due.saturating_sub(unlocked_total).min(balance);
    UnlockStatus {
        can_unlock_now: !amount_to_unlock.is_zero(),
        amount_to_unlock,
    }
}

/// Derived schedule view of a vault, `None` for fixed and goal vaults
pub fn vault_schedule(vault: &Vault, now: i64) -> Option<(Vec<UnlockDay>, UnlockStatus)> {
    let VaultTerms::Schedule {
        every_days,
        amount_per_period,
    } = vault.terms
    else {
        return None;
    };
    let first = vault.first_unlock()?;
    let days = UnlockSchedule::new(first, vault.end_date, every_days).checkpoints(now);
    let status = unlock_status(&days, amount_per_period, vault.unlocked_total, vault.amount);
    Some((days, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Asset, NATIVE_DECIMALS};
    use alloy_primitives::Address;

    const DAY: i64 = SECONDS_PER_DAY;
    // 2025-01-01T00:00:00Z
    const JAN_1: i64 = 1_735_689_600;

    #[test]
    fn length_matches_floor_formula() {
        for (first, end, every) in [
            (JAN_1, JAN_1 + 50 * DAY, 10u32),
            (JAN_1, JAN_1 + 55 * DAY, 10),
            (JAN_1, JAN_1, 7),
            (JAN_1 + 3 * DAY, JAN_1 + 100 * DAY, 1),
        ] {
            let dates: Vec<i64> = UnlockSchedule::new(first, end, every).collect();
            let expected = ((end - first) / (i64::from(every) * DAY) + 1) as usize;
            assert_eq!(dates.len(), expected);
            assert_eq!(UnlockSchedule::new(first, end, every).size_hint().0, expected);
            assert!(dates.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(*dates.last().unwrap(), first + (expected as i64 - 1) * every as i64 * DAY);
        }
    }

    #[test]
    fn restarting_yields_the_same_sequence() {
        let schedule = UnlockSchedule::new(JAN_1, JAN_1 + 90 * DAY, 30);
        let a: Vec<i64> = schedule.clone().collect();
        let b: Vec<i64> = schedule.collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn degenerate_inputs_are_empty() {
        assert_eq!(UnlockSchedule::new(JAN_1, JAN_1 + 10 * DAY, 0).count(), 0);
        assert_eq!(UnlockSchedule::new(JAN_1 + DAY, JAN_1, 1).count(), 0);
    }

    #[test]
    fn wide_ranges_stay_bounded() {
        let schedule = UnlockSchedule::new(i64::MIN, i64::MAX, 1);
        let expected = usize::try_from(u64::MAX / DAY as u64 + 1).ok();
        assert_eq!(schedule.size_hint().1, expected);
        assert_eq!(schedule.checkpoints(JAN_1).len(), MAX_CHECKPOINTS);

        let five_years = UnlockSchedule::new(JAN_1, JAN_1 + 1825 * DAY, 1);
        assert_eq!(five_years.checkpoints(JAN_1).len(), 1826);
    }

    #[test]
    fn statuses_follow_calendar_day() {
        let now = JAN_1 + 20 * DAY + 15 * 3600;
        let days = UnlockSchedule::new(JAN_1, JAN_1 + 40 * DAY, 10).checkpoints(now);
        let statuses: Vec<DayStatus> = days.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                DayStatus::Past,
                DayStatus::Past,
                DayStatus::Current,
                DayStatus::Future,
                DayStatus::Future
            ]
        );
    }

    #[test]
    fn unlock_status_accounts_for_withdrawals() {
        let now = JAN_1 + 20 * DAY;
        let days = UnlockSchedule::new(JAN_1, JAN_1 + 40 * DAY, 10).checkpoints(now);

        let open = unlock_status(&days, U256::from(10), U256::ZERO, U256::from(100));
        assert!(open.can_unlock_now);
        assert_eq!(open.amount_to_unlock, U256::from(30));

        let partly = unlock_status(&days, U256::from(10), U256::from(20), U256::from(80));
        assert_eq!(partly.amount_to_unlock, U256::from(10));

        let covered = unlock_status(&days, U256::from(10), U256::from(30), U256::from(70));
        assert!(!covered.can_unlock_now);

        let capped = unlock_status(&days, U256::from(10), U256::ZERO, U256::from(5));
        assert_eq!(capped.amount_to_unlock, U256::from(5));

        let early = UnlockSchedule::new(JAN_1 + 30 * DAY, JAN_1 + 40 * DAY, 10).checkpoints(now);
        assert!(!unlock_status(&early, U256::from(10), U256::ZERO, U256::from(100)).can_unlock_now);
    }

    #[test]
    fn only_schedule_vaults_have_a_schedule() {
        let mut vault = Vault {
            id: 9,
            owner: Address::repeat_byte(0x33),
            chain_id: 8453,
            asset: Asset::Native,
            symbol: "ETH".to_string(),
            decimals: NATIVE_DECIMALS,
            amount: U256::from(100),
            unlocked_total: U256::ZERO,
            start_date: JAN_1,
            end_date: JAN_1 + 50 * DAY,
            terms: VaultTerms::Fixed,
            required_slippage: 0,
            title: "drip".to_string(),
            emergency: false,
            next_unlock: None,
        };
        assert!(vault_schedule(&vault, JAN_1).is_none());

        vault.terms = VaultTerms::Schedule {
            every_days: 10,
            amount_per_period: U256::from(10),
        };
        let (days, status) = vault_schedule(&vault, JAN_1 + 25 * DAY).unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0].date, JAN_1 + 10 * DAY);
        assert_eq!(status.amount_to_unlock, U256::from(20));
    }
}
