use anchor_lang::prelude::*;

use crate::errors::TieredLockError;
use crate::state::{LockRecord, RankBalance, UserLedger};
use crate::MAX_LOCKS_PER_ACCOUNT;

impl UserLedger {
    pub fn new(owner: Pubkey, bump: u8) -> Self {
        Self {
            owner,
            bump,
            balances: Vec::new(),
            locks: Vec::new(),
        }
    }

    /// Balance for `rank_id`, zero if the rank was never touched.
    pub fn balance(&self, rank_id: u8) -> RankBalance {
        self.balances
            .get(usize::from(rank_id))
            .copied()
            .unwrap_or_default()
    }

    /// Mutable balance for `rank_id`, growing the table with zero entries.
    pub fn balance_mut(&mut self, rank_id: u8) -> &mut RankBalance {
        let index = usize::from(rank_id);
        if self.balances.len() <= index {
            self.balances.resize(index + 1, RankBalance::default());
        }
        &mut self.balances[index]
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub fn push_lock(&mut self, lock: LockRecord) -> Result<()> {
        require!(
            self.locks.len() < MAX_LOCKS_PER_ACCOUNT,
            TieredLockError::TooManyLocks
        );
        self.locks.push(lock);
        Ok(())
    }

    /// Removes the record at `index` by moving the last record into its slot.
    pub fn remove_lock(&mut self, index: usize) -> Option<LockRecord> {
        (index < self.locks.len()).then(|| self.locks.swap_remove(index))
    }

    /// Amounts of every record matching `pred`, summed per rank in rank order.
    pub(crate) fn tally_locks<F>(&self, pred: F) -> Result<Vec<(u8, u64)>>
    where
        F: Fn(&LockRecord) -> bool,
    {
        let mut tally: Vec<(u8, u64)> = Vec::new();
        for lock in self.locks.iter().filter(|lock| pred(lock)) {
            match tally.binary_search_by_key(&lock.rank_id, |&(rank, _)| rank) {
                Ok(pos) => {
                    tally[pos].1 = tally[pos]
                        .1
                        .checked_add(lock.amount)
                        .ok_or(TieredLockError::ArithmeticOverflow)?;
                }
                Err(pos) => tally.insert(pos, (lock.rank_id, lock.amount)),
            }
        }
        Ok(tally)
    }

    /// Drops every record matching `pred`. Survivors keep no particular order.
    pub(crate) fn drop_locks<F>(&mut self, pred: F)
    where
        F: Fn(&LockRecord) -> bool,
    {
        let mut i = 0;
        while i < self.locks.len() {
            if pred(&self.locks[i]) {
                self.locks.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Checks that each `(rank, amount)` of `tally` can move from `locked` to
    /// `unlocked` and returns the total.
    pub(crate) fn check_release(&self, tally: &[(u8, u64)]) -> Result<u64> {
        tally.iter().try_fold(0u64, |total, &(rank_id, amount)| {
            let balance = self.balance(rank_id);
            require!(
                balance.locked >= amount && balance.unlocked.checked_add(amount).is_some(),
                TieredLockError::ArithmeticOverflow
            );
            total
                .checked_add(amount)
                .ok_or_else(|| error!(TieredLockError::ArithmeticOverflow))
        })
    }

    /// Applies a tally that passed `check_release`.
    pub(crate) fn apply_release(&mut self, tally: &[(u8, u64)]) {
        for &(rank_id, amount) in tally {
            let balance = self.balance_mut(rank_id);
            balance.locked -= amount;
            balance.unlocked += amount;
        }
    }

    /// Sum of locked and unlocked value across every rank.
    pub fn total_value(&self) -> Result<u64> {
        self.balances.iter().try_fold(0u64, |acc, balance| {
            balance
                .total()
                .and_then(|total| acc.checked_add(total))
                .ok_or_else(|| error!(TieredLockError::ArithmeticOverflow))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty() && self.balances.iter().all(RankBalance::is_empty)
    }
}
