//! Deposit and withdraw state transitions.
//!
//! Token movement and events live in the instruction handlers; this module
//! only decides how the ledger changes.

use anchor_lang::prelude::*;

use crate::errors::TieredLockError;
use crate::settlement::{expiry_from, Consolidation};
use crate::state::{LockRecord, RankTable, UserLedger};
use crate::MAX_LOCKS_PER_ACCOUNT;

/// What a deposit did to the account's lower ranks before locking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Goal not reached and no consolidation requested
    Held,
    /// Goal reached: every lower-rank lock was released
    Promoted { released: u64 },
    /// Goal not reached: lower ranks were pulled up into this one
    Consolidated(Consolidation),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub expires_at: i64,
    pub settlement: Settlement,
}

impl UserLedger {
    /// Locks `amount` at `rank_id` until `now + min_duration`.
    ///
    /// If the rank's balance plus `amount` meets the goal, everything below
    /// the rank is unlocked first. Otherwise, with `consolidate` set, lower
    /// ranks are folded into this one.
    pub fn deposit(
        &mut self,
        ranks: &RankTable,
        amount: u64,
        rank_id: u8,
        consolidate: bool,
        now: i64,
    ) -> Result<DepositReceipt> {
        require!(amount > 0, TieredLockError::InvalidAmount);
        require!(
            self.locks.len() < MAX_LOCKS_PER_ACCOUNT,
            TieredLockError::TooManyLocks
        );
        let rank = *ranks.get(rank_id)?;
        let expires_at = expiry_from(now, rank.min_duration)?;

        let current = self.balance(rank_id);
        let projected = current
            .total()
            .and_then(|total| total.checked_add(amount))
            .ok_or(TieredLockError::ArithmeticOverflow)?;
        let locked = current
            .locked
            .checked_add(amount)
            .ok_or(TieredLockError::ArithmeticOverflow)?;

        // Promotion only drops records and never touches `rank_id` itself, so
        // the slot and balance checks above still hold once it returns.
        let settlement = if projected >= rank.goal_amount {
            Settlement::Promoted {
                released: self.promote(rank_id)?,
            }
        } else if consolidate {
            let plan = self.plan_consolidation(rank_id, rank.goal_amount - projected)?;
            require!(
                plan.lock_count_after(self.locks.len()) < MAX_LOCKS_PER_ACCOUNT,
                TieredLockError::TooManyLocks
            );
            require!(
                locked.checked_add(plan.outcome.relocked).is_some()
                    && current.unlocked.checked_add(plan.outcome.spilled).is_some(),
                TieredLockError::ArithmeticOverflow
            );
            self.apply_consolidation(rank_id, &plan, expires_at);
            Settlement::Consolidated(plan.outcome)
        } else {
            Settlement::Held
        };

        self.locks.push(LockRecord {
            expires_at,
            amount,
            rank_id,
        });
        self.balance_mut(rank_id).locked += amount;

        Ok(DepositReceipt {
            expires_at,
            settlement,
        })
    }

    /// Sweeps expired locks, then takes `amount` out of the rank's unlocked
    /// bucket. Returns how much the sweep released.
    pub fn withdraw(&mut self, amount: u64, rank_id: u8, now: i64) -> Result<u64> {
        require!(amount > 0, TieredLockError::InvalidAmount);

        let expired = |lock: &LockRecord| lock.expires_at <= now;
        let tally = self.tally_locks(expired)?;
        let swept = self.check_release(&tally)?;
        let freed = tally
            .iter()
            .find(|&&(rank, _)| rank == rank_id)
            .map_or(0, |&(_, freed)| freed);
        let unlocked = self
            .balance(rank_id)
            .unlocked
            .checked_add(freed)
            .ok_or(TieredLockError::ArithmeticOverflow)?;
        require!(unlocked >= amount, TieredLockError::InsufficientUnlocked);

        self.drop_locks(expired);
        self.apply_release(&tally);
        self.balance_mut(rank_id).unlocked = unlocked - amount;
        Ok(swept)
    }
}
