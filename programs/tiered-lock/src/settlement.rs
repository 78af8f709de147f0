//! Balance migrations between lock records and rank buckets.
//!
//! Every function here works on a single account's ledger. Each one runs all
//! of its fallible checks before the first write, so an error leaves the
//! ledger as it was.

use anchor_lang::prelude::*;

use crate::errors::TieredLockError;
use crate::state::{LockRecord, UserLedger};
use crate::MAX_LOCKS_PER_ACCOUNT;

/// Result of pulling lower-rank value up into a target rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Consolidation {
    /// Combined locked + unlocked value taken from every lower rank
    pub pulled: u64,
    /// Part of `pulled` re-locked at the target rank
    pub relocked: u64,
    /// Part of `pulled` beyond the shortfall, credited as unlocked
    pub spilled: u64,
}

/// A consolidation worked out against the current ledger but not yet applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ConsolidationPlan {
    pub outcome: Consolidation,
    /// Lower-rank records the consolidation drops
    pub dropped: usize,
}

impl ConsolidationPlan {
    /// Records left once the plan is applied.
    pub fn lock_count_after(&self, current: usize) -> usize {
        current - self.dropped + usize::from(self.outcome.relocked > 0)
    }
}

pub fn expiry_from(now: i64, min_duration: u64) -> Result<i64> {
    i64::try_from(min_duration)
        .ok()
        .and_then(|duration| now.checked_add(duration))
        .ok_or_else(|| error!(TieredLockError::ArithmeticOverflow))
}

impl UserLedger {
    /// Moves every expired record's amount from `locked` to `unlocked` of its
    /// own rank and drops the record. Returns the total released.
    pub fn sweep_expired(&mut self, now: i64) -> Result<u64> {
        let expired = |lock: &LockRecord| lock.expires_at <= now;
        let tally = self.tally_locks(expired)?;
        let released = self.check_release(&tally)?;

        self.drop_locks(expired);
        self.apply_release(&tally);
        Ok(released)
    }

    /// What a sweep would release for `rank_id` at `now`.
    pub fn peek_expired(&self, rank_id: u8, now: i64) -> Result<u64> {
        self.locks
            .iter()
            .filter(|lock| lock.rank_id == rank_id && lock.expires_at <= now)
            .try_fold(0u64, |acc, lock| {
                acc.checked_add(lock.amount)
                    .ok_or_else(|| error!(TieredLockError::ArithmeticOverflow))
            })
    }

    /// Unlocks everything held below `rank_id`, expired or not. Returns the
    /// total released.
    pub(crate) fn promote(&mut self, rank_id: u8) -> Result<u64> {
        let lower = |lock: &LockRecord| lock.rank_id < rank_id;
        let tally = self.tally_locks(lower)?;
        let released = self.check_release(&tally)?;

        self.drop_locks(lower);
        self.apply_release(&tally);
        Ok(released)
    }

    /// Works out how much folding every rank below `rank_id` into it would
    /// move, given a shortfall of `needed`.
    pub(crate) fn plan_consolidation(&self, rank_id: u8, needed: u64) -> Result<ConsolidationPlan> {
        let pulled = self
            .balances
            .iter()
            .take(usize::from(rank_id))
            .try_fold(0u64, |acc, balance| {
                balance.total().and_then(|total| acc.checked_add(total))
            })
            .ok_or(TieredLockError::ArithmeticOverflow)?;
        let dropped = self
            .locks
            .iter()
            .filter(|lock| lock.rank_id < rank_id)
            .count();

        let relocked = pulled.min(needed);
        Ok(ConsolidationPlan {
            outcome: Consolidation {
                pulled,
                relocked,
                spilled: pulled - relocked,
            },
            dropped,
        })
    }

    /// Applies a plan whose slot and overflow checks already passed.
    pub(crate) fn apply_consolidation(
        &mut self,
        rank_id: u8,
        plan: &ConsolidationPlan,
        expires_at: i64,
    ) {
        for balance in self.balances.iter_mut().take(usize::from(rank_id)) {
            *balance = Default::default();
        }
        self.drop_locks(|lock| lock.rank_id < rank_id);

        let Consolidation {
            relocked, spilled, ..
        } = plan.outcome;
        if relocked > 0 {
            self.locks.push(LockRecord {
                expires_at,
                amount: relocked,
                rank_id,
            });
        }
        let target = self.balance_mut(rank_id);
        target.locked += relocked;
        target.unlocked += spilled;
    }

    /// Empties every rank below `rank_id` into it. Up to `needed` is re-locked
    /// until `expires_at`; any excess lands in the target's `unlocked` bucket.
    pub(crate) fn consolidate(
        &mut self,
        rank_id: u8,
        needed: u64,
        expires_at: i64,
    ) -> Result<Consolidation> {
        let plan = self.plan_consolidation(rank_id, needed)?;
        require!(
            plan.lock_count_after(self.locks.len()) <= MAX_LOCKS_PER_ACCOUNT,
            TieredLockError::TooManyLocks
        );
        let target = self.balance(rank_id);
        require!(
            target.locked.checked_add(plan.outcome.relocked).is_some()
                && target.unlocked.checked_add(plan.outcome.spilled).is_some(),
            TieredLockError::ArithmeticOverflow
        );

        self.apply_consolidation(rank_id, &plan, expires_at);
        Ok(plan.outcome)
    }
}
