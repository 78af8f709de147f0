use anchor_lang::prelude::*;

use crate::errors::TieredLockError;
use crate::state::{Rank, RankTable};
use crate::MAX_RANKS;

impl RankTable {
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Looks up a rank for a deposit, distinguishing an empty table from an
    /// out-of-range id.
    pub fn get(&self, id: u8) -> Result<&Rank> {
        require!(!self.ranks.is_empty(), TieredLockError::NoRanksDefined);
        self.ranks
            .get(usize::from(id))
            .ok_or_else(|| error!(TieredLockError::InvalidRank))
    }

    /// Appends a new highest rank and returns it.
    pub fn add_rank(&mut self, min_duration: u64, goal_amount: u64) -> Result<Rank> {
        require!(self.ranks.len() < MAX_RANKS, TieredLockError::CapacityExceeded);

        if let Some(top) = self.ranks.last() {
            require!(
                goal_amount >= top.goal_amount && min_duration >= top.min_duration,
                TieredLockError::OrderingViolation
            );
        }

        // MAX_RANKS bounds the length, so the id always fits a u8
        let id = u8::try_from(self.ranks.len()).map_err(|_| TieredLockError::CapacityExceeded)?;
        let rank = Rank {
            id,
            min_duration,
            goal_amount,
        };
        self.ranks.push(rank);
        Ok(rank)
    }

    /// Replaces rank `id` in place. Both neighbours are checked, including the
    /// top rank when `id` is the one directly below it.
    pub fn modify_rank(&mut self, id: u8, min_duration: u64, goal_amount: u64) -> Result<Rank> {
        let index = usize::from(id);
        require!(index < self.ranks.len(), TieredLockError::NotFound);

        if index > 0 {
            let prev = &self.ranks[index - 1];
            require!(
                prev.goal_amount <= goal_amount && prev.min_duration <= min_duration,
                TieredLockError::OrderingViolation
            );
        }
        if let Some(next) = self.ranks.get(index + 1) {
            require!(
                goal_amount <= next.goal_amount && min_duration <= next.min_duration,
                TieredLockError::OrderingViolation
            );
        }

        let rank = Rank {
            id,
            min_duration,
            goal_amount,
        };
        self.ranks[index] = rank;
        Ok(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::error::Error;

    fn table(ranks: &[(u64, u64)]) -> RankTable {
        let mut table = RankTable {
            ranks: Vec::new(),
            bump: 255,
        };
        for &(duration, goal) in ranks {
            table.add_rank(duration, goal).unwrap();
        }
        table
    }

    fn assert_fails<T: std::fmt::Debug>(result: Result<T>, expected: TieredLockError) {
        assert_eq!(result.unwrap_err(), Error::from(expected));
    }

    #[test]
    fn test_add_rank_assigns_sequential_ids() {
        let table = table(&[(10, 100), (20, 300), (20, 300)]);
        let ids: Vec<u8> = table.ranks.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(table.ranks[1].goal_amount, 300);
    }

    #[test]
    fn test_add_rank_rejects_smaller_goal() {
        let mut table = table(&[(10, 100)]);
        assert_fails(table.add_rank(10, 99), TieredLockError::OrderingViolation);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_add_rank_rejects_shorter_duration() {
        let mut table = table(&[(10, 100)]);
        assert_fails(table.add_rank(9, 500), TieredLockError::OrderingViolation);
    }

    #[test]
    fn test_add_rank_capacity() {
        let mut table = table(&[]);
        for i in 0..MAX_RANKS as u64 {
            table.add_rank(i, i * 10).unwrap();
        }
        assert_eq!(table.ranks.last().unwrap().id, 255);
        assert_fails(table.add_rank(1_000, 1_000_000), TieredLockError::CapacityExceeded);
        assert_eq!(table.len(), MAX_RANKS);
    }

    #[test]
    fn test_get_empty_and_out_of_range() {
        let empty = table(&[]);
        assert_fails(empty.get(0), TieredLockError::NoRanksDefined);

        let table = table(&[(10, 100)]);
        assert_eq!(table.get(0).unwrap().goal_amount, 100);
        assert_fails(table.get(1), TieredLockError::InvalidRank);
    }

    #[test]
    fn test_modify_rank_not_found() {
        let mut empty = table(&[]);
        assert_fails(empty.modify_rank(0, 1, 1), TieredLockError::NotFound);

        let mut table = table(&[(10, 100)]);
        assert_fails(table.modify_rank(1, 10, 100), TieredLockError::NotFound);
    }

    #[test]
    fn test_modify_rank_within_neighbours() {
        let mut table = table(&[(10, 100), (20, 300), (30, 600)]);
        let rank = table.modify_rank(1, 25, 450).unwrap();
        assert_eq!(rank.id, 1);
        assert_eq!(table.ranks[1], Rank { id: 1, min_duration: 25, goal_amount: 450 });
    }

    #[test]
    fn test_modify_rank_checks_lower_neighbour() {
        let mut table = table(&[(10, 100), (20, 300), (30, 600)]);
        assert_fails(table.modify_rank(1, 20, 99), TieredLockError::OrderingViolation);
        assert_fails(table.modify_rank(1, 9, 300), TieredLockError::OrderingViolation);
        assert_eq!(table.ranks[1].goal_amount, 300);
    }

    #[test]
    fn test_modify_rank_below_top_checks_top() {
        // The rank directly under the top is validated against it too.
        let mut table = table(&[(10, 100), (20, 300), (30, 600)]);
        assert_fails(table.modify_rank(1, 20, 601), TieredLockError::OrderingViolation);
        assert_fails(table.modify_rank(1, 31, 300), TieredLockError::OrderingViolation);
        assert_eq!(table.ranks[1].min_duration, 20);
    }

    #[test]
    fn test_modify_top_rank_has_no_upper_bound() {
        let mut table = table(&[(10, 100), (20, 300)]);
        table.modify_rank(1, 1_000, 1_000_000).unwrap();
        assert_eq!(table.ranks[1].goal_amount, 1_000_000);
    }

    #[test]
    fn test_modify_bottom_rank_has_no_lower_bound() {
        let mut table = table(&[(10, 100), (20, 300)]);
        table.modify_rank(0, 0, 0).unwrap();
        assert_eq!(table.ranks[0], Rank { id: 0, min_duration: 0, goal_amount: 0 });
        assert_fails(table.modify_rank(0, 21, 0), TieredLockError::OrderingViolation);
    }
}
