use anchor_lang::prelude::*;
use tiered_lock::state::{RankTable, UserLedger};
use tiered_lock::MAX_LOCKS_PER_ACCOUNT;

/// Small deterministic generator so failures replay exactly.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn rank_table() -> RankTable {
    let mut table = RankTable {
        ranks: Vec::new(),
        bump: 255,
    };
    table.add_rank(10, 500).unwrap();
    table.add_rank(40, 2_000).unwrap();
    table.add_rank(90, 8_000).unwrap();
    table.add_rank(200, 30_000).unwrap();
    table
}

fn locked_matches_records(ledger: &UserLedger, ranks: &RankTable) -> bool {
    ledger.balances.len() <= ranks.len()
        && (0..ranks.len() as u8).all(|rank_id| {
            let recorded: u64 = ledger
                .locks
                .iter()
                .filter(|lock| lock.rank_id == rank_id)
                .map(|lock| lock.amount)
                .sum();
            ledger.balance(rank_id).locked == recorded
        })
}

fn run(seed: u64, steps: usize) {
    let table = rank_table();
    let mut ledger = UserLedger::new(Pubkey::new_unique(), 250);
    let mut rng = Lcg(seed);
    let mut now: i64 = 1_700_000_000;
    let mut held: u64 = 0;

    for _ in 0..steps {
        now += rng.below(30) as i64;
        let before = ledger.clone();
        let rank_id = rng.below(table.len() as u64) as u8;

        match rng.below(4) {
            0 | 1 => {
                let amount = 1 + rng.below(3_000);
                let consolidate = rng.below(2) == 0;
                match ledger.deposit(&table, amount, rank_id, consolidate, now) {
                    Ok(_) => held += amount,
                    Err(_) => {
                        assert!(before.lock_count() + 2 > MAX_LOCKS_PER_ACCOUNT);
                        assert_eq!(ledger.locks, before.locks);
                        assert_eq!(ledger.balances, before.balances);
                    }
                }
            }
            2 => {
                let unlocked =
                    ledger.balance(rank_id).unlocked + ledger.peek_expired(rank_id, now).unwrap();
                let amount = if unlocked == 0 { 1 } else { 1 + rng.below(unlocked) };
                match ledger.withdraw(amount, rank_id, now) {
                    Ok(_) => held -= amount,
                    Err(_) => {
                        assert!(amount > unlocked);
                        assert_eq!(ledger.locks, before.locks);
                        assert_eq!(ledger.balances, before.balances);
                    }
                }
            }
            _ => {
                let released = ledger.sweep_expired(now).unwrap();
                let again = ledger.clone();
                assert_eq!(ledger.sweep_expired(now).unwrap(), 0);
                assert_eq!(ledger.balances, again.balances);
                assert_eq!(ledger.locks, again.locks);
                assert_eq!(
                    before.total_value().unwrap(),
                    ledger.total_value().unwrap()
                );
                assert!(released <= before.total_value().unwrap());
            }
        }

        assert_eq!(ledger.total_value().unwrap(), held);
        assert!(locked_matches_records(&ledger, &table));
        assert!(ledger.lock_count() <= MAX_LOCKS_PER_ACCOUNT);
    }
}

#[test]
fn test_random_sequences_conserve_value() {
    for seed in [1, 7, 42, 1_337, 90_210] {
        run(seed, 400);
    }
}

#[test]
fn test_long_sequence_conserves_value() {
    run(3, 2_500);
}

#[test]
fn test_full_cycle_drains_ledger() {
    let table = rank_table();
    let mut ledger = UserLedger::new(Pubkey::new_unique(), 250);

    ledger.deposit(&table, 400, 0, false, 0).unwrap();
    ledger.deposit(&table, 900, 1, true, 5).unwrap();
    ledger.deposit(&table, 8_000, 2, false, 6).unwrap();

    // Reaching rank 2's goal released ranks 0 and 1 immediately
    assert_eq!(ledger.balance(0).locked, 0);
    assert_eq!(ledger.balance(1).locked, 0);
    assert_eq!(ledger.balance(1).unlocked, 1_300);

    ledger.withdraw(1_300, 1, 7).unwrap();
    ledger.withdraw(8_000, 2, 6 + 90).unwrap();

    assert_eq!(ledger.total_value().unwrap(), 0);
    assert!(ledger.is_empty());
}
