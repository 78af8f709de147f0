use anchor_lang::prelude::*;

/// Program-wide settings written once by `initialize`.
/// Seeds: [b"config"]
#[account]
#[derive(InitSpace)]
pub struct Config {
    /// The only key allowed to add or modify ranks
    pub admin: Pubkey,

    /// Mint of the token users lock up
    pub value_mint: Pubkey,

    /// Receipt mint issued 1:1 against locked value; `Config` is its authority
    pub receipt_mint: Pubkey,

    /// Token account holding every deposit in custody; owned by `Config`
    pub vault: Pubkey,

    /// Bump seed for PDA derivation
    pub bump: u8,
}

impl Config {
    pub const SEED: &'static [u8] = b"config";
}

/// One tier of the ladder. `id` always equals the rank's index in the table.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, InitSpace)]
pub struct Rank {
    pub id: u8,

    /// Seconds a deposit at this rank stays locked
    pub min_duration: u64,

    /// Cumulative amount that promotes an account to this rank
    pub goal_amount: u64,
}

/// Ordered rank definitions, lowest tier first.
/// Seeds: [b"rank_table"]
#[account]
#[derive(InitSpace)]
pub struct RankTable {
    #[max_len(256)]
    pub ranks: Vec<Rank>,

    pub bump: u8,
}

impl RankTable {
    pub const SEED: &'static [u8] = b"rank_table";
}

/// A single deposit's timelock.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockRecord {
    /// Unix timestamp at which the amount may be swept into `unlocked`
    pub expires_at: i64,
    pub amount: u64,
    pub rank_id: u8,
}

impl LockRecord {
    pub const SIZE: usize = 8 + 8 + 1;
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RankBalance {
    pub locked: u64,
    pub unlocked: u64,
}

impl RankBalance {
    pub const SIZE: usize = 8 + 8;

    pub fn total(&self) -> Option<u64> {
        self.locked.checked_add(self.unlocked)
    }

    pub fn is_empty(&self) -> bool {
        self.locked == 0 && self.unlocked == 0
    }
}

/// PDA holding one account's lock records and per-rank balances.
/// Seeds: [b"ledger", owner_pubkey]
///
/// `locks` is unordered: records are removed with `swap_remove`, so an index
/// is only meaningful until the next removal.
#[account]
pub struct UserLedger {
    /// The wallet that owns this ledger
    pub owner: Pubkey,

    /// Bump seed for PDA derivation
    pub bump: u8,

    /// Indexed by rank id; ranks past the end have a zero balance
    pub balances: Vec<RankBalance>,

    pub locks: Vec<LockRecord>,
}

impl UserLedger {
    pub const SEED: &'static [u8] = b"ledger";

    pub fn space_for(balances: usize, locks: usize) -> usize {
        8 + // discriminator
        32 + // owner
        1 + // bump
        4 + // balances vec len
        balances * RankBalance::SIZE +
        4 + // locks vec len
        locks * LockRecord::SIZE
    }

    /// Account size that fits the ledger after a deposit at `rank_id`.
    /// A deposit appends at most two records: the consolidated lock and the
    /// deposit's own lock.
    pub fn space_after_deposit(&self, rank_id: u8) -> usize {
        let balances = self.balances.len().max(usize::from(rank_id) + 1);
        Self::space_for(balances, self.locks.len() + 2)
    }
}
