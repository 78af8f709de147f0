use anchor_lang::prelude::*;

#[event]
pub struct DepositEvent {
    pub account: Pubkey,
    pub amount: u64,
}

#[event]
pub struct WithdrawEvent {
    pub account: Pubkey,
    pub amount: u64,
}

#[event]
pub struct NewRankEvent {
    pub min_duration: u64,
    pub goal_amount: u64,
    pub id: u8,
}

#[event]
pub struct ModifyRankEvent {
    pub min_duration: u64,
    pub goal_amount: u64,
    pub id: u8,
}

/// A deposit met its rank's goal and released every lower-rank lock.
#[event]
pub struct PromotedEvent {
    pub account: Pubkey,
    pub rank_id: u8,
    pub released: u64,
}

/// A deposit folded lower-rank holdings into its rank.
#[event]
pub struct ConsolidatedEvent {
    pub account: Pubkey,
    pub rank_id: u8,
    pub pulled: u64,
    pub relocked: u64,
    pub spilled: u64,
}

#[event]
pub struct AdminTransferredEvent {
    pub previous: Pubkey,
    pub admin: Pubkey,
}
