use anchor_lang::prelude::*;

#[error_code]
pub enum TieredLockError {
    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    #[msg("Rank id is beyond the rank table")]
    InvalidRank,

    #[msg("No ranks have been defined yet")]
    NoRanksDefined,

    #[msg("Rank table is full (256 ranks)")]
    CapacityExceeded,

    #[msg("Account already holds the maximum number of lock records")]
    TooManyLocks,

    #[msg("Rank goal and duration must not decrease from one rank to the next")]
    OrderingViolation,

    #[msg("Rank not found")]
    NotFound,

    #[msg("Unlocked balance is smaller than the requested amount")]
    InsufficientUnlocked,

    #[msg("Arithmetic overflow or underflow in ledger accounting")]
    ArithmeticOverflow,

    #[msg("Signer is not the rank administrator")]
    Unauthorized,

    #[msg("Ledger still holds locks or balances")]
    LedgerNotEmpty,
}
