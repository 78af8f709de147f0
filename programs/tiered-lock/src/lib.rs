use anchor_lang::prelude::*;
use anchor_spl::token::{self, Burn, Mint, MintTo, Token, TokenAccount, TransferChecked};

pub mod errors;
pub mod events;
pub mod ledger;
pub mod ranks;
pub mod settlement;
pub mod state;
pub mod vault;

use errors::TieredLockError;
use events::*;
use state::{Config, RankTable, UserLedger};
use vault::Settlement;

declare_id!("8S5FvC4GrsmftQzaTWdiiZtm61zDih7W5x3ymn67tpwd");

/// Rank ids are a u8, so the table holds at most 256 ranks
pub const MAX_RANKS: usize = 256;

/// Bounds per-account storage and the cost of a sweep
pub const MAX_LOCKS_PER_ACCOUNT: usize = 600;

pub const VAULT_SEED: &[u8] = b"vault";
pub const RECEIPT_MINT_SEED: &[u8] = b"receipt_mint";

#[program]
pub mod tiered_lock {
    use super::*;

    /// Create the program config, an empty rank table, the custody vault for
    /// `value_mint` and the receipt mint. `Config` is the authority of both
    /// token accounts it creates.
    pub fn initialize(ctx: Context<Initialize>, admin: Pubkey) -> Result<()> {
        ctx.accounts.config.set_inner(Config {
            admin,
            value_mint: ctx.accounts.value_mint.key(),
            receipt_mint: ctx.accounts.receipt_mint.key(),
            vault: ctx.accounts.vault.key(),
            bump: ctx.bumps.config,
        });
        ctx.accounts.rank_table.set_inner(RankTable {
            ranks: Vec::new(),
            bump: ctx.bumps.rank_table,
        });

        msg!(
            "Tiered Lock: initialized for mint {} with admin {}",
            ctx.accounts.value_mint.key(),
            admin
        );

        Ok(())
    }

    /// Hand the rank administration role to another key.
    pub fn transfer_admin(ctx: Context<TransferAdmin>, new_admin: Pubkey) -> Result<()> {
        let config = &mut ctx.accounts.config;
        let previous = config.admin;
        config.admin = new_admin;

        emit!(AdminTransferredEvent {
            previous,
            admin: new_admin,
        });
        msg!("Tiered Lock: admin moved from {} to {}", previous, new_admin);

        Ok(())
    }

    /// Append a new highest rank.
    pub fn add_rank(ctx: Context<ManageRanks>, min_duration: u64, goal_amount: u64) -> Result<()> {
        let rank = ctx.accounts.rank_table.add_rank(min_duration, goal_amount)?;

        emit!(NewRankEvent {
            min_duration: rank.min_duration,
            goal_amount: rank.goal_amount,
            id: rank.id,
        });
        msg!(
            "Tiered Lock: rank {} added (duration {}s, goal {})",
            rank.id,
            rank.min_duration,
            rank.goal_amount
        );

        Ok(())
    }

    /// Change an existing rank without breaking ordering against its neighbours.
    pub fn modify_rank(
        ctx: Context<ManageRanks>,
        id: u8,
        min_duration: u64,
        goal_amount: u64,
    ) -> Result<()> {
        let rank = ctx
            .accounts
            .rank_table
            .modify_rank(id, min_duration, goal_amount)?;

        emit!(ModifyRankEvent {
            min_duration: rank.min_duration,
            goal_amount: rank.goal_amount,
            id: rank.id,
        });
        msg!(
            "Tiered Lock: rank {} modified (duration {}s, goal {})",
            rank.id,
            rank.min_duration,
            rank.goal_amount
        );

        Ok(())
    }

    /// Create the caller's empty ledger PDA.
    pub fn open_ledger(ctx: Context<OpenLedger>) -> Result<()> {
        let owner = ctx.accounts.user.key();
        ctx.accounts
            .user_ledger
            .set_inner(UserLedger::new(owner, ctx.bumps.user_ledger));

        msg!("Tiered Lock: ledger opened for {}", owner);

        Ok(())
    }

    /// Lock `amount` at `rank_id`, settling lower ranks first (promotion when
    /// the goal is met, consolidation when requested and it is not), then
    /// take the tokens into custody and mint receipts 1:1.
    pub fn deposit(
        ctx: Context<Deposit>,
        amount: u64,
        rank_id: u8,
        consolidate: bool,
    ) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let user = ctx.accounts.user.key();

        let receipt = ctx.accounts.user_ledger.deposit(
            &ctx.accounts.rank_table,
            amount,
            rank_id,
            consolidate,
            now,
        )?;

        token::transfer_checked(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                TransferChecked {
                    from: ctx.accounts.user_value_account.to_account_info(),
                    mint: ctx.accounts.value_mint.to_account_info(),
                    to: ctx.accounts.vault.to_account_info(),
                    authority: ctx.accounts.user.to_account_info(),
                },
            ),
            amount,
            ctx.accounts.value_mint.decimals,
        )?;

        let bump = [ctx.accounts.config.bump];
        let seeds: &[&[u8]] = &[Config::SEED, &bump];
        token::mint_to(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                MintTo {
                    mint: ctx.accounts.receipt_mint.to_account_info(),
                    to: ctx.accounts.user_receipt_account.to_account_info(),
                    authority: ctx.accounts.config.to_account_info(),
                },
                &[seeds],
            ),
            amount,
        )?;

        match receipt.settlement {
            Settlement::Promoted { released } => emit!(PromotedEvent {
                account: user,
                rank_id,
                released,
            }),
            Settlement::Consolidated(c) => emit!(ConsolidatedEvent {
                account: user,
                rank_id,
                pulled: c.pulled,
                relocked: c.relocked,
                spilled: c.spilled,
            }),
            Settlement::Held => {}
        }
        emit!(DepositEvent {
            account: user,
            amount,
        });
        msg!(
            "Tiered Lock: {} deposited {} at rank {} until {}",
            user,
            amount,
            rank_id,
            receipt.expires_at
        );

        Ok(())
    }

    /// Sweep expired locks, then burn receipts and return `amount` of the
    /// rank's unlocked balance.
    pub fn withdraw(ctx: Context<Withdraw>, amount: u64, rank_id: u8) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let user = ctx.accounts.user.key();

        let swept = ctx.accounts.user_ledger.withdraw(amount, rank_id, now)?;

        token::burn(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                Burn {
                    mint: ctx.accounts.receipt_mint.to_account_info(),
                    from: ctx.accounts.user_receipt_account.to_account_info(),
                    authority: ctx.accounts.user.to_account_info(),
                },
            ),
            amount,
        )?;

        let bump = [ctx.accounts.config.bump];
        let seeds: &[&[u8]] = &[Config::SEED, &bump];
        token::transfer_checked(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                TransferChecked {
                    from: ctx.accounts.vault.to_account_info(),
                    mint: ctx.accounts.value_mint.to_account_info(),
                    to: ctx.accounts.user_value_account.to_account_info(),
                    authority: ctx.accounts.config.to_account_info(),
                },
                &[seeds],
            ),
            amount,
            ctx.accounts.value_mint.decimals,
        )?;

        emit!(WithdrawEvent {
            account: user,
            amount,
        });
        msg!(
            "Tiered Lock: {} withdrew {} from rank {} ({} swept)",
            user,
            amount,
            rank_id,
            swept
        );

        Ok(())
    }

    /// Move every expired lock of the caller into its rank's unlocked bucket.
    /// Returns the amount released.
    pub fn sweep_expired(ctx: Context<SweepExpired>) -> Result<u64> {
        let now = Clock::get()?.unix_timestamp;
        let released = ctx.accounts.user_ledger.sweep_expired(now)?;

        msg!(
            "Tiered Lock: swept {} for {}",
            released,
            ctx.accounts.user.key()
        );

        Ok(released)
    }

    /// Preview what a sweep would release for `rank_id` right now.
    pub fn peek_expired(ctx: Context<PeekExpired>, rank_id: u8) -> Result<u64> {
        let now = Clock::get()?.unix_timestamp;
        ctx.accounts.user_ledger.peek_expired(rank_id, now)
    }

    /// Close an empty ledger, reclaiming the rent.
    pub fn close_ledger(ctx: Context<CloseLedger>) -> Result<()> {
        require!(
            ctx.accounts.user_ledger.is_empty(),
            TieredLockError::LedgerNotEmpty
        );

        msg!(
            "Tiered Lock: ledger closed for {}",
            ctx.accounts.user_ledger.owner
        );

        Ok(())
    }
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,

    #[account(
        init,
        payer = payer,
        space = 8 + Config::INIT_SPACE,
        seeds = [Config::SEED],
        bump,
    )]
    pub config: Account<'info, Config>,

    #[account(
        init,
        payer = payer,
        space = 8 + RankTable::INIT_SPACE,
        seeds = [RankTable::SEED],
        bump,
    )]
    pub rank_table: Account<'info, RankTable>,

    pub value_mint: Account<'info, Mint>,

    #[account(
        init,
        payer = payer,
        seeds = [VAULT_SEED],
        bump,
        token::mint = value_mint,
        token::authority = config,
    )]
    pub vault: Account<'info, TokenAccount>,

    #[account(
        init,
        payer = payer,
        seeds = [RECEIPT_MINT_SEED],
        bump,
        mint::decimals = value_mint.decimals,
        mint::authority = config,
    )]
    pub receipt_mint: Account<'info, Mint>,

    /// `payer` must be this program's upgrade authority.
    #[account(constraint = program.programdata_address()? == Some(program_data.key()))]
    pub program: Program<'info, crate::program::TieredLock>,

    #[account(
        constraint = program_data.upgrade_authority_address == Some(payer.key())
            @ TieredLockError::Unauthorized,
    )]
    pub program_data: Account<'info, ProgramData>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct TransferAdmin<'info> {
    pub admin: Signer<'info>,

    #[account(
        mut,
        seeds = [Config::SEED],
        bump = config.bump,
        has_one = admin @ TieredLockError::Unauthorized,
    )]
    pub config: Account<'info, Config>,
}

#[derive(Accounts)]
pub struct ManageRanks<'info> {
    pub admin: Signer<'info>,

    #[account(
        seeds = [Config::SEED],
        bump = config.bump,
        has_one = admin @ TieredLockError::Unauthorized,
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [RankTable::SEED],
        bump = rank_table.bump,
    )]
    pub rank_table: Account<'info, RankTable>,
}

#[derive(Accounts)]
pub struct OpenLedger<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        init,
        payer = user,
        space = UserLedger::space_for(0, 0),
        seeds = [UserLedger::SEED, user.key().as_ref()],
        bump,
    )]
    pub user_ledger: Account<'info, UserLedger>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(amount: u64, rank_id: u8)]
pub struct Deposit<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        seeds = [Config::SEED],
        bump = config.bump,
        has_one = value_mint,
        has_one = vault,
        has_one = receipt_mint,
    )]
    pub config: Account<'info, Config>,

    /// Read-only here, so rank edits cannot interleave with a deposit
    #[account(
        seeds = [RankTable::SEED],
        bump = rank_table.bump,
    )]
    pub rank_table: Account<'info, RankTable>,

    #[account(
        mut,
        seeds = [UserLedger::SEED, user.key().as_ref()],
        bump = user_ledger.bump,
        realloc = user_ledger.space_after_deposit(rank_id),
        realloc::payer = user,
        realloc::zero = false,
    )]
    pub user_ledger: Account<'info, UserLedger>,

    pub value_mint: Account<'info, Mint>,

    #[account(
        mut,
        token::mint = value_mint,
        token::authority = user,
    )]
    pub user_value_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub receipt_mint: Account<'info, Mint>,

    #[account(
        mut,
        token::mint = receipt_mint,
        token::authority = user,
    )]
    pub user_receipt_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct Withdraw<'info> {
    pub user: Signer<'info>,

    #[account(
        seeds = [Config::SEED],
        bump = config.bump,
        has_one = value_mint,
        has_one = vault,
        has_one = receipt_mint,
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [UserLedger::SEED, user.key().as_ref()],
        bump = user_ledger.bump,
    )]
    pub user_ledger: Account<'info, UserLedger>,

    pub value_mint: Account<'info, Mint>,

    #[account(
        mut,
        token::mint = value_mint,
        token::authority = user,
    )]
    pub user_value_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub receipt_mint: Account<'info, Mint>,

    #[account(
        mut,
        token::mint = receipt_mint,
        token::authority = user,
    )]
    pub user_receipt_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct SweepExpired<'info> {
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [UserLedger::SEED, user.key().as_ref()],
        bump = user_ledger.bump,
    )]
    pub user_ledger: Account<'info, UserLedger>,
}

#[derive(Accounts)]
pub struct PeekExpired<'info> {
    #[account(
        seeds = [UserLedger::SEED, user_ledger.owner.as_ref()],
        bump = user_ledger.bump,
    )]
    pub user_ledger: Account<'info, UserLedger>,
}

#[derive(Accounts)]
pub struct CloseLedger<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        mut,
        close = user,
        seeds = [UserLedger::SEED, user_ledger.owner.as_ref()],
        bump = user_ledger.bump,
        constraint = user_ledger.owner == user.key(),
    )]
    pub user_ledger: Account<'info, UserLedger>,
}
