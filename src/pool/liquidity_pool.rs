//! Unified liquidity pool.
//!
//! The pool custodies staked capital and underwrites every bet placed through an
//! approved game. Funds only move through the [`TokenLedger`] capability, and the
//! pool keeps a mirror of its own balance split into:
//!
//! - `escrowed`: stakes of bets that are still open
//! - `assets`: `balance - escrowed`, the capital stakers have a claim on
//! - `reserved`: the largest net win each open bet could still be paid
//!
//! `reserved <= assets` holds after every operation, so a winning bet can always
//! be paid in full.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::config::PoolParams;
use crate::core::context::CallContext;
use crate::core::token::{TokenAmount, TokenLedger};
use crate::error::{Error, Result};
use crate::pool::registry::{ApprovalChange, GameRegistry, GameStatus};
use crate::pool::shares::ShareLedger;
use crate::utils::crypto::{Address, Hash};
use crate::utils::math::{apply_bps, safe_add, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// ESCROW
// ═══════════════════════════════════════════════════════════════════════════════

/// Stake held for an open bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    /// Stake pulled from the player
    pub stake: TokenAmount,
    /// Net win reserved against pool assets
    pub max_win: TokenAmount,
    /// Escrow time
    pub escrowed_at: u64,
}

/// Result of settling an escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Stake that was escrowed
    pub stake: TokenAmount,
    /// Amount paid to the player (`stake + delta`)
    pub payout: TokenAmount,
    /// Signed result relative to the stake
    pub delta: i128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDITY POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// The pool that backs every game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityPool {
    address: Address,
    admin: Address,
    exposure_cap_bps: u128,
    registry: GameRegistry,
    shares: ShareLedger,
    balance: TokenAmount,
    escrowed: TokenAmount,
    reserved: TokenAmount,
    escrows: HashMap<(Address, Address), Escrow>,
    total_bets: u64,
    total_paid_out: TokenAmount,
    total_collected: TokenAmount,
}

impl LiquidityPool {
    /// Create a new pool
    pub fn new(address: Address, admin: Address, params: &PoolParams) -> Self {
        Self {
            address,
            admin,
            exposure_cap_bps: params.exposure_cap_bps,
            registry: GameRegistry::new(params.game_approval_cooldown_secs),
            shares: ShareLedger::new(),
            balance: TokenAmount::ZERO,
            escrowed: TokenAmount::ZERO,
            reserved: TokenAmount::ZERO,
            escrows: HashMap::new(),
            total_bets: 0,
            total_paid_out: TokenAmount::ZERO,
            total_collected: TokenAmount::ZERO,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STAKING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pull `amount` from the caller (pool as spender) and mint shares
    pub fn stake<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        ctx: &CallContext,
        amount: TokenAmount,
    ) -> Result<u128> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let assets = self.assets();
        let minted = self.shares.shares_for_deposit(amount, assets)?;
        let new_balance = safe_add(self.balance.base(), amount.base())?;

        ledger.transfer_from(self.address, ctx.caller, self.address, amount)?;

        self.balance = TokenAmount::from_base(new_balance);
        self.write_off_worthless_shares(assets);
        self.shares.mint(ctx.caller, minted)?;

        info!(staker = %ctx.caller, amount = %amount, shares = minted, "Stake deposited");
        Ok(minted)
    }

    /// Burn shares worth `amount` (rounded up) and pay the caller
    pub fn unstake<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        ctx: &CallContext,
        amount: TokenAmount,
    ) -> Result<u128> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let assets = self.assets();
        let claim = self.shares.claim_of(&ctx.caller, assets)?;
        if amount > claim {
            return Err(Error::OverWithdrawal {
                requested: amount.base(),
                claim: claim.base(),
            });
        }
        let free = self.free_liquidity();
        if amount > free {
            return Err(Error::InsufficientLiquidity {
                required: amount.base(),
                available: free.base(),
            });
        }
        let burned = self.shares.shares_for_withdrawal(&ctx.caller, amount, assets)?;
        let new_balance = safe_sub(self.balance.base(), amount.base())?;

        ledger.transfer(self.address, ctx.caller, amount)?;

        self.balance = TokenAmount::from_base(new_balance);
        self.shares.burn(&ctx.caller, burned)?;

        info!(staker = %ctx.caller, amount = %amount, shares = burned, "Stake withdrawn");
        Ok(burned)
    }

    /// Donate capital from the caller into the house reserve
    pub fn fund<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        ctx: &CallContext,
        amount: TokenAmount,
    ) -> Result<u128> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let assets = self.assets();
        let minted = self.shares.shares_for_deposit(amount, assets)?;
        let new_balance = safe_add(self.balance.base(), amount.base())?;

        ledger.transfer(ctx.caller, self.address, amount)?;

        self.balance = TokenAmount::from_base(new_balance);
        self.write_off_worthless_shares(assets);
        self.shares.mint(self.address, minted)?;

        info!(funder = %ctx.caller, amount = %amount, "House reserve funded");
        Ok(minted)
    }

    fn write_off_worthless_shares(&mut self, assets: TokenAmount) {
        let cleared = self.shares.clear_worthless(assets);
        if cleared > 0 {
            warn!(shares = cleared, "Pool assets exhausted, share ledger reset");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GAME AUTHORIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start the approval cooldown for `game` (any caller)
    pub fn register_game_for_approval(&mut self, ctx: &CallContext, game: Address) -> Result<GameStatus> {
        let status = self.registry.register(game, ctx.timestamp)?;
        info!(%game, by = %ctx.caller, "Game registered for approval");
        Ok(status)
    }

    /// Approve or revoke `game` (admin only)
    pub fn set_game_approval(
        &mut self,
        ctx: &CallContext,
        game: Address,
        approved: bool,
    ) -> Result<ApprovalChange> {
        if ctx.caller != self.admin {
            return Err(Error::Unauthorized("only the pool admin may approve games".into()));
        }
        let change = self.registry.set_approval(game, approved, ctx.timestamp)?;
        if let ApprovalChange::Changed(status) = change {
            info!(%game, %status, "Game approval changed");
        }
        Ok(change)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BET FUNDS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pull `stake` from `player` (game as spender) and reserve `max_win`
    pub fn escrow_bet<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        game: Address,
        player: Address,
        stake: TokenAmount,
        max_win: TokenAmount,
        now: u64,
    ) -> Result<()> {
        if !self.registry.is_approved(&game) {
            return Err(Error::Unauthorized(format!("game {} is not approved", game)));
        }
        if stake.is_zero() {
            return Err(Error::ZeroAmount);
        }
        if self.escrows.contains_key(&(game, player)) {
            return Err(Error::AlreadyBetted(player.to_hex()));
        }
        let free = self.free_liquidity();
        if max_win > free {
            return Err(Error::InsufficientLiquidity {
                required: max_win.base(),
                available: free.base(),
            });
        }
        let new_balance = safe_add(self.balance.base(), stake.base())?;
        let new_escrowed = safe_add(self.escrowed.base(), stake.base())?;
        let new_reserved = safe_add(self.reserved.base(), max_win.base())?;

        ledger.transfer_from(game, player, self.address, stake)?;

        self.balance = TokenAmount::from_base(new_balance);
        self.escrowed = TokenAmount::from_base(new_escrowed);
        self.reserved = TokenAmount::from_base(new_reserved);
        self.escrows.insert(
            (game, player),
            Escrow {
                stake,
                max_win,
                escrowed_at: now,
            },
        );
        self.total_bets += 1;

        debug!(%game, %player, stake = %stake, max_win = %max_win, "Stake escrowed");
        Ok(())
    }

    /// Pay `stake + delta` to `player` and close the escrow (approved games only)
    pub fn settle<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        game: Address,
        player: Address,
        delta: i128,
    ) -> Result<Settlement> {
        if !self.registry.is_approved(&game) {
            return Err(Error::Unauthorized(format!("game {} is not approved", game)));
        }
        let escrow = self
            .escrows
            .get(&(game, player))
            .copied()
            .ok_or_else(|| Error::NoActiveBet(player.to_hex()))?;

        let stake = to_signed(escrow.stake)?;
        let max_win = to_signed(escrow.max_win)?;
        if delta < -stake || delta > max_win {
            return Err(Error::InvalidParameter {
                name: "delta".into(),
                reason: format!("{} outside [-{}, {}]", delta, stake, max_win),
            });
        }
        let payout = TokenAmount::from_base((stake + delta) as u128);

        let new_balance = safe_sub(self.balance.base(), payout.base())?;
        let new_escrowed = safe_sub(self.escrowed.base(), escrow.stake.base())?;
        let new_reserved = safe_sub(self.reserved.base(), escrow.max_win.base())?;

        if !payout.is_zero() {
            ledger.transfer(self.address, player, payout)?;
        }

        self.balance = TokenAmount::from_base(new_balance);
        self.escrowed = TokenAmount::from_base(new_escrowed);
        self.reserved = TokenAmount::from_base(new_reserved);
        self.escrows.remove(&(game, player));

        if delta >= 0 {
            self.total_paid_out = self.total_paid_out.saturating_add(TokenAmount::from_base(delta as u128));
        } else {
            self.total_collected = self
                .total_collected
                .saturating_add(TokenAmount::from_base(delta.unsigned_abs()));
        }

        info!(%game, %player, delta, payout = %payout, "Bet settled");
        Ok(Settlement {
            stake: escrow.stake,
            payout,
            delta,
        })
    }

    /// Return an escrowed stake untouched (administrative recovery)
    pub fn refund_escrow<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        game: Address,
        player: Address,
    ) -> Result<TokenAmount> {
        let escrow = self
            .escrows
            .get(&(game, player))
            .copied()
            .ok_or_else(|| Error::NoActiveBet(player.to_hex()))?;

        let new_balance = safe_sub(self.balance.base(), escrow.stake.base())?;
        let new_escrowed = safe_sub(self.escrowed.base(), escrow.stake.base())?;
        let new_reserved = safe_sub(self.reserved.base(), escrow.max_win.base())?;

        ledger.transfer(self.address, player, escrow.stake)?;

        self.balance = TokenAmount::from_base(new_balance);
        self.escrowed = TokenAmount::from_base(new_escrowed);
        self.reserved = TokenAmount::from_base(new_reserved);
        self.escrows.remove(&(game, player));

        info!(%game, %player, stake = %escrow.stake, "Escrow refunded");
        Ok(escrow.stake)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pool address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Administrative identity
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Total tokens held by the pool
    pub fn balance(&self) -> TokenAmount {
        self.balance
    }

    /// Stakes of open bets
    pub fn escrowed(&self) -> TokenAmount {
        self.escrowed
    }

    /// Net wins reserved for open bets
    pub fn reserved(&self) -> TokenAmount {
        self.reserved
    }

    /// Capital stakers have a claim on
    pub fn assets(&self) -> TokenAmount {
        self.balance.saturating_sub(self.escrowed)
    }

    /// Assets not reserved for open bets
    pub fn free_liquidity(&self) -> TokenAmount {
        self.assets().saturating_sub(self.reserved)
    }

    /// Largest stake a single bet may have
    pub fn exposure_cap(&self) -> TokenAmount {
        // bps <= 10_000 keeps the product below the balance, which cannot overflow
        apply_bps(self.balance.base(), self.exposure_cap_bps)
            .map(TokenAmount::from_base)
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Current claim of `staker`
    pub fn claim_of(&self, staker: &Address) -> Result<TokenAmount> {
        self.shares.claim_of(staker, self.assets())
    }

    /// Shares held by `staker`
    pub fn shares_of(&self, staker: &Address) -> u128 {
        self.shares.shares_of(staker)
    }

    /// Share ledger
    pub fn shares(&self) -> &ShareLedger {
        &self.shares
    }

    /// Authorization status of `game`
    pub fn game_status(&self, game: &Address) -> GameStatus {
        self.registry.status(game)
    }

    /// Game registry
    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// Open escrow of `player` in `game`
    pub fn escrow_of(&self, game: &Address, player: &Address) -> Option<&Escrow> {
        self.escrows.get(&(*game, *player))
    }

    /// Check the pool's accounting against the token ledger
    pub fn verify_solvency<L: TokenLedger>(&self, ledger: &L) -> Result<()> {
        let on_ledger = ledger.balance_of(&self.address);
        if on_ledger < self.balance {
            return Err(Error::InvariantViolation(format!(
                "ledger holds {} but pool accounts for {}",
                on_ledger, self.balance
            )));
        }
        if self.escrowed > self.balance {
            return Err(Error::InvariantViolation(format!(
                "escrowed {} exceeds balance {}",
                self.escrowed, self.balance
            )));
        }
        if self.reserved > self.assets() {
            return Err(Error::InvariantViolation(format!(
                "reserved {} exceeds assets {}",
                self.reserved,
                self.assets()
            )));
        }
        let escrow_sum = self
            .escrows
            .values()
            .try_fold(0u128, |acc, e| acc.checked_add(e.stake.base()));
        if escrow_sum != Some(self.escrowed.base()) {
            return Err(Error::InvariantViolation("escrow total mismatch".into()));
        }
        Ok(())
    }

    /// Get pool statistics
    pub fn statistics(&self) -> PoolStats {
        PoolStats {
            balance: self.balance,
            escrowed: self.escrowed,
            reserved: self.reserved,
            assets: self.assets(),
            free_liquidity: self.free_liquidity(),
            exposure_cap: self.exposure_cap(),
            total_shares: self.shares.total_shares(),
            staker_count: self.shares.holder_count() as u64,
            open_bets: self.escrows.len() as u64,
            approved_games: self.registry.approved_games().len() as u64,
            total_bets: self.total_bets,
            total_paid_out: self.total_paid_out,
            total_collected: self.total_collected,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Compute state hash
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();
        data.extend_from_slice(self.address.as_bytes());
        data.extend_from_slice(&self.balance.base().to_be_bytes());
        data.extend_from_slice(&self.escrowed.base().to_be_bytes());
        data.extend_from_slice(&self.reserved.base().to_be_bytes());
        data.extend_from_slice(&self.shares.total_shares().to_be_bytes());

        let mut holders: Vec<_> = self.shares.iter().collect();
        holders.sort_by_key(|(a, _)| **a);
        for (holder, shares) in holders {
            data.extend_from_slice(holder.as_bytes());
            data.extend_from_slice(&shares.to_be_bytes());
        }
        Hash::sha256(&data)
    }
}

fn to_signed(amount: TokenAmount) -> Result<i128> {
    i128::try_from(amount.base()).map_err(|_| Error::Overflow {
        operation: "amount to signed".into(),
    })
}

/// Liquidity pool statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub balance: TokenAmount,
    pub escrowed: TokenAmount,
    pub reserved: TokenAmount,
    pub assets: TokenAmount,
    pub free_liquidity: TokenAmount,
    pub exposure_cap: TokenAmount,
    pub total_shares: u128,
    pub staker_count: u64,
    pub open_bets: u64,
    pub approved_games: u64,
    pub total_bets: u64,
    pub total_paid_out: TokenAmount,
    pub total_collected: TokenAmount,
}
