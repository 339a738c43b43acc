//! Proportional share accounting for pool stakers.
//!
//! Shares are internal bookkeeping, not a transferable token. A holder's claim is
//! `shares * assets / total_shares`, so every holder gains or loses in proportion
//! when bets settle against the pool.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::token::TokenAmount;
use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::{mul_div, mul_div_up, safe_add, safe_sub};

/// Share balances of every staker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareLedger {
    total_shares: u128,
    holders: HashMap<Address, u128>,
}

impl ShareLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Total shares outstanding
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Shares held by `holder`
    pub fn shares_of(&self, holder: &Address) -> u128 {
        self.holders.get(holder).copied().unwrap_or(0)
    }

    /// Number of holders with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }

    /// Iterate over (holder, shares)
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.holders.iter()
    }

    /// Current claim of `holder` on `assets`
    pub fn claim_of(&self, holder: &Address, assets: TokenAmount) -> Result<TokenAmount> {
        let shares = self.shares_of(holder);
        if shares == 0 || self.total_shares == 0 {
            return Ok(TokenAmount::ZERO);
        }
        mul_div(shares, assets.base(), self.total_shares).map(TokenAmount::from_base)
    }

    /// Shares minted for depositing `amount` into a pool holding `assets`
    ///
    /// The first deposit mints 1:1, as does any deposit into a pool whose assets
    /// were paid out entirely (see [`ShareLedger::clear_worthless`]). Later
    /// deposits round down.
    pub fn shares_for_deposit(&self, amount: TokenAmount, assets: TokenAmount) -> Result<u128> {
        if self.total_shares == 0 || assets.is_zero() {
            return Ok(amount.base());
        }
        let shares = mul_div(amount.base(), self.total_shares, assets.base())?;
        if shares == 0 {
            return Err(Error::InvalidParameter {
                name: "amount".into(),
                reason: "too small to mint a share".into(),
            });
        }
        Ok(shares)
    }

    /// Shares burned for withdrawing `amount` from a pool holding `assets`
    ///
    /// Rounds up so that withdrawals never dilute the remaining holders.
    pub fn shares_for_withdrawal(
        &self,
        holder: &Address,
        amount: TokenAmount,
        assets: TokenAmount,
    ) -> Result<u128> {
        if assets.is_zero() {
            return Err(Error::InvariantViolation("withdrawal from an empty pool".into()));
        }
        let shares = mul_div_up(amount.base(), self.total_shares, assets.base())?;
        Ok(shares.min(self.shares_of(holder)))
    }

    /// Credit `shares` to `holder`
    pub fn mint(&mut self, holder: Address, shares: u128) -> Result<()> {
        let total = safe_add(self.total_shares, shares)?;
        let balance = safe_add(self.shares_of(&holder), shares)?;
        self.total_shares = total;
        self.holders.insert(holder, balance);
        Ok(())
    }

    /// Drop every holder when `assets` is zero
    ///
    /// Shares outstanding against an empty pool have no claim left. Returns the
    /// number of shares written off.
    pub fn clear_worthless(&mut self, assets: TokenAmount) -> u128 {
        if !assets.is_zero() || self.total_shares == 0 {
            return 0;
        }
        let cleared = self.total_shares;
        self.total_shares = 0;
        self.holders.clear();
        cleared
    }

    /// Remove `shares` from `holder`
    pub fn burn(&mut self, holder: &Address, shares: u128) -> Result<()> {
        let balance = safe_sub(self.shares_of(holder), shares)?;
        let total = safe_sub(self.total_shares, shares)?;
        self.total_shares = total;
        if balance == 0 {
            self.holders.remove(holder);
        } else {
            self.holders.insert(*holder, balance);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokens(n: u128) -> TokenAmount {
        TokenAmount::from_tokens(n)
    }

    #[test]
    fn test_bootstrap_is_one_to_one() {
        let ledger = ShareLedger::new();
        assert_eq!(ledger.shares_for_deposit(tokens(100), TokenAmount::ZERO).unwrap(), tokens(100).base());
    }

    #[test]
    fn test_claim_proportional_to_contribution() {
        let house = Address::derive("house");
        let staker = Address::derive("staker");
        let mut ledger = ShareLedger::new();

        // 100,000 seeded, then 1,000 staked
        ledger.mint(house, ledger.shares_for_deposit(tokens(100_000), TokenAmount::ZERO).unwrap()).unwrap();
        let minted = ledger.shares_for_deposit(tokens(1_000), tokens(100_000)).unwrap();
        ledger.mint(staker, minted).unwrap();

        assert_eq!(ledger.claim_of(&staker, tokens(101_000)).unwrap(), tokens(1_000));

        // A 10,100 loss to the pool costs the staker 1%
        assert_eq!(ledger.claim_of(&staker, tokens(90_900)).unwrap(), tokens(900));
    }

    #[test]
    fn test_withdrawal_rounds_up() {
        let a = Address::derive("a");
        let b = Address::derive("b");
        let mut ledger = ShareLedger::new();
        ledger.mint(a, 2).unwrap();
        ledger.mint(b, 1).unwrap();

        // 3 shares over 10 units: one unit costs ceil(1 * 3 / 10) = 1 share
        let burned = ledger
            .shares_for_withdrawal(&a, TokenAmount::from_base(1), TokenAmount::from_base(10))
            .unwrap();
        assert_eq!(burned, 1);
    }

    #[test]
    fn test_emptied_pool_bootstraps_again() {
        let a = Address::derive("a");
        let b = Address::derive("b");
        let mut ledger = ShareLedger::new();
        ledger.mint(a, 10).unwrap();

        assert_eq!(ledger.clear_worthless(tokens(1)), 0);
        assert_eq!(ledger.shares_of(&a), 10);

        assert_eq!(ledger.clear_worthless(TokenAmount::ZERO), 10);
        assert_eq!(ledger.total_shares(), 0);
        assert_eq!(ledger.holder_count(), 0);

        let minted = ledger.shares_for_deposit(tokens(5), TokenAmount::ZERO).unwrap();
        ledger.mint(b, minted).unwrap();
        assert_eq!(ledger.claim_of(&b, tokens(5)).unwrap(), tokens(5));
        assert_eq!(ledger.claim_of(&a, tokens(5)).unwrap(), TokenAmount::ZERO);
    }

    #[test]
    fn test_burn_removes_empty_holder() {
        let a = Address::derive("a");
        let mut ledger = ShareLedger::new();
        ledger.mint(a, 10).unwrap();
        ledger.burn(&a, 10).unwrap();
        assert_eq!(ledger.holder_count(), 0);
        assert_eq!(ledger.total_shares(), 0);
        assert!(ledger.burn(&a, 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_claims_never_exceed_assets(
            deposits in proptest::collection::vec(1u128..1_000_000, 1..8),
            assets_after in 0u128..10_000_000,
        ) {
            let mut ledger = ShareLedger::new();
            let mut assets = 0u128;
            for (i, d) in deposits.iter().enumerate() {
                let holder = Address::derive(&format!("holder-{}", i));
                let minted = ledger
                    .shares_for_deposit(TokenAmount::from_base(*d), TokenAmount::from_base(assets))
                    .unwrap_or(0);
                if minted > 0 {
                    ledger.mint(holder, minted).unwrap();
                    assets += d;
                }
            }

            let total_claims: u128 = ledger
                .iter()
                .map(|(h, _)| ledger.claim_of(h, TokenAmount::from_base(assets_after)).unwrap().base())
                .sum();
            prop_assert!(total_claims <= assets_after);
        }

        #[test]
        fn prop_withdraw_full_claim_never_overdraws(stake in 1u128..1_000_000_000, seed in 1u128..1_000_000_000, pnl in 0u128..1_000_000) {
            let house = Address::derive("house");
            let staker = Address::derive("staker");
            let mut ledger = ShareLedger::new();
            ledger.mint(house, seed).unwrap();
            let minted = ledger.shares_for_deposit(TokenAmount::from_base(stake), TokenAmount::from_base(seed));
            prop_assume!(minted.is_ok());
            ledger.mint(staker, minted.unwrap()).unwrap();

            let assets = TokenAmount::from_base(seed + stake + pnl);
            let claim = ledger.claim_of(&staker, assets).unwrap();
            let burned = ledger.shares_for_withdrawal(&staker, claim, assets).unwrap();
            prop_assert!(burned <= ledger.shares_of(&staker));
        }
    }
}
