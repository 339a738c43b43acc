//! Wagering token ledger.
//!
//! This module implements the fungible token players wager and stakers deposit:
//! - Strongly typed base-unit amounts (18 decimals)
//! - Balance and allowance tracking
//! - Transfer and delegated transfer operations
//!
//! The pool and game modules talk to the ledger only through [`TokenLedger`], so a
//! host-runtime token can stand in for the in-memory [`Token`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::crypto::{Address, Hash};
use crate::utils::math::{safe_add, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed token amount in base units (prevents mixing amounts and shares)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from base units
    pub const fn from_base(base: u128) -> Self {
        Self(base)
    }

    /// Create from whole tokens
    pub const fn from_tokens(tokens: u128) -> Self {
        Self(tokens * TOKEN_BASE_UNIT)
    }

    /// Get raw base-unit value
    pub const fn base(&self) -> u128 {
        self.0
    }

    /// Get value in whole tokens (truncated)
    pub fn whole_tokens(&self) -> u128 {
        self.0 / TOKEN_BASE_UNIT
    }

    /// Decimal representation for display
    pub fn to_decimal(&self) -> Option<Decimal> {
        i128::try_from(self.0)
            .ok()
            .and_then(|v| Decimal::try_from_i128_with_scale(v, TOKEN_DECIMALS).ok())
            .map(|d| d.normalize())
    }

    /// Get formatted string representation
    pub fn to_string_formatted(&self) -> String {
        match self.to_decimal() {
            Some(d) => format!("{} GBTS", d),
            None => format!("{} GBTS", self.whole_tokens()),
        }
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating addition
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_formatted())
    }
}

impl From<u128> for TokenAmount {
    fn from(base: u128) -> Self {
        Self(base)
    }
}

impl From<TokenAmount> for u128 {
    fn from(amount: TokenAmount) -> Self {
        amount.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Fungible-token capability used by the pool and the games
pub trait TokenLedger {
    /// Balance held by `owner`
    fn balance_of(&self, owner: &Address) -> TokenAmount;

    /// Amount `spender` may still move out of `owner`'s balance
    fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount;

    /// Sets `spender`'s allowance over `owner`'s balance
    fn approve(&mut self, owner: Address, spender: Address, amount: TokenAmount) -> Result<()>;

    /// Moves `amount` from `from` to `to`
    fn transfer(&mut self, from: Address, to: Address, amount: TokenAmount) -> Result<()>;

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming allowance
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory implementation of the wagering token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Token name
    pub name: String,
    /// Token symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u32,
    total_supply: TokenAmount,
    balances: HashMap<Address, TokenAmount>,
    allowances: HashMap<Address, HashMap<Address, TokenAmount>>,
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl Token {
    /// Create an empty token
    pub fn new() -> Self {
        Self {
            name: "Gembites".to_string(),
            symbol: "GBTS".to_string(),
            decimals: TOKEN_DECIMALS,
            total_supply: TokenAmount::ZERO,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Create a token whose whole supply is held by `holder`
    pub fn with_genesis(holder: Address, supply: TokenAmount) -> Result<Self> {
        let mut token = Self::new();
        token.mint(holder, supply)?;
        Ok(token)
    }

    /// Get total supply
    pub fn total_supply(&self) -> TokenAmount {
        self.total_supply
    }

    /// Mint new tokens to `to`
    pub fn mint(&mut self, to: Address, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let new_supply = safe_add(self.total_supply.base(), amount.base())?;
        let new_balance = safe_add(self.balance_of(&to).base(), amount.base())?;

        self.total_supply = TokenAmount::from_base(new_supply);
        self.balances.insert(to, TokenAmount::from_base(new_balance));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get number of token holders
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Verify supply invariant (total_supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(b.base()));
        sum == Some(self.total_supply.base())
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Compute state hash over supply and sorted balances
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();
        data.extend_from_slice(&self.total_supply.base().to_be_bytes());

        let mut sorted_balances: Vec<_> = self.balances.iter().collect();
        sorted_balances.sort_by_key(|(k, _)| **k);

        for (address, balance) in sorted_balances {
            data.extend_from_slice(address.as_bytes());
            data.extend_from_slice(&balance.base().to_be_bytes());
        }

        Hash::sha256(&data)
    }

    fn debit(&mut self, from: &Address, amount: TokenAmount) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount.base(),
                available: available.base(),
            });
        }
        let remaining = available.saturating_sub(amount);
        if remaining.is_zero() {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, remaining);
        }
        Ok(())
    }
}

impl TokenLedger for Token {
    fn balance_of(&self, owner: &Address) -> TokenAmount {
        self.balances.get(owner).copied().unwrap_or(TokenAmount::ZERO)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: TokenAmount) -> Result<()> {
        let entry = self.allowances.entry(owner).or_default();
        if amount.is_zero() {
            entry.remove(&spender);
        } else {
            entry.insert(spender, amount);
        }
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        if from == to {
            let available = self.balance_of(&from);
            if available < amount {
                return Err(Error::InsufficientBalance {
                    required: amount.base(),
                    available: available.base(),
                });
            }
            return Ok(());
        }

        // Validate the credit before debiting so a failure leaves both balances intact
        let new_to_balance = safe_add(self.balance_of(&to).base(), amount.base())?;
        self.debit(&from, amount)?;
        self.balances.insert(to, TokenAmount::from_base(new_to_balance));
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<()> {
        let approved = self.allowance(&from, &spender);
        if approved < amount {
            return Err(Error::InsufficientAllowance {
                required: amount.base(),
                approved: approved.base(),
            });
        }
        self.transfer(from, to, amount)?;
        let remaining = safe_sub(approved.base(), amount.base())?;
        self.approve(from, spender, TokenAmount::from_base(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    fn funded() -> Token {
        Token::with_genesis(alice(), TokenAmount::from_tokens(1_000)).unwrap()
    }

    #[test]
    fn test_token_amount() {
        let amount = TokenAmount::from_tokens(245);
        assert_eq!(amount.base(), 245 * TOKEN_BASE_UNIT);
        assert_eq!(amount.whole_tokens(), 245);
        assert_eq!(amount.to_string_formatted(), "245 GBTS");

        let half = TokenAmount::from_base(TOKEN_BASE_UNIT / 2);
        assert_eq!(half.to_string_formatted(), "0.5 GBTS");
    }

    #[test]
    fn test_token_amount_arithmetic() {
        let a = TokenAmount::from_base(100);
        let b = TokenAmount::from_base(50);

        assert_eq!(a.saturating_add(b), TokenAmount::from_base(150));
        assert_eq!(a.saturating_sub(b), TokenAmount::from_base(50));
        assert_eq!(b.saturating_sub(a), TokenAmount::ZERO);
        assert_eq!(b.checked_sub(a), None);
    }

    #[test]
    fn test_transfer() {
        let mut token = funded();
        token.transfer(alice(), bob(), TokenAmount::from_tokens(300)).unwrap();

        assert_eq!(token.balance_of(&alice()), TokenAmount::from_tokens(700));
        assert_eq!(token.balance_of(&bob()), TokenAmount::from_tokens(300));
        assert_eq!(token.total_supply(), TokenAmount::from_tokens(1_000));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut token = funded();
        let err = token
            .transfer(bob(), alice(), TokenAmount::from_tokens(1))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { available: 0, .. }));
        assert_eq!(token.balance_of(&alice()), TokenAmount::from_tokens(1_000));
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut token = funded();
        let spender = Address::derive("pool");
        token.approve(alice(), spender, TokenAmount::from_tokens(100)).unwrap();

        token
            .transfer_from(spender, alice(), bob(), TokenAmount::from_tokens(60))
            .unwrap();

        assert_eq!(token.allowance(&alice(), &spender), TokenAmount::from_tokens(40));
        assert_eq!(token.balance_of(&bob()), TokenAmount::from_tokens(60));
    }

    #[test]
    fn test_transfer_from_insufficient_allowance() {
        let mut token = funded();
        let spender = Address::derive("pool");
        token.approve(alice(), spender, TokenAmount::from_tokens(10)).unwrap();

        let err = token
            .transfer_from(spender, alice(), bob(), TokenAmount::from_tokens(11))
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientAllowance { .. }));
        assert_eq!(token.balance_of(&bob()), TokenAmount::ZERO);
        assert_eq!(token.allowance(&alice(), &spender), TokenAmount::from_tokens(10));
    }

    #[test]
    fn test_supply_invariant() {
        let mut token = funded();
        token.mint(bob(), TokenAmount::from_tokens(500)).unwrap();
        token.transfer(alice(), bob(), TokenAmount::from_tokens(200)).unwrap();
        token.transfer(bob(), alice(), TokenAmount::from_tokens(700)).unwrap();

        assert!(token.verify_supply_invariant());
        assert_eq!(token.holder_count(), 1);
    }

    #[test]
    fn test_bytes_roundtrip_preserves_state_hash() {
        let mut token = funded();
        token.approve(alice(), bob(), TokenAmount::from_tokens(5)).unwrap();

        let restored = Token::from_bytes(&token.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.state_hash(), token.state_hash());
        assert_eq!(restored.allowance(&alice(), &bob()), TokenAmount::from_tokens(5));
    }
}
