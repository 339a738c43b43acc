//! DiceRoll rules.
//!
//! The player picks a number in `1..=50`. The roll is `(value mod 100) + 1` and
//! the player wins when `roll <= number`. A win pays `stake * 98 / number`, so the
//! multiplier is fixed by the chosen number and the house keeps a 2% edge.

use serde::{Deserialize, Serialize};

use crate::core::config::DiceParams;
use crate::core::token::TokenAmount;
use crate::error::{Error, Result};
use crate::games::module::{GameRules, Outcome};
use crate::oracle::consumer::RandomWord;
use crate::utils::math::{mul_div, safe_sub};

/// Roll-under dice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    sides: u32,
    min_number: u32,
    max_number: u32,
    payout_numerator: u128,
}

impl Default for DiceRoll {
    fn default() -> Self {
        Self::new(&DiceParams::default())
    }
}

impl DiceRoll {
    /// Create from deployment settings
    pub fn new(params: &DiceParams) -> Self {
        Self {
            sides: params.sides,
            min_number: params.min_number,
            max_number: params.max_number,
            payout_numerator: params.payout_numerator,
        }
    }

    /// Map a random value to a roll in `1..=sides`
    pub fn roll(&self, value: &RandomWord) -> u32 {
        value.modulo(self.sides) + 1
    }

    /// Gross amount paid on a win
    pub fn gross_payout(&self, stake: TokenAmount, number: u32) -> Result<TokenAmount> {
        self.validate_choice(number)?;
        mul_div(stake.base(), self.payout_numerator, number as u128).map(TokenAmount::from_base)
    }

    /// Probability of winning in basis points
    pub fn win_chance_bps(&self, number: u32) -> u32 {
        number.min(self.sides) * 10_000 / self.sides
    }
}

impl GameRules for DiceRoll {
    fn name(&self) -> &'static str {
        "dice_roll"
    }

    fn validate_choice(&self, number: u32) -> Result<()> {
        if number < self.min_number || number > self.max_number {
            return Err(Error::NumberOutOfRange {
                number,
                min: self.min_number,
                max: self.max_number,
            });
        }
        Ok(())
    }

    fn max_win(&self, stake: TokenAmount, number: u32) -> Result<TokenAmount> {
        let payout = self.gross_payout(stake, number)?;
        safe_sub(payout.base(), stake.base()).map(TokenAmount::from_base)
    }

    fn resolve(&self, stake: TokenAmount, number: u32, value: &RandomWord) -> Result<Outcome> {
        let roll = self.roll(value);
        let signed_stake = i128::try_from(stake.base()).map_err(|_| Error::Overflow {
            operation: "stake to signed".into(),
        })?;

        if roll <= number {
            let payout = self.gross_payout(stake, number)?;
            let win = i128::try_from(payout.base()).map_err(|_| Error::Overflow {
                operation: "payout to signed".into(),
            })?;
            Ok(Outcome {
                roll,
                won: true,
                payout,
                delta: win - signed_stake,
            })
        } else {
            Ok(Outcome {
                roll,
                won: false,
                payout: TokenAmount::ZERO,
                delta: -signed_stake,
            })
        }
    }
}
