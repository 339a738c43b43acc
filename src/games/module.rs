//! Game module: per-player bet lifecycle.
//!
//! ```text
//! None --bet--> Placed --play--> Placed(request) --fulfillment--> Resolved
//!                  \______________ stalled-round recovery ______________/--> None
//! ```
//!
//! A game holds only transient bet state. Stakes and payouts move exclusively
//! through the pool, which checks the game's authorization on every call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::context::CallContext;
use crate::core::token::{TokenAmount, TokenLedger};
use crate::error::{Error, Result};
use crate::games::dice::DiceRoll;
use crate::oracle::consumer::{RandomWord, RandomnessConsumer};
use crate::oracle::sources::RandomnessOracle;
use crate::pool::liquidity_pool::LiquidityPool;
use crate::utils::crypto::{Address, RequestId};

// ═══════════════════════════════════════════════════════════════════════════════
// RULES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of resolving one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Mapped roll
    pub roll: u32,
    /// Whether the player won
    pub won: bool,
    /// Gross amount owed to the player (zero on a loss)
    pub payout: TokenAmount,
    /// Signed result relative to the stake
    pub delta: i128,
}

/// Game-specific rules plugged into a [`GameModule`]
pub trait GameRules {
    /// Rule set name
    fn name(&self) -> &'static str;

    /// Check the player's choice
    fn validate_choice(&self, number: u32) -> Result<()>;

    /// Largest net win a bet could produce
    fn max_win(&self, stake: TokenAmount, number: u32) -> Result<TokenAmount>;

    /// Resolve a round from the delivered random value
    fn resolve(&self, stake: TokenAmount, number: u32, value: &RandomWord) -> Result<Outcome>;
}

/// Rule sets a module can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameKind {
    /// Roll-under dice
    DiceRoll(DiceRoll),
}

impl GameRules for GameKind {
    fn name(&self) -> &'static str {
        match self {
            GameKind::DiceRoll(d) => d.name(),
        }
    }

    fn validate_choice(&self, number: u32) -> Result<()> {
        match self {
            GameKind::DiceRoll(d) => d.validate_choice(number),
        }
    }

    fn max_win(&self, stake: TokenAmount, number: u32) -> Result<TokenAmount> {
        match self {
            GameKind::DiceRoll(d) => d.max_win(stake, number),
        }
    }

    fn resolve(&self, stake: TokenAmount, number: u32, value: &RandomWord) -> Result<Outcome> {
        match self {
            GameKind::DiceRoll(d) => d.resolve(stake, number, value),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BETS
// ═══════════════════════════════════════════════════════════════════════════════

/// Position of a player's bet in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    /// No open bet
    None,
    /// Stake escrowed, waiting for play or for randomness
    Placed,
    /// Settled
    Resolved,
}

/// A player's bet in one game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    /// Player
    pub player: Address,
    /// Chosen number
    pub number: u32,
    /// Stake
    pub amount: TokenAmount,
    /// Lifecycle status
    pub status: BetStatus,
    /// Outstanding randomness request
    pub request: Option<RequestId>,
    /// Time the bet was placed
    pub placed_at: u64,
    /// Time randomness was requested
    pub played_at: Option<u64>,
    /// Outcome once resolved
    pub outcome: Option<Outcome>,
}

impl Bet {
    /// Time the round started waiting (play time, or placement if never played)
    pub fn waiting_since(&self) -> u64 {
        self.played_at.unwrap_or(self.placed_at)
    }
}

/// A settled round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Player
    pub player: Address,
    /// Stake
    pub stake: TokenAmount,
    /// Chosen number
    pub number: u32,
    /// Outcome
    pub outcome: Outcome,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GAME MODULE
// ═══════════════════════════════════════════════════════════════════════════════

/// One deployed game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameModule {
    address: Address,
    rules: GameKind,
    bets: HashMap<Address, Bet>,
    by_request: HashMap<RequestId, Address>,
    stats: GameStats,
}

impl GameModule {
    /// Create a game at `address` running `rules`
    pub fn new(address: Address, rules: GameKind) -> Self {
        Self {
            address,
            rules,
            bets: HashMap::new(),
            by_request: HashMap::new(),
            stats: GameStats::default(),
        }
    }

    /// Game address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Rules in use
    pub fn rules(&self) -> &GameKind {
        &self.rules
    }

    /// Place a bet of `amount` on `number`
    ///
    /// Checks, in order: game approved, player balance, `min_bet <= amount <= exposure cap`,
    /// no bet already placed, number in range. Then escrows the stake in the pool.
    pub fn bet<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        pool: &mut LiquidityPool,
        ctx: &CallContext,
        number: u32,
        amount: TokenAmount,
        min_bet: TokenAmount,
    ) -> Result<()> {
        let player = ctx.caller;

        if !pool.game_status(&self.address).is_approved() {
            return Err(Error::Unauthorized(format!("game {} is not approved", self.address)));
        }
        let balance = ledger.balance_of(&player);
        if balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount.base(),
                available: balance.base(),
            });
        }
        let cap = pool.exposure_cap();
        if amount < min_bet || amount > cap {
            return Err(Error::BetOutOfRange {
                amount: amount.base(),
                min: min_bet.base(),
                max: cap.base(),
            });
        }
        if self.status_of(&player) == BetStatus::Placed {
            return Err(Error::AlreadyBetted(player.to_hex()));
        }
        self.rules.validate_choice(number)?;

        let max_win = self.rules.max_win(amount, number)?;
        pool.escrow_bet(ledger, self.address, player, amount, max_win, ctx.timestamp)?;

        self.bets.insert(
            player,
            Bet {
                player,
                number,
                amount,
                status: BetStatus::Placed,
                request: None,
                placed_at: ctx.timestamp,
                played_at: None,
                outcome: None,
            },
        );
        self.stats.total_bets += 1;
        self.stats.total_wagered = self.stats.total_wagered.saturating_add(amount);

        info!(game = %self.address, %player, number, amount = %amount, "Bet placed");
        Ok(())
    }

    /// Request randomness for the caller's placed bet
    pub fn play<O: RandomnessOracle + ?Sized>(
        &mut self,
        consumer: &mut RandomnessConsumer,
        oracle: &mut O,
        ctx: &CallContext,
    ) -> Result<RequestId> {
        let player = ctx.caller;
        let bet = self
            .bets
            .get(&player)
            .filter(|b| b.status == BetStatus::Placed)
            .ok_or_else(|| Error::NoActiveBet(player.to_hex()))?;
        if bet.request.is_some() {
            return Err(Error::AwaitingRandomness(player.to_hex()));
        }

        let id = consumer.request_randomness(oracle, self.address, ctx.timestamp)?;

        if let Some(bet) = self.bets.get_mut(&player) {
            bet.request = Some(id);
            bet.played_at = Some(ctx.timestamp);
        }
        self.by_request.insert(id, player);

        debug!(game = %self.address, %player, request = %id.short(), "Round started");
        Ok(id)
    }

    /// Settle the round waiting on `id` with `value`
    pub fn resolve<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        pool: &mut LiquidityPool,
        id: &RequestId,
        value: &RandomWord,
        now: u64,
    ) -> Result<Resolution> {
        let player = *self
            .by_request
            .get(id)
            .ok_or_else(|| Error::UnknownRequest(id.to_hex()))?;
        let bet = self
            .bets
            .get(&player)
            .filter(|b| b.status == BetStatus::Placed && b.request.as_ref() == Some(id))
            .ok_or_else(|| Error::NoActiveBet(player.to_hex()))?;

        let outcome = self.rules.resolve(bet.amount, bet.number, value)?;
        pool.settle(ledger, self.address, player, outcome.delta)?;

        let resolution = Resolution {
            player,
            stake: bet.amount,
            number: bet.number,
            outcome,
        };
        if let Some(bet) = self.bets.get_mut(&player) {
            bet.status = BetStatus::Resolved;
            bet.request = None;
            bet.outcome = Some(outcome);
        }
        self.by_request.remove(id);

        if outcome.won {
            self.stats.wins += 1;
            self.stats.total_paid = self.stats.total_paid.saturating_add(outcome.payout);
        } else {
            self.stats.losses += 1;
        }

        info!(
            game = %self.address,
            %player,
            roll = outcome.roll,
            won = outcome.won,
            payout = %outcome.payout,
            at = now,
            "Round resolved"
        );
        Ok(resolution)
    }

    /// Refund a round that has waited at least `timeout` seconds and return the
    /// player to `None`. Returns the cancelled request, if one was issued.
    pub fn cancel_stalled_round<L: TokenLedger>(
        &mut self,
        ledger: &mut L,
        pool: &mut LiquidityPool,
        consumer: &mut RandomnessConsumer,
        player: Address,
        now: u64,
        timeout: u64,
    ) -> Result<Option<RequestId>> {
        let bet = self
            .bets
            .get(&player)
            .filter(|b| b.status == BetStatus::Placed)
            .ok_or_else(|| Error::NoActiveBet(player.to_hex()))?;

        let stalled_at = bet.waiting_since().saturating_add(timeout);
        if now < stalled_at {
            return Err(Error::RoundNotStalled {
                remaining: stalled_at - now,
            });
        }
        let request = bet.request;
        if let Some(id) = request {
            let pending = consumer
                .request(&id)
                .map(|r| r.state.is_pending())
                .unwrap_or(false);
            if !pending {
                return Err(Error::InvariantViolation(format!(
                    "placed bet references non-pending request {}",
                    id
                )));
            }
        }

        let refunded = pool.refund_escrow(ledger, self.address, player)?;
        if let Some(id) = request {
            consumer.cancel(&id, now)?;
            self.by_request.remove(&id);
        }
        self.bets.remove(&player);
        self.stats.cancelled += 1;

        warn!(game = %self.address, %player, refunded = %refunded, "Stalled round cancelled");
        Ok(request)
    }

    /// Bet of `player`, if any
    pub fn bet_of(&self, player: &Address) -> Option<&Bet> {
        self.bets.get(player)
    }

    /// Lifecycle status of `player`
    pub fn status_of(&self, player: &Address) -> BetStatus {
        self.bets
            .get(player)
            .map(|b| b.status)
            .unwrap_or(BetStatus::None)
    }

    /// Player waiting on `id`
    pub fn player_for_request(&self, id: &RequestId) -> Option<Address> {
        self.by_request.get(id).copied()
    }

    /// Bets currently placed
    pub fn open_bets(&self) -> impl Iterator<Item = &Bet> {
        self.bets.values().filter(|b| b.status == BetStatus::Placed)
    }

    /// Get game statistics
    pub fn statistics(&self) -> GameStats {
        GameStats {
            open_rounds: self.open_bets().count() as u64,
            ..self.stats.clone()
        }
    }
}

/// Game statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStats {
    pub total_bets: u64,
    pub total_wagered: TokenAmount,
    pub wins: u64,
    pub losses: u64,
    pub total_paid: TokenAmount,
    pub cancelled: u64,
    pub open_rounds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PoolParams;
    use crate::core::token::Token;
    use crate::oracle::sources::ManualOracle;

    const DAY: u64 = 86_400;

    fn tokens(n: u128) -> TokenAmount {
        TokenAmount::from_tokens(n)
    }

    fn admin() -> Address {
        Address::derive("admin")
    }

    fn player() -> Address {
        Address::derive("player")
    }

    struct Fixture {
        token: Token,
        pool: LiquidityPool,
        consumer: RandomnessConsumer,
        oracle: ManualOracle,
        game: GameModule,
    }

    fn setup() -> Fixture {
        let mut token = Token::with_genesis(admin(), tokens(10_000_000)).unwrap();
        let mut pool = LiquidityPool::new(Address::derive("pool"), admin(), &PoolParams::default());
        let game = GameModule::new(Address::derive("dice"), GameKind::DiceRoll(DiceRoll::default()));
        let oracle = ManualOracle::new(Address::derive("oracle"));
        let consumer = RandomnessConsumer::new(Address::derive("consumer"), admin(), oracle.address());

        let admin_ctx = CallContext::new(admin(), 0);
        pool.fund(&mut token, &admin_ctx, tokens(101_000)).unwrap();
        pool.register_game_for_approval(&admin_ctx, game.address()).unwrap();
        pool.set_game_approval(&CallContext::new(admin(), DAY), game.address(), true)
            .unwrap();

        token.transfer(admin(), player(), tokens(1_000_000)).unwrap();
        token.approve(player(), game.address(), tokens(1_000_000)).unwrap();

        Fixture { token, pool, consumer, oracle, game }
    }

    fn ctx(t: u64) -> CallContext {
        CallContext::new(player(), t)
    }

    #[test]
    fn test_bet_escrows_stake() {
        let mut f = setup();
        f.game
            .bet(&mut f.token, &mut f.pool, &ctx(DAY), 40, tokens(100), tokens(25))
            .unwrap();

        assert_eq!(f.game.status_of(&player()), BetStatus::Placed);
        assert_eq!(f.pool.balance(), tokens(101_100));
        assert_eq!(f.token.balance_of(&player()), tokens(999_900));
    }

    #[test]
    fn test_bet_check_order() {
        let mut f = setup();
        let min = tokens(25);

        // Balance is checked before range
        let poor = CallContext::new(Address::derive("poor"), DAY);
        assert!(matches!(
            f.game.bet(&mut f.token, &mut f.pool, &poor, 40, tokens(1), min),
            Err(Error::InsufficientBalance { .. })
        ));

        // Range is checked before the number
        assert!(matches!(
            f.game.bet(&mut f.token, &mut f.pool, &ctx(DAY), 51, tokens(24), min),
            Err(Error::BetOutOfRange { .. })
        ));
        assert!(matches!(
            f.game.bet(&mut f.token, &mut f.pool, &ctx(DAY), 40, tokens(1_011), min),
            Err(Error::BetOutOfRange { .. })
        ));

        // AlreadyBetted is checked before the number
        f.game
            .bet(&mut f.token, &mut f.pool, &ctx(DAY), 40, tokens(100), min)
            .unwrap();
        assert!(matches!(
            f.game.bet(&mut f.token, &mut f.pool, &ctx(DAY), 51, tokens(100), min),
            Err(Error::AlreadyBetted(_))
        ));
    }

    #[test]
    fn test_bet_number_out_of_range() {
        let mut f = setup();
        let err = f
            .game
            .bet(&mut f.token, &mut f.pool, &ctx(DAY), 51, tokens(100), tokens(25))
            .unwrap_err();
        assert_eq!(err, Error::NumberOutOfRange { number: 51, min: 1, max: 50 });
        assert_eq!(f.pool.balance(), tokens(101_000));
    }

    #[test]
    fn test_play_without_bet() {
        let mut f = setup();
        assert!(matches!(
            f.game.play(&mut f.consumer, &mut f.oracle, &ctx(DAY)),
            Err(Error::NoActiveBet(_))
        ));
    }

    #[test]
    fn test_play_twice_awaits_randomness() {
        let mut f = setup();
        f.game
            .bet(&mut f.token, &mut f.pool, &ctx(DAY), 40, tokens(100), tokens(25))
            .unwrap();
        f.game.play(&mut f.consumer, &mut f.oracle, &ctx(DAY)).unwrap();
        assert!(matches!(
            f.game.play(&mut f.consumer, &mut f.oracle, &ctx(DAY)),
            Err(Error::AwaitingRandomness(_))
        ));
        assert_eq!(f.oracle.submitted().len(), 1);
    }

    #[test]
    fn test_resolve_pays_winner() {
        let mut f = setup();
        f.game
            .bet(&mut f.token, &mut f.pool, &ctx(DAY), 40, tokens(100), tokens(25))
            .unwrap();
        let id = f.game.play(&mut f.consumer, &mut f.oracle, &ctx(DAY)).unwrap();

        let resolution = f
            .game
            .resolve(&mut f.token, &mut f.pool, &id, &RandomWord::from_u128(39), DAY + 1)
            .unwrap();

        assert!(resolution.outcome.won);
        assert_eq!(f.token.balance_of(&player()), tokens(1_000_145));
        assert_eq!(f.game.status_of(&player()), BetStatus::Resolved);
        assert!(f.game.player_for_request(&id).is_none());

        // A resolved player may bet again
        f.game
            .bet(&mut f.token, &mut f.pool, &ctx(DAY + 2), 20, tokens(100), tokens(25))
            .unwrap();
    }

    #[test]
    fn test_cancel_stalled_round() {
        let mut f = setup();
        f.game
            .bet(&mut f.token, &mut f.pool, &ctx(DAY), 40, tokens(100), tokens(25))
            .unwrap();
        let id = f.game.play(&mut f.consumer, &mut f.oracle, &ctx(DAY + 10)).unwrap();

        let err = f
            .game
            .cancel_stalled_round(&mut f.token, &mut f.pool, &mut f.consumer, player(), DAY + 10 + 99, 100)
            .unwrap_err();
        assert_eq!(err, Error::RoundNotStalled { remaining: 1 });

        let cancelled = f
            .game
            .cancel_stalled_round(&mut f.token, &mut f.pool, &mut f.consumer, player(), DAY + 110, 100)
            .unwrap();
        assert_eq!(cancelled, Some(id));
        assert_eq!(f.game.status_of(&player()), BetStatus::None);
        assert_eq!(f.token.balance_of(&player()), tokens(1_000_000));
        assert_eq!(f.pool.escrowed(), TokenAmount::ZERO);
        assert_eq!(f.game.statistics().cancelled, 1);
    }
}
