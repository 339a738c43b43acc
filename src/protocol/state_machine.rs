//! Protocol State Machine - Core orchestration engine.
//!
//! [`Protocol`] owns the token ledger, the liquidity pool, the randomness
//! consumer, the governor and every deployed game. Each public operation runs to
//! completion against `&mut self`: it validates first, mutates second and records
//! its events only after it has succeeded.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::config::ProtocolConfig;
use crate::core::context::CallContext;
use crate::core::token::{Token, TokenAmount, TokenLedger};
use crate::error::{Error, Result};
use crate::games::dice::DiceRoll;
use crate::games::module::{BetStatus, GameKind, GameModule, GameRules, GameStats, Resolution};
use crate::governance::governor::{ParameterChange, ParameterGovernor};
use crate::governance::parameters::Parameter;
use crate::oracle::consumer::{ConsumerStats, RandomWord, RandomnessConsumer};
use crate::oracle::sources::RandomnessOracle;
use crate::pool::liquidity_pool::{LiquidityPool, PoolStats};
use crate::pool::registry::{ApprovalChange, GameStatus};
use crate::protocol::events::*;
use crate::utils::crypto::{Address, Hash, RequestId};

/// Label the pool address is derived from
pub const POOL_LABEL: &str = "liquidity_pool";

/// Label the consumer address is derived from
pub const CONSUMER_LABEL: &str = "randomness_consumer";

/// Label the DiceRoll game address is derived from
pub const DICE_LABEL: &str = "game:dice_roll";

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

/// A complete deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol<L: TokenLedger = Token> {
    /// Deployment configuration
    config: ProtocolConfig,
    /// Administrative identity
    admin: Address,
    /// Token ledger
    ledger: L,
    /// Liquidity pool
    pool: LiquidityPool,
    /// Randomness consumer
    consumer: RandomnessConsumer,
    /// Parameter governor
    governor: ParameterGovernor,
    /// Deployed games by address
    games: HashMap<Address, GameModule>,
    /// Events recorded since the last `take_events`
    #[serde(skip)]
    event_log: EventLog,
}

impl Protocol<Token> {
    /// Deploy with an in-memory token, minting the genesis supply to `admin`
    pub fn new(config: ProtocolConfig, admin: Address, oracle: Address) -> Result<Self> {
        let token = Token::with_genesis(admin, config.genesis_supply)?;
        Self::with_ledger(config, admin, oracle, token)
    }

    /// Compute state hash
    pub fn state_hash(&self) -> Hash {
        let mut data = Vec::new();
        data.extend_from_slice(self.ledger.state_hash().as_bytes());
        data.extend_from_slice(self.pool.state_hash().as_bytes());
        data.extend_from_slice(self.consumer.oracle().as_bytes());

        let stats = self.consumer.statistics();
        for count in [stats.total_requests, stats.pending, stats.fulfilled, stats.cancelled] {
            data.extend_from_slice(&count.to_be_bytes());
        }
        for entry in self.governor.parameters() {
            data.extend_from_slice(entry.parameter.name().as_bytes());
            data.extend_from_slice(&entry.value.to_be_bytes());
        }

        let mut games: Vec<&GameModule> = self.games.values().collect();
        games.sort_by_key(|g| g.address());
        for game in games {
            data.extend_from_slice(game.address().as_bytes());
            let mut open: Vec<_> = game.open_bets().collect();
            open.sort_by_key(|b| b.player);
            for bet in open {
                data.extend_from_slice(bet.player.as_bytes());
                data.extend_from_slice(&bet.amount.base().to_be_bytes());
                data.extend_from_slice(&bet.number.to_be_bytes());
            }
        }
        Hash::sha256(&data)
    }
}

impl<L: TokenLedger> Protocol<L> {
    /// Deploy over an existing ledger
    pub fn with_ledger(config: ProtocolConfig, admin: Address, oracle: Address, ledger: L) -> Result<Self> {
        config.validate()?;

        let pool = LiquidityPool::new(Address::derive(POOL_LABEL), admin, &config.pool);
        let consumer = RandomnessConsumer::new(Address::derive(CONSUMER_LABEL), admin, oracle);
        let governor = ParameterGovernor::new(admin, &config.governance);

        let dice = GameModule::new(
            Address::derive(DICE_LABEL),
            GameKind::DiceRoll(DiceRoll::new(&config.dice)),
        );
        let mut games = HashMap::new();
        games.insert(dice.address(), dice);

        info!(admin = %admin, oracle = %oracle, pool = %pool.address(), "Protocol deployed");
        Ok(Self {
            config,
            admin,
            ledger,
            pool,
            consumer,
            governor,
            games,
            event_log: EventLog::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TOKEN OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Transfer tokens; a transfer to the pool funds the house reserve
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: TokenAmount) -> Result<()> {
        if to == self.pool.address() {
            return self.fund(ctx, amount).map(|_| ());
        }
        self.ledger.transfer(ctx.caller, to, amount)?;
        self.event_log.push(ProtocolEvent::TokenTransfer(TokenTransferEvent {
            from: ctx.caller,
            to,
            amount,
            timestamp: ctx.timestamp,
        }));
        Ok(())
    }

    /// Set the caller's allowance for `spender`
    pub fn approve(&mut self, ctx: &CallContext, spender: Address, amount: TokenAmount) -> Result<()> {
        self.ledger.approve(ctx.caller, spender, amount)?;
        self.event_log.push(ProtocolEvent::TokenApproval(TokenApprovalEvent {
            owner: ctx.caller,
            spender,
            amount,
            timestamp: ctx.timestamp,
        }));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POOL OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stake into the pool (the pool must hold an allowance from the caller)
    pub fn stake(&mut self, ctx: &CallContext, amount: TokenAmount) -> Result<u128> {
        let shares = self.pool.stake(&mut self.ledger, ctx, amount)?;
        self.event_log.push(ProtocolEvent::Staked(StakeEvent {
            staker: ctx.caller,
            amount,
            shares,
            timestamp: ctx.timestamp,
        }));
        Ok(shares)
    }

    /// Withdraw `amount` of the caller's claim
    pub fn unstake(&mut self, ctx: &CallContext, amount: TokenAmount) -> Result<u128> {
        let shares = self.pool.unstake(&mut self.ledger, ctx, amount)?;
        self.event_log.push(ProtocolEvent::Unstaked(StakeEvent {
            staker: ctx.caller,
            amount,
            shares,
            timestamp: ctx.timestamp,
        }));
        Ok(shares)
    }

    /// Donate capital into the house reserve
    pub fn fund(&mut self, ctx: &CallContext, amount: TokenAmount) -> Result<u128> {
        let shares = self.pool.fund(&mut self.ledger, ctx, amount)?;
        self.event_log.push(ProtocolEvent::PoolFunded(PoolFundedEvent {
            funder: ctx.caller,
            amount,
            new_balance: self.pool.balance(),
            timestamp: ctx.timestamp,
        }));
        Ok(shares)
    }

    /// Start the approval cooldown for `game`
    pub fn register_game_for_approval(&mut self, ctx: &CallContext, game: Address) -> Result<GameStatus> {
        let status = self.pool.register_game_for_approval(ctx, game)?;
        self.event_log.push(ProtocolEvent::GameRegistered(GameRegisteredEvent {
            game,
            registered_by: ctx.caller,
            timestamp: ctx.timestamp,
        }));
        Ok(status)
    }

    /// Approve or revoke `game` (admin only)
    pub fn set_game_approval(
        &mut self,
        ctx: &CallContext,
        game: Address,
        approved: bool,
    ) -> Result<ApprovalChange> {
        let change = self.pool.set_game_approval(ctx, game, approved)?;
        if let ApprovalChange::Changed(status) = change {
            self.event_log.push(ProtocolEvent::GameApprovalChanged(GameApprovalEvent {
                game,
                status,
                timestamp: ctx.timestamp,
            }));
        }
        Ok(change)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ROUND OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Place a bet in `game`
    pub fn bet(&mut self, ctx: &CallContext, game: Address, number: u32, amount: TokenAmount) -> Result<()> {
        let min_bet = self.min_bet();
        let module = self
            .games
            .get_mut(&game)
            .ok_or_else(|| Error::UnknownGame(game.to_hex()))?;
        module.bet(&mut self.ledger, &mut self.pool, ctx, number, amount, min_bet)?;

        self.event_log.push(ProtocolEvent::BetPlaced(BetPlacedEvent {
            game,
            player: ctx.caller,
            number,
            amount,
            timestamp: ctx.timestamp,
        }));
        Ok(())
    }

    /// Request randomness for the caller's bet in `game`
    pub fn play<O: RandomnessOracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        ctx: &CallContext,
        game: Address,
    ) -> Result<RequestId> {
        if oracle.address() != self.consumer.oracle() {
            return Err(Error::Unauthorized(format!(
                "oracle {} is not the configured randomness source",
                oracle.address()
            )));
        }
        let module = self
            .games
            .get_mut(&game)
            .ok_or_else(|| Error::UnknownGame(game.to_hex()))?;
        let request_id = module.play(&mut self.consumer, oracle, ctx)?;

        self.event_log.push(ProtocolEvent::RandomnessRequested(RandomnessRequestedEvent {
            game,
            player: ctx.caller,
            request_id,
            timestamp: ctx.timestamp,
        }));
        Ok(request_id)
    }

    /// Fulfillment callback from the oracle identity
    ///
    /// Validation happens before anything moves, so a rejected callback leaves
    /// the request, the bet and the pool untouched.
    pub fn on_fulfilled(&mut self, ctx: &CallContext, id: RequestId, value: RandomWord) -> Result<Resolution> {
        let game = self.consumer.validate_fulfillment(ctx, &id)?.requester;
        let module = self
            .games
            .get_mut(&game)
            .ok_or_else(|| Error::UnknownGame(game.to_hex()))?;

        let resolution = module.resolve(&mut self.ledger, &mut self.pool, &id, &value, ctx.timestamp)?;
        self.consumer.mark_fulfilled(&id, value, ctx.timestamp)?;

        self.event_log.push(ProtocolEvent::BetSettled(BetSettledEvent {
            game,
            player: resolution.player,
            request_id: id,
            roll: resolution.outcome.roll,
            won: resolution.outcome.won,
            stake: resolution.stake,
            payout: resolution.outcome.payout,
            timestamp: ctx.timestamp,
        }));
        Ok(resolution)
    }

    /// Refund a round whose randomness never arrived (admin only)
    pub fn cancel_stalled_round(
        &mut self,
        ctx: &CallContext,
        game: Address,
        player: Address,
    ) -> Result<Option<RequestId>> {
        if ctx.caller != self.admin {
            return Err(Error::Unauthorized("only the admin may cancel stalled rounds".into()));
        }
        let timeout = self.round_timeout();
        let module = self
            .games
            .get_mut(&game)
            .ok_or_else(|| Error::UnknownGame(game.to_hex()))?;
        let request_id = module.cancel_stalled_round(
            &mut self.ledger,
            &mut self.pool,
            &mut self.consumer,
            player,
            ctx.timestamp,
            timeout,
        )?;

        self.event_log.push(ProtocolEvent::RoundCancelled(RoundCancelledEvent {
            game,
            player,
            request_id,
            timestamp: ctx.timestamp,
        }));
        Ok(request_id)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMINISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Change a governed parameter (governor owner only)
    pub fn set_parameter(&mut self, ctx: &CallContext, parameter: Parameter, value: u128) -> Result<ParameterChange> {
        let change = self.governor.set_parameter(ctx, parameter, value)?;
        self.event_log.push(ProtocolEvent::ParameterChanged(ParameterChangedEvent {
            parameter,
            old_value: change.old_value,
            new_value: change.new_value,
            timestamp: ctx.timestamp,
        }));
        Ok(change)
    }

    /// Replace the trusted oracle (admin only)
    pub fn set_oracle(&mut self, ctx: &CallContext, oracle: Address) -> Result<()> {
        let old_oracle = self.consumer.oracle();
        self.consumer.set_oracle(ctx, oracle)?;
        self.event_log.push(ProtocolEvent::OracleChanged(OracleChangedEvent {
            old_oracle,
            new_oracle: oracle,
            timestamp: ctx.timestamp,
        }));
        Ok(())
    }

    /// Drain the events recorded so far
    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.event_log)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERY METHODS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deployment configuration
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Administrative identity
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Token ledger
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Token balance of `owner`
    pub fn balance_of(&self, owner: &Address) -> TokenAmount {
        self.ledger.balance_of(owner)
    }

    /// Liquidity pool
    pub fn pool(&self) -> &LiquidityPool {
        &self.pool
    }

    /// Randomness consumer
    pub fn consumer(&self) -> &RandomnessConsumer {
        &self.consumer
    }

    /// Parameter governor
    pub fn governor(&self) -> &ParameterGovernor {
        &self.governor
    }

    /// Deployed game at `address`
    pub fn game(&self, address: &Address) -> Option<&GameModule> {
        self.games.get(address)
    }

    /// Address of the DiceRoll game
    pub fn dice_address(&self) -> Address {
        Address::derive(DICE_LABEL)
    }

    /// Bet status of `player` in `game`
    pub fn bet_status(&self, game: &Address, player: &Address) -> BetStatus {
        self.games
            .get(game)
            .map(|g| g.status_of(player))
            .unwrap_or(BetStatus::None)
    }

    /// Current minimum bet
    pub fn min_bet(&self) -> TokenAmount {
        TokenAmount::from_base(self.governor.get(Parameter::MinBet))
    }

    /// Current stalled-round timeout in seconds
    pub fn round_timeout(&self) -> u64 {
        u64::try_from(self.governor.get(Parameter::RoundTimeout)).unwrap_or(u64::MAX)
    }

    /// Check pool accounting against the ledger
    pub fn verify_solvency(&self) -> Result<()> {
        self.pool.verify_solvency(&self.ledger).map_err(|e| {
            warn!(error = %e, "Solvency check failed");
            e
        })
    }

    /// Get protocol statistics
    pub fn statistics(&self) -> ProtocolStats {
        let mut games: Vec<GameSummary> = self
            .games
            .values()
            .map(|g| GameSummary {
                address: g.address(),
                name: g.rules().name().to_string(),
                status: self.pool.game_status(&g.address()),
                stats: g.statistics(),
            })
            .collect();
        games.sort_by_key(|g| g.address);

        ProtocolStats {
            pool: self.pool.statistics(),
            consumer: self.consumer.statistics(),
            games,
            min_bet: self.min_bet(),
            round_timeout_secs: self.round_timeout(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

impl<L: TokenLedger + Serialize + DeserializeOwned> Protocol<L> {
    /// Serialize to bytes (pending events are not included)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let protocol: Self =
            bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
        debug!(games = protocol.games.len(), "Protocol snapshot restored");
        Ok(protocol)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-game summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    /// Game address
    pub address: Address,
    /// Rule set name
    pub name: String,
    /// Authorization status
    pub status: GameStatus,
    /// Round statistics
    pub stats: GameStats,
}

/// Whole-protocol statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolStats {
    /// Pool statistics
    pub pool: PoolStats,
    /// Randomness statistics
    pub consumer: ConsumerStats,
    /// Deployed games
    pub games: Vec<GameSummary>,
    /// Current minimum bet
    pub min_bet: TokenAmount,
    /// Current round timeout
    pub round_timeout_secs: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::sources::ManualOracle;

    const DAY: u64 = 86_400;

    fn tokens(n: u128) -> TokenAmount {
        TokenAmount::from_tokens(n)
    }

    fn admin() -> Address {
        Address::derive("admin")
    }

    fn oracle() -> ManualOracle {
        ManualOracle::new(Address::derive("oracle"))
    }

    fn deployed() -> Protocol {
        let mut protocol = Protocol::new(ProtocolConfig::default(), admin(), Address::derive("oracle")).unwrap();
        let ctx = CallContext::new(admin(), 0);
        let pool = protocol.pool().address();
        let dice = protocol.dice_address();
        protocol.transfer(&ctx, pool, tokens(100_000)).unwrap();
        protocol.register_game_for_approval(&ctx, dice).unwrap();
        protocol
            .set_game_approval(&CallContext::new(admin(), DAY), dice, true)
            .unwrap();
        protocol
    }

    fn funded_player(protocol: &mut Protocol, label: &str, amount: u128) -> Address {
        let player = Address::derive(label);
        let dice = protocol.dice_address();
        protocol
            .transfer(&CallContext::new(admin(), DAY), player, tokens(amount))
            .unwrap();
        protocol
            .approve(&CallContext::new(player, DAY), dice, tokens(amount))
            .unwrap();
        player
    }

    #[test]
    fn test_deploy_mints_genesis_to_admin() {
        let protocol = Protocol::new(ProtocolConfig::default(), admin(), Address::derive("oracle")).unwrap();
        assert_eq!(protocol.balance_of(&admin()), ProtocolConfig::default().genesis_supply);
        assert_eq!(
            protocol.pool().game_status(&protocol.dice_address()),
            GameStatus::Unregistered
        );
        assert_eq!(protocol.min_bet(), tokens(25));
    }

    #[test]
    fn test_transfer_to_pool_funds_reserve() {
        let mut protocol = deployed();
        assert_eq!(protocol.pool().balance(), tokens(100_000));
        assert_eq!(protocol.balance_of(&protocol.pool().address()), tokens(100_000));
        assert!(protocol.verify_solvency().is_ok());

        let events = protocol.take_events();
        assert_eq!(events.filter_by_type("PoolFunded").len(), 1);
        assert!(events.filter_by_type("TokenTransfer").is_empty());
        assert!(protocol.take_events().is_empty());
    }

    #[test]
    fn test_bet_unknown_game() {
        let mut protocol = deployed();
        let player = funded_player(&mut protocol, "alice", 1_000);
        let err = protocol
            .bet(&CallContext::new(player, DAY), Address::derive("roulette"), 10, tokens(100))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownGame(_)));
    }

    #[test]
    fn test_play_rejects_untrusted_oracle() {
        let mut protocol = deployed();
        let player = funded_player(&mut protocol, "alice", 1_000);
        let dice = protocol.dice_address();
        let ctx = CallContext::new(player, DAY);
        protocol.bet(&ctx, dice, 40, tokens(100)).unwrap();

        let mut rogue = ManualOracle::new(Address::derive("rogue"));
        assert!(matches!(
            protocol.play(&mut rogue, &ctx, dice),
            Err(Error::Unauthorized(_))
        ));
        assert!(rogue.submitted().is_empty());
    }

    #[test]
    fn test_round_trip_through_fulfillment() {
        let mut protocol = deployed();
        let player = funded_player(&mut protocol, "alice", 1_000);
        let dice = protocol.dice_address();
        let ctx = CallContext::new(player, DAY);
        let mut oracle = oracle();

        protocol.bet(&ctx, dice, 40, tokens(100)).unwrap();
        let id = protocol.play(&mut oracle, &ctx, dice).unwrap();
        assert_eq!(oracle.last_request().map(|r| r.id), Some(id));

        let oracle_ctx = CallContext::new(oracle.address(), DAY + 5);
        let resolution = protocol
            .on_fulfilled(&oracle_ctx, id, RandomWord::from_u128(39))
            .unwrap();
        assert!(resolution.outcome.won);
        assert_eq!(protocol.balance_of(&player), tokens(1_145));
        assert_eq!(protocol.bet_status(&dice, &player), BetStatus::Resolved);
        assert!(protocol.verify_solvency().is_ok());

        let events = protocol.take_events();
        assert_eq!(events.filter_by_type("BetSettled").len(), 1);
    }

    #[test]
    fn test_cancel_stalled_round_admin_only() {
        let mut protocol = deployed();
        let player = funded_player(&mut protocol, "alice", 1_000);
        let dice = protocol.dice_address();
        let ctx = CallContext::new(player, DAY);
        let mut oracle = oracle();

        protocol.bet(&ctx, dice, 40, tokens(100)).unwrap();
        let id = protocol.play(&mut oracle, &ctx, dice).unwrap();

        let late = DAY + protocol.round_timeout();
        assert!(matches!(
            protocol.cancel_stalled_round(&CallContext::new(player, late), dice, player),
            Err(Error::Unauthorized(_))
        ));
        assert_eq!(
            protocol.cancel_stalled_round(&CallContext::new(admin(), late), dice, player),
            Ok(Some(id))
        );
        assert_eq!(protocol.balance_of(&player), tokens(1_000));

        // A late fulfillment is rejected and moves nothing
        let err = protocol
            .on_fulfilled(&CallContext::new(oracle.address(), late + 1), id, RandomWord::from_u128(0))
            .unwrap_err();
        assert!(matches!(err, Error::RequestCancelled(_)));
        assert_eq!(protocol.balance_of(&player), tokens(1_000));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut protocol = deployed();
        let player = funded_player(&mut protocol, "alice", 1_000);
        let dice = protocol.dice_address();
        protocol
            .bet(&CallContext::new(player, DAY), dice, 25, tokens(50))
            .unwrap();

        let bytes = protocol.to_bytes().unwrap();
        let restored = Protocol::<Token>::from_bytes(&bytes).unwrap();
        assert_eq!(restored.state_hash(), protocol.state_hash());
        assert_eq!(restored.bet_status(&dice, &player), BetStatus::Placed);
        assert!(restored.verify_solvency().is_ok());
    }
}
