//! Protocol events for state change notifications.
//!
//! Every successful public operation records one or more events, so clients
//! can follow pool, game and governance activity without diffing state.

use serde::{Deserialize, Serialize};

use crate::core::token::TokenAmount;
use crate::governance::parameters::Parameter;
use crate::pool::registry::GameStatus;
use crate::utils::crypto::{Address, Hash, RequestId};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All protocol event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    // Pool Events
    /// Capital staked into the pool
    Staked(StakeEvent),
    /// Capital withdrawn from the pool
    Unstaked(StakeEvent),
    /// House reserve funded
    PoolFunded(PoolFundedEvent),

    // Token Events
    /// Tokens transferred between holders
    TokenTransfer(TokenTransferEvent),
    /// Allowance set
    TokenApproval(TokenApprovalEvent),

    // Authorization Events
    /// Game registered for approval
    GameRegistered(GameRegisteredEvent),
    /// Game approved or revoked
    GameApprovalChanged(GameApprovalEvent),

    // Round Events
    /// Bet placed and escrowed
    BetPlaced(BetPlacedEvent),
    /// Randomness requested for a round
    RandomnessRequested(RandomnessRequestedEvent),
    /// Round resolved and settled
    BetSettled(BetSettledEvent),
    /// Stalled round cancelled and refunded
    RoundCancelled(RoundCancelledEvent),

    // Administrative Events
    /// Governed parameter changed
    ParameterChanged(ParameterChangedEvent),
    /// Trusted oracle replaced
    OracleChanged(OracleChangedEvent),
}

impl ProtocolEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Staked(_) => "Staked",
            Self::Unstaked(_) => "Unstaked",
            Self::PoolFunded(_) => "PoolFunded",
            Self::TokenTransfer(_) => "TokenTransfer",
            Self::TokenApproval(_) => "TokenApproval",
            Self::GameRegistered(_) => "GameRegistered",
            Self::GameApprovalChanged(_) => "GameApprovalChanged",
            Self::BetPlaced(_) => "BetPlaced",
            Self::RandomnessRequested(_) => "RandomnessRequested",
            Self::BetSettled(_) => "BetSettled",
            Self::RoundCancelled(_) => "RoundCancelled",
            Self::ParameterChanged(_) => "ParameterChanged",
            Self::OracleChanged(_) => "OracleChanged",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Staked(e) | Self::Unstaked(e) => e.timestamp,
            Self::PoolFunded(e) => e.timestamp,
            Self::TokenTransfer(e) => e.timestamp,
            Self::TokenApproval(e) => e.timestamp,
            Self::GameRegistered(e) => e.timestamp,
            Self::GameApprovalChanged(e) => e.timestamp,
            Self::BetPlaced(e) => e.timestamp,
            Self::RandomnessRequested(e) => e.timestamp,
            Self::BetSettled(e) => e.timestamp,
            Self::RoundCancelled(e) => e.timestamp,
            Self::ParameterChanged(e) => e.timestamp,
            Self::OracleChanged(e) => e.timestamp,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Stake or withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeEvent {
    /// Staker
    pub staker: Address,
    /// Tokens moved
    pub amount: TokenAmount,
    /// Shares minted or burned
    pub shares: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when the house reserve is funded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolFundedEvent {
    /// Funder
    pub funder: Address,
    /// Tokens donated
    pub amount: TokenAmount,
    /// Pool balance afterwards
    pub new_balance: TokenAmount,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when tokens are transferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferEvent {
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Amount transferred
    pub amount: TokenAmount,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when an allowance is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenApprovalEvent {
    /// Holder
    pub owner: Address,
    /// Spender
    pub spender: Address,
    /// New allowance
    pub amount: TokenAmount,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTHORIZATION EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a game enters its approval cooldown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRegisteredEvent {
    /// Game address
    pub game: Address,
    /// Who registered it
    pub registered_by: Address,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a game's authorization changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameApprovalEvent {
    /// Game address
    pub game: Address,
    /// New status
    pub status: GameStatus,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUND EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a bet is placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetPlacedEvent {
    /// Game address
    pub game: Address,
    /// Player
    pub player: Address,
    /// Chosen number
    pub number: u32,
    /// Stake
    pub amount: TokenAmount,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a round asks for randomness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequestedEvent {
    /// Game address
    pub game: Address,
    /// Player
    pub player: Address,
    /// Request id
    pub request_id: RequestId,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a round is settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetSettledEvent {
    /// Game address
    pub game: Address,
    /// Player
    pub player: Address,
    /// Request that resolved the round
    pub request_id: RequestId,
    /// Mapped roll
    pub roll: u32,
    /// Whether the player won
    pub won: bool,
    /// Stake
    pub stake: TokenAmount,
    /// Amount paid to the player
    pub payout: TokenAmount,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a stalled round is cancelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCancelledEvent {
    /// Game address
    pub game: Address,
    /// Player refunded
    pub player: Address,
    /// Cancelled request, if one was issued
    pub request_id: Option<RequestId>,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADMINISTRATIVE EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a governed parameter changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChangedEvent {
    /// Parameter
    pub parameter: Parameter,
    /// Previous value
    pub old_value: u128,
    /// New value
    pub new_value: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when the trusted oracle changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleChangedEvent {
    /// Previous oracle
    pub old_oracle: Address,
    /// New oracle
    pub new_oracle: Address,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered collection of events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&ProtocolEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Merge another event log into this one
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Chained digest over all events, in order (zero for an empty log)
    pub fn digest(&self) -> Hash {
        self.events.iter().fold(Hash::zero(), |acc, event| {
            let mut data = Vec::with_capacity(64);
            data.extend_from_slice(acc.as_bytes());
            data.extend_from_slice(event.hash().as_bytes());
            Hash::sha256(&data)
        })
    }
}

impl IntoIterator for EventLog {
    type Item = ProtocolEvent;
    type IntoIter = std::vec::IntoIter<ProtocolEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(amount: u128, timestamp: u64) -> ProtocolEvent {
        ProtocolEvent::TokenTransfer(TokenTransferEvent {
            from: Address::derive("alice"),
            to: Address::derive("bob"),
            amount: TokenAmount::from_tokens(amount),
            timestamp,
        })
    }

    #[test]
    fn test_event_types() {
        let event = ProtocolEvent::Staked(StakeEvent {
            staker: Address::derive("alice"),
            amount: TokenAmount::from_tokens(1_000),
            shares: 1_000,
            timestamp: 1_234_567_890,
        });

        assert_eq!(event.event_type(), "Staked");
        assert_eq!(event.timestamp(), 1_234_567_890);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.push(transfer(10, 1));
        log.push(ProtocolEvent::GameRegistered(GameRegisteredEvent {
            game: Address::derive("dice"),
            registered_by: Address::derive("alice"),
            timestamp: 2,
        }));
        log.push(transfer(20, 3));

        assert_eq!(log.len(), 3);
        assert_eq!(log.filter_by_type("TokenTransfer").len(), 2);
        assert_eq!(log.filter_by_type("GameRegistered").len(), 1);
        assert!(log.filter_by_type("BetSettled").is_empty());
    }

    #[test]
    fn test_event_hash() {
        let event = transfer(10, 1);
        assert_eq!(event.hash(), event.hash());
        assert_ne!(event.hash(), transfer(10, 2).hash());
    }

    #[test]
    fn test_digest_depends_on_order() {
        let mut log = EventLog::new();
        assert!(log.digest().is_zero());

        log.push(transfer(10, 1));
        log.push(transfer(20, 2));
        let forward = log.digest();
        assert!(!forward.is_zero());

        let mut reversed = EventLog::new();
        reversed.push(transfer(20, 2));
        reversed.push(transfer(10, 1));
        assert_ne!(forward, reversed.digest());
    }
}
