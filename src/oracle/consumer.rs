//! Randomness consumer.
//!
//! Issues one request per game round and accepts exactly one fulfillment for it,
//! from the configured oracle identity only. The consumer never resolves rounds
//! itself: the protocol validates a fulfillment here, lets the requesting game
//! settle, and only then marks the request fulfilled.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::core::context::CallContext;
use crate::error::{Error, Result};
use crate::oracle::sources::RandomnessOracle;
use crate::utils::constants::HASH_LENGTH;
use crate::utils::crypto::{create_message_hash, Address, Hash, RequestId};
use crate::utils::math::mod_be_bytes;

// ═══════════════════════════════════════════════════════════════════════════════
// RANDOM WORD
// ═══════════════════════════════════════════════════════════════════════════════

/// A 256-bit random value delivered by the oracle (big-endian)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RandomWord([u8; HASH_LENGTH]);

impl Serialize for RandomWord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for RandomWord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hash = Hash::deserialize(deserializer)?;
        Ok(Self(*hash.as_bytes()))
    }
}

impl RandomWord {
    /// Create from raw bytes
    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Value whose low 128 bits are `value`
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; HASH_LENGTH];
        bytes[HASH_LENGTH - 16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Get the value as bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// The full 256-bit value reduced modulo `n`
    pub fn modulo(&self, n: u32) -> u32 {
        mod_be_bytes(&self.0, n)
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<Hash> for RandomWord {
    fn from(hash: Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl fmt::Debug for RandomWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomWord({}...)", &self.to_hex()[..16])
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUESTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of a randomness request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    /// Waiting for the oracle
    Pending,
    /// Value delivered
    Fulfilled {
        /// Delivered value
        value: RandomWord,
        /// Fulfillment time
        fulfilled_at: u64,
    },
    /// Voided by administrative recovery
    Cancelled {
        /// Cancellation time
        cancelled_at: u64,
    },
}

impl RequestState {
    /// Whether the request still awaits fulfillment
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }
}

/// A randomness request issued for one game round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    /// Request id
    pub id: RequestId,
    /// Game that asked for the value
    pub requester: Address,
    /// Seed the oracle must derive the value from
    pub seed: Hash,
    /// Request time
    pub requested_at: u64,
    /// Current state
    pub state: RequestState,
}

impl RandomnessRequest {
    /// Seconds the request has been waiting at `now`
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.requested_at)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSUMER
// ═══════════════════════════════════════════════════════════════════════════════

/// Issues randomness requests and gates their fulfillment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessConsumer {
    address: Address,
    admin: Address,
    oracle: Address,
    nonce: u64,
    requests: HashMap<RequestId, RandomnessRequest>,
}

impl RandomnessConsumer {
    /// Create a consumer trusting `oracle`
    pub fn new(address: Address, admin: Address, oracle: Address) -> Self {
        Self {
            address,
            admin,
            oracle,
            nonce: 0,
            requests: HashMap::new(),
        }
    }

    /// Consumer address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Oracle identity allowed to fulfill
    pub fn oracle(&self) -> Address {
        self.oracle
    }

    /// Replace the trusted oracle (admin only)
    pub fn set_oracle(&mut self, ctx: &CallContext, oracle: Address) -> Result<()> {
        if ctx.caller != self.admin {
            return Err(Error::Unauthorized("only the admin may set the oracle".into()));
        }
        info!(old = %self.oracle, new = %oracle, "Randomness oracle changed");
        self.oracle = oracle;
        Ok(())
    }

    /// Issue a request for `requester` and hand it to the oracle
    pub fn request_randomness<O: RandomnessOracle + ?Sized>(
        &mut self,
        oracle: &mut O,
        requester: Address,
        now: u64,
    ) -> Result<RequestId> {
        let nonce = self.nonce.checked_add(1).ok_or(Error::Overflow {
            operation: "request nonce".into(),
        })?;
        let id = RequestId::generate(&self.address, nonce, &requester, now);
        let request = RandomnessRequest {
            id,
            requester,
            seed: create_message_hash("randomness", id.as_bytes()),
            requested_at: now,
            state: RequestState::Pending,
        };

        oracle.submit(&request)?;

        self.nonce = nonce;
        self.requests.insert(id, request);
        debug!(request = %id.short(), %requester, "Randomness requested");
        Ok(id)
    }

    /// Check that `ctx.caller` may fulfill `id` now, without changing state
    pub fn validate_fulfillment(&self, ctx: &CallContext, id: &RequestId) -> Result<&RandomnessRequest> {
        if ctx.caller != self.oracle {
            warn!(caller = %ctx.caller, request = %id.short(), "Fulfillment from non-oracle rejected");
            return Err(Error::Unauthorized("only the oracle may fulfill requests".into()));
        }
        let request = self
            .requests
            .get(id)
            .ok_or_else(|| Error::UnknownRequest(id.to_hex()))?;
        match request.state {
            RequestState::Pending => Ok(request),
            RequestState::Fulfilled { .. } => {
                warn!(request = %id.short(), "Duplicate fulfillment rejected");
                Err(Error::AlreadyFulfilled(id.to_hex()))
            }
            RequestState::Cancelled { .. } => {
                warn!(request = %id.short(), "Fulfillment of cancelled request rejected");
                Err(Error::RequestCancelled(id.to_hex()))
            }
        }
    }

    /// Pending -> Fulfilled
    pub fn mark_fulfilled(&mut self, id: &RequestId, value: RandomWord, now: u64) -> Result<()> {
        let request = self.pending_mut(id)?;
        request.state = RequestState::Fulfilled {
            value,
            fulfilled_at: now,
        };
        Ok(())
    }

    /// Pending -> Cancelled
    pub fn cancel(&mut self, id: &RequestId, now: u64) -> Result<()> {
        let request = self.pending_mut(id)?;
        request.state = RequestState::Cancelled { cancelled_at: now };
        info!(request = %id.short(), "Randomness request cancelled");
        Ok(())
    }

    fn pending_mut(&mut self, id: &RequestId) -> Result<&mut RandomnessRequest> {
        let request = self
            .requests
            .get_mut(id)
            .ok_or_else(|| Error::UnknownRequest(id.to_hex()))?;
        match request.state {
            RequestState::Pending => Ok(request),
            RequestState::Fulfilled { .. } => Err(Error::AlreadyFulfilled(id.to_hex())),
            RequestState::Cancelled { .. } => Err(Error::RequestCancelled(id.to_hex())),
        }
    }

    /// Look up a request
    pub fn request(&self, id: &RequestId) -> Option<&RandomnessRequest> {
        self.requests.get(id)
    }

    /// Delivered value of a fulfilled request
    pub fn value_of(&self, id: &RequestId) -> Option<RandomWord> {
        match self.requests.get(id)?.state {
            RequestState::Fulfilled { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Requests still waiting for the oracle, oldest first
    pub fn pending_requests(&self) -> Vec<&RandomnessRequest> {
        let mut pending: Vec<_> = self
            .requests
            .values()
            .filter(|r| r.state.is_pending())
            .collect();
        pending.sort_by_key(|r| (r.requested_at, r.id));
        pending
    }

    /// Get consumer statistics
    pub fn statistics(&self) -> ConsumerStats {
        let mut stats = ConsumerStats {
            total_requests: self.requests.len() as u64,
            ..Default::default()
        };
        for request in self.requests.values() {
            match request.state {
                RequestState::Pending => stats.pending += 1,
                RequestState::Fulfilled { .. } => stats.fulfilled += 1,
                RequestState::Cancelled { .. } => stats.cancelled += 1,
            }
        }
        stats
    }
}

/// Randomness consumer statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub total_requests: u64,
    pub pending: u64,
    pub fulfilled: u64,
    pub cancelled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::sources::ManualOracle;

    fn admin() -> Address {
        Address::derive("admin")
    }

    fn game() -> Address {
        Address::derive("dice")
    }

    fn setup() -> (RandomnessConsumer, ManualOracle) {
        let oracle = ManualOracle::new(Address::derive("oracle"));
        let consumer = RandomnessConsumer::new(Address::derive("consumer"), admin(), oracle.address());
        (consumer, oracle)
    }

    #[test]
    fn test_random_word_modulo() {
        assert_eq!(RandomWord::from_u128(39).modulo(100), 39);
        assert_eq!(RandomWord::from_u128(139).modulo(100), 39);
        assert_eq!(RandomWord::new([0xff; 32]).modulo(2), 1);
    }

    #[test]
    fn test_request_is_submitted_and_pending() {
        let (mut consumer, mut oracle) = setup();
        let id = consumer.request_randomness(&mut oracle, game(), 100).unwrap();

        assert_eq!(oracle.submitted().len(), 1);
        assert_eq!(oracle.submitted()[0].id, id);
        assert_eq!(consumer.pending_requests().len(), 1);
        assert_eq!(consumer.request(&id).unwrap().requester, game());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let (mut consumer, mut oracle) = setup();
        let a = consumer.request_randomness(&mut oracle, game(), 100).unwrap();
        let b = consumer.request_randomness(&mut oracle, game(), 100).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fulfillment_validation() {
        let (mut consumer, mut oracle) = setup();
        let id = consumer.request_randomness(&mut oracle, game(), 100).unwrap();
        let oracle_ctx = CallContext::new(oracle.address(), 101);

        let stranger = CallContext::new(Address::derive("stranger"), 101);
        assert!(matches!(
            consumer.validate_fulfillment(&stranger, &id),
            Err(Error::Unauthorized(_))
        ));

        let unknown = RequestId::new([7u8; 32]);
        assert!(matches!(
            consumer.validate_fulfillment(&oracle_ctx, &unknown),
            Err(Error::UnknownRequest(_))
        ));

        consumer.validate_fulfillment(&oracle_ctx, &id).unwrap();
        consumer.mark_fulfilled(&id, RandomWord::from_u128(5), 101).unwrap();
        assert_eq!(consumer.value_of(&id), Some(RandomWord::from_u128(5)));
        assert!(matches!(
            consumer.validate_fulfillment(&oracle_ctx, &id),
            Err(Error::AlreadyFulfilled(_))
        ));
        assert!(consumer.mark_fulfilled(&id, RandomWord::from_u128(6), 102).is_err());
        assert_eq!(consumer.value_of(&id), Some(RandomWord::from_u128(5)));
    }

    #[test]
    fn test_cancelled_request_rejects_fulfillment() {
        let (mut consumer, mut oracle) = setup();
        let id = consumer.request_randomness(&mut oracle, game(), 100).unwrap();
        consumer.cancel(&id, 200).unwrap();

        let oracle_ctx = CallContext::new(oracle.address(), 201);
        assert!(matches!(
            consumer.validate_fulfillment(&oracle_ctx, &id),
            Err(Error::RequestCancelled(_))
        ));
        assert!(consumer.cancel(&id, 202).is_err());
        assert_eq!(consumer.statistics().cancelled, 1);
    }

    #[test]
    fn test_set_oracle_admin_only() {
        let (mut consumer, _) = setup();
        let new_oracle = Address::derive("new-oracle");

        let err = consumer
            .set_oracle(&CallContext::new(game(), 0), new_oracle)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        consumer.set_oracle(&CallContext::new(admin(), 0), new_oracle).unwrap();
        assert_eq!(consumer.oracle(), new_oracle);
    }
}
