//! Randomness sources.
//!
//! This module defines the outgoing oracle capability and two sources:
//! - [`ManualOracle`]: records requests; the caller chooses the values (tests, replay)
//! - [`SigningOracle`]: derives each value from a secp256k1 signature over the
//!   request seed, so anyone holding the oracle public key can verify it

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::oracle::consumer::{RandomWord, RandomnessRequest};
use crate::utils::crypto::{Address, Hash, KeyPair, PublicKey, RequestId, Signature};

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Capability to hand a request to the randomness provider
pub trait RandomnessOracle {
    /// Identity that will call back with the value
    fn address(&self) -> Address;

    /// Accept a request for later fulfillment
    fn submit(&mut self, request: &RandomnessRequest) -> Result<()>;
}

impl<O: RandomnessOracle + ?Sized> RandomnessOracle for Box<O> {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn submit(&mut self, request: &RandomnessRequest) -> Result<()> {
        (**self).submit(request)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MANUAL ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Oracle that only records what it was asked for
#[derive(Debug, Clone, Default)]
pub struct ManualOracle {
    address: Address,
    submitted: Vec<RandomnessRequest>,
}

impl ManualOracle {
    /// Create an oracle answering as `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            submitted: Vec::new(),
        }
    }

    /// Requests received so far
    pub fn submitted(&self) -> &[RandomnessRequest] {
        &self.submitted
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<&RandomnessRequest> {
        self.submitted.last()
    }
}

impl RandomnessOracle for ManualOracle {
    fn address(&self) -> Address {
        self.address
    }

    fn submit(&mut self, request: &RandomnessRequest) -> Result<()> {
        self.submitted.push(request.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNING ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// A verifiable answer to one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    /// Request being answered
    pub request_id: RequestId,
    /// Seed that was signed
    pub seed: Hash,
    /// Signature over the seed
    pub signature: Signature,
    /// `sha256(signature)`
    pub value: RandomWord,
}

/// Oracle that signs request seeds with its key
#[derive(Debug, Clone)]
pub struct SigningOracle {
    keypair: KeyPair,
    queue: Vec<RandomnessRequest>,
}

impl SigningOracle {
    /// Create an oracle from its key pair
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            queue: Vec::new(),
        }
    }

    /// Public key fulfillments verify against
    pub fn public_key(&self) -> &PublicKey {
        self.keypair.public_key()
    }

    /// Requests waiting to be answered
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Answer a single request
    pub fn fulfill(&self, request: &RandomnessRequest) -> Fulfillment {
        let signature = self.keypair.sign(&request.seed);
        Fulfillment {
            request_id: request.id,
            seed: request.seed,
            signature,
            value: RandomWord::from(Hash::sha256(signature.as_bytes())),
        }
    }

    /// Answer every queued request, oldest first
    pub fn drain_fulfillments(&mut self) -> Vec<Fulfillment> {
        let queue = std::mem::take(&mut self.queue);
        queue.iter().map(|r| self.fulfill(r)).collect()
    }
}

impl RandomnessOracle for SigningOracle {
    fn address(&self) -> Address {
        self.keypair.address()
    }

    fn submit(&mut self, request: &RandomnessRequest) -> Result<()> {
        debug!(request = %request.id.short(), "Request queued for signing");
        self.queue.push(request.clone());
        Ok(())
    }
}

/// Check a fulfillment against the oracle's public key
pub fn verify_fulfillment(oracle: &PublicKey, fulfillment: &Fulfillment) -> bool {
    oracle.verify(&fulfillment.seed, &fulfillment.signature)
        && fulfillment.value == RandomWord::from(Hash::sha256(fulfillment.signature.as_bytes()))
}
