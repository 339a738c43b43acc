//! Cryptographic primitives for the Gembites protocol.
//!
//! This module provides:
//! - Hashes (SHA256)
//! - secp256k1 private/public keys and compact ECDSA signatures
//! - Account addresses derived from public keys
//! - Randomness request identifiers

use secp256k1::{
    ecdsa::Signature as Secp256k1Signature, Message, PublicKey as Secp256k1PubKey, Secp256k1,
    SecretKey,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::{ADDRESS_LENGTH, HASH_LENGTH, PUBKEY_LENGTH, SIGNATURE_LENGTH};

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

thread_local! {
    static SECP: Secp256k1<secp256k1::All> = Secp256k1::new();
}

fn with_secp<F, R>(f: F) -> R
where
    F: FnOnce(&Secp256k1<secp256k1::All>) -> R,
{
    SECP.with(|secp| f(secp))
}

/// Hex-encodes fixed-size byte arrays for serde
fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn deserialize_hex<'de, D: Deserializer<'de>, const N: usize>(
    deserializer: D,
) -> std::result::Result<[u8; N], D::Error> {
    let s = String::deserialize(deserializer)?;
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != N {
        return Err(serde::de::Error::custom(format!(
            "expected {} bytes, got {}",
            N,
            bytes.len()
        )));
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

fn decode_fixed<const N: usize>(name: &str, s: &str) -> Result<[u8; N]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| Error::InvalidParameter {
        name: name.into(),
        reason: e.to_string(),
    })?;
    if bytes.len() != N {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: format!("expected {} bytes, got {}", N, bytes.len()),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HASH
// ═══════════════════════════════════════════════════════════════════════════════

/// A 32-byte cryptographic hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_LENGTH]);

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_hex::<D, HASH_LENGTH>(deserializer).map(Hash)
    }
}

impl Hash {
    /// Create a new hash from bytes
    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Compute SHA256 hash of data
    pub fn sha256(data: &[u8]) -> Self {
        let result = Sha256::digest(data);
        let mut bytes = [0u8; HASH_LENGTH];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Get the hash as bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_fixed::<HASH_LENGTH>("hash", s).map(Self)
    }

    /// Zero hash (all zeros)
    pub fn zero() -> Self {
        Self([0u8; HASH_LENGTH])
    }

    /// Check if hash is zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LENGTH]
    }

    /// Convert to secp256k1 Message for signing
    pub fn to_message(&self) -> Message {
        Message::from_digest(self.0)
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Create a message hash for signing with domain separation
pub fn create_message_hash(operation: &str, data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(b"gembites:");
    hasher.update(operation.as_bytes());
    hasher.update(b":");
    hasher.update(data);
    let mut bytes = [0u8; HASH_LENGTH];
    bytes.copy_from_slice(&hasher.finalize());
    Hash::new(bytes)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRIVATE KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Private key length in bytes
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// A secp256k1 private key for signing operations
#[derive(Clone)]
pub struct PrivateKey {
    inner: SecretKey,
}

impl PrivateKey {
    /// Create a new private key from a slice
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != PRIVATE_KEY_LENGTH {
            return Err(Error::InvalidParameter {
                name: "private_key".into(),
                reason: format!("expected {} bytes, got {}", PRIVATE_KEY_LENGTH, slice.len()),
            });
        }
        let inner = SecretKey::from_slice(slice).map_err(|e| Error::CryptoError {
            operation: "private_key_from_slice".into(),
            details: e.to_string(),
        })?;
        Ok(Self { inner })
    }

    /// Generate a new random private key
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self { inner: SecretKey::new(&mut rng) }
    }

    /// Derive a key from a seed phrase (simulation and test identities)
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        Self::from_slice(Hash::sha256(seed).as_bytes())
    }

    /// Create from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_fixed::<PRIVATE_KEY_LENGTH>("private_key", s)?;
        Self::from_slice(&bytes)
    }

    /// Convert to hex string (SECURITY: be careful with this)
    pub fn to_hex(&self) -> String {
        hex::encode(self.inner.secret_bytes())
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        with_secp(|secp| {
            let pk = Secp256k1PubKey::from_secret_key(secp, &self.inner);
            PublicKey::new(pk.serialize())
        })
    }

    /// Sign a message hash (RFC 6979 deterministic nonce)
    pub fn sign(&self, message: &Hash) -> Signature {
        with_secp(|secp| {
            let sig = secp.sign_ecdsa(&message.to_message(), &self.inner);
            Signature::new(sig.serialize_compact())
        })
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A compressed secp256k1 public key (33 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBKEY_LENGTH]);

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_hex::<D, PUBKEY_LENGTH>(deserializer).map(PublicKey)
    }
}

impl PublicKey {
    /// Create a new public key from bytes (must be valid compressed format)
    pub fn new(bytes: [u8; PUBKEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse and validate from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = decode_fixed::<PUBKEY_LENGTH>("public_key", s)?;
        Secp256k1PubKey::from_slice(&bytes).map_err(|e| Error::CryptoError {
            operation: "public_key_parse".into(),
            details: e.to_string(),
        })?;
        Ok(Self(bytes))
    }

    /// Get the public key as bytes
    pub fn as_bytes(&self) -> &[u8; PUBKEY_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify that this is a valid secp256k1 public key
    pub fn is_valid(&self) -> bool {
        Secp256k1PubKey::from_slice(&self.0).is_ok()
    }

    /// Account address controlled by this key
    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }

    /// Verify a signature against this public key
    pub fn verify(&self, message: &Hash, signature: &Signature) -> bool {
        verify_signature(self, message, signature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNATURE
// ═══════════════════════════════════════════════════════════════════════════════

/// A compact ECDSA signature (64 bytes)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_hex::<D, SIGNATURE_LENGTH>(deserializer).map(Signature)
    }
}

impl Signature {
    /// Create a new signature from bytes
    pub fn new(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the signature as bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

/// Verify a signature against a message and public key
pub fn verify_signature(pubkey: &PublicKey, message: &Hash, signature: &Signature) -> bool {
    let Ok(pk) = Secp256k1PubKey::from_slice(pubkey.as_bytes()) else {
        return false;
    };
    let Ok(sig) = Secp256k1Signature::from_compact(signature.as_bytes()) else {
        return false;
    };
    with_secp(|secp| secp.verify_ecdsa(&message.to_message(), &sig, &pk).is_ok())
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A key pair containing both private and public keys
#[derive(Clone)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_private(PrivateKey::generate())
    }

    /// Create from a private key
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Deterministic key pair from a seed phrase
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        Ok(Self::from_private(PrivateKey::from_seed(seed)?))
    }

    /// Get the private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Address controlled by this key pair
    pub fn address(&self) -> Address {
        self.public.address()
    }

    /// Sign a message hash
    pub fn sign(&self, message: &Hash) -> Signature {
        self.private.sign(message)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair {{ public: {:?} }}", self.public)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A 20-byte account identity
///
/// Externally owned accounts use the last 20 bytes of `sha256(compressed pubkey)`.
/// Protocol components (pool, games, consumer) use [`Address::derive`] on a label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_hex::<D, ADDRESS_LENGTH>(deserializer).map(Address)
    }
}

impl Address {
    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Address of the account controlled by `pubkey`
    pub fn from_public_key(pubkey: &PublicKey) -> Self {
        Self::from_hash(&Hash::sha256(pubkey.as_bytes()))
    }

    /// Deterministic address for a protocol component
    pub fn derive(label: &str) -> Self {
        Self::from_hash(&create_message_hash("address", label.as_bytes()))
    }

    fn from_hash(hash: &Hash) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&hash.as_bytes()[HASH_LENGTH - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Get the address as bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Convert to 0x-prefixed hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without 0x prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_fixed::<ADDRESS_LENGTH>("address", s).map(Self)
    }

    /// Short representation for display
    pub fn short(&self) -> String {
        let hex = hex::encode(self.0);
        format!("0x{}..{}", &hex[..6], &hex[hex.len() - 4..])
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque identifier of a randomness request
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId([u8; HASH_LENGTH]);

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_hex::<D, HASH_LENGTH>(deserializer).map(RequestId)
    }
}

impl RequestId {
    /// Create a request id from raw bytes
    pub fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive a request id from the consumer, its nonce, the requester and the time
    pub fn generate(consumer: &Address, nonce: u64, requester: &Address, timestamp: u64) -> Self {
        let mut data = Vec::with_capacity(2 * ADDRESS_LENGTH + 16);
        data.extend_from_slice(consumer.as_bytes());
        data.extend_from_slice(&nonce.to_be_bytes());
        data.extend_from_slice(requester.as_bytes());
        data.extend_from_slice(&timestamp.to_be_bytes());
        Self(*Hash::sha256(&data).as_bytes())
    }

    /// Get the id as bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_fixed::<HASH_LENGTH>("request_id", s).map(Self)
    }

    /// Short representation for display
    pub fn short(&self) -> String {
        let hex = self.to_hex();
        format!("{}...{}", &hex[..8], &hex[hex.len() - 8..])
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.short())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_sha256() {
        let hash = Hash::sha256(b"hello world");
        let expected =
            Hash::from_hex("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
                .unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_signature_verification() {
        let private = PrivateKey::generate();
        let public = private.public_key();
        let message = Hash::sha256(b"hello gembites");

        let signature = private.sign(&message);
        assert!(verify_signature(&public, &message, &signature));

        let other_message = Hash::sha256(b"different");
        assert!(!verify_signature(&public, &other_message, &signature));

        let other_public = PrivateKey::generate().public_key();
        assert!(!verify_signature(&other_public, &message, &signature));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let keypair = KeyPair::from_seed(b"oracle").unwrap();
        let message = Hash::sha256(b"seed");
        assert_eq!(keypair.sign(&message), keypair.sign(&message));
    }

    #[test]
    fn test_address_derivation() {
        let keypair = KeyPair::from_seed(b"alice").unwrap();
        let again = KeyPair::from_seed(b"alice").unwrap();
        let other = KeyPair::from_seed(b"bob").unwrap();

        assert_eq!(keypair.address(), again.address());
        assert_ne!(keypair.address(), other.address());
        assert_ne!(Address::derive("pool"), Address::derive("dice"));
    }

    #[test]
    fn test_address_hex_forms() {
        let address = Address::derive("pool");
        let hex = address.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(Address::from_hex(&hex).unwrap(), address);
        assert_eq!(Address::from_hex(&hex[2..]).unwrap(), address);
        assert!(Address::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_request_id_generation() {
        let consumer = Address::derive("consumer");
        let game = Address::derive("dice");

        let id1 = RequestId::generate(&consumer, 1, &game, 100);
        let id2 = RequestId::generate(&consumer, 2, &game, 100);
        let id1_again = RequestId::generate(&consumer, 1, &game, 100);

        assert_ne!(id1, id2);
        assert_eq!(id1, id1_again);
        assert_eq!(RequestId::from_hex(&id1.to_hex()).unwrap(), id1);
    }

    #[test]
    fn test_public_key_validation() {
        let keypair = KeyPair::generate();
        assert!(keypair.public_key().is_valid());
        assert!(PublicKey::from_hex(&keypair.public_key().to_hex()).is_ok());

        let mut invalid_bytes = [0u8; PUBKEY_LENGTH];
        invalid_bytes[0] = 0x04;
        assert!(!PublicKey::new(invalid_bytes).is_valid());
    }

    #[test]
    fn test_private_key_hex_roundtrip() {
        let original = PrivateKey::generate();
        let recovered = PrivateKey::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original.public_key(), recovered.public_key());
    }

    #[test]
    fn test_serde_json_forms() {
        let keypair = KeyPair::generate();
        let address = keypair.address();

        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", hex::encode(address.as_bytes())));
        let recovered: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, address);

        let sig = keypair.sign(&Hash::sha256(b"x"));
        let sig_json = serde_json::to_string(&sig).unwrap();
        let sig_recovered: Signature = serde_json::from_str(&sig_json).unwrap();
        assert_eq!(sig, sig_recovered);
    }

    #[test]
    fn test_message_hash_domain_separation() {
        let hash1 = create_message_hash("randomness", &[1, 2, 3]);
        let hash2 = create_message_hash("randomness", &[1, 2, 3]);
        let hash3 = create_message_hash("address", &[1, 2, 3]);

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }
}
