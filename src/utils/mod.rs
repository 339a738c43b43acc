//! Utility modules for the Gembites protocol.
//!
//! This module contains shared utilities used across the protocol:
//! - Cryptographic primitives and identities
//! - Wide fixed-point arithmetic
//! - Constants

pub mod constants;
pub mod crypto;
pub mod math;

pub use constants::*;
pub use crypto::*;
pub use math::*;
