//! Monitoring for Gembites deployments.
//!
//! - **Health**: solvency, outstanding randomness and liquidity checks

pub mod health;

pub use health::*;
