//! Core modules for the Gembites protocol.
//!
//! This module contains the fundamental building blocks:
//! - Deployment configuration
//! - Call context (caller identity and time)
//! - The wagering token and the ledger capability

pub mod config;
pub mod context;
pub mod token;

pub use config::*;
pub use context::*;
pub use token::*;
