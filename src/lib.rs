//! Notary client library
//!
//! Encrypted request/reply messaging with a notary, and basket currency
//! contracts.

pub mod config;
pub mod observability;

pub mod channel;
pub mod envelope;

pub mod contract;
pub mod identity;

pub mod basket;
pub mod client;

pub use basket::Basket;
pub use channel::SecureChannel;
pub use client::{SendError, ServerConnection};
pub use config::ClientConfig;
