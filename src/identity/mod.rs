//! Identities and their persistence.
//!
//! # Data Flow
//! ```text
//! NymStore (file / memory)
//!     → PersistentNym (Nym + store)
//!     → &mut dyn Identity
//!         ← ServerConnection session: request number updates
//!         ← Basket harvest: closing number clawback
//! ```
//!
//! # Design Decisions
//! - Mutations stay in memory until persisted; callers choose when to write
//! - Numbers are keyed by notary id text so the JSON form is readable

pub mod nym;
pub mod store;

pub use nym::Nym;
pub use store::{FileNymStore, MemoryNymStore, NymStore, PersistentNym};

use std::path::PathBuf;

use thiserror::Error;

use crate::contract::Identifier;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Nym not found: {0}")]
    NotFound(String),

    #[error("Cannot store a Nym with an empty id")]
    EmptyId,

    #[error("Stored Nym at {0} has a different id")]
    IdMismatch(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The acting identity of a request.
pub trait Identity: Send {
    fn nym_id(&self) -> &Identifier;

    /// Set the next request number for `notary` and save.
    fn update_request_number(&mut self, notary: &Identifier, number: i64) -> Result<(), StoreError>;

    /// Return a spent number to the available pool, saving now if asked and
    /// if the number came back. Returns whether it did.
    fn clawback_transaction_number(
        &mut self,
        notary: &Identifier,
        number: i64,
        persist_now: bool,
    ) -> Result<bool, StoreError>;

    fn persist(&mut self) -> Result<(), StoreError>;
}
