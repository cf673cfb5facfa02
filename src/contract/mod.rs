//! Contracts and their text form.
//!
//! # Data Flow
//! ```text
//! Message / ServerContract / Basket
//!     → tag.rs (deterministic element text)
//!     → identifier.rs (digest → content id)
//!
//! Contract text
//!     → reader.rs (element by element)
//!     → Message::load_contract_from_string / Basket::process_xml_node
//! ```
//!
//! # Design Decisions
//! - Content ids are digests of generated text, so emission order is fixed
//! - All data lives in attributes; the reader ignores text nodes

pub mod identifier;
pub mod message;
pub mod reader;
pub mod server;
pub mod tag;

pub use identifier::Identifier;
pub use message::Message;
pub use reader::{Element, ElementReader};
pub use server::ServerContract;
pub use tag::Tag;

use thiserror::Error;

/// Errors from parsing or loading contracts.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Malformed contract text: {0}")]
    Xml(String),

    #[error("Missing element <{0}>")]
    MissingElement(&'static str),

    #[error("Missing attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("Invalid value for attribute '{0}'")]
    InvalidAttribute(&'static str),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Contract id mismatch: expected {expected}, computed {actual}")]
    IdMismatch { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
