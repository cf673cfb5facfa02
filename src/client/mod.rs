//! Client side of the notary protocol.
//!
//! # Data Flow
//! ```text
//! ServerConnection::send(server, nym, message)
//!     → check server is this connection's notary
//!     → Message::save_contract_raw → armor::wrap
//!     → SecureChannel::send_raw → SecureChannel::recv_raw
//!         (failure: network_failure = true, channel reset, error)
//!     → armor::unwrap → Message::load_contract_from_string
//!         (failure: error, channel untouched)
//!     → ReplyProcessor::process(reply, Session { server, nym })
//! ```
//!
//! # Design Decisions
//! - The failure flag belongs to the connection, not the process
//! - Request context travels as an explicit `Session`, never stored
//! - No retry loop: callers decide whether to send again

pub mod connection;
pub mod error;
pub mod processor;
pub mod session;

pub use connection::{ConnectionId, ServerConnection};
pub use error::SendError;
pub use processor::{ReplyInbox, ReplyProcessor};
pub use session::Session;
