//! Envelope codec.
//!
//! # Data Flow
//! ```text
//! Outgoing: Message text → armor::wrap → armored text → SecureChannel
//! Incoming: SecureChannel → armored text → armor::unwrap → Message text
//! ```
//!
//! # Design Decisions
//! - Empty input is an error in both directions
//! - Decoding is whitespace-insensitive so line breaks survive any transport

pub mod armor;

pub use armor::{unwrap, unwrap_bookended, wrap, wrap_bookended, ArmorError};
