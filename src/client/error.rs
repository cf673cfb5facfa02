use thiserror::Error;

use crate::channel::ChannelError;
use crate::contract::ContractError;
use crate::envelope::ArmorError;

/// Why a `send` did not deliver a reply.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Server contract {actual} is not this connection's notary ({expected})")]
    NotaryMismatch { expected: String, actual: String },

    #[error("Envelope error: {0}")]
    Armor(#[from] ArmorError),

    #[error("Reply is not UTF-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Malformed reply: {0}")]
    Message(#[from] ContractError),

    /// Only built where the connection also resets its channel.
    #[error("Transport error: {0}")]
    Transport(ChannelError),
}

impl SendError {
    /// Transport failures reset the channel; everything else leaves it alone.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, SendError::Transport(_))
    }
}
