//! Encrypted request/reply transport to a notary.
//!
//! # Data Flow
//! ```text
//! SecureChannel::connect(endpoint, notary key)
//!     → Connector::open (fresh local keypair, lazy socket)
//!
//! SecureChannel::send_raw (send deadline)
//!     → first use: TCP dial → curve.rs hello/welcome handshake
//!     → encrypted frame
//! SecureChannel::recv_raw (receive deadline)
//!     → encrypted frame → plaintext bytes
//!
//! Any failure → caller resets: close (linger) → new keypair → new socket
//! ```
//!
//! # Design Decisions
//! - Strict request/reply: one outstanding request per socket
//! - The dial happens on first send, so an unreachable notary is a send
//!   failure and is recovered through reset, never retried inline
//! - Deadlines are the only cancellation mechanism

pub mod curve;
#[cfg(test)]
pub(crate) mod fake;
pub mod keys;
pub mod listener;
pub mod secure;

pub use curve::{CurveConnector, CurveSocket};
pub use keys::{TransportKey, TransportKeypair};
pub use listener::{CurveListener, NotarySocket};
pub use secure::SecureChannel;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TransportConfig;

/// Errors from the encrypted transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Invalid transport key: {0}")]
    InvalidKey(String),

    #[error("Channel has no server key; connect first")]
    NotConnected,

    #[error("A request is already awaiting its reply")]
    RequestPending,

    #[error("No request is awaiting a reply")]
    NoRequestPending,

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Frame failed authentication")]
    Decrypt,

    #[error("Frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One request/reply socket.
#[async_trait]
pub trait Socket: Send {
    async fn send_raw(&mut self, payload: &[u8]) -> Result<(), ChannelError>;

    async fn recv_raw(&mut self) -> Result<Vec<u8>, ChannelError>;

    /// Close, spending at most the linger period on it.
    async fn close(&mut self);
}

/// Creates sockets bound to one notary.
pub trait Connector: Send + Sync {
    type Socket: Socket;

    /// Open a socket for `addr` (`host:port`). Must not block on the network.
    fn open(
        &self,
        addr: &str,
        server_key: &TransportKey,
        settings: &TransportConfig,
    ) -> Result<Self::Socket, ChannelError>;
}

/// Normalize `tcp://host:port` or `host:port` to `host:port`.
pub fn parse_endpoint(endpoint: &str) -> Result<String, ChannelError> {
    let invalid = || ChannelError::InvalidEndpoint(endpoint.to_string());

    let rest = match endpoint.split_once("://") {
        Some(("tcp", rest)) => rest,
        Some(_) => return Err(invalid()),
        None => endpoint,
    };

    let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.parse::<u16>().map_or(true, |p| p == 0) {
        return Err(invalid());
    }
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(parse_endpoint("tcp://127.0.0.1:7085").unwrap(), "127.0.0.1:7085");
        assert_eq!(parse_endpoint("notary.example:443").unwrap(), "notary.example:443");
        assert_eq!(parse_endpoint("tcp://[::1]:7085").unwrap(), "[::1]:7085");
    }

    #[test]
    fn test_parse_endpoint_rejects_malformed() {
        for bad in ["", "tcp://", "udp://host:1", "host", "host:0", "host:99999", ":7085"] {
            assert!(
                matches!(parse_endpoint(bad), Err(ChannelError::InvalidEndpoint(_))),
                "accepted {bad:?}"
            );
        }
    }
}
