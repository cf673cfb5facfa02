//! Connection to one notary.
//!
//! # Responsibilities
//! - Bind a [`SecureChannel`] to a notary's endpoint and transport key
//! - Run the request/reply cycle of `send`
//! - Reset the channel after transport failures so the next send starts clean

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::channel::{ChannelError, Connector, CurveConnector, SecureChannel};
use crate::client::error::SendError;
use crate::client::processor::{ReplyInbox, ReplyProcessor};
use crate::client::session::Session;
use crate::contract::{Identifier, Message, ServerContract};
use crate::envelope;
use crate::identity::Identity;
use crate::observability::metrics;

/// Relaxed ordering is enough: ids only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique id used to correlate log lines of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A client's connection to one notary.
///
/// `send` takes `&mut self`: one request is in flight at a time.
pub struct ServerConnection<P: ReplyProcessor = ReplyInbox, C: Connector = CurveConnector> {
    id: ConnectionId,
    notary_id: Identifier,
    channel: SecureChannel<C>,
    processor: P,
    network_failure: bool,
}

impl<P: ReplyProcessor> ServerConnection<P, CurveConnector> {
    /// Connect to the notary described by `server`.
    pub fn new(server: &ServerContract, processor: P) -> Result<Self, ChannelError> {
        Self::with_channel(server, processor, SecureChannel::new())
    }
}

impl<P: ReplyProcessor, C: Connector> ServerConnection<P, C> {
    /// Connect `channel` to the notary described by `server`.
    pub fn with_channel(
        server: &ServerContract,
        processor: P,
        mut channel: SecureChannel<C>,
    ) -> Result<Self, ChannelError> {
        channel.connect(server.endpoint(), server.public_transport_key())?;

        let id = ConnectionId::new();
        tracing::info!(
            connection_id = %id,
            notary_id = %server.id(),
            endpoint = server.endpoint(),
            "Connected to notary"
        );

        Ok(Self {
            id,
            notary_id: server.id().clone(),
            channel,
            processor,
            network_failure: false,
        })
    }

    /// Send `message` on behalf of `nym` and hand the reply to the processor.
    ///
    /// Transport failures set [`network_failure`](Self::network_failure) and
    /// reset the channel before returning. A reply that arrives but cannot be
    /// decoded is an error that leaves the channel as it is.
    pub async fn send(
        &mut self,
        server: &ServerContract,
        nym: &mut dyn Identity,
        message: &Message,
    ) -> Result<(), SendError> {
        let start = Instant::now();
        let result = self.exchange(server, nym, message).await;

        let outcome = match &result {
            Ok(()) => "ok",
            Err(e) if e.is_network_failure() => "network_failure",
            Err(SendError::NotaryMismatch { .. }) => "rejected",
            Err(_) => "bad_reply",
        };
        metrics::record_send(outcome, start);

        if let Err(e) = &result {
            tracing::warn!(
                connection_id = %self.id,
                command = %message.command,
                request_num = message.request_num,
                error = %e,
                "Send failed"
            );
        }
        result
    }

    async fn exchange(
        &mut self,
        server: &ServerContract,
        nym: &mut dyn Identity,
        message: &Message,
    ) -> Result<(), SendError> {
        if server.id() != &self.notary_id {
            return Err(SendError::NotaryMismatch {
                expected: self.notary_id.to_string(),
                actual: server.id().to_string(),
            });
        }

        let raw = message.save_contract_raw();
        let mut session = Session::new(server, nym);
        self.network_failure = false;

        tracing::debug!(
            connection_id = %self.id,
            command = %message.command,
            request_num = message.request_num,
            "BEGIN send"
        );

        let armored = envelope::wrap(&raw)?;

        if let Err(e) = self.channel.send_raw(armored.as_bytes()).await {
            return Err(self.transport_failed(e).await);
        }
        let reply = match self.channel.recv_raw().await {
            Ok(reply) => reply,
            Err(e) => return Err(self.transport_failed(e).await),
        };

        let reply = String::from_utf8(reply)?;
        let text = envelope::unwrap(&reply)?;
        let reply = Message::load_contract_from_string(&text)?;

        tracing::debug!(
            connection_id = %self.id,
            command = %reply.command,
            request_num = reply.request_num,
            success = reply.success,
            "END send"
        );

        self.processor.process(reply, &mut session);
        Ok(())
    }

    async fn transport_failed(&mut self, error: ChannelError) -> SendError {
        self.network_failure = true;
        metrics::record_network_failure();

        match self.channel.reset().await {
            Ok(()) => metrics::record_socket_reset(true),
            Err(e) => {
                metrics::record_socket_reset(false);
                tracing::error!(connection_id = %self.id, error = %e, "Failed to reset channel");
            }
        }
        SendError::Transport(error)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn notary_id(&self) -> &Identifier {
        &self.notary_id
    }

    /// Whether the last `send` failed in the transport.
    pub fn network_failure(&self) -> bool {
        self.network_failure
    }

    pub fn channel(&self) -> &SecureChannel<C> {
        &self.channel
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }
}
