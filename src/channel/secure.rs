//! The client channel: one socket, one notary, deadlines on every call.

use std::future::Future;
use std::time::Duration;

use crate::channel::{parse_endpoint, ChannelError, Connector, CurveConnector, Socket, TransportKey};
use crate::config::{settings, TransportConfig};

/// Encrypted request/reply channel to one notary.
///
/// Generic over the [`Connector`] so the transport can be replaced in tests.
pub struct SecureChannel<C: Connector = CurveConnector> {
    connector: C,
    endpoint: Option<String>,
    addr: Option<String>,
    server_key: Option<TransportKey>,
    pinned: Option<TransportConfig>,
    settings: TransportConfig,
    socket: Option<C::Socket>,
}

impl SecureChannel<CurveConnector> {
    pub fn new() -> Self {
        Self::with_connector(CurveConnector)
    }
}

impl Default for SecureChannel<CurveConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> SecureChannel<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            endpoint: None,
            addr: None,
            server_key: None,
            pinned: None,
            settings: settings::transport(),
            socket: None,
        }
    }

    /// Use `settings` for every socket this channel builds instead of the
    /// process-wide values.
    pub fn with_settings(mut self, settings: TransportConfig) -> Self {
        self.pinned = Some(settings);
        self.settings = settings;
        self
    }

    /// Bind to `endpoint` and `server_key` and build a socket.
    ///
    /// No network traffic happens here; the socket dials on first send.
    pub fn connect(&mut self, endpoint: &str, server_key: &TransportKey) -> Result<(), ChannelError> {
        let addr = parse_endpoint(endpoint).inspect_err(|e| {
            tracing::error!(endpoint, error = %e, "Failed to connect");
        })?;

        self.endpoint = Some(endpoint.to_string());
        self.addr = Some(addr);
        self.server_key = Some(*server_key);
        self.rebuild()?;

        tracing::debug!(endpoint, server_key = %server_key, "Channel connected");
        Ok(())
    }

    /// Close the current socket and build a new one for the same notary.
    pub async fn reset(&mut self) -> Result<(), ChannelError> {
        if self.server_key.is_none() {
            tracing::error!("Reset requested before a server key was associated");
            return Err(ChannelError::NotConnected);
        }

        if let Some(mut socket) = self.socket.take() {
            socket.close().await;
        }
        self.rebuild()?;

        tracing::debug!(endpoint = self.endpoint.as_deref().unwrap_or_default(), "Channel reset");
        Ok(())
    }

    fn rebuild(&mut self) -> Result<(), ChannelError> {
        let (Some(addr), Some(server_key)) = (self.addr.as_deref(), self.server_key.as_ref()) else {
            return Err(ChannelError::NotConnected);
        };

        self.settings = self.pinned.unwrap_or_else(settings::transport);
        self.socket = Some(self.connector.open(addr, server_key, &self.settings)?);
        Ok(())
    }

    /// Send one request, bounded by the send timeout.
    pub async fn send_raw(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        let after = self.settings.send_timeout();
        let socket = self.socket.as_mut().ok_or(ChannelError::NotConnected)?;
        bounded("send", after, socket.send_raw(payload)).await
    }

    /// Receive the reply, bounded by the receive timeout.
    pub async fn recv_raw(&mut self) -> Result<Vec<u8>, ChannelError> {
        let after = self.settings.recv_timeout();
        let socket = self.socket.as_mut().ok_or(ChannelError::NotConnected)?;
        bounded("receive", after, socket.recv_raw()).await
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn server_key(&self) -> Option<&TransportKey> {
        self.server_key.as_ref()
    }

    /// Settings of the current socket.
    pub fn settings(&self) -> &TransportConfig {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}

async fn bounded<T>(
    op: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T, ChannelError>>,
) -> Result<T, ChannelError> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| ChannelError::Timeout { op, after })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::fake::{FakeConnector, FakeReply};
    use crate::channel::TransportKeypair;

    fn quick() -> TransportConfig {
        TransportConfig {
            linger_ms: 10,
            send_timeout_ms: 50,
            recv_timeout_ms: 50,
        }
    }

    fn channel(fake: &FakeConnector) -> SecureChannel<FakeConnector> {
        SecureChannel::with_connector(fake.clone()).with_settings(quick())
    }

    #[tokio::test]
    async fn test_reset_before_connect_fails() {
        let fake = FakeConnector::default();
        let mut channel = channel(&fake);

        assert!(matches!(channel.reset().await, Err(ChannelError::NotConnected)));
        assert!(matches!(channel.send_raw(b"x").await, Err(ChannelError::NotConnected)));
        assert_eq!(fake.opened(), 0);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_endpoint() {
        let fake = FakeConnector::default();
        let mut channel = channel(&fake);
        let key = TransportKeypair::generate().public();

        assert!(matches!(
            channel.connect("http://notary:80", &key),
            Err(ChannelError::InvalidEndpoint(_))
        ));
        assert!(!channel.is_connected());
        assert_eq!(fake.opened(), 0);
    }

    #[tokio::test]
    async fn test_reset_keeps_endpoint_and_key() {
        let fake = FakeConnector::default();
        let mut channel = channel(&fake);
        let key = TransportKeypair::generate().public();

        channel.connect("tcp://127.0.0.1:7085", &key).unwrap();
        channel.reset().await.unwrap();

        assert_eq!(fake.opened(), 2);
        assert_eq!(fake.closed(), 1);
        assert_eq!(channel.endpoint(), Some("tcp://127.0.0.1:7085"));
        assert_eq!(channel.server_key(), Some(&key));
    }

    #[tokio::test]
    async fn test_recv_is_bounded() {
        let fake = FakeConnector::default();
        fake.push_reply(FakeReply::Hang);
        let mut channel = channel(&fake);
        channel
            .connect("127.0.0.1:7085", &TransportKeypair::generate().public())
            .unwrap();

        channel.send_raw(b"request").await.unwrap();
        let err = channel.recv_raw().await.unwrap_err();
        assert!(matches!(err, ChannelError::Timeout { op: "receive", .. }));
    }

    #[tokio::test]
    async fn test_pinned_settings_survive_reset() {
        let fake = FakeConnector::default();
        let mut channel = channel(&fake);
        channel
            .connect("127.0.0.1:7085", &TransportKeypair::generate().public())
            .unwrap();
        channel.reset().await.unwrap();

        assert_eq!(*channel.settings(), quick());
    }
}
