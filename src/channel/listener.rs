//! Notary side of the curve transport.
//!
//! Binds a TCP listener and completes the handshake with the notary's static
//! keypair. Each accepted [`NotarySocket`] serves one client.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::channel::curve::{notary_handshake, EncryptedStream};
use crate::channel::keys::{TransportKey, TransportKeypair};
use crate::channel::ChannelError;

/// Accepts curve connections for one notary.
pub struct CurveListener {
    inner: TcpListener,
    keypair: TransportKeypair,
}

impl CurveListener {
    pub async fn bind(addr: &str, keypair: TransportKeypair) -> Result<Self, ChannelError> {
        let inner = TcpListener::bind(addr).await?;

        tracing::info!(
            address = %inner.local_addr()?,
            transport_key = %keypair.public(),
            "Notary listener bound"
        );

        Ok(Self { inner, keypair })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.inner.local_addr()?)
    }

    /// The key clients must be configured with.
    pub fn public_key(&self) -> TransportKey {
        self.keypair.public()
    }

    /// Accept one client and complete the handshake.
    pub async fn accept(&self) -> Result<NotarySocket, ChannelError> {
        let (stream, peer_addr) = self.inner.accept().await?;
        stream.set_nodelay(true)?;

        let (session, client_key) = notary_handshake(stream, &self.keypair).await?;
        tracing::debug!(%peer_addr, client_key = %client_key, "Client handshake complete");

        Ok(NotarySocket {
            session,
            client_key,
        })
    }
}

/// One accepted client.
pub struct NotarySocket {
    session: EncryptedStream,
    client_key: TransportKey,
}

impl NotarySocket {
    /// Wait for the next request. An IO error means the client went away.
    pub async fn recv_request(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.session.recv().await
    }

    pub async fn send_reply(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        self.session.send(payload).await
    }

    pub fn client_key(&self) -> TransportKey {
        self.client_key
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.session.peer_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Connector, CurveConnector, Socket};
    use crate::config::TransportConfig;

    async fn echo_notary() -> (String, TransportKey, tokio::task::JoinHandle<Option<TransportKey>>) {
        let listener = CurveListener::bind("127.0.0.1:0", TransportKeypair::generate())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let key = listener.public_key();

        let handle = tokio::spawn(async move {
            let mut socket = listener.accept().await.ok()?;
            while let Ok(request) = socket.recv_request().await {
                let mut reply = b"echo:".to_vec();
                reply.extend_from_slice(&request);
                socket.send_reply(&reply).await.ok()?;
            }
            Some(socket.client_key())
        });

        (addr, key, handle)
    }

    #[tokio::test]
    async fn test_request_reply_over_tcp() {
        let (addr, key, handle) = echo_notary().await;
        let mut socket = CurveConnector
            .open(&addr, &key, &TransportConfig::default())
            .unwrap();
        let local_key = socket.local_key();

        socket.send_raw(b"one").await.unwrap();
        assert_eq!(socket.recv_raw().await.unwrap(), b"echo:one");
        socket.send_raw(b"two").await.unwrap();
        assert_eq!(socket.recv_raw().await.unwrap(), b"echo:two");

        socket.close().await;
        assert_eq!(handle.await.unwrap(), Some(local_key));
    }

    #[tokio::test]
    async fn test_one_outstanding_request() {
        let (addr, key, _handle) = echo_notary().await;
        let mut socket = CurveConnector
            .open(&addr, &key, &TransportConfig::default())
            .unwrap();

        assert!(matches!(
            socket.recv_raw().await,
            Err(ChannelError::NoRequestPending)
        ));

        socket.send_raw(b"first").await.unwrap();
        assert!(matches!(
            socket.send_raw(b"second").await,
            Err(ChannelError::RequestPending)
        ));
        assert_eq!(socket.recv_raw().await.unwrap(), b"echo:first");
    }

    #[tokio::test]
    async fn test_wrong_notary_key_fails_handshake() {
        let (addr, _key, _handle) = echo_notary().await;
        let wrong = TransportKeypair::generate().public();
        let mut socket = CurveConnector
            .open(&addr, &wrong, &TransportConfig::default())
            .unwrap();

        assert!(matches!(
            socket.send_raw(b"hello").await,
            Err(ChannelError::Handshake(_))
        ));
    }
}
