//! Curve transport: X25519 handshake and ChaCha20-Poly1305 frames over TCP.
//!
//! Handshake:
//! ```text
//! client → notary   "NCRV" | version | client ephemeral public key (32)
//! both              shared = X25519(own secret, peer public)
//!                   c2s, s2c = HKDF-SHA256(shared, salt, info = dir | client pk | notary pk)
//! notary → client   frame(s2c, "WELCOME")
//! ```
//! Only a peer holding the notary's transport secret can produce a WELCOME
//! frame the client can open, which authenticates the notary.
//!
//! Frames: `[len: u32 BE][ciphertext + tag]`, nonce = 4 zero bytes followed by
//! a per-direction u64 BE counter.

use std::time::Duration;

use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use zeroize::Zeroizing;

use crate::channel::keys::{TransportKey, TransportKeypair, KEY_LEN};
use crate::channel::{ChannelError, Connector, Socket};
use crate::config::TransportConfig;

const MAGIC: &[u8; 4] = b"NCRV";
const VERSION: u8 = 1;
const HELLO_LEN: usize = MAGIC.len() + 1 + KEY_LEN;
const HKDF_SALT: &[u8] = b"notary-curve-v1";
const WELCOME: &[u8] = b"WELCOME";

/// Upper bound on a single frame.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// One direction of an encrypted session.
struct FrameCipher {
    cipher: ChaCha20Poly1305,
    counter: u64,
}

impl FrameCipher {
    fn new(key: &[u8; KEY_LEN]) -> Result<Self, ChannelError> {
        let cipher = ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| ChannelError::Handshake("bad session key length".into()))?;
        Ok(Self { cipher, counter: 0 })
    }

    fn next_nonce(&mut self) -> Result<Nonce, ChannelError> {
        let mut nonce = [0u8; 12];
        nonce[4..].copy_from_slice(&self.counter.to_be_bytes());
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or_else(|| ChannelError::Handshake("nonce space exhausted".into()))?;
        Ok(Nonce::from(nonce))
    }

    fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let nonce = self.next_nonce()?;
        self.cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| ChannelError::Handshake("encryption failed".into()))
    }

    fn open(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let nonce = self.next_nonce()?;
        self.cipher
            .decrypt(&nonce, ciphertext)
            .map_err(|_| ChannelError::Decrypt)
    }
}

/// Derive the client→notary and notary→client keys.
fn session_keys(
    local: &TransportKeypair,
    peer: &TransportKey,
    client: &TransportKey,
    notary: &TransportKey,
) -> Result<(FrameCipher, FrameCipher), ChannelError> {
    let shared = local.agree(peer)?;
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared.as_bytes());

    let expand = |direction: &[u8]| -> Result<FrameCipher, ChannelError> {
        let mut info = Vec::with_capacity(direction.len() + 2 * KEY_LEN);
        info.extend_from_slice(direction);
        info.extend_from_slice(client.as_bytes());
        info.extend_from_slice(notary.as_bytes());

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        hk.expand(&info, &mut key[..])
            .map_err(|e| ChannelError::Handshake(e.to_string()))?;
        FrameCipher::new(&key)
    };

    Ok((expand(b"c2s")?, expand(b"s2c")?))
}

/// A TCP stream carrying encrypted frames.
pub(crate) struct EncryptedStream {
    stream: TcpStream,
    send: FrameCipher,
    recv: FrameCipher,
}

impl EncryptedStream {
    pub(crate) async fn send(&mut self, plaintext: &[u8]) -> Result<(), ChannelError> {
        let frame = self.send.seal(plaintext)?;
        let len = u32::try_from(frame.len())
            .ok()
            .filter(|&len| len as usize <= MAX_FRAME_LEN)
            .ok_or(ChannelError::FrameTooLarge(frame.len()))?;

        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub(crate) async fn recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len).await?;
        let len = u32::from_be_bytes(len) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ChannelError::FrameTooLarge(len));
        }

        let mut frame = vec![0u8; len];
        self.stream.read_exact(&mut frame).await?;
        self.recv.open(&frame)
    }

    pub(crate) async fn close(mut self, linger: Duration) {
        if tokio::time::timeout(linger, self.stream.shutdown()).await.is_err() {
            tracing::debug!(?linger, "Linger expired while closing socket");
        }
    }

    pub(crate) fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }
}

/// Client side of the handshake.
pub(crate) async fn client_handshake(
    mut stream: TcpStream,
    local: &TransportKeypair,
    notary: &TransportKey,
) -> Result<EncryptedStream, ChannelError> {
    let client = local.public();

    let mut hello = Vec::with_capacity(HELLO_LEN);
    hello.extend_from_slice(MAGIC);
    hello.push(VERSION);
    hello.extend_from_slice(client.as_bytes());
    stream.write_all(&hello).await?;
    stream.flush().await?;

    let (send, recv) = session_keys(local, notary, &client, notary)?;
    let mut session = EncryptedStream { stream, send, recv };

    match session.recv().await {
        Ok(welcome) if welcome == WELCOME => Ok(session),
        Ok(_) => Err(ChannelError::Handshake("unexpected welcome".into())),
        Err(ChannelError::Decrypt) => Err(ChannelError::Handshake(
            "notary did not prove possession of its transport key".into(),
        )),
        Err(e) => Err(e),
    }
}

/// Notary side of the handshake. Returns the session and the client's key.
pub(crate) async fn notary_handshake(
    mut stream: TcpStream,
    local: &TransportKeypair,
) -> Result<(EncryptedStream, TransportKey), ChannelError> {
    let mut hello = [0u8; HELLO_LEN];
    stream.read_exact(&mut hello).await?;

    let (magic, rest) = hello.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(ChannelError::Handshake("bad hello magic".into()));
    }
    let (version, key) = rest.split_at(1);
    if version[0] != VERSION {
        return Err(ChannelError::Handshake(format!(
            "unsupported version {}",
            version[0]
        )));
    }

    let mut client_bytes = [0u8; KEY_LEN];
    client_bytes.copy_from_slice(key);
    let client = TransportKey::from_bytes(client_bytes);
    let notary = local.public();

    let (c2s, s2c) = session_keys(local, &client, &client, &notary)?;
    let mut session = EncryptedStream {
        stream,
        send: s2c,
        recv: c2s,
    };
    session.send(WELCOME).await?;
    Ok((session, client))
}

/// Opens [`CurveSocket`]s, each with a freshly generated local keypair.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurveConnector;

impl Connector for CurveConnector {
    type Socket = CurveSocket;

    fn open(
        &self,
        addr: &str,
        server_key: &TransportKey,
        settings: &TransportConfig,
    ) -> Result<CurveSocket, ChannelError> {
        Ok(CurveSocket {
            addr: addr.to_string(),
            server_key: *server_key,
            keypair: TransportKeypair::generate(),
            linger: settings.linger(),
            session: None,
            awaiting_reply: false,
        })
    }
}

/// Client request socket. Dials and handshakes on first send.
pub struct CurveSocket {
    addr: String,
    server_key: TransportKey,
    keypair: TransportKeypair,
    linger: Duration,
    session: Option<EncryptedStream>,
    awaiting_reply: bool,
}

impl CurveSocket {
    /// This socket's public key, as the notary sees it.
    pub fn local_key(&self) -> TransportKey {
        self.keypair.public()
    }
}

#[async_trait]
impl Socket for CurveSocket {
    async fn send_raw(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        if self.awaiting_reply {
            return Err(ChannelError::RequestPending);
        }

        let session = match &mut self.session {
            Some(session) => session,
            None => {
                let stream = TcpStream::connect(&self.addr).await?;
                stream.set_nodelay(true)?;
                let session = client_handshake(stream, &self.keypair, &self.server_key).await?;
                tracing::debug!(addr = %self.addr, "Curve session established");
                self.session.insert(session)
            }
        };

        session.send(payload).await?;
        self.awaiting_reply = true;
        Ok(())
    }

    async fn recv_raw(&mut self) -> Result<Vec<u8>, ChannelError> {
        if !self.awaiting_reply {
            return Err(ChannelError::NoRequestPending);
        }
        let session = self.session.as_mut().ok_or(ChannelError::NotConnected)?;

        let reply = session.recv().await?;
        self.awaiting_reply = false;
        Ok(reply)
    }

    async fn close(&mut self) {
        self.awaiting_reply = false;
        if let Some(session) = self.session.take() {
            session.close(self.linger).await;
        }
    }
}
