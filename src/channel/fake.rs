//! Scripted connector for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::channel::{ChannelError, Connector, Socket, TransportKey};
use crate::config::TransportConfig;

pub(crate) enum FakeReply {
    Bytes(Vec<u8>),
    Fail,
    Hang,
}

#[derive(Default)]
struct FakeState {
    opened: usize,
    closed: usize,
    failing_sends: usize,
    sent: Vec<(usize, Vec<u8>)>,
    replies: VecDeque<FakeReply>,
}

/// Shares its state with every socket it opens.
#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub(crate) fn push_reply(&self, reply: FakeReply) {
        self.with_state(|s| s.replies.push_back(reply));
    }

    pub(crate) fn fail_next_sends(&self, count: usize) {
        self.with_state(|s| s.failing_sends = count);
    }

    pub(crate) fn opened(&self) -> usize {
        self.with_state(|s| s.opened)
    }

    pub(crate) fn closed(&self) -> usize {
        self.with_state(|s| s.closed)
    }

    /// Payloads that reached a socket, tagged with the socket's open sequence number.
    pub(crate) fn sent(&self) -> Vec<(usize, Vec<u8>)> {
        self.with_state(|s| s.sent.clone())
    }
}

impl Connector for FakeConnector {
    type Socket = FakeSocket;

    fn open(
        &self,
        _addr: &str,
        _server_key: &TransportKey,
        _settings: &TransportConfig,
    ) -> Result<FakeSocket, ChannelError> {
        let seq = self.with_state(|s| {
            s.opened += 1;
            s.opened
        });
        Ok(FakeSocket {
            seq,
            connector: self.clone(),
        })
    }
}

pub(crate) struct FakeSocket {
    seq: usize,
    connector: FakeConnector,
}

#[async_trait]
impl Socket for FakeSocket {
    async fn send_raw(&mut self, payload: &[u8]) -> Result<(), ChannelError> {
        let seq = self.seq;
        self.connector.with_state(|s| {
            if s.failing_sends > 0 {
                s.failing_sends -= 1;
                return Err(ChannelError::Io(std::io::ErrorKind::ConnectionRefused.into()));
            }
            s.sent.push((seq, payload.to_vec()));
            Ok(())
        })
    }

    async fn recv_raw(&mut self) -> Result<Vec<u8>, ChannelError> {
        let next = self.connector.with_state(|s| s.replies.pop_front());
        match next {
            Some(FakeReply::Bytes(bytes)) => Ok(bytes),
            Some(FakeReply::Hang) => std::future::pending().await,
            Some(FakeReply::Fail) | None => {
                Err(ChannelError::Io(std::io::ErrorKind::UnexpectedEof.into()))
            }
        }
    }

    async fn close(&mut self) {
        self.connector.with_state(|s| s.closed += 1);
    }
}
