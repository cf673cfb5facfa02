//! Request/reply against an in-process notary over the real curve transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notary_client::channel::{ChannelError, SecureChannel, TransportKeypair};
use notary_client::client::{ReplyInbox, SendError, ServerConnection};
use notary_client::config::TransportConfig;
use notary_client::contract::{Identifier, Message, ServerContract};
use notary_client::identity::{FileNymStore, Identity, MemoryNymStore, Nym, NymStore, PersistentNym};

mod common;

fn quick_settings() -> TransportConfig {
    TransportConfig {
        linger_ms: 50,
        send_timeout_ms: 1000,
        recv_timeout_ms: 300,
    }
}

fn connect(server: &ServerContract) -> ServerConnection<ReplyInbox> {
    let channel = SecureChannel::new().with_settings(quick_settings());
    ServerConnection::with_channel(server, ReplyInbox::new(), channel).unwrap()
}

#[tokio::test]
async fn test_ping_round_trip() {
    let server = common::start_mock_notary(common::answering_notary(1)).await;
    let mut nym = PersistentNym::new(Nym::generate(), MemoryNymStore::new());
    let mut conn = connect(&server);

    let ping = Message::ping_notary(nym.nym_id().clone(), server.id().clone(), 1);
    conn.send(&server, &mut nym, &ping).await.unwrap();
    conn.send(&server, &mut nym, &ping).await.unwrap();

    assert!(!conn.network_failure());
    let replies = conn.processor().replies();
    assert_eq!(replies.len(), 2);
    assert!(replies.iter().all(|r| r.is_reply_to("pingNotary") && r.success));
    assert_eq!(&replies[0].nym_id, nym.nym_id());
}

#[tokio::test]
async fn test_request_number_saved_to_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_mock_notary(common::answering_notary(57)).await;
    let store = FileNymStore::new(dir.path().join("nyms")).unwrap();
    let mut nym = PersistentNym::load_or_create(store.clone(), &Identifier::random()).unwrap();
    let mut conn = connect(&server);

    let request = Message::get_request_number(nym.nym_id().clone(), server.id().clone());
    conn.send(&server, &mut nym, &request).await.unwrap();

    let saved = store.load(nym.nym_id()).unwrap().unwrap();
    assert_eq!(saved.request_number(server.id()), Some(57));
}

#[tokio::test]
async fn test_unanswered_request_times_out_then_recovers() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let server = common::start_mock_notary(move |request| {
        // Ignore the first request only.
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            None
        } else {
            Some(Message::reply_to(&request, true))
        }
    })
    .await;
    let mut nym = PersistentNym::new(Nym::generate(), Arc::new(MemoryNymStore::new()));
    let mut conn = connect(&server);
    let ping = Message::ping_notary(nym.nym_id().clone(), server.id().clone(), 1);

    let start = Instant::now();
    let err = conn.send(&server, &mut nym, &ping).await.unwrap_err();
    assert!(matches!(
        err,
        SendError::Transport(ChannelError::Timeout { op: "receive", .. })
    ));
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(conn.network_failure());

    // The reset socket dials a new connection and gets an answer.
    conn.send(&server, &mut nym, &ping).await.unwrap();
    assert!(!conn.network_failure());
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreachable_notary_is_network_failure() {
    // Bind and drop to get a port nobody listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let server = ServerContract::new(
        "gone",
        format!("tcp://{addr}"),
        TransportKeypair::generate().public(),
    );
    let mut nym = PersistentNym::new(Nym::generate(), MemoryNymStore::new());
    let mut conn = connect(&server);

    let ping = Message::ping_notary(nym.nym_id().clone(), server.id().clone(), 1);
    let err = conn.send(&server, &mut nym, &ping).await.unwrap_err();

    assert!(err.is_network_failure());
    assert!(conn.network_failure());
    assert!(conn.processor().is_empty());
}

#[tokio::test]
async fn test_wrong_transport_key_never_delivers() {
    let real = common::start_mock_notary(common::answering_notary(1)).await;
    // Same endpoint, but a key the notary cannot prove it holds.
    let impostor = ServerContract::new(
        "impostor",
        real.endpoint(),
        TransportKeypair::generate().public(),
    );
    let mut nym = PersistentNym::new(Nym::generate(), MemoryNymStore::new());
    let mut conn = connect(&impostor);

    let ping = Message::ping_notary(nym.nym_id().clone(), impostor.id().clone(), 1);
    let err = conn.send(&impostor, &mut nym, &ping).await.unwrap_err();

    assert!(matches!(err, SendError::Transport(ChannelError::Handshake(_))));
    assert!(conn.processor().is_empty());
}
