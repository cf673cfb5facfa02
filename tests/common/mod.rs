//! Shared utilities for integration testing.

use std::sync::Arc;

use notary_client::channel::{CurveListener, NotarySocket, TransportKeypair};
use notary_client::contract::{Message, ServerContract};
use notary_client::envelope;

/// Start an in-process notary on an ephemeral port.
///
/// `handler` sees every parsed request; returning `None` leaves the request
/// unanswered.
pub async fn start_mock_notary<F>(handler: F) -> ServerContract
where
    F: Fn(Message) -> Option<Message> + Send + Sync + 'static,
{
    let listener = CurveListener::bind("127.0.0.1:0", TransportKeypair::generate())
        .await
        .unwrap();
    let endpoint = format!("tcp://{}", listener.local_addr().unwrap());
    let server = ServerContract::new("mock notary", endpoint, listener.public_key());
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok(socket) => {
                    tokio::spawn(serve(socket, handler.clone()));
                }
                // A failed handshake only affects that client.
                Err(_) => continue,
            }
        }
    });

    server
}

async fn serve<F>(mut socket: NotarySocket, handler: Arc<F>)
where
    F: Fn(Message) -> Option<Message> + Send + Sync + 'static,
{
    while let Ok(request) = socket.recv_request().await {
        let text = envelope::unwrap(std::str::from_utf8(&request).unwrap()).unwrap();
        let request = Message::load_contract_from_string(&text).unwrap();

        let Some(reply) = handler(request) else {
            continue;
        };
        let armored = envelope::wrap(&reply.save_contract_raw()).unwrap();
        if socket.send_reply(armored.as_bytes()).await.is_err() {
            break;
        }
    }
}

/// Answers every request successfully, handing out `next_request_num` for
/// request number queries.
#[allow(dead_code)]
pub fn answering_notary(next_request_num: i64) -> impl Fn(Message) -> Option<Message> + Send + Sync + 'static {
    move |request| {
        let mut reply = Message::reply_to(&request, true);
        if request.command == "getRequestNumber" {
            reply.new_request_num = Some(next_request_num);
        }
        Some(reply)
    }
}
