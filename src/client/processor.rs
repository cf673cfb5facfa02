//! What happens to a reply once it has been received and parsed.

use crate::client::session::Session;
use crate::contract::message::GET_REQUEST_NUMBER;
use crate::contract::Message;

/// Receives every successfully parsed reply, on the sending task, before
/// `send` returns.
pub trait ReplyProcessor: Send {
    fn process(&mut self, reply: Message, session: &mut Session<'_>);
}

impl<F> ReplyProcessor for F
where
    F: FnMut(Message, &mut Session<'_>) + Send,
{
    fn process(&mut self, reply: Message, session: &mut Session<'_>) {
        self(reply, session)
    }
}

/// Keeps replies in arrival order and applies request number updates.
#[derive(Debug, Default)]
pub struct ReplyInbox {
    replies: Vec<Message>,
}

impl ReplyInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> &[Message] {
        &self.replies
    }

    pub fn last(&self) -> Option<&Message> {
        self.replies.last()
    }

    pub fn take(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.replies)
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}

impl ReplyProcessor for ReplyInbox {
    fn process(&mut self, reply: Message, session: &mut Session<'_>) {
        if reply.is_reply_to(GET_REQUEST_NUMBER) && reply.success {
            match reply.new_request_num {
                Some(number) => {
                    if let Err(e) = session.on_server_response_to_get_request_number(number) {
                        tracing::error!(error = %e, "Failed to save new request number");
                    }
                }
                None => tracing::warn!("Request number reply carries no number"),
            }
        }
        self.replies.push(reply);
    }
}
