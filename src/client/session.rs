use crate::contract::{Identifier, ServerContract};
use crate::identity::{Identity, StoreError};

/// The notary and acting identity of one `send`.
///
/// Built per call and lent to the reply processor, so reply handling always
/// sees the context of the request it answers.
pub struct Session<'a> {
    server: &'a ServerContract,
    nym: &'a mut dyn Identity,
}

impl<'a> Session<'a> {
    pub fn new(server: &'a ServerContract, nym: &'a mut dyn Identity) -> Self {
        Self { server, nym }
    }

    pub fn server(&self) -> &ServerContract {
        self.server
    }

    pub fn notary_id(&self) -> &Identifier {
        self.server.id()
    }

    pub fn nym(&self) -> &dyn Identity {
        &*self.nym
    }

    pub fn nym_mut(&mut self) -> &mut dyn Identity {
        &mut *self.nym
    }

    /// Record and save the request number the notary just handed out.
    pub fn on_server_response_to_get_request_number(
        &mut self,
        new_request_number: i64,
    ) -> Result<(), StoreError> {
        tracing::info!(
            nym_id = %self.nym.nym_id(),
            notary_id = %self.server.id(),
            new_request_number,
            "Received new request number"
        );
        self.nym
            .update_request_number(self.server.id(), new_request_number)
    }
}
