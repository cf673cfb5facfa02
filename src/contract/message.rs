//! Application messages exchanged with a notary.

use crate::contract::identifier::Identifier;
use crate::contract::reader::ElementReader;
use crate::contract::tag::Tag;
use crate::contract::ContractError;
use crate::envelope::{self, ArmorError};

pub const MESSAGE_VERSION: &str = "1.0";

pub const PING_NOTARY: &str = "pingNotary";
pub const GET_REQUEST_NUMBER: &str = "getRequestNumber";

/// Suffix the notary appends to a request's command in its reply.
pub const RESPONSE_SUFFIX: &str = "Response";

/// One request or reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub command: String,
    pub request_num: i64,
    pub nym_id: Identifier,
    pub notary_id: Identifier,
    pub success: bool,
    /// Set on `getRequestNumberResponse`.
    pub new_request_num: Option<i64>,
    /// Armored, command-specific content.
    pub payload: Option<String>,
}

impl Message {
    pub fn new(
        command: impl Into<String>,
        nym_id: Identifier,
        notary_id: Identifier,
        request_num: i64,
    ) -> Self {
        Self {
            command: command.into(),
            request_num,
            nym_id,
            notary_id,
            ..Default::default()
        }
    }

    pub fn ping_notary(nym_id: Identifier, notary_id: Identifier, request_num: i64) -> Self {
        Self::new(PING_NOTARY, nym_id, notary_id, request_num)
    }

    pub fn get_request_number(nym_id: Identifier, notary_id: Identifier) -> Self {
        // The request number is what is being asked for, so the request carries 1.
        Self::new(GET_REQUEST_NUMBER, nym_id, notary_id, 1)
    }

    /// The reply a notary would build for `request`.
    pub fn reply_to(request: &Message, success: bool) -> Self {
        Self {
            command: format!("{}{}", request.command, RESPONSE_SUFFIX),
            request_num: request.request_num,
            nym_id: request.nym_id.clone(),
            notary_id: request.notary_id.clone(),
            success,
            ..Default::default()
        }
    }

    pub fn is_reply_to(&self, command: &str) -> bool {
        self.command
            .strip_suffix(RESPONSE_SUFFIX)
            .is_some_and(|base| base == command)
    }

    /// Armor `text` and attach it as the payload.
    pub fn set_payload(&mut self, text: &str) -> Result<(), ArmorError> {
        self.payload = Some(envelope::wrap(text)?);
        Ok(())
    }

    /// Decoded payload, if one is attached.
    pub fn payload_text(&self) -> Result<Option<String>, ArmorError> {
        self.payload.as_deref().map(envelope::unwrap).transpose()
    }

    /// Raw (unsigned) contract text of this message.
    pub fn save_contract_raw(&self) -> String {
        let mut tag = Tag::new("notaryMessage");
        tag.add_attribute("version", MESSAGE_VERSION);
        tag.add_attribute("command", self.command.as_str());
        tag.add_attribute("requestNum", self.request_num.to_string());
        tag.add_attribute("nymID", self.nym_id.to_string());
        tag.add_attribute("notaryID", self.notary_id.to_string());
        tag.add_attribute("success", if self.success { "true" } else { "false" });
        if let Some(n) = self.new_request_num {
            tag.add_attribute("newRequestNum", n.to_string());
        }
        if let Some(payload) = &self.payload {
            tag.add_attribute("payload", payload.as_str());
        }
        tag.output()
    }

    /// Parse contract text produced by [`save_contract_raw`](Self::save_contract_raw).
    pub fn load_contract_from_string(text: &str) -> Result<Self, ContractError> {
        for element in ElementReader::new(text) {
            let element = element?;
            if element.name() != "notaryMessage" {
                continue;
            }

            let command = element
                .non_empty_attribute("command")
                .ok_or(ContractError::MissingAttribute("command"))?;
            let request_num = element
                .attribute("requestNum")
                .ok_or(ContractError::MissingAttribute("requestNum"))?
                .parse()
                .map_err(|_| ContractError::InvalidAttribute("requestNum"))?;
            let new_request_num = element
                .attribute("newRequestNum")
                .map(|v| v.parse().map_err(|_| ContractError::InvalidAttribute("newRequestNum")))
                .transpose()?;

            return Ok(Self {
                command: command.to_string(),
                request_num,
                nym_id: Identifier::from_encoded(element.attribute("nymID").unwrap_or_default()),
                notary_id: Identifier::from_encoded(
                    element.attribute("notaryID").unwrap_or_default(),
                ),
                success: element.attribute("success") == Some("true"),
                new_request_num,
                payload: element.non_empty_attribute("payload").map(str::to_string),
            });
        }

        Err(ContractError::MissingElement("notaryMessage"))
    }
}
