//! Notary (server) contracts.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::channel::TransportKey;
use crate::contract::identifier::Identifier;
use crate::contract::tag::Tag;
use crate::contract::ContractError;

/// What a client needs to know about a notary: where it listens and which
/// transport key proves it is the real one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerContract {
    id: Identifier,
    name: String,
    endpoint: String,
    transport_key: TransportKey,
}

impl ServerContract {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, transport_key: TransportKey) -> Self {
        let mut contract = Self {
            id: Identifier::default(),
            name: name.into(),
            endpoint: endpoint.into(),
            transport_key,
        };
        contract.id = contract.calculate_contract_id();
        contract
    }

    /// Load a contract from JSON, checking that its id matches its contents.
    pub fn load_json(path: &Path) -> Result<Self, ContractError> {
        let file = File::open(path)?;
        let contract: Self = serde_json::from_reader(BufReader::new(file))?;
        contract.verify_id()?;
        Ok(contract)
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn public_transport_key(&self) -> &TransportKey {
        &self.transport_key
    }

    /// Canonical unsigned contents; the contract id is their digest.
    pub fn unsigned_contents(&self) -> String {
        let mut tag = Tag::new("notaryContract");
        tag.add_attribute("name", self.name.as_str());
        tag.add_attribute("endpoint", self.endpoint.as_str());
        tag.add_attribute("transportKey", self.transport_key.to_string());
        tag.output()
    }

    pub fn calculate_contract_id(&self) -> Identifier {
        Identifier::digest(self.unsigned_contents())
    }

    pub fn verify_id(&self) -> Result<(), ContractError> {
        let actual = self.calculate_contract_id();
        if actual != self.id {
            return Err(ContractError::IdMismatch {
                expected: self.id.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}
