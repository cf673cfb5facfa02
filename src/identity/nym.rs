//! Per-notary numbering state of one pseudonym.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::contract::Identifier;

/// A pseudonymous identity and the numbers it holds at each notary.
///
/// All maps are keyed by the notary id in its text form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nym {
    id: Identifier,
    #[serde(default)]
    request_numbers: BTreeMap<String, i64>,
    /// Numbers the notary has issued and not yet closed.
    #[serde(default)]
    issued: BTreeMap<String, BTreeSet<i64>>,
    /// Issued numbers not yet spent on a transaction.
    #[serde(default)]
    available: BTreeMap<String, BTreeSet<i64>>,
}

impl Nym {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// A Nym with a fresh random id.
    pub fn generate() -> Self {
        Self::new(Identifier::random())
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn request_number(&self, notary: &Identifier) -> Option<i64> {
        self.request_numbers.get(&notary.to_string()).copied()
    }

    pub fn update_request_number(&mut self, notary: &Identifier, number: i64) {
        self.request_numbers.insert(notary.to_string(), number);
    }

    /// Advance the request number, starting at 1 for an unknown notary.
    pub fn increment_request_number(&mut self, notary: &Identifier) -> i64 {
        let number = self.request_numbers.entry(notary.to_string()).or_insert(0);
        *number += 1;
        *number
    }

    /// Record a number the notary issued. It starts out available.
    pub fn add_issued_number(&mut self, notary: &Identifier, number: i64) {
        let key = notary.to_string();
        self.issued.entry(key.clone()).or_default().insert(number);
        self.available.entry(key).or_default().insert(number);
    }

    /// Take the highest available number for a transaction. It stays issued.
    pub fn take_transaction_number(&mut self, notary: &Identifier) -> Option<i64> {
        self.available.get_mut(&notary.to_string())?.pop_last()
    }

    pub fn verify_issued_number(&self, notary: &Identifier, number: i64) -> bool {
        contains(&self.issued, notary, number)
    }

    pub fn verify_available_number(&self, notary: &Identifier, number: i64) -> bool {
        contains(&self.available, notary, number)
    }

    /// Close a number for good. Returns whether it was issued.
    pub fn remove_issued_number(&mut self, notary: &Identifier, number: i64) -> bool {
        let key = notary.to_string();
        if let Some(available) = self.available.get_mut(&key) {
            available.remove(&number);
        }
        self.issued
            .get_mut(&key)
            .is_some_and(|issued| issued.remove(&number))
    }

    /// Make a spent number available again.
    ///
    /// Only numbers that are still issued and not already available come
    /// back; returns whether this one did.
    pub fn clawback_transaction_number(&mut self, notary: &Identifier, number: i64) -> bool {
        if !self.verify_issued_number(notary, number) {
            return false;
        }
        self.available
            .entry(notary.to_string())
            .or_default()
            .insert(number)
    }

    pub fn issued_count(&self, notary: &Identifier) -> usize {
        self.issued.get(&notary.to_string()).map_or(0, BTreeSet::len)
    }

    pub fn available_count(&self, notary: &Identifier) -> usize {
        self.available.get(&notary.to_string()).map_or(0, BTreeSet::len)
    }
}

fn contains(map: &BTreeMap<String, BTreeSet<i64>>, notary: &Identifier, number: i64) -> bool {
    map.get(&notary.to_string())
        .is_some_and(|set| set.contains(&number))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notary() -> Identifier {
        Identifier::digest("notary")
    }

    #[test]
    fn test_request_numbers() {
        let mut nym = Nym::generate();
        assert_eq!(nym.request_number(&notary()), None);

        assert_eq!(nym.increment_request_number(&notary()), 1);
        nym.update_request_number(&notary(), 41);
        assert_eq!(nym.increment_request_number(&notary()), 42);
        assert_eq!(nym.request_number(&notary()), Some(42));
    }

    #[test]
    fn test_take_and_clawback() {
        let mut nym = Nym::generate();
        nym.add_issued_number(&notary(), 5);
        nym.add_issued_number(&notary(), 9);

        assert_eq!(nym.take_transaction_number(&notary()), Some(9));
        assert!(nym.verify_issued_number(&notary(), 9));
        assert!(!nym.verify_available_number(&notary(), 9));

        assert!(nym.clawback_transaction_number(&notary(), 9));
        assert!(nym.verify_available_number(&notary(), 9));
        // Already available: nothing to recover.
        assert!(!nym.clawback_transaction_number(&notary(), 9));
    }

    #[test]
    fn test_clawback_requires_issued() {
        let mut nym = Nym::generate();
        assert!(!nym.clawback_transaction_number(&notary(), 3));
        assert_eq!(nym.available_count(&notary()), 0);

        nym.add_issued_number(&notary(), 3);
        assert!(nym.remove_issued_number(&notary(), 3));
        assert!(!nym.clawback_transaction_number(&notary(), 3));
    }

    #[test]
    fn test_numbers_are_per_notary() {
        let other = Identifier::digest("other notary");
        let mut nym = Nym::generate();
        nym.add_issued_number(&notary(), 1);

        assert_eq!(nym.issued_count(&notary()), 1);
        assert_eq!(nym.issued_count(&other), 0);
        assert_eq!(nym.take_transaction_number(&other), None);
    }

    #[test]
    fn test_json_form() {
        let mut nym = Nym::generate();
        nym.add_issued_number(&notary(), 7);
        nym.update_request_number(&notary(), 3);

        let json = serde_json::to_string(&nym).unwrap();
        let back: Nym = serde_json::from_str(&json).unwrap();
        assert_eq!(back, nym);
    }
}
