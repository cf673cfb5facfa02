use crate::contract::Identifier;

/// One sub-currency leg of a basket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasketItem {
    pub sub_contract_id: Identifier,
    pub sub_account_id: Identifier,
    /// Per-leg minimum. Only set when defining a basket.
    pub minimum_transfer_amount: i64,
    /// Only set on an exchange request.
    pub closing_transaction_no: i64,
}

impl BasketItem {
    /// A leg of an exchange request.
    pub fn request(sub_contract_id: Identifier, sub_account_id: Identifier, closing_transaction_no: i64) -> Self {
        Self {
            sub_contract_id,
            sub_account_id,
            minimum_transfer_amount: 0,
            closing_transaction_no,
        }
    }

    /// A leg of a basket definition.
    pub fn definition(sub_contract_id: Identifier, minimum_transfer_amount: i64) -> Self {
        Self {
            sub_contract_id,
            minimum_transfer_amount,
            ..Self::default()
        }
    }
}
