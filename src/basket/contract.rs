//! The basket contract.

use crate::basket::item::BasketItem;
use crate::contract::{ContractError, Element, ElementReader, Identifier, Tag};
use crate::identity::{Identity, StoreError};
use crate::observability::metrics;

const CURRENCY_BASKET: &str = "currencyBasket";
const REQUEST_EXCHANGE: &str = "requestExchange";
const BASKET_ITEM: &str = "basketItem";

/// Result of offering one element to [`Basket::process_xml_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// The element belongs to the basket and was applied.
    Handled,
    /// Not a basket element; left for the caller.
    NotHandled,
}

/// A currency made of a fixed set of sub-currencies.
///
/// The same type describes a basket definition (legs with per-leg minimums)
/// and a request to exchange in or out of one (legs with accounts and
/// closing numbers). A basket is an exchange request when its transfer
/// multiple is positive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Basket {
    sub_count: i32,
    minimum_transfer: i64,
    transfer_multiple: i32,
    request_account_id: Identifier,
    exchanging_in: bool,
    closing_transaction_no: i64,
    hide_account_ids: bool,
    items: Vec<BasketItem>,
    unsigned_contents: String,
}

impl Basket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(sub_count: i32, minimum_transfer: i64) -> Self {
        Self {
            sub_count,
            minimum_transfer,
            ..Self::default()
        }
    }

    /// Parse a basket from its contract text.
    pub fn from_xml(text: &str) -> Result<Self, ContractError> {
        let mut basket = Self::new();
        let mut seen_root = false;

        for element in ElementReader::new(text) {
            let element = element?;
            match basket.process_xml_node(&element) {
                NodeStatus::Handled => seen_root |= element.name() == CURRENCY_BASKET,
                NodeStatus::NotHandled => {
                    tracing::debug!(element = element.name(), "Skipping unknown basket element");
                }
            }
        }

        if !seen_root {
            return Err(ContractError::MissingElement(CURRENCY_BASKET));
        }
        basket.unsigned_contents = text.to_string();
        Ok(basket)
    }

    /// Apply one element. Missing ids read as empty and unparseable numbers
    /// as zero.
    pub fn process_xml_node(&mut self, element: &Element) -> NodeStatus {
        match element.name() {
            CURRENCY_BASKET => {
                self.sub_count = lenient_i32(element.attribute("contractCount"));
                self.minimum_transfer = lenient_i64(element.attribute("minimumTransfer"));
                tracing::debug!(
                    sub_count = self.sub_count,
                    minimum_transfer = self.minimum_transfer,
                    "Loading currency basket"
                );
                NodeStatus::Handled
            }
            REQUEST_EXCHANGE => {
                if let Some(multiple) = element.attribute("transferMultiple") {
                    self.transfer_multiple = lenient_i32(Some(multiple));
                }
                if let Some(account) = element.attribute("transferAccountID") {
                    self.request_account_id = Identifier::from_encoded(account);
                }
                if let Some(direction) = element.attribute("direction") {
                    self.exchanging_in = direction == "in";
                }
                if let Some(closing) = element.attribute("closingTransactionNo") {
                    self.closing_transaction_no = lenient_i64(Some(closing));
                }
                tracing::debug!(
                    transfer_multiple = self.transfer_multiple,
                    exchanging_in = self.exchanging_in,
                    closing_transaction_no = self.closing_transaction_no,
                    account = %self.request_account_id,
                    "Loaded exchange request"
                );
                NodeStatus::Handled
            }
            BASKET_ITEM => {
                self.items.push(BasketItem {
                    sub_contract_id: Identifier::from_encoded(
                        element.attribute("instrumentDefinitionID").unwrap_or_default(),
                    ),
                    sub_account_id: Identifier::from_encoded(
                        element.attribute("accountID").unwrap_or_default(),
                    ),
                    minimum_transfer_amount: lenient_i64(element.attribute("minimumTransfer")),
                    closing_transaction_no: lenient_i64(element.attribute("closingTransactionNo")),
                });
                NodeStatus::Handled
            }
            _ => NodeStatus::NotHandled,
        }
    }

    /// Append a leg of an exchange request. The basket minimum applies to it.
    pub fn add_request_sub_contract(
        &mut self,
        sub_contract_id: Identifier,
        sub_account_id: Identifier,
        closing_transaction_no: i64,
    ) {
        self.items.push(BasketItem::request(
            sub_contract_id,
            sub_account_id,
            closing_transaction_no,
        ));
    }

    /// Append a leg of a basket definition.
    pub fn add_sub_contract(&mut self, sub_contract_id: Identifier, minimum_transfer_amount: i64) {
        self.items
            .push(BasketItem::definition(sub_contract_id, minimum_transfer_amount));
    }

    /// Closing number of the leg at `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn closing_transaction_no_at(&self, index: usize) -> i64 {
        assert!(
            index < self.items.len(),
            "basket item index {index} out of bounds ({} items)",
            self.items.len()
        );
        self.items[index].closing_transaction_no
    }

    pub fn at(&self, index: usize) -> Option<&BasketItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[BasketItem] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn sub_count(&self) -> i32 {
        self.sub_count
    }

    pub fn minimum_transfer(&self) -> i64 {
        self.minimum_transfer
    }

    pub fn transfer_multiple(&self) -> i32 {
        self.transfer_multiple
    }

    pub fn set_transfer_multiple(&mut self, multiple: i32) {
        self.transfer_multiple = multiple;
    }

    pub fn request_account_id(&self) -> &Identifier {
        &self.request_account_id
    }

    pub fn set_request_account_id(&mut self, account: Identifier) {
        self.request_account_id = account;
    }

    pub fn exchanging_in(&self) -> bool {
        self.exchanging_in
    }

    pub fn set_exchanging_in(&mut self, exchanging_in: bool) {
        self.exchanging_in = exchanging_in;
    }

    /// Closing number of the basket leg itself.
    pub fn closing_num(&self) -> i64 {
        self.closing_transaction_no
    }

    pub fn set_closing_num(&mut self, number: i64) {
        self.closing_transaction_no = number;
    }

    pub fn set_hide_account_ids(&mut self, hide: bool) {
        self.hide_account_ids = hide;
    }

    pub fn is_exchanging(&self) -> bool {
        self.transfer_multiple > 0
    }

    /// Contract text. Element and attribute order are fixed: the content id
    /// is a digest of this text.
    pub fn generate_contents(&self, hide_account_ids: bool) -> String {
        let mut root = Tag::new(CURRENCY_BASKET);
        root.add_attribute("contractCount", self.sub_count.to_string());
        root.add_attribute("minimumTransfer", self.minimum_transfer.to_string());

        if self.is_exchanging() {
            let mut request = Tag::new(REQUEST_EXCHANGE);
            request.add_attribute("transferMultiple", self.transfer_multiple.to_string());
            request.add_attribute("transferAccountID", self.request_account_id.to_string());
            request.add_attribute("closingTransactionNo", self.closing_transaction_no.to_string());
            request.add_attribute("direction", if self.exchanging_in { "in" } else { "out" });
            root.add_tag(request);
        }

        for item in &self.items {
            let mut tag = Tag::new(BASKET_ITEM);
            tag.add_attribute("minimumTransfer", item.minimum_transfer_amount.to_string());
            let account = if hide_account_ids {
                String::new()
            } else {
                item.sub_account_id.to_string()
            };
            tag.add_attribute("accountID", account);
            tag.add_attribute("instrumentDefinitionID", item.sub_contract_id.to_string());
            if self.is_exchanging() {
                tag.add_attribute("closingTransactionNo", item.closing_transaction_no.to_string());
            }
            root.add_tag(tag);
        }

        root.output()
    }

    /// Regenerate the stored contents.
    pub fn update_contents(&mut self) {
        self.unsigned_contents = self.generate_contents(self.hide_account_ids);
    }

    /// Contents as last generated or loaded.
    pub fn unsigned_contents(&self) -> &str {
        &self.unsigned_contents
    }

    /// Content id. Account ids never contribute, so the same basket has the
    /// same id at every notary.
    pub fn calculate_contract_id(&self) -> Identifier {
        Identifier::digest(self.generate_contents(true))
    }

    /// Return every closing number this basket holds to `nym`'s available pool.
    ///
    /// Numbers that are not outstanding are skipped. Saves once, at the end,
    /// when `save` is set and something came back. Returns whether anything did.
    pub fn harvest_closing_numbers(
        &self,
        nym: &mut dyn Identity,
        notary_id: &Identifier,
        save: bool,
    ) -> Result<bool, StoreError> {
        let mut recovered = 0u64;

        let closing_numbers = self
            .items
            .iter()
            .map(|item| item.closing_transaction_no)
            .chain(std::iter::once(self.closing_transaction_no));
        for number in closing_numbers {
            if nym.clawback_transaction_number(notary_id, number, false)? {
                recovered += 1;
            }
        }

        if recovered > 0 {
            metrics::record_numbers_harvested(recovered);
            tracing::debug!(
                nym_id = %nym.nym_id(),
                notary_id = %notary_id,
                recovered,
                "Harvested basket closing numbers"
            );
            if save {
                nym.persist()?;
            }
        }
        Ok(recovered > 0)
    }

    /// Drop every item and reset all fields.
    pub fn release(&mut self) {
        *self = Self::default();
    }
}

/// Leading-integer parse: optional sign then digits, anything else is zero.
fn lenient_i64(value: Option<&str>) -> i64 {
    let Some(value) = value else { return 0 };
    let value = value.trim_start();
    let digits_end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);

    value[..digits_end].parse().unwrap_or(0)
}

fn lenient_i32(value: Option<&str>) -> i32 {
    let wide = lenient_i64(value);
    i32::try_from(wide).unwrap_or(if wide < 0 { i32::MIN } else { i32::MAX })
}
