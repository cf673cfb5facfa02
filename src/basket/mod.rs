//! Basket currencies.
//!
//! # Data Flow
//! ```text
//! Definition:  with_params → add_sub_contract ... → calculate_contract_id
//! Exchange:    set_transfer_multiple / account / direction
//!              → add_request_sub_contract (leg, account, closing number) ...
//!              → update_contents → message payload
//! Abandoned:   harvest_closing_numbers → Identity clawback → persist
//! Incoming:    contract text → ElementReader → process_xml_node
//! ```
//!
//! # Design Decisions
//! - The content id hashes contents with account ids blanked, so the same
//!   basket has one id across notaries
//! - Items are owned values in insertion order

pub mod contract;
pub mod item;

pub use contract::{Basket, NodeStatus};
pub use item::BasketItem;
