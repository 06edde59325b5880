//! Splitbill Types
//!
//! This crate defines the data model shared by the splitbill crates
//! (`splitbill-calculator`, `splitbill-core` and `splitbill-api`): people, line
//! items, their stable identifiers, the charge configuration and the derived
//! per-person totals.

#![deny(warnings)]
#![deny(missing_docs)]

mod types;
pub use types::{ChargeConfig, ItemId, LineItem, Person, PersonId, PersonTotal, VatBase};
