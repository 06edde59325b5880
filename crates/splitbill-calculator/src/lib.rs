#![deny(warnings)]
//! The allocation engine for splitbill.
//!
//! Turns a set of line items, a set of people and a sparse person/item
//! assignment relation into per-person totals, applying service charge and
//! VAT in the configured order and the round-up policy. Everything here is a
//! pure computation: no I/O and no shared state, so it is safe to re-run on
//! every user event.

pub mod allocation;
pub mod built_in;
pub mod charges;

pub use allocation::{Allocation, AssignmentLookup, PersonAllocation, allocate};
pub use built_in::equal_split::EqualSplitCalculator;
pub use built_in::percentage_of::PercentageOfCalculator;
pub use built_in::round_up::RoundingPolicy;
pub use charges::breakdown;
