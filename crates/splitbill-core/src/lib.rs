#![deny(warnings)]
#![allow(missing_docs)]
//! Session state for splitting a single restaurant bill.
//!
//! This crate owns everything between the user's events and the allocation
//! engine: the people and line items of the bill, the sparse assignment
//! store, the charge configuration, the entry validation that gates what
//! reaches the engine, and the boundary to the external receipt extractor.

/// Sparse item/person assignment store
pub mod assignment_store;
/// Charge configuration updates
pub mod charges;
/// Error types for session operations
pub mod error;
/// Receipt extraction boundary and rate derivation
pub mod extraction;
/// The bill session tying everything together
pub mod session;
/// Name and price validation for new entries
pub mod validation;

pub use assignment_store::AssignmentStore;
pub use charges::ChargeUpdate;
pub use error::{SplitError, SplitResult};
pub use extraction::{
    DerivedRate, ExtractedItem, ExtractedReceipt, ExtractionError, ExtractionOutcome,
    ReceiptExtractor, ReceiptImage, RejectedItem, TokenUsage,
};
pub use session::{BillSession, Reconciliation, SessionStatus};
pub use validation::{EntityKind, FieldError};

pub use splitbill_calculator::{Allocation, PersonAllocation};
pub use splitbill_types::{ChargeConfig, ItemId, LineItem, Person, PersonId, PersonTotal, VatBase};
