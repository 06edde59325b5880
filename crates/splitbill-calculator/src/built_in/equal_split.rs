//! Equal Split Calculator
//!
//! Divides a line item's price evenly between the people sharing it.
//!
//! result = price / shares
//!
//! Returns `None` when nobody shares the item. The division is plain
//! floating-point; a price that does not divide evenly yields a repeating
//! fraction and is only rounded for display.

/// Calculator for even splits of a single price
#[derive(Debug, Default, Clone, Copy)]
pub struct EqualSplitCalculator;

impl EqualSplitCalculator {
    /// Share of `price` paid by each of `shares` people
    pub fn calculate(&self, price: f64, shares: usize) -> Option<f64> {
        if shares == 0 {
            return None;
        }
        Some(price / shares as f64)
    }
}
