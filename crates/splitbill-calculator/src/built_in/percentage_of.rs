//! Calculator for taking a percentage of an amount
//!
//! Rates are expressed in percentage points, so a 7% VAT rate is `7.0`.
//! For example, 7% of 210 is 14.7 (210 * 7 / 100).

/// Calculator for percentage-of-amount operations
///
/// # Arguments
/// * `amount` - The amount the rate applies to
/// * `rate_percent` - Rate in percentage points (e.g., 10.0 for 10%)
///
/// # Returns
/// `amount * rate_percent / 100`. Out-of-range rates are not clamped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentageOfCalculator;

impl PercentageOfCalculator {
    /// Apply `rate_percent` to `amount`
    pub fn calculate(&self, amount: f64, rate_percent: f64) -> f64 {
        amount * rate_percent / 100.0
    }
}
