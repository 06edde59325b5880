//! Built-in calculators the allocation engine is assembled from.

// Splitting calculators
pub mod equal_split;

// Charge calculators
pub mod percentage_of;

// Rounding
pub mod round_up;
