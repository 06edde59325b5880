//! Round-up policy for headline totals.

/// How a person's final total is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingPolicy {
    /// Keep the exact floating-point total
    #[default]
    Exact,
    /// Ceiling to the next whole currency unit
    RoundUp,
}

impl RoundingPolicy {
    /// Apply the policy to a total
    pub fn apply(self, total: f64) -> f64 {
        match self {
            RoundingPolicy::Exact => total,
            RoundingPolicy::RoundUp => total.ceil(),
        }
    }
}

impl From<bool> for RoundingPolicy {
    fn from(round_up: bool) -> Self {
        if round_up { RoundingPolicy::RoundUp } else { RoundingPolicy::Exact }
    }
}
