//! Service charge and VAT application for a single base amount.

use splitbill_types::{ChargeConfig, PersonTotal, VatBase};

use crate::built_in::percentage_of::PercentageOfCalculator;

/// Apply service charge, then VAT, to `base`
///
/// The returned `total` is unrounded; the round-up policy is the caller's
/// concern since it applies to the headline figure only.
pub fn breakdown(base: f64, config: &ChargeConfig) -> PersonTotal {
    let percentage = PercentageOfCalculator;

    let service_charge_amount = percentage.calculate(base, config.service_charge_rate_percent);
    let vat_base_amount = match config.vat_base {
        VatBase::Base => base,
        VatBase::BaseWithService => base + service_charge_amount,
    };
    let vat_amount = percentage.calculate(vat_base_amount, config.vat_rate_percent);

    PersonTotal {
        base,
        service_charge_amount,
        vat_amount,
        total: base + service_charge_amount + vat_amount,
    }
}
