//! Partial updates to the charge configuration.

use serde::{Deserialize, Serialize};
use splitbill_types::{ChargeConfig, VatBase};

use crate::error::{SplitError, SplitResult};
use crate::validation::{FieldError, validate_rate};

/// Any subset of the charge settings to change in one step
///
/// Either every present field is applied or, when a rate is rejected,
/// nothing is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChargeUpdate {
    pub vat_rate_percent: Option<f64>,
    pub service_charge_rate_percent: Option<f64>,
    pub vat_base: Option<VatBase>,
    pub round_up: Option<bool>,
}

impl ChargeUpdate {
    pub fn vat_rate(mut self, percent: f64) -> Self {
        self.vat_rate_percent = Some(percent);
        self
    }

    pub fn service_charge_rate(mut self, percent: f64) -> Self {
        self.service_charge_rate_percent = Some(percent);
        self
    }

    pub fn vat_base(mut self, base: VatBase) -> Self {
        self.vat_base = Some(base);
        self
    }

    pub fn round_up(mut self, enabled: bool) -> Self {
        self.round_up = Some(enabled);
        self
    }

    /// `true` when the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.vat_rate_percent.is_none()
            && self.service_charge_rate_percent.is_none()
            && self.vat_base.is_none()
            && self.round_up.is_none()
    }

    /// Produce the configuration that results from applying this update
    ///
    /// Rates must be finite and within `[0, 100]`; every rejected rate is
    /// reported.
    pub fn apply_to(&self, current: &ChargeConfig) -> SplitResult<ChargeConfig> {
        let mut errors: Vec<FieldError> = Vec::new();
        let mut next = *current;

        if let Some(rate) = self.vat_rate_percent {
            match validate_rate("vatRatePercent", rate) {
                Ok(rate) => next.vat_rate_percent = rate,
                Err(error) => errors.push(error),
            }
        }
        if let Some(rate) = self.service_charge_rate_percent {
            match validate_rate("serviceChargeRatePercent", rate) {
                Ok(rate) => next.service_charge_rate_percent = rate,
                Err(error) => errors.push(error),
            }
        }
        if !errors.is_empty() {
            return Err(SplitError::validation(errors));
        }

        if let Some(base) = self.vat_base {
            next.vat_base = base;
        }
        if let Some(round_up) = self.round_up {
            next.round_up = round_up;
        }
        Ok(next)
    }
}
