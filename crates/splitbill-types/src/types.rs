use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a person within a bill session
///
/// Assigned once when the person is created. Display names can collide in
/// case or be re-used after removal; identifiers never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(Uuid);

impl PersonId {
    /// Generate a fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identifier of a line item within a bill session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generate a fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Someone sharing the bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Stable identifier
    pub id: PersonId,
    /// Display name, unique (case-insensitive) within a session
    pub name: String,
}

impl Person {
    /// Create a person with a freshly generated identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: PersonId::new(), name: name.into() }
    }
}

/// A single priced entry on the receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable identifier
    pub id: ItemId,
    /// Display name, unique (case-insensitive) among the current items
    pub name: String,
    /// Price before service charge and VAT; finite and positive once validated
    pub price: f64,
}

impl LineItem {
    /// Create a line item with a freshly generated identifier
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self { id: ItemId::new(), name: name.into(), price }
    }
}

/// The amount VAT is levied on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VatBase {
    /// VAT on the raw base amount only
    Base,
    /// VAT on the base amount plus the service charge
    #[default]
    BaseWithService,
}

/// User-adjustable charges applied on top of each person's base amount
///
/// Rates are percentages. They are conceptually within `[0, 100]` but the
/// allocation engine computes with whatever value it is given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeConfig {
    /// VAT rate in percent
    pub vat_rate_percent: f64,
    /// Service-charge rate in percent
    pub service_charge_rate_percent: f64,
    /// Whether VAT applies to the base or to base plus service charge
    pub vat_base: VatBase,
    /// Round each person's headline total up to a whole currency unit
    pub round_up: bool,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            vat_rate_percent: 0.0,
            service_charge_rate_percent: 0.0,
            vat_base: VatBase::default(),
            round_up: false,
        }
    }
}

impl ChargeConfig {
    /// Create a configuration with the given rates and default VAT base and rounding
    #[must_use]
    pub fn new(vat_rate_percent: f64, service_charge_rate_percent: f64) -> Self {
        Self { vat_rate_percent, service_charge_rate_percent, ..Self::default() }
    }

    /// Set the VAT base
    #[must_use]
    pub const fn with_vat_base(mut self, vat_base: VatBase) -> Self {
        self.vat_base = vat_base;
        self
    }

    /// Set the round-up policy
    #[must_use]
    pub const fn with_round_up(mut self, round_up: bool) -> Self {
        self.round_up = round_up;
        self
    }
}

/// One person's share of the bill, broken down by charge
///
/// `base`, `service_charge_amount` and `vat_amount` are always unrounded;
/// only `total` is subject to the round-up policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonTotal {
    /// Sum of the person's split item prices
    pub base: f64,
    /// Service charge on the base
    pub service_charge_amount: f64,
    /// VAT on the configured VAT base
    pub vat_amount: f64,
    /// Headline total
    pub total: f64,
}
