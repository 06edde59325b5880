//! One bill being split.
//!
//! [`BillSession`] owns the people, the line items, the assignment store and
//! the charge configuration, and tracks the receipt extraction that seeds
//! them. Every mutation is validated here; totals are recomputed from scratch
//! on each call to [`BillSession::allocation`].

use serde::Serialize;
use splitbill_calculator::{Allocation, allocate};
use splitbill_types::{ChargeConfig, ItemId, LineItem, Person, PersonId};
use tracing::{debug, info, instrument, warn};

use crate::assignment_store::AssignmentStore;
use crate::charges::ChargeUpdate;
use crate::error::{SplitError, SplitResult};
use crate::extraction::{
    DerivedRate, ExtractedReceipt, ExtractionError, ExtractionOutcome, ReceiptExtractor,
    ReceiptImage, RejectedItem,
};
use crate::validation::{EntityKind, FieldError, validate_name, validate_price, validate_rate};

/// Where the session is in the receipt extraction lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionStatus {
    /// No receipt extracted yet, or the receipt was cleared
    #[default]
    Idle,
    /// An extraction call is in flight
    Processing,
    /// The last extraction succeeded
    Ready,
    /// The last extraction failed; previous items are kept
    Failed { message: String },
}

/// Receipt total compared with the calculated grand total
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub receipt_total: f64,
    pub calculated_total: f64,
    /// `calculated_total - receipt_total`
    pub difference: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BillSession {
    people: Vec<Person>,
    items: Vec<LineItem>,
    assignments: AssignmentStore,
    charges: ChargeConfig,
    receipt_total: Option<f64>,
    status: SessionStatus,
}

impl BillSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    pub fn charges(&self) -> &ChargeConfig {
        &self.charges
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_processing(&self) -> bool {
        self.status == SessionStatus::Processing
    }

    /// Total printed on the last extracted receipt
    pub fn receipt_total(&self) -> Option<f64> {
        self.receipt_total
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.people.iter().find(|person| person.id == id)
    }

    pub fn item(&self, id: ItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[instrument(skip(self))]
    pub fn add_person(&mut self, name: &str) -> SplitResult<Person> {
        let name = validate_name(
            EntityKind::Person,
            name,
            self.people.iter().map(|person| person.name.as_str()),
        )
        .map_err(SplitError::invalid_field)?;

        let person = Person::new(name);
        info!(person_id = %person.id, name = %person.name, "Person added");
        self.people.push(person.clone());
        Ok(person)
    }

    #[instrument(skip(self), fields(person_id = %id))]
    pub fn remove_person(&mut self, id: PersonId) -> SplitResult<Person> {
        let index = self
            .people
            .iter()
            .position(|person| person.id == id)
            .ok_or_else(|| SplitError::person_not_found(id))?;

        let person = self.people.remove(index);
        self.assignments.remove_person(id);
        info!(name = %person.name, "Person removed");
        Ok(person)
    }

    /// Add a line item, reporting every invalid field at once
    #[instrument(skip(self))]
    pub fn add_item(&mut self, name: &str, price: f64) -> SplitResult<LineItem> {
        let (name, price) = validate_item(name, price, self.item_names())
            .map_err(SplitError::validation)?;

        let item = LineItem::new(name, price);
        info!(item_id = %item.id, name = %item.name, price = item.price, "Item added");
        self.items.push(item.clone());
        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %id))]
    pub fn remove_item(&mut self, id: ItemId) -> SplitResult<LineItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| SplitError::item_not_found(id))?;

        let item = self.items.remove(index);
        self.assignments.remove_item(id);
        info!(name = %item.name, "Item removed");
        Ok(item)
    }

    /// Flip whether a person shares an item; returns the new state
    #[instrument(skip(self), fields(item_id = %item, person_id = %person))]
    pub fn toggle(&mut self, item: ItemId, person: PersonId) -> SplitResult<bool> {
        self.require_item(item)?;
        self.require_person(person)?;

        let assigned = self.assignments.toggle(item, person);
        debug!(assigned, "Assignment toggled");
        Ok(assigned)
    }

    /// Mark every current person on an item
    #[instrument(skip(self), fields(item_id = %item))]
    pub fn assign_all(&mut self, item: ItemId) -> SplitResult<Vec<PersonId>> {
        self.require_item(item)?;

        let ids: Vec<PersonId> = self.people.iter().map(|person| person.id).collect();
        self.assignments.assign_all(item, ids.iter().copied());
        debug!(people = ids.len(), "Item assigned to everyone");
        Ok(ids)
    }

    #[instrument(skip(self))]
    pub fn update_charges(&mut self, update: ChargeUpdate) -> SplitResult<ChargeConfig> {
        self.charges = update.apply_to(&self.charges)?;
        info!(
            vat_rate_percent = self.charges.vat_rate_percent,
            service_charge_rate_percent = self.charges.service_charge_rate_percent,
            vat_base = ?self.charges.vat_base,
            round_up = self.charges.round_up,
            "Charges updated"
        );
        Ok(self.charges)
    }

    /// Per-person totals for the current state of the bill
    pub fn allocation(&self) -> Allocation {
        allocate(&self.items, &self.people, &self.assignments, &self.charges)
    }

    /// Compare the calculated grand total with the receipt, when one is known
    pub fn reconciliation(&self) -> Option<Reconciliation> {
        let receipt_total = self.receipt_total.filter(|total| *total > 0.0)?;
        let calculated_total = self.allocation().grand_total();
        Some(Reconciliation {
            receipt_total,
            calculated_total,
            difference: calculated_total - receipt_total,
        })
    }

    /// Mark an extraction as in flight
    ///
    /// Fails while another extraction is pending. Editing people, items,
    /// assignments and charges stays possible meanwhile.
    #[instrument(skip(self))]
    pub fn begin_extraction(&mut self) -> SplitResult<()> {
        if self.is_processing() {
            warn!("Rejected extraction: another one is in progress");
            return Err(SplitError::ExtractionInProgress);
        }
        self.status = SessionStatus::Processing;
        debug!("Extraction started");
        Ok(())
    }

    /// Apply the result of an extraction and clear the processing flag
    ///
    /// On success the items are replaced (their assignments dropped), the
    /// derived rates and the receipt total are applied, and people are kept.
    /// On failure the message is recorded and the bill is left untouched.
    #[instrument(skip_all)]
    pub fn complete_extraction(
        &mut self,
        result: Result<ExtractedReceipt, ExtractionError>,
    ) -> SplitResult<ExtractionOutcome> {
        match result {
            Ok(receipt) => Ok(self.apply_receipt(receipt)),
            Err(error) => {
                let message = error.to_string();
                warn!(error = %message, "Extraction failed");
                self.status = SessionStatus::Failed { message: message.clone() };
                Err(SplitError::extraction_with_details(message, format!("{error:?}")))
            }
        }
    }

    /// Run a whole extraction against this session
    pub async fn extract_with<E>(
        &mut self,
        extractor: &E,
        image: &ReceiptImage,
    ) -> SplitResult<ExtractionOutcome>
    where
        E: ReceiptExtractor + ?Sized,
    {
        self.begin_extraction()?;
        info!(extractor = extractor.name(), bytes = image.len(), "Extracting receipt");
        let result = extractor.extract(image).await;
        self.complete_extraction(result)
    }

    /// Drop the receipt: its items, their assignments, the receipt total and
    /// any extraction error. People and charges stay.
    #[instrument(skip(self))]
    pub fn clear_receipt(&mut self) -> SplitResult<()> {
        if self.is_processing() {
            return Err(SplitError::ExtractionInProgress);
        }
        for item in &self.items {
            self.assignments.remove_item(item.id);
        }
        self.items.clear();
        self.receipt_total = None;
        self.status = SessionStatus::Idle;
        info!("Receipt cleared");
        Ok(())
    }

    fn apply_receipt(&mut self, receipt: ExtractedReceipt) -> ExtractionOutcome {
        let mut warnings = Vec::new();
        let vat_rate = accept_derived_rate(
            "vatRatePercent",
            receipt.vat_rate(),
            "VAT rate could not be derived from the receipt; using 0%",
            &mut warnings,
        );
        let service_charge_rate = accept_derived_rate(
            "serviceChargeRatePercent",
            receipt.service_charge_rate(),
            "Service charge rate could not be derived from the receipt; using 0%",
            &mut warnings,
        );

        let mut items: Vec<LineItem> = Vec::with_capacity(receipt.items.len());
        let mut rejected = Vec::new();
        for extracted in receipt.items {
            let checked =
                validate_item(&extracted.name, extracted.price, items.iter().map(|i| i.name.as_str()));
            match checked {
                Ok((name, price)) => items.push(LineItem::new(name, price)),
                Err(errors) => {
                    debug!(name = %extracted.name, "Skipping extracted item");
                    rejected.push(RejectedItem {
                        name: extracted.name,
                        price: extracted.price,
                        reasons: errors.iter().map(ToString::to_string).collect(),
                    });
                }
            }
        }
        if !rejected.is_empty() {
            warnings.push(format!("{} extracted item(s) were skipped", rejected.len()));
        }

        for old in &self.items {
            self.assignments.remove_item(old.id);
        }
        self.items = items;
        self.charges.vat_rate_percent = vat_rate;
        self.charges.service_charge_rate_percent = service_charge_rate;
        self.receipt_total = Some(receipt.total_amount);
        self.status = SessionStatus::Ready;

        info!(
            items = self.items.len(),
            rejected = rejected.len(),
            vat_rate_percent = vat_rate,
            service_charge_rate_percent = service_charge_rate,
            receipt_total = receipt.total_amount,
            "Receipt applied"
        );

        ExtractionOutcome {
            items: self.items.clone(),
            rejected,
            charges: self.charges,
            receipt_total: receipt.total_amount,
            warnings,
        }
    }

    fn item_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name.as_str())
    }

    fn require_item(&self, id: ItemId) -> SplitResult<()> {
        self.item(id).map(|_| ()).ok_or_else(|| SplitError::item_not_found(id))
    }

    fn require_person(&self, id: PersonId) -> SplitResult<()> {
        self.person(id).map(|_| ()).ok_or_else(|| SplitError::person_not_found(id))
    }
}

/// Validate both fields of a line item, collecting every failure
fn validate_item<'a, I>(name: &str, price: f64, existing: I) -> Result<(String, f64), Vec<FieldError>>
where
    I: IntoIterator<Item = &'a str>,
{
    let name = validate_name(EntityKind::Product, name, existing);
    let price = validate_price(price);
    match (name, price) {
        (Ok(name), Ok(price)) => Ok((name, price)),
        (name, price) => Err(name.err().into_iter().chain(price.err()).collect()),
    }
}

/// Turn a derived rate into a usable percentage, falling back to 0
fn accept_derived_rate(
    field: &'static str,
    rate: DerivedRate,
    undefined_warning: &str,
    warnings: &mut Vec<String>,
) -> f64 {
    match rate.value() {
        Some(percent) => match validate_rate(field, percent) {
            Ok(percent) => percent,
            Err(error) => {
                warnings.push(format!("{error}; using 0%"));
                0.0
            }
        },
        None => {
            warnings.push(undefined_warning.to_string());
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractedItem;

    #[test]
    fn add_item_reports_every_invalid_field() {
        let mut session = BillSession::new();
        let error = session.add_item(" ", -1.0).unwrap_err();

        let fields: Vec<&str> = error.field_errors().iter().map(FieldError::field).collect();
        assert_eq!(fields, vec!["name", "price"]);
        assert!(session.items().is_empty());
    }

    #[test]
    fn removing_a_person_drops_their_assignments() {
        let mut session = BillSession::new();
        let alice = session.add_person("Alice").unwrap();
        let soup = session.add_item("Soup", 80.0).unwrap();
        assert!(session.toggle(soup.id, alice.id).unwrap());

        session.remove_person(alice.id).unwrap();
        assert!(!session.assignments().is_assigned(soup.id, alice.id));
        assert!(session.remove_person(alice.id).is_err());
    }

    #[test]
    fn toggle_rejects_unknown_ids() {
        let mut session = BillSession::new();
        let alice = session.add_person("Alice").unwrap();
        let soup = session.add_item("Soup", 80.0).unwrap();

        let error = session.toggle(ItemId::new(), alice.id).unwrap_err();
        assert_eq!(error.category(), "not_found");
        let error = session.toggle(soup.id, PersonId::new()).unwrap_err();
        assert!(matches!(error, SplitError::NotFound { kind: EntityKind::Person, .. }));
    }

    #[test]
    fn derived_rates_fall_back_to_zero_with_warning() {
        let mut session = BillSession::new();
        session
            .update_charges(ChargeUpdate::default().vat_rate(7.0).service_charge_rate(10.0))
            .unwrap();
        session.begin_extraction().unwrap();
        let outcome = session
            .complete_extraction(Ok(ExtractedReceipt {
                items: vec![ExtractedItem::new("Rice", 40.0)],
                vat_amount: 3.0,
                service_charge_amount: 0.0,
                total_amount: 0.0,
            }))
            .unwrap();

        assert_eq!(outcome.charges.vat_rate_percent, 0.0);
        assert_eq!(outcome.charges.service_charge_rate_percent, 0.0);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("VAT rate"));
        assert!(session.reconciliation().is_none());
    }

    #[test]
    fn out_of_range_derived_rate_is_replaced() {
        let mut session = BillSession::new();
        session.begin_extraction().unwrap();
        let outcome = session
            .complete_extraction(Ok(ExtractedReceipt {
                items: vec![ExtractedItem::new("Rice", 10.0)],
                vat_amount: 0.0,
                service_charge_amount: 50.0,
                total_amount: 60.0,
            }))
            .unwrap();

        assert_eq!(outcome.charges.service_charge_rate_percent, 0.0);
        assert!(outcome.warnings.iter().any(|w| w.contains("serviceChargeRatePercent")));
    }
}
