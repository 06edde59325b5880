//! End-to-end flows through a bill session.

use async_trait::async_trait;
use splitbill_core::{
    BillSession, ChargeUpdate, EntityKind, ExtractedItem, ExtractedReceipt, ExtractionError,
    FieldError, ReceiptExtractor, ReceiptImage, SessionStatus, SplitError, VatBase,
};

struct FixedExtractor(ExtractedReceipt);

#[async_trait]
impl ReceiptExtractor for FixedExtractor {
    async fn extract(&self, _image: &ReceiptImage) -> Result<ExtractedReceipt, ExtractionError> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct FailingExtractor;

#[async_trait]
impl ReceiptExtractor for FailingExtractor {
    async fn extract(&self, _image: &ReceiptImage) -> Result<ExtractedReceipt, ExtractionError> {
        Err(ExtractionError::request("connection reset"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn thai_receipt() -> ExtractedReceipt {
    ExtractedReceipt {
        items: vec![ExtractedItem::new("Pad Thai", 120.0), ExtractedItem::new("Tom Yum", 180.0)],
        vat_amount: 23.1,
        service_charge_amount: 30.0,
        total_amount: 353.1,
    }
}

fn image() -> ReceiptImage {
    ReceiptImage::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg")
}

#[test]
fn test_duplicate_person_name_is_rejected() {
    let mut session = BillSession::new();
    session.add_person("Alice").unwrap();

    let error = session.add_person("alice").unwrap_err();

    assert_eq!(
        error,
        SplitError::Validation {
            errors: vec![FieldError::DuplicateName {
                kind: EntityKind::Person,
                name: "alice".to_string()
            }]
        }
    );
    assert_eq!(session.people().len(), 1);
    assert_eq!(session.people()[0].name, "Alice");
}

#[test]
fn test_names_are_stored_trimmed() {
    let mut session = BillSession::new();
    let person = session.add_person("  Bob  ").unwrap();
    let item = session.add_item("  Som Tam ", 60.0).unwrap();

    assert_eq!(person.name, "Bob");
    assert_eq!(item.name, "Som Tam");
    assert!(session.add_item("som tam", 10.0).is_err());
}

#[test]
fn test_manual_bill_scenario() {
    let mut session = BillSession::new();
    let alice = session.add_person("Alice").unwrap();
    let bob = session.add_person("Bob").unwrap();
    let pad_thai = session.add_item("Pad Thai", 120.0).unwrap();
    let tom_yum = session.add_item("Tom Yum", 180.0).unwrap();

    session.toggle(pad_thai.id, alice.id).unwrap();
    session.toggle(tom_yum.id, alice.id).unwrap();
    session.toggle(tom_yum.id, bob.id).unwrap();
    session
        .update_charges(
            ChargeUpdate::default().vat_rate(7.0).service_charge_rate(10.0).vat_base(VatBase::Base),
        )
        .unwrap();

    let allocation = session.allocation();
    let alice_total = allocation.total_for(alice.id).unwrap();
    let bob_total = allocation.total_for(bob.id).unwrap();

    assert!((alice_total.total - 245.7).abs() < 1e-9);
    assert!((bob_total.total - 105.3).abs() < 1e-9);
    assert!((allocation.grand_total() - 351.0).abs() < 1e-9);
}

#[test]
fn test_out_of_range_charge_update_changes_nothing() {
    let mut session = BillSession::new();
    session.update_charges(ChargeUpdate::default().vat_rate(7.0)).unwrap();

    let error =
        session.update_charges(ChargeUpdate::default().vat_rate(101.0).round_up(true)).unwrap_err();

    assert_eq!(error.category(), "validation");
    assert_eq!(session.charges().vat_rate_percent, 7.0);
    assert!(!session.charges().round_up);
}

#[test]
fn test_assign_all_then_remove_item() {
    let mut session = BillSession::new();
    let alice = session.add_person("Alice").unwrap();
    let bob = session.add_person("Bob").unwrap();
    let platter = session.add_item("Platter", 300.0).unwrap();

    let assigned = session.assign_all(platter.id).unwrap();
    assert_eq!(assigned, vec![alice.id, bob.id]);
    assert_eq!(session.allocation().total_for(bob.id).unwrap().base, 150.0);

    session.remove_item(platter.id).unwrap();
    assert!(session.assignments().is_empty());
    assert_eq!(session.allocation().grand_total(), 0.0);
    assert!(matches!(session.remove_item(platter.id), Err(SplitError::NotFound { .. })));
}

#[tokio::test]
async fn test_extraction_replaces_items_and_keeps_people() {
    let mut session = BillSession::new();
    let alice = session.add_person("Alice").unwrap();
    let old = session.add_item("Old Item", 50.0).unwrap();
    session.toggle(old.id, alice.id).unwrap();

    let outcome = session.extract_with(&FixedExtractor(thai_receipt()), &image()).await.unwrap();

    assert_eq!(session.status(), &SessionStatus::Ready);
    assert_eq!(session.people().len(), 1);
    let names: Vec<&str> = session.items().iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Pad Thai", "Tom Yum"]);
    assert!(!session.assignments().is_assigned(old.id, alice.id));

    assert_eq!(outcome.charges.vat_rate_percent, 7.0);
    assert_eq!(outcome.charges.service_charge_rate_percent, 10.0);
    assert!(outcome.warnings.is_empty());
    assert!(outcome.rejected.is_empty());
    assert_eq!(session.receipt_total(), Some(353.1));

    // nothing assigned yet, so the calculated side is 0
    let reconciliation = session.reconciliation().unwrap();
    assert_eq!(reconciliation.calculated_total, 0.0);
    assert!((reconciliation.difference + 353.1).abs() < 1e-9);
}

#[tokio::test]
async fn test_extraction_skips_invalid_items() {
    let mut session = BillSession::new();
    let receipt = ExtractedReceipt {
        items: vec![
            ExtractedItem::new("Beer", 90.0),
            ExtractedItem::new("beer", 90.0),
            ExtractedItem::new("X", 10.0),
            ExtractedItem::new("Discount", -20.0),
        ],
        vat_amount: 0.0,
        service_charge_amount: 0.0,
        total_amount: 160.0,
    };

    let outcome = session.extract_with(&FixedExtractor(receipt), &image()).await.unwrap();

    assert_eq!(session.items().len(), 1);
    assert_eq!(outcome.rejected.len(), 3);
    assert_eq!(outcome.rejected[2].reasons, vec!["Price must be greater than 0".to_string()]);
    assert!(outcome.warnings.iter().any(|warning| warning.contains("3 extracted item(s)")));
}

#[tokio::test]
async fn test_failed_extraction_keeps_items_and_clears_processing() {
    let mut session = BillSession::new();
    session.add_item("Rice", 20.0).unwrap();

    let error = session.extract_with(&FailingExtractor, &image()).await.unwrap_err();

    assert_eq!(error.category(), "extraction");
    assert_eq!(error.to_string(), "Extraction error: Extraction request failed: connection reset");
    assert_eq!(session.items().len(), 1);
    assert!(!session.is_processing());
    assert!(matches!(session.status(), SessionStatus::Failed { .. }));

    // a retry is allowed
    session.extract_with(&FixedExtractor(thai_receipt()), &image()).await.unwrap();
    assert_eq!(session.status(), &SessionStatus::Ready);
}

#[test]
fn test_second_begin_is_rejected_while_processing() {
    let mut session = BillSession::new();
    session.begin_extraction().unwrap();

    assert_eq!(session.begin_extraction(), Err(SplitError::ExtractionInProgress));
    assert_eq!(session.clear_receipt(), Err(SplitError::ExtractionInProgress));

    // edits still go through
    let alice = session.add_person("Alice").unwrap();
    assert_eq!(session.people()[0].id, alice.id);

    session.complete_extraction(Ok(thai_receipt())).unwrap();
    assert!(!session.is_processing());
}

#[test]
fn test_clear_receipt_drops_items_and_assignments() {
    let mut session = BillSession::new();
    let alice = session.add_person("Alice").unwrap();
    session.update_charges(ChargeUpdate::default().round_up(true)).unwrap();
    session.begin_extraction().unwrap();
    session.complete_extraction(Ok(thai_receipt())).unwrap();
    let first = session.items()[0].id;
    session.toggle(first, alice.id).unwrap();

    session.clear_receipt().unwrap();

    assert!(session.items().is_empty());
    assert!(session.assignments().is_empty());
    assert_eq!(session.receipt_total(), None);
    assert_eq!(session.status(), &SessionStatus::Idle);
    assert_eq!(session.people().len(), 1);
    assert!(session.charges().round_up);
}
