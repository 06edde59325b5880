//! Request and response bodies of the HTTP relay.

use serde::{Deserialize, Serialize};
use splitbill_core::{
    Allocation, BillSession, ChargeConfig, ItemId, LineItem, Person, PersonId, Reconciliation,
    SessionStatus, TokenUsage,
};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// An extraction call is in flight
    pub processing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPersonRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub item_id: ItemId,
    pub person_id: PersonId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub item_id: ItemId,
    pub person_id: PersonId,
    pub assigned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAllResponse {
    pub item_id: ItemId,
    pub person_ids: Vec<PersonId>,
}

/// People marked on one item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRow {
    pub item_id: ItemId,
    pub person_ids: Vec<PersonId>,
}

/// Everything a presentation layer needs to render the bill
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSnapshot {
    pub people: Vec<Person>,
    pub items: Vec<LineItem>,
    /// One row per item, in item order, people in people order
    pub assignments: Vec<AssignmentRow>,
    pub charges: ChargeConfig,
    pub status: SessionStatus,
    pub receipt_total: Option<f64>,
    pub allocation: Allocation,
    pub reconciliation: Option<Reconciliation>,
}

impl From<&BillSession> for BillSnapshot {
    fn from(session: &BillSession) -> Self {
        let assignments = session
            .items()
            .iter()
            .map(|item| AssignmentRow {
                item_id: item.id,
                person_ids: session
                    .people()
                    .iter()
                    .filter(|person| session.assignments().is_assigned(item.id, person.id))
                    .map(|person| person.id)
                    .collect(),
            })
            .collect();

        Self {
            people: session.people().to_vec(),
            items: session.items().to_vec(),
            assignments,
            charges: *session.charges(),
            status: session.status().clone(),
            receipt_total: session.receipt_total(),
            allocation: session.allocation(),
            reconciliation: session.reconciliation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub extractor: String,
    /// Absent when the extractor is not metered
    pub token_usage: Option<TokenUsage>,
}
