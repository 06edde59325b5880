#![deny(warnings)]
#![allow(missing_docs)]
//! splitbill HTTP relay
//!
//! Holds exactly one bill session and exposes it as JSON over HTTP, together
//! with the receipt upload that runs the extraction collaborator.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use splitbill_core::{BillSession, ReceiptExtractor};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::SplitbillConfig;
use crate::error::{ApiError, ApiResult};

pub mod config;
pub mod error;
pub mod gemini;
pub mod handlers;
pub mod tracing_setup;
pub mod types;

/// Application state shared by every handler
pub struct AppState {
    pub start_time: DateTime<Utc>,
    pub session: RwLock<BillSession>,
    pub extractor: Arc<dyn ReceiptExtractor>,
    pub config: SplitbillConfig,
}

impl AppState {
    pub fn new(config: SplitbillConfig, extractor: Arc<dyn ReceiptExtractor>) -> Self {
        info!(extractor = extractor.name(), "Initializing application state");
        Self {
            start_time: Utc::now(),
            session: RwLock::new(BillSession::new()),
            extractor,
            config,
        }
    }

    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.start_time).to_std().unwrap_or_default()
    }

    pub fn read_session(&self) -> ApiResult<RwLockReadGuard<'_, BillSession>> {
        self.session.read().map_err(|_| ApiError::internal("Session lock poisoned"))
    }

    pub fn write_session(&self) -> ApiResult<RwLockWriteGuard<'_, BillSession>> {
        self.session.write().map_err(|_| ApiError::internal("Session lock poisoned"))
    }

    /// Rejection for a request body over the configured image limit
    pub fn payload_too_large(&self) -> ApiError {
        ApiError::PayloadTooLarge { limit_bytes: self.config.limits.max_image_bytes() }
    }
}

/// Build the router for a prepared state
pub fn create_app(state: Arc<AppState>) -> Router {
    let max_image_bytes = state.config.limits.max_image_bytes();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/bill", get(handlers::get_bill))
        .route("/totals", get(handlers::get_totals))
        .route("/people", post(handlers::add_person))
        .route("/people/{id}", delete(handlers::remove_person))
        .route("/items", post(handlers::add_item))
        .route("/items/{id}", delete(handlers::remove_item))
        .route("/items/{id}/assign-all", post(handlers::assign_all))
        .route("/assignments/toggle", post(handlers::toggle_assignment))
        .route("/charges", get(handlers::get_charges).patch(handlers::update_charges))
        .route("/receipt", post(handlers::upload_receipt).delete(handlers::clear_receipt))
        .route("/extraction/usage", get(handlers::extraction_usage))
        .layer(DefaultBodyLimit::max(max_image_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
