//! Receipt extraction boundary.
//!
//! A [`ReceiptExtractor`] turns a photo of a receipt into line items and the
//! charge amounts printed on it. The session converts those amounts into
//! rates with [`DerivedRate`], which keeps a zero or missing divisor from
//! ever reaching the charge configuration as NaN or infinity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use splitbill_types::{ChargeConfig, LineItem};
use thiserror::Error;

/// Raw image handed to an extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReceiptImage {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self { bytes: bytes.into(), mime_type: mime_type.into() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A line as read off the receipt, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub name: String,
    pub price: f64,
}

impl ExtractedItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self { name: name.into(), price }
    }
}

/// Everything an extractor read off a receipt
///
/// Amounts the receipt does not show are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedReceipt {
    pub items: Vec<ExtractedItem>,
    pub vat_amount: f64,
    pub service_charge_amount: f64,
    pub total_amount: f64,
}

impl ExtractedReceipt {
    /// Sum of the extracted item prices
    pub fn item_sum(&self) -> f64 {
        self.items.iter().map(|item| item.price).sum()
    }

    /// VAT as a whole percentage of the receipt total
    pub fn vat_rate(&self) -> DerivedRate {
        DerivedRate::from_amounts(self.vat_amount, self.total_amount)
    }

    /// Service charge as a whole percentage of the item sum
    pub fn service_charge_rate(&self) -> DerivedRate {
        DerivedRate::from_amounts(self.service_charge_amount, self.item_sum())
    }
}

/// A percentage derived from two amounts on a receipt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivedRate {
    /// `round(amount / divisor * 100)`
    Defined(f64),
    /// The divisor was zero or the quotient was not finite
    Undefined,
}

impl DerivedRate {
    pub fn from_amounts(amount: f64, divisor: f64) -> Self {
        if divisor == 0.0 {
            return DerivedRate::Undefined;
        }
        let percent = (amount / divisor * 100.0).round();
        if percent.is_finite() { DerivedRate::Defined(percent) } else { DerivedRate::Undefined }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            DerivedRate::Defined(percent) => Some(*percent),
            DerivedRate::Undefined => None,
        }
    }
}

/// Token counts reported by a generative model, accumulated across calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Failure of the extraction collaborator
///
/// The `Display` text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Receipt image is empty")]
    EmptyImage,

    #[error("Unsupported image type: {mime_type}")]
    UnsupportedMediaType { mime_type: String },

    #[error("Extraction service is not configured: {message}")]
    NotConfigured { message: String },

    #[error("Extraction request failed: {message}")]
    Request { message: String },

    #[error("Extraction service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Could not read the extraction response: {message}")]
    InvalidResponse { message: String },

    #[error("No products were recognised on the receipt")]
    NoFunctionCall,
}

impl ExtractionError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request { message: message.into() }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }
}

/// External capability that reads line items off a receipt image
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    async fn extract(&self, image: &ReceiptImage) -> Result<ExtractedReceipt, ExtractionError>;

    /// Name used in logs
    fn name(&self) -> &str;

    /// Tokens consumed so far, for extractors backed by a metered model
    fn token_usage(&self) -> Option<TokenUsage> {
        None
    }
}

/// An extracted line that did not pass entry validation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedItem {
    pub name: String,
    pub price: f64,
    pub reasons: Vec<String>,
}

/// What a successful extraction did to the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    /// Items now on the bill
    pub items: Vec<LineItem>,
    /// Extracted lines that were skipped
    pub rejected: Vec<RejectedItem>,
    /// Charge configuration after applying the derived rates
    pub charges: ChargeConfig,
    /// Total printed on the receipt
    pub receipt_total: f64,
    /// Rates that could not be derived and other non-fatal notes
    pub warnings: Vec<String>,
}
