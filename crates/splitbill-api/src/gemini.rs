//! Receipt extraction through the Gemini `generateContent` endpoint.
//!
//! The model is forced to answer with a single call to
//! `extractProductsFromReceipt`, whose arguments carry the products and the
//! charge amounts printed on the receipt.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use splitbill_core::{
    ExtractedItem, ExtractedReceipt, ExtractionError, ReceiptExtractor, ReceiptImage, TokenUsage,
};
use tracing::{debug, instrument, warn};

use crate::config::ExtractionConfig;

pub const FUNCTION_NAME: &str = "extractProductsFromReceipt";

const SYSTEM_INSTRUCTION: &str = "Extract products from receipt image as [name, price] pairs.";
const USER_PROMPT: &str =
    "I've uploaded a receipt image. Please extract the product details from it.";

pub struct GeminiExtractor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    usage: Mutex<TokenUsage>,
}

impl GeminiExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ExtractionError::NotConfigured { message: e.to_string() })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            usage: Mutex::new(TokenUsage::default()),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn record_usage(&self, usage: TokenUsage) {
        match self.usage.lock() {
            Ok(mut total) => total.add(usage),
            Err(_) => warn!("Token usage lock poisoned; usage not recorded"),
        }
    }
}

#[async_trait]
impl ReceiptExtractor for GeminiExtractor {
    #[instrument(skip_all, fields(model = %self.model, bytes = image.len()))]
    async fn extract(&self, image: &ReceiptImage) -> Result<ExtractedReceipt, ExtractionError> {
        if self.api_key.is_empty() {
            return Err(ExtractionError::NotConfigured {
                message: "no Gemini API key set".to_string(),
            });
        }
        check_image(image)?;

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(image))
            .send()
            .await
            .map_err(|e| ExtractionError::request(e.without_url().to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ExtractionError::request(e.to_string()))?;
        if !status.is_success() {
            return Err(ExtractionError::Service {
                status: status.as_u16(),
                message: service_error_message(&body),
            });
        }

        let (receipt, usage) = parse_response(&body)?;
        if let Some(usage) = usage {
            self.record_usage(usage);
        }
        debug!(items = receipt.items.len(), total = receipt.total_amount, "Receipt extracted");
        Ok(receipt)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn token_usage(&self) -> Option<TokenUsage> {
        self.usage.lock().ok().map(|usage| *usage)
    }
}

/// Reject input the model cannot read before spending a request on it
pub fn check_image(image: &ReceiptImage) -> Result<(), ExtractionError> {
    if image.is_empty() {
        return Err(ExtractionError::EmptyImage);
    }
    if !image.mime_type.to_ascii_lowercase().starts_with("image/") {
        return Err(ExtractionError::UnsupportedMediaType { mime_type: image.mime_type.clone() });
    }
    Ok(())
}

/// Build the `generateContent` request for one receipt image
pub fn request_body(image: &ReceiptImage) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "role": "user",
            "parts": [
                { "text": USER_PROMPT },
                {
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": STANDARD.encode(&image.bytes),
                    }
                }
            ]
        }],
        "tools": [{
            "functionDeclarations": [{
                "name": FUNCTION_NAME,
                "description": "Extract products from receipt image",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "extractedProducts": {
                            "type": "ARRAY",
                            "description": "Products from receipt",
                            "items": {
                                "type": "OBJECT",
                                "description": "Product details",
                                "properties": {
                                    "name": { "type": "STRING", "description": "Product name" },
                                    "price": { "type": "NUMBER", "description": "Product price" }
                                },
                                "required": ["name", "price"]
                            }
                        },
                        "vat": { "type": "NUMBER", "description": "VAT amount if present" },
                        "serviceCharge": {
                            "type": "NUMBER",
                            "description": "Service charge amount if present"
                        },
                        "totalAmount": {
                            "type": "NUMBER",
                            "description": "Total amount including VAT and service charge"
                        }
                    }
                }
            }]
        }],
        "toolConfig": {
            "functionCallingConfig": {
                "mode": "ANY",
                "allowedFunctionNames": [FUNCTION_NAME]
            }
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ReceiptArgs {
    extracted_products: Vec<ExtractedItem>,
    vat: Option<f64>,
    service_charge: Option<f64>,
    total_amount: Option<f64>,
}

/// Read the forced function call out of a `generateContent` response body
pub fn parse_response(
    body: &str,
) -> Result<(ExtractedReceipt, Option<TokenUsage>), ExtractionError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ExtractionError::invalid_response(e.to_string()))?;

    let usage = response.usage_metadata.map(|meta| TokenUsage {
        prompt_tokens: meta.prompt_token_count,
        completion_tokens: meta.candidates_token_count,
        total_tokens: meta.total_token_count,
    });

    let call = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .into_iter()
        .flat_map(|content| content.parts)
        .filter_map(|part| part.function_call)
        .find(|call| call.name == FUNCTION_NAME)
        .ok_or(ExtractionError::NoFunctionCall)?;

    let args: ReceiptArgs = if call.args.is_null() {
        ReceiptArgs::default()
    } else {
        serde_json::from_value(call.args)
            .map_err(|e| ExtractionError::invalid_response(e.to_string()))?
    };

    let receipt = ExtractedReceipt {
        items: args.extracted_products,
        vat_amount: args.vat.unwrap_or(0.0),
        service_charge_amount: args.service_charge.unwrap_or(0.0),
        total_amount: args.total_amount.unwrap_or(0.0),
    };
    Ok((receipt, usage))
}

fn service_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{
                    "functionCall": {
                        "name": "extractProductsFromReceipt",
                        "args": {
                            "extractedProducts": [
                                {"name": "Pad Thai", "price": 120},
                                {"name": "Tom Yum", "price": 180.5}
                            ],
                            "vat": 23.1,
                            "serviceCharge": 30,
                            "totalAmount": 353.6
                        }
                    }
                }]
            },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 1290,
            "candidatesTokenCount": 48,
            "totalTokenCount": 1338
        }
    }"#;

    fn jpeg() -> ReceiptImage {
        ReceiptImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
    }

    #[test]
    fn test_parse_function_call() {
        let (receipt, usage) = parse_response(SAMPLE_RESPONSE).unwrap();

        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[1], ExtractedItem::new("Tom Yum", 180.5));
        assert_eq!(receipt.vat_amount, 23.1);
        assert_eq!(receipt.service_charge_amount, 30.0);
        assert_eq!(receipt.total_amount, 353.6);
        assert_eq!(
            usage,
            Some(TokenUsage { prompt_tokens: 1290, completion_tokens: 48, total_tokens: 1338 })
        );
    }

    #[test]
    fn test_missing_amounts_are_zero() {
        let body = r#"{"candidates":[{"content":{"parts":[{"functionCall":{
            "name":"extractProductsFromReceipt",
            "args":{"extractedProducts":[{"name":"Rice","price":20}]}}}]}}]}"#;
        let (receipt, usage) = parse_response(body).unwrap();

        assert_eq!(receipt.vat_amount, 0.0);
        assert_eq!(receipt.service_charge_amount, 0.0);
        assert_eq!(receipt.total_amount, 0.0);
        assert!(usage.is_none());
    }

    #[test]
    fn test_text_only_answer_is_an_error() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"I cannot read this"}]}}]}"#;
        assert_eq!(parse_response(body).unwrap_err(), ExtractionError::NoFunctionCall);
        assert_eq!(parse_response(r#"{"candidates":[]}"#).unwrap_err(), ExtractionError::NoFunctionCall);
    }

    #[test]
    fn test_malformed_body_is_invalid_response() {
        assert!(matches!(
            parse_response("<html>").unwrap_err(),
            ExtractionError::InvalidResponse { .. }
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(&jpeg());

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], USER_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "/9j/4A==");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], SYSTEM_INSTRUCTION);
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], FUNCTION_NAME);
        assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], "ANY");
    }

    #[test]
    fn test_check_image() {
        assert!(check_image(&jpeg()).is_ok());
        assert_eq!(
            check_image(&ReceiptImage::new(Vec::new(), "image/png")),
            Err(ExtractionError::EmptyImage)
        );
        assert!(matches!(
            check_image(&ReceiptImage::new(vec![1, 2], "application/pdf")),
            Err(ExtractionError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn test_check_image_ignores_mime_case() {
        assert!(check_image(&ReceiptImage::new(vec![1, 2], "IMAGE/JPEG")).is_ok());
        assert!(check_image(&ReceiptImage::new(vec![1, 2], "Image/Png")).is_ok());
    }

    #[test]
    fn test_service_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(service_error_message(body), "API key not valid.");
        assert_eq!(service_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let extractor = GeminiExtractor::new(&ExtractionConfig::default()).unwrap();
        let error = extractor.extract(&jpeg()).await.unwrap_err();

        assert!(matches!(error, ExtractionError::NotConfigured { .. }));
        assert_eq!(extractor.token_usage(), Some(TokenUsage::default()));
    }
}
