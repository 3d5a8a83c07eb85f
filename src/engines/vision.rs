//! Google Cloud Vision engine implementation
//!
//! High-accuracy cloud OCR via the Vision REST API (`DOCUMENT_TEXT_DETECTION`).
//! Every call is bounded by the configured timeout; a timeout or API error is
//! a recognition failure and the cascade moves on.

use crate::engine::Recognizer;
use crate::error::OcrError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::GrayImage;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::time::Duration;

/// Public Vision API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Recognizer calling Google Cloud Vision
pub struct VisionRecognizer {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl VisionRecognizer {
    pub fn new(api_key: &str, endpoint: &str, timeout: Duration) -> Result<Self, OcrError> {
        if api_key.trim().is_empty() {
            return Err(OcrError::InitializationError(
                "Google Vision requires an API key".to_string(),
            ));
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        tracing::info!(
            "Google Vision engine initialized (endpoint: {}, timeout: {:?})",
            endpoint,
            timeout
        );

        Ok(Self {
            agent,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request_body(image: &GrayImage) -> Result<String, OcrError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to encode PNG: {}", e)))?;

        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(&png) },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }]
            }]
        });
        Ok(body.to_string())
    }
}

/// Extract the full text annotation from an `images:annotate` response
fn parse_annotate_response(body: &str) -> Result<String, OcrError> {
    let response: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::ProcessingError(format!("Invalid Vision response: {}", e)))?;

    let Some(first) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(status) = first.error {
        return Err(OcrError::ProcessingError(format!(
            "Vision API error {}: {}",
            status.code, status.message
        )));
    }
    Ok(first
        .full_text_annotation
        .map(|annotation| annotation.text)
        .unwrap_or_default())
}

impl Recognizer for VisionRecognizer {
    fn name(&self) -> &str {
        "google-vision"
    }

    fn description(&self) -> &str {
        "Google Cloud Vision document text detection - high accuracy cloud OCR"
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        let body = Self::request_body(image)?;
        let url = format!("{}?key={}", self.endpoint, self.api_key);

        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .map_err(|e| OcrError::ProcessingError(format!("Vision request failed: {}", e)))?;

        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to read Vision response: {}", e)))?;

        parse_annotate_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_text() {
        let body = r#"{"responses": [{"fullTextAnnotation": {"text": "Hello world\n"}}]}"#;
        assert_eq!(parse_annotate_response(body).unwrap(), "Hello world\n");
    }

    #[test]
    fn test_parse_missing_annotation_is_empty() {
        assert_eq!(parse_annotate_response(r#"{"responses": [{}]}"#).unwrap(), "");
        assert_eq!(parse_annotate_response(r#"{}"#).unwrap(), "");
    }

    #[test]
    fn test_parse_error_status_fails() {
        let body = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        let err = parse_annotate_response(body).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }

    #[test]
    fn test_request_body_embeds_png() {
        let body = VisionRecognizer::request_body(&GrayImage::new(2, 2)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let content = value["requests"][0]["image"]["content"].as_str().unwrap();
        let png = STANDARD.decode(content).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        assert_eq!(
            value["requests"][0]["features"][0]["type"],
            "DOCUMENT_TEXT_DETECTION"
        );
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        assert!(VisionRecognizer::new(" ", DEFAULT_ENDPOINT, Duration::from_secs(1)).is_err());
    }
}
