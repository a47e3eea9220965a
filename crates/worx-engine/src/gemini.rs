use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use crate::api::{
    Candidate, ContentPart, GenerateContentResponse, GenerationApi, InlineData, ResponsePart,
};
use crate::error::ApiError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The key travels in a header so it never shows up in URLs or error text.
const API_KEY_HEADER: &str = "x-goog-api-key";
const ENTITY_NOT_FOUND_MESSAGE: &str = "Requested entity was not found";
const ERROR_BODY_MAX_CHARS: usize = 512;

/// Gemini `generateContent` over blocking HTTP.
///
/// Exactly one attempt per call and no client-side timeout; failures come
/// only from the service response or the transport.
pub struct GeminiApi {
    api_base: String,
    http: HttpClient,
}

impl GeminiApi {
    pub fn new(api_base: &str) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(None::<Duration>)
            .build()
            .context("failed to build Gemini HTTP client")?;
        let api_base = api_base.trim().trim_end_matches('/');
        Ok(Self {
            api_base: if api_base.is_empty() {
                DEFAULT_API_BASE.to_string()
            } else {
                api_base.to_string()
            },
            http,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl GenerationApi for GeminiApi {
    fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        parts: &[ContentPart],
    ) -> Result<GenerateContentResponse, ApiError> {
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(%endpoint, parts = parts.len(), "sending Gemini request");
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&request_payload(parts))
            .send()
            .map_err(|err| ApiError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| ApiError::Transport(err.without_url().to_string()))?;
        if !status.is_success() {
            return Err(api_error_from_body(status.as_u16(), &body));
        }
        let payload: Value = serde_json::from_str(&body).map_err(|err| {
            ApiError::Transport(format!("Gemini returned invalid JSON payload: {err}"))
        })?;
        Ok(response_from_payload(&payload))
    }
}

fn request_payload(parts: &[ContentPart]) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": parts.iter().map(ContentPart::to_json).collect::<Vec<Value>>(),
        }]
    })
}

/// Maps an error response to [`ApiError`]. Only the service's
/// "Requested entity was not found" message marks a bad key; a plain 404
/// (unknown model, wrong API base) stays a service error.
fn api_error_from_body(status: u16, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| truncate_text(body.trim(), ERROR_BODY_MAX_CHARS));

    if message.contains(ENTITY_NOT_FOUND_MESSAGE) {
        return ApiError::EntityNotFound(message);
    }
    ApiError::Service { status, message }
}

fn response_from_payload(payload: &Value) -> GenerateContentResponse {
    let candidates = payload
        .get("candidates")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    GenerateContentResponse {
        candidates: candidates
            .iter()
            .map(|candidate| Candidate {
                parts: candidate
                    .get("content")
                    .and_then(|content| content.get("parts"))
                    .and_then(Value::as_array)
                    .map(|parts| parts.iter().map(response_part).collect())
                    .unwrap_or_default(),
            })
            .collect(),
    }
}

fn response_part(part: &Value) -> ResponsePart {
    let inline_data = part
        .get("inlineData")
        .or_else(|| part.get("inline_data"))
        .and_then(Value::as_object)
        .and_then(|inline| {
            let data = inline.get("data").and_then(Value::as_str)?;
            if data.is_empty() {
                return None;
            }
            Some(InlineData {
                mime_type: inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .filter(|mime| !mime.is_empty())
                    .map(str::to_string),
                data: data.to_string(),
            })
        });
    ResponsePart {
        text: part.get("text").and_then(Value::as_str).map(str::to_string),
        inline_data,
    }
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{api_error_from_body, request_payload, response_from_payload, GeminiApi};
    use crate::api::{ContentPart, InlineData};
    use crate::error::{ApiError, GenerationError};

    #[test]
    fn endpoint_normalizes_model_path() -> anyhow::Result<()> {
        let api = GeminiApi::new("https://example.test/v1beta/")?;
        assert_eq!(
            api.endpoint_for_model("gemini-2.5-flash-image"),
            "https://example.test/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(
            api.endpoint_for_model("models/gemini-3-flash-preview"),
            "https://example.test/v1beta/models/gemini-3-flash-preview:generateContent"
        );
        assert_eq!(GeminiApi::new("  ")?.api_base(), super::DEFAULT_API_BASE);
        Ok(())
    }

    #[test]
    fn payload_keeps_part_order() {
        let payload = request_payload(&[
            ContentPart::InlineData {
                mime_type: "image/png".to_string(),
                data: "AA==".to_string(),
            },
            ContentPart::Text("draw".to_string()),
        ]);
        assert_eq!(
            payload,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "AA=="}},
                        {"text": "draw"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn not_found_error_maps_to_entity_not_found() {
        let body = json!({
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND"
            }
        })
        .to_string();
        assert!(matches!(
            api_error_from_body(404, &body),
            ApiError::EntityNotFound(message) if message == "Requested entity was not found."
        ));

        let body = json!({"error": {"message": "Requested entity was not found."}}).to_string();
        assert!(matches!(
            api_error_from_body(400, &body),
            ApiError::EntityNotFound(_)
        ));
    }

    #[test]
    fn unknown_model_404_is_a_service_error() {
        let body = json!({
            "error": {
                "code": 404,
                "message": "models/gemini-typo is not found for API version v1beta, or is not supported for generateContent.",
                "status": "NOT_FOUND"
            }
        })
        .to_string();
        let err = api_error_from_body(404, &body);
        assert!(matches!(
            &err,
            ApiError::Service { status: 404, message } if message.starts_with("models/gemini-typo")
        ));
        assert_eq!(GenerationError::from(err).kind(), "transport");
        assert!(matches!(
            api_error_from_body(404, "<html>Not Found</html>"),
            ApiError::Service { status: 404, .. }
        ));
    }

    #[test]
    fn other_errors_map_to_service() {
        let body = json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        })
        .to_string();
        assert!(matches!(
            api_error_from_body(400, &body),
            ApiError::Service { status: 400, message } if message == "API key not valid."
        ));
        assert!(matches!(
            api_error_from_body(502, "  bad gateway  "),
            ApiError::Service { status: 502, message } if message == "bad gateway"
        ));
    }

    #[test]
    fn response_parsing_reads_inline_data_and_text() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "AAEC"}},
                        {"inline_data": {"data": "AQ=="}},
                        {"inlineData": {"mimeType": "image/png", "data": ""}}
                    ]
                }
            }]
        });
        let response = response_from_payload(&payload);
        let parts = response.parts();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0].text.as_deref(), Some("Here you go"));
        assert_eq!(
            parts[1].inline_data,
            Some(InlineData {
                mime_type: Some("image/jpeg".to_string()),
                data: "AAEC".to_string(),
            })
        );
        assert_eq!(
            parts[2].inline_data,
            Some(InlineData {
                mime_type: None,
                data: "AQ==".to_string(),
            })
        );
        assert_eq!(parts[3].inline_data, None);
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let response = response_from_payload(&json!({"promptFeedback": {"blockReason": "OTHER"}}));
        assert!(response.parts().is_empty());
    }
}
