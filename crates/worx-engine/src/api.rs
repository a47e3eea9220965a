use serde_json::{json, Value};

use crate::error::ApiError;

/// One part of a multi-part generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    InlineData { mime_type: String, data: String },
    Text(String),
}

impl ContentPart {
    pub fn to_json(&self) -> Value {
        match self {
            Self::InlineData { mime_type, data } => json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": data,
                }
            }),
            Self::Text(text) => json!({ "text": text }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate; later candidates are ignored.
    pub fn parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .map(|candidate| candidate.parts.as_slice())
            .unwrap_or_default()
    }

    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Transport seam for the external multimodal generation service.
pub trait GenerationApi {
    fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        parts: &[ContentPart],
    ) -> Result<GenerateContentResponse, ApiError>;
}
