use worx_contracts::brand::BrandGuidelines;
use worx_contracts::prompt::compose_instruction;
use worx_contracts::references::DataUrl;

use crate::api::{ContentPart, GenerateContentResponse, GenerationApi};
use crate::error::GenerationError;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_VERIFY_MODEL: &str = "gemini-3-flash-preview";
const VERIFY_PROMPT: &str = "test";
const DEFAULT_IMAGE_MIME: &str = "image/png";

pub struct GenerationClient<A> {
    api: A,
    image_model: String,
    verify_model: String,
}

impl<A: GenerationApi> GenerationClient<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            verify_model: DEFAULT_VERIFY_MODEL.to_string(),
        }
    }

    pub fn with_models(mut self, image_model: &str, verify_model: &str) -> Self {
        self.image_model = image_model.to_string();
        self.verify_model = verify_model.to_string();
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Generates one brand illustration and returns it as a data URL.
    ///
    /// `references` are the user's choices (presets, then uploads); the fixed
    /// guideline references are always sent first.
    pub fn generate(
        &self,
        prompt: &str,
        guidelines: &BrandGuidelines,
        references: &[String],
        effective_key: Option<&str>,
    ) -> Result<String, GenerationError> {
        let Some(api_key) = effective_key.map(str::trim).filter(|key| !key.is_empty()) else {
            return Err(GenerationError::MissingKey);
        };

        let parts = build_parts(guidelines, references, prompt);
        tracing::debug!(
            model = %self.image_model,
            image_parts = parts.len() - 1,
            "requesting brand illustration"
        );
        let response = self
            .api
            .generate_content(api_key, &self.image_model, &parts)
            .map_err(|err| {
                tracing::error!(error = %err, "generation request failed");
                GenerationError::from(err)
            })?;

        first_inline_image(&response).ok_or(GenerationError::NoImage)
    }

    /// Minimal trial call; the key is good only if the service answers with
    /// text.
    pub fn verify_key(&self, api_key: &str) -> Result<(), GenerationError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(GenerationError::MissingKey);
        }
        let response = self.api.generate_content(
            api_key,
            &self.verify_model,
            &[ContentPart::Text(VERIFY_PROMPT.to_string())],
        )?;
        if response.text().is_none() {
            return Err(GenerationError::InvalidKey);
        }
        Ok(())
    }
}

/// Reference images in order, then the composed instruction. Entries that
/// are not base64 data URLs are dropped.
pub(crate) fn build_parts(
    guidelines: &BrandGuidelines,
    references: &[String],
    prompt: &str,
) -> Vec<ContentPart> {
    let mut parts: Vec<ContentPart> = guidelines
        .reference_assets
        .iter()
        .chain(references)
        .filter_map(|reference| DataUrl::parse(reference))
        .map(|data_url| ContentPart::InlineData {
            mime_type: data_url.mime_type.to_string(),
            data: data_url.payload.to_string(),
        })
        .collect();
    parts.push(ContentPart::Text(compose_instruction(guidelines, prompt)));
    parts
}

fn first_inline_image(response: &GenerateContentResponse) -> Option<String> {
    response.parts().iter().find_map(|part| {
        let inline = part.inline_data.as_ref()?;
        let mime_type = inline.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME);
        Some(format!("data:{mime_type};base64,{}", inline.data))
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use worx_contracts::brand::BrandGuidelines;

    use super::{build_parts, GenerationClient, DEFAULT_IMAGE_MODEL, DEFAULT_VERIFY_MODEL};
    use crate::api::{
        Candidate, ContentPart, GenerateContentResponse, GenerationApi, InlineData, ResponsePart,
    };
    use crate::error::{ApiError, GenerationError};

    #[derive(Default)]
    struct ScriptedApi {
        calls: RefCell<Vec<(String, String, Vec<ContentPart>)>>,
        replies: RefCell<VecDeque<Result<GenerateContentResponse, ApiError>>>,
    }

    impl ScriptedApi {
        fn replying(reply: Result<GenerateContentResponse, ApiError>) -> Self {
            let api = Self::default();
            api.replies.borrow_mut().push_back(reply);
            api
        }
    }

    impl GenerationApi for ScriptedApi {
        fn generate_content(
            &self,
            api_key: &str,
            model: &str,
            parts: &[ContentPart],
        ) -> Result<GenerateContentResponse, ApiError> {
            self.calls
                .borrow_mut()
                .push((api_key.to_string(), model.to_string(), parts.to_vec()));
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("no scripted reply".to_string())))
        }
    }

    fn guidelines() -> BrandGuidelines {
        BrandGuidelines {
            art_style: "Rough pencil".to_string(),
            mood: "Hopeful".to_string(),
            reference_assets: vec!["data:image/png;base64,Rkl4".to_string()],
        }
    }

    fn response(parts: Vec<ResponsePart>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate { parts }],
        }
    }

    fn image_part(mime_type: Option<&str>, data: &str) -> ResponsePart {
        ResponsePart {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.map(str::to_string),
                data: data.to_string(),
            }),
        }
    }

    fn text_part(text: &str) -> ResponsePart {
        ResponsePart {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    #[test]
    fn missing_key_fails_before_any_call() {
        let client = GenerationClient::new(ScriptedApi::default());
        for key in [None, Some(""), Some("   ")] {
            let err = client.generate("globe", &guidelines(), &[], key).err();
            assert!(matches!(err, Some(GenerationError::MissingKey)));
        }
        assert!(client.api().calls.borrow().is_empty());
    }

    #[test]
    fn parts_are_fixed_then_user_references_then_instruction() {
        let references = vec![
            "data:image/jpeg;base64,UHJl".to_string(),
            "https://example.com/not-inline.png".to_string(),
            "data:image/webp;base64,VXA=".to_string(),
        ];
        let parts = build_parts(&guidelines(), &references, "globe");

        let inline: Vec<(&str, &str)> = parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::InlineData { mime_type, data } => {
                    Some((mime_type.as_str(), data.as_str()))
                }
                ContentPart::Text(_) => None,
            })
            .collect();
        assert_eq!(
            inline,
            vec![
                ("image/png", "Rkl4"),
                ("image/jpeg", "UHJl"),
                ("image/webp", "VXA="),
            ]
        );
        assert!(matches!(
            parts.last(),
            Some(ContentPart::Text(text)) if text.contains("\"globe\"")
        ));
        assert_eq!(parts.len(), 4);
    }

    #[test]
    fn returns_first_inline_image_as_data_url() {
        let client = GenerationClient::new(ScriptedApi::replying(Ok(response(vec![
            text_part("Sure"),
            image_part(Some("image/jpeg"), "Rmlyc3Q="),
            image_part(Some("image/png"), "U2Vjb25k"),
        ]))));

        let image = client.generate("globe", &guidelines(), &[], Some("key-1"));

        assert_eq!(image.ok().as_deref(), Some("data:image/jpeg;base64,Rmlyc3Q="));
        let calls = client.api().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "key-1");
        assert_eq!(calls[0].1, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn missing_mime_type_defaults_to_png() {
        let client =
            GenerationClient::new(ScriptedApi::replying(Ok(response(vec![image_part(None, "AA==")]))));
        let image = client.generate("globe", &guidelines(), &[], Some("key-1"));
        assert_eq!(image.ok().as_deref(), Some("data:image/png;base64,AA=="));
    }

    #[test]
    fn text_only_response_is_no_image() {
        let client =
            GenerationClient::new(ScriptedApi::replying(Ok(response(vec![text_part("nope")]))));
        let err = client.generate("globe", &guidelines(), &[], Some("key-1")).err();
        assert!(matches!(err, Some(GenerationError::NoImage)));
    }

    #[test]
    fn entity_not_found_is_invalid_key_without_retry() {
        let client = GenerationClient::new(ScriptedApi::replying(Err(ApiError::EntityNotFound(
            "Requested entity was not found.".to_string(),
        ))));
        let err = client.generate("globe", &guidelines(), &[], Some("key-1")).err();
        assert!(matches!(err, Some(GenerationError::InvalidKey)));
        assert_eq!(client.api().calls.borrow().len(), 1);
    }

    #[test]
    fn verify_key_uses_text_model_and_requires_text() {
        let client = GenerationClient::new(ScriptedApi::replying(Ok(response(vec![text_part(
            "ok",
        )]))));
        assert!(client.verify_key("key-2").is_ok());
        {
            let calls = client.api().calls.borrow();
            assert_eq!(calls[0].1, DEFAULT_VERIFY_MODEL);
            assert_eq!(calls[0].2, vec![ContentPart::Text("test".to_string())]);
        }

        let empty = GenerationClient::new(ScriptedApi::replying(Ok(response(Vec::new()))));
        assert!(matches!(
            empty.verify_key("key-2"),
            Err(GenerationError::InvalidKey)
        ));
    }

    #[test]
    fn custom_models_are_used() {
        let client = GenerationClient::new(ScriptedApi::replying(Ok(response(vec![image_part(
            None, "AA==",
        )]))))
        .with_models("image-x", "text-y");
        let _ = client.generate("globe", &guidelines(), &[], Some("key-1"));
        assert_eq!(client.api().calls.borrow()[0].1, "image-x");
        assert_eq!(client.image_model(), "image-x");
    }
}
