mod api;
mod client;
mod config;
mod error;
mod gemini;
mod host;
mod studio;
mod uploads;

pub use api::{Candidate, ContentPart, GenerateContentResponse, GenerationApi, InlineData, ResponsePart};
pub use client::{GenerationClient, DEFAULT_IMAGE_MODEL, DEFAULT_VERIFY_MODEL};
pub use config::{StudioConfig, ENVIRONMENT_KEY_VARS};
pub use error::{ApiError, GenerationError};
pub use gemini::{GeminiApi, DEFAULT_API_BASE};
pub use host::{EnvironmentKeySelector, KeySelector};
pub use studio::{
    ConnectOutcome, CredentialModal, GenerateOutcome, KeySaveOutcome, Studio, UploadOutcome,
    INVALID_KEY_MESSAGE, KEY_VERIFICATION_FAILED_MESSAGE,
};
pub use uploads::{read_upload_batch, sniff_mime_type};
