use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{json, Map, Value};
use worx_contracts::brand::BrandCatalog;
use worx_contracts::credentials::{
    resolve_key, HostKeyStatus, KeyResolution, SessionKey, KEY_REGISTRATION_URL,
};
use worx_contracts::events::{EventPayload, EventWriter};
use worx_contracts::gallery::{write_download, Gallery, GeneratedImage};
use worx_contracts::key_store::KeyStore;
use worx_contracts::references::{user_references, CustomUploads, PresetSelection};

use crate::api::GenerationApi;
use crate::client::GenerationClient;
use crate::error::GenerationError;
use crate::host::{host_status, KeySelector};
use crate::uploads::read_upload_batch;

pub const INVALID_KEY_MESSAGE: &str =
    "The API key is invalid or has expired. Please set it up again.";
pub const KEY_VERIFICATION_FAILED_MESSAGE: &str =
    "This API key is not valid. Please check it and try again.";

/// State of the API key settings dialog.
#[derive(Clone, Default)]
pub struct CredentialModal {
    open: bool,
    saved_draft: Option<String>,
    error: Option<String>,
}

impl CredentialModal {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The stored manual key the dialog was prefilled with, if any.
    pub fn saved_draft(&self) -> Option<&str> {
        self.saved_draft.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl fmt::Debug for CredentialModal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialModal")
            .field("open", &self.open)
            .field("saved_draft", &self.saved_draft.as_ref().map(|_| "<redacted>"))
            .field("error", &self.error)
            .finish()
    }
}

#[derive(Debug)]
pub enum GenerateOutcome {
    /// Blank prompt; nothing happened.
    Skipped,
    /// No usable key; the settings dialog is open.
    NeedsKey,
    Generated(GeneratedImage),
    Failed(GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Selected,
    /// No host selector; the user has to register a key on this page.
    OpenRegistrationPage(&'static str),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySaveOutcome {
    Ignored,
    Saved { persisted: bool },
    Rejected,
}

#[derive(Debug)]
pub enum UploadOutcome {
    Added(usize),
    SlotsFull,
    Failed(GenerationError),
}

/// One studio session: prompt, style references, credentials and gallery.
///
/// All mutation goes through `&mut self`, so at most one generation call can
/// be in flight.
pub struct Studio<A> {
    catalog: BrandCatalog,
    client: GenerationClient<A>,
    key_store: KeyStore,
    host: Option<Box<dyn KeySelector>>,
    environment_key: Option<String>,
    events: Option<EventWriter>,
    session_key: SessionKey,
    prompt: String,
    presets: PresetSelection,
    uploads: CustomUploads,
    gallery: Gallery,
    error: Option<String>,
    modal: CredentialModal,
}

impl<A: GenerationApi> Studio<A> {
    pub fn new(catalog: BrandCatalog, client: GenerationClient<A>, key_store: KeyStore) -> Self {
        Self {
            catalog,
            client,
            key_store,
            host: None,
            environment_key: None,
            events: None,
            session_key: SessionKey::Unset,
            prompt: String::new(),
            presets: PresetSelection::new(),
            uploads: CustomUploads::new(),
            gallery: Gallery::new(),
            error: None,
            modal: CredentialModal::default(),
        }
    }

    pub fn with_host(mut self, host: Box<dyn KeySelector>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_environment_key(mut self, environment_key: Option<String>) -> Self {
        self.environment_key = environment_key;
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    /// Startup key check: stored manual key, then host selection, otherwise
    /// the settings dialog opens.
    pub fn start(&mut self) {
        self.emit("session_started", EventPayload::new());
        if let Some(saved) = self.key_store.load() {
            self.session_key = SessionKey::from_saved(&saved);
            self.emit_key_resolved("manual");
            return;
        }
        if host_status(self.host.as_deref()) == HostKeyStatus::Selected {
            self.session_key = SessionKey::DeferToEnvironment;
            self.emit_key_resolved("environment");
            return;
        }
        self.open_settings();
    }

    pub fn catalog(&self) -> &BrandCatalog {
        &self.catalog
    }

    pub fn client(&self) -> &GenerationClient<A> {
        &self.client
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn presets(&self) -> &PresetSelection {
        &self.presets
    }

    pub fn uploads(&self) -> &CustomUploads {
        &self.uploads
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Last user-facing error, cleared when a generation starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn modal(&self) -> &CredentialModal {
        &self.modal
    }

    /// Returns the new selection state, or `None` for an id not in the
    /// catalog.
    pub fn toggle_preset(&mut self, id: &str) -> Option<bool> {
        if !self.catalog.contains(id) {
            return None;
        }
        let selected = self.presets.toggle(id);
        let mut payload = EventPayload::new();
        payload.insert(
            "selected".to_string(),
            Value::Array(self.presets.ids().iter().cloned().map(Value::String).collect()),
        );
        self.emit("presets_changed", payload);
        Some(selected)
    }

    pub fn add_uploads(&mut self, paths: &[PathBuf]) -> UploadOutcome {
        if paths.is_empty() {
            return UploadOutcome::Added(0);
        }
        if !self.uploads.can_upload() {
            return UploadOutcome::SlotsFull;
        }
        match read_upload_batch(paths) {
            Ok(batch) => {
                let added = batch.len();
                self.uploads.extend(batch);
                self.emit("uploads_added", payload(json!({ "count": added })));
                UploadOutcome::Added(added)
            }
            Err(err) => {
                tracing::warn!(error = %err, "error reading upload batch");
                self.emit(
                    "upload_failed",
                    payload(json!({ "kind": err.kind(), "error": err.to_string() })),
                );
                UploadOutcome::Failed(err)
            }
        }
    }

    pub fn remove_upload(&mut self, index: usize) -> bool {
        self.uploads.remove(index).is_some()
    }

    /// Generates from the current prompt and references.
    ///
    /// A blank prompt is a no-op. A missing key opens the settings dialog
    /// instead of calling out; an invalid key additionally drops trust in
    /// the session key. Failures are never retried.
    pub fn generate(&mut self) -> GenerateOutcome {
        if self.prompt.trim().is_empty() {
            return GenerateOutcome::Skipped;
        }

        let resolution = resolve_key(
            self.session_key.manual_key(),
            host_status(self.host.as_deref()),
            self.environment_key.as_deref(),
        );
        let KeyResolution::Resolved(effective_key) = resolution else {
            self.open_settings();
            return GenerateOutcome::NeedsKey;
        };

        self.error = None;
        let references = user_references(&self.catalog, &self.presets, &self.uploads);
        self.emit(
            "generation_started",
            payload(json!({
                "key_source": effective_key.source().as_str(),
                "presets": self.presets.ids(),
                "custom_uploads": self.uploads.len(),
                "prompt_chars": self.prompt.chars().count(),
            })),
        );

        let result = self.client.generate(
            &self.prompt,
            self.catalog.guidelines(),
            &references,
            effective_key.value(),
        );
        match result {
            Ok(image) => {
                let generated = GeneratedImage::new(image, self.prompt.clone());
                self.gallery.prepend(generated.clone());
                self.prompt.clear();
                self.emit(
                    "image_generated",
                    payload(json!({ "image_id": generated.id })),
                );
                GenerateOutcome::Generated(generated)
            }
            Err(err) => {
                self.emit(
                    "generation_failed",
                    payload(json!({ "kind": err.kind() })),
                );
                match err {
                    GenerationError::InvalidKey => {
                        self.session_key = SessionKey::Unset;
                        self.error = Some(INVALID_KEY_MESSAGE.to_string());
                        self.open_settings();
                    }
                    GenerationError::MissingKey => {
                        self.error = Some(err.to_string());
                        self.open_settings();
                    }
                    _ => self.error = Some(err.to_string()),
                }
                GenerateOutcome::Failed(err)
            }
        }
    }

    pub fn open_settings(&mut self) {
        self.modal.open = true;
        self.modal.saved_draft = self.key_store.load();
        self.modal.error = None;
        self.emit("credential_modal_opened", EventPayload::new());
    }

    pub fn close_settings(&mut self) {
        self.modal.open = false;
    }

    /// Hands key selection to the host; without one the user is pointed at
    /// the key registration page.
    pub fn connect_host(&mut self) -> ConnectOutcome {
        let Some(host) = self.host.as_deref() else {
            return ConnectOutcome::OpenRegistrationPage(KEY_REGISTRATION_URL);
        };
        match host.open_select_key() {
            Ok(()) => {
                self.session_key = SessionKey::DeferToEnvironment;
                self.close_settings();
                self.emit_key_resolved("environment");
                ConnectOutcome::Selected
            }
            Err(err) => {
                tracing::error!(error = %err, "host key selection failed");
                ConnectOutcome::Failed(err.to_string())
            }
        }
    }

    /// Verifies a manually entered key with a trial call and persists it only
    /// when the call succeeds.
    pub fn save_manual_key(&mut self, draft: &str) -> KeySaveOutcome {
        let key = draft.trim();
        if key.is_empty() {
            return KeySaveOutcome::Ignored;
        }
        self.modal.error = None;

        if let Err(err) = self.client.verify_key(key) {
            tracing::warn!(kind = err.kind(), "manual key verification failed");
            self.modal.error = Some(KEY_VERIFICATION_FAILED_MESSAGE.to_string());
            self.emit(
                "key_verification_failed",
                payload(json!({ "kind": err.kind() })),
            );
            return KeySaveOutcome::Rejected;
        }

        let persisted = match self.key_store.save(key) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, path = %self.key_store.path().display(), "failed to persist API key");
                false
            }
        };
        self.session_key = SessionKey::Manual(key.to_string());
        self.close_settings();
        self.emit("key_verified", payload(json!({ "persisted": persisted })));
        KeySaveOutcome::Saved { persisted }
    }

    /// Writes `worxphere-<id>.png` for the gallery image matching
    /// `reference` (position, id or id prefix).
    pub fn download(&self, reference: &str, dir: &Path) -> anyhow::Result<PathBuf> {
        let image = self
            .gallery
            .find(reference)
            .with_context(|| format!("no generated image matches '{reference}'"))?;
        let path = write_download(image, dir)?;
        self.emit(
            "image_downloaded",
            payload(json!({
                "image_id": image.id,
                "path": path.to_string_lossy(),
            })),
        );
        Ok(path)
    }

    fn emit_key_resolved(&self, source: &str) {
        self.emit("key_resolved", payload(json!({ "key_source": source })));
    }

    fn emit(&self, event_type: &str, payload: EventPayload) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.emit(event_type, payload) {
            tracing::warn!(error = %err, event_type, "failed to write session event");
        }
    }
}

fn payload(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
