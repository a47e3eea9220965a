use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::brand::BrandCatalog;

/// The upload affordance disappears once this many custom images exist.
pub const MAX_CUSTOM_UPLOADS: usize = 2;

/// A borrowed view of a `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Both parts must be non-empty single-line text. The last `;base64,`
    /// marker splits mime from payload.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let body = raw.strip_prefix("data:")?;
        let split = body.rfind(";base64,")?;
        let mime_type = &body[..split];
        let payload = &body[split + ";base64,".len()..];
        if mime_type.is_empty() || payload.is_empty() {
            return None;
        }
        if [mime_type, payload]
            .iter()
            .any(|part| part.contains(['\n', '\r']))
        {
            return None;
        }
        Some(Self { mime_type, payload })
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.payload.as_bytes())
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Toggle set of selected preset ids, kept in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetSelection {
    ids: Vec<String>,
}

impl PresetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the preset is selected after the toggle.
    pub fn toggle(&mut self, id: &str) -> bool {
        if let Some(idx) = self.ids.iter().position(|existing| existing == id) {
            self.ids.remove(idx);
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// User-uploaded reference images, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomUploads {
    images: Vec<String>,
}

impl CustomUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_upload(&self) -> bool {
        self.images.len() < MAX_CUSTOM_UPLOADS
    }

    /// Appends a whole batch. Callers only build a batch once every read in
    /// it succeeded.
    pub fn extend(&mut self, batch: Vec<String>) {
        self.images.extend(batch);
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index >= self.images.len() {
            return None;
        }
        Some(self.images.remove(index))
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Selected presets in catalog order, regardless of the order they were
/// toggled on.
pub fn selected_preset_images(catalog: &BrandCatalog, selection: &PresetSelection) -> Vec<String> {
    catalog
        .presets()
        .filter(|preset| selection.contains(&preset.id))
        .map(|preset| preset.image.clone())
        .collect()
}

/// References chosen by the user: selected presets, then custom uploads.
pub fn user_references(
    catalog: &BrandCatalog,
    selection: &PresetSelection,
    uploads: &CustomUploads,
) -> Vec<String> {
    let mut references = selected_preset_images(catalog, selection);
    references.extend(uploads.images().iter().cloned());
    references
}

/// Every reference sent with a generation request: the fixed brand assets
/// first, then the user's choices.
pub fn assemble_references(
    catalog: &BrandCatalog,
    selection: &PresetSelection,
    uploads: &CustomUploads,
) -> Vec<String> {
    let mut references = catalog.guidelines().reference_assets.clone();
    references.extend(user_references(catalog, selection, uploads));
    references
}
