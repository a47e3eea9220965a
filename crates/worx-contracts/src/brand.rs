use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

const BRAND_CATALOG_JSON: &str = include_str!("../resources/brand.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("brand catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("preset '{0}' must start with 'Person' or 'Object'")]
    UnknownCategory(String),
    #[error("preset '{0}' is listed more than once")]
    DuplicatePreset(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetCategory {
    Person,
    Object,
}

impl PresetCategory {
    pub const ALL: [PresetCategory; 2] = [PresetCategory::Person, PresetCategory::Object];

    /// Category is encoded in the preset id prefix (`Person1`, `Object3`, ...).
    pub fn from_id(id: &str) -> Option<Self> {
        if id.starts_with("Person") {
            Some(Self::Person)
        } else if id.starts_with("Object") {
            Some(Self::Object)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Object => "Object",
        }
    }

    pub fn prompt_examples(self) -> &'static [&'static str] {
        match self {
            Self::Person => &[
                "이력서 파도를 타고 있는 사람",
                "시계 바늘 위에서 쉬고 있는 사람",
                "연필 위에 앉아 있는 사람",
                "키보드 위에서 춤추고 있는 사람",
            ],
            Self::Object => &[
                "이력서로 만들어진 종이비행기",
                "띠가 둘러진 지구본",
                "손목 시계 화면",
                "날아다니는 이력서 뭉치",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandPreset {
    pub id: String,
    pub label: String,
    pub image: String,
    pub category: PresetCategory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandGuidelines {
    pub art_style: String,
    pub mood: String,
    pub reference_assets: Vec<String>,
}

/// The fixed brand guidelines plus the catalog of pre-approved presets.
///
/// Loaded once from the catalog embedded at build time. Preset iteration
/// follows catalog order, which is also the order presets are sent to the
/// generation service.
#[derive(Debug, Clone)]
pub struct BrandCatalog {
    guidelines: BrandGuidelines,
    presets: IndexMap<String, BrandPreset>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    art_style: String,
    mood: String,
    #[serde(default)]
    reference_assets: Vec<String>,
    #[serde(default)]
    presets: Vec<RawPreset>,
}

#[derive(Debug, Deserialize)]
struct RawPreset {
    id: String,
    label: String,
    image: String,
}

impl BrandCatalog {
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(BRAND_CATALOG_JSON)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let parsed: RawCatalog = serde_json::from_str(raw)?;
        let mut presets = IndexMap::new();
        for preset in parsed.presets {
            let category = PresetCategory::from_id(&preset.id)
                .ok_or_else(|| CatalogError::UnknownCategory(preset.id.clone()))?;
            if presets.contains_key(&preset.id) {
                return Err(CatalogError::DuplicatePreset(preset.id));
            }
            presets.insert(
                preset.id.clone(),
                BrandPreset {
                    id: preset.id,
                    label: preset.label,
                    image: preset.image,
                    category,
                },
            );
        }
        Ok(Self {
            guidelines: BrandGuidelines {
                art_style: parsed.art_style,
                mood: parsed.mood,
                reference_assets: parsed.reference_assets,
            },
            presets,
        })
    }

    pub fn guidelines(&self) -> &BrandGuidelines {
        &self.guidelines
    }

    pub fn preset(&self, id: &str) -> Option<&BrandPreset> {
        self.presets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.presets.contains_key(id)
    }

    pub fn presets(&self) -> impl Iterator<Item = &BrandPreset> {
        self.presets.values()
    }

    pub fn by_category(&self, category: PresetCategory) -> Vec<&BrandPreset> {
        self.presets
            .values()
            .filter(|preset| preset.category == category)
            .collect()
    }
}
