use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;

use crate::references::DataUrl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub id: String,
    /// `data:<mime>;base64,...` as returned by the generation service.
    pub image: String,
    pub prompt: String,
    pub created_at_ms: i64,
}

impl GeneratedImage {
    pub fn new(image: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            image: image.into(),
            prompt: prompt.into(),
            created_at_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn download_file_name(&self) -> String {
        download_file_name(&self.id)
    }
}

pub fn download_file_name(id: &str) -> String {
    format!("worxphere-{id}.png")
}

/// Decodes the image and writes it as `worxphere-<id>.png` under `dir`.
pub fn write_download(image: &GeneratedImage, dir: &Path) -> anyhow::Result<PathBuf> {
    let Some(data_url) = DataUrl::parse(&image.image) else {
        bail!("image {} does not hold a base64 data URL", image.id);
    };
    let bytes = data_url
        .decode()
        .with_context(|| format!("image {} payload is not valid base64", image.id))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(image.download_file_name());
    std::fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Session gallery, newest first. Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    images: Vec<GeneratedImage>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, image: GeneratedImage) {
        self.images.insert(0, image);
    }

    pub fn images(&self) -> &[GeneratedImage] {
        &self.images
    }

    pub fn latest(&self) -> Option<&GeneratedImage> {
        self.images.first()
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedImage> {
        self.images.iter().find(|image| image.id == id)
    }

    /// Looks an image up by 1-based gallery position, full id, or a unique
    /// id prefix.
    pub fn find(&self, reference: &str) -> Option<&GeneratedImage> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Ok(position) = reference.parse::<usize>() {
            if position >= 1 && position <= self.images.len() {
                return self.images.get(position - 1);
            }
        }
        if let Some(image) = self.get(reference) {
            return Some(image);
        }
        let mut matches = self
            .images
            .iter()
            .filter(|image| image.id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(image), None) => Some(image),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{download_file_name, write_download, Gallery, GeneratedImage};

    #[test]
    fn prepend_keeps_newest_first() {
        let mut gallery = Gallery::new();
        let first = GeneratedImage::new("data:image/png;base64,AA==", "one");
        let second = GeneratedImage::new("data:image/png;base64,AQ==", "two");
        gallery.prepend(first.clone());
        gallery.prepend(second.clone());

        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.latest(), Some(&second));
        assert_eq!(gallery.images()[1], first);
        assert!(gallery.images()[0].created_at_ms >= gallery.images()[1].created_at_ms);
    }

    #[test]
    fn find_by_position_id_or_prefix() {
        let mut gallery = Gallery::new();
        let mut older = GeneratedImage::new("data:image/png;base64,AA==", "older");
        older.id = "abc-111".to_string();
        let mut newer = GeneratedImage::new("data:image/png;base64,AQ==", "newer");
        newer.id = "abd-222".to_string();
        gallery.prepend(older.clone());
        gallery.prepend(newer.clone());

        assert_eq!(gallery.find("1"), Some(&newer));
        assert_eq!(gallery.find("2"), Some(&older));
        assert_eq!(gallery.find("abc-111"), Some(&older));
        assert_eq!(gallery.find("abd"), Some(&newer));
        assert_eq!(gallery.find("ab"), None);
        assert_eq!(gallery.find("3"), None);
    }

    #[test]
    fn ids_are_unique() {
        let a = GeneratedImage::new("data:image/png;base64,AA==", "same");
        let b = GeneratedImage::new("data:image/png;base64,AA==", "same");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn download_writes_named_png() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image = GeneratedImage::new("data:image/png;base64,AAEC", "prompt");

        let path = write_download(&image, temp.path())?;

        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some(format!("worxphere-{}.png", image.id).as_str())
        );
        assert_eq!(std::fs::read(&path)?, vec![0, 1, 2]);
        assert_eq!(download_file_name("abc"), "worxphere-abc.png");
        Ok(())
    }

    #[test]
    fn download_rejects_non_data_url() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut image = GeneratedImage::new("data:image/png;base64,AA==", "prompt");
        image.image = "https://example.com/a.png".to_string();
        assert!(write_download(&image, temp.path()).is_err());
        Ok(())
    }
}
