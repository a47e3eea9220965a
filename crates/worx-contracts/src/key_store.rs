use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::credentials::MANUAL_KEY_SLOT;

/// Durable slot for the manually entered API key.
///
/// Backed by a small JSON object file so other entries written by newer
/// versions survive a save.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<String> {
        read_json_object(&self.path)?
            .get(MANUAL_KEY_SLOT)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn save(&self, key: &str) -> anyhow::Result<()> {
        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        on_disk.insert(
            MANUAL_KEY_SLOT.to_string(),
            Value::String(key.trim().to_string()),
        );
        write_json_object(&self.path, &on_disk)
    }

    /// Returns whether a key was stored.
    pub fn clear(&self) -> anyhow::Result<bool> {
        let Some(mut on_disk) = read_json_object(&self.path) else {
            return Ok(false);
        };
        if on_disk.remove(MANUAL_KEY_SLOT).is_none() {
            return Ok(false);
        }
        write_json_object(&self.path, &on_disk)?;
        Ok(true)
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(&Value::Object(payload.clone()))?;
    let mut file = open_private(path)?;
    file.write_all(raw.as_bytes())?;
    Ok(())
}

/// Opens for truncating write with owner-only access before any byte lands.
#[cfg(unix)]
fn open_private(path: &Path) -> anyhow::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> anyhow::Result<File> {
    Ok(OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::KeyStore;
    use crate::credentials::MANUAL_KEY_SLOT;

    #[test]
    fn missing_file_has_no_key() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = KeyStore::new(temp.path().join("credentials.json"));
        assert_eq!(store.load(), None);
        assert!(!store.clear()?);
        Ok(())
    }

    #[test]
    fn save_then_load_between_instances() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("credentials.json");
        KeyStore::new(&path).save("  key-123 ")?;
        assert_eq!(KeyStore::new(&path).load().as_deref(), Some("key-123"));
        Ok(())
    }

    #[test]
    fn save_preserves_unrelated_entries() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("credentials.json");
        std::fs::write(&path, json!({"theme": "dark"}).to_string())?;

        let store = KeyStore::new(&path);
        store.save("key-123")?;

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(parsed["theme"], json!("dark"));
        assert_eq!(parsed[MANUAL_KEY_SLOT], json!("key-123"));
        Ok(())
    }

    #[test]
    fn clear_removes_only_the_key() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("credentials.json");
        std::fs::write(
            &path,
            json!({"theme": "dark", "worxphere_manual_key": "key-123"}).to_string(),
        )?;

        let store = KeyStore::new(&path);
        assert!(store.clear()?);
        assert_eq!(store.load(), None);
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(parsed["theme"], json!("dark"));
        Ok(())
    }

    #[test]
    fn blank_stored_key_counts_as_missing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("credentials.json");
        std::fs::write(&path, json!({"worxphere_manual_key": "  "}).to_string())?;
        assert_eq!(KeyStore::new(&path).load(), None);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir()?;
        let fresh = temp.path().join("fresh.json");
        KeyStore::new(&fresh).save("key-123")?;
        assert_eq!(std::fs::metadata(&fresh)?.permissions().mode() & 0o777, 0o600);

        let existing = temp.path().join("existing.json");
        std::fs::write(&existing, "{}")?;
        std::fs::set_permissions(&existing, std::fs::Permissions::from_mode(0o644))?;
        KeyStore::new(&existing).save("key-123")?;
        assert_eq!(std::fs::metadata(&existing)?.permissions().mode() & 0o777, 0o600);
        Ok(())
    }
}
