use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use worx_contracts::references::encode_data_url;

use crate::error::GenerationError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Reads every file into a data URL, concurrently, all or nothing.
///
/// The result keeps the order of `paths`. The first failed read (in path
/// order) is returned and nothing from the batch is kept.
pub fn read_upload_batch(paths: &[PathBuf]) -> Result<Vec<String>, GenerationError> {
    thread::scope(|scope| {
        let readers: Vec<_> = paths
            .iter()
            .map(|path| (path, scope.spawn(move || read_upload(path))))
            .collect();
        readers
            .into_iter()
            .map(|(path, reader)| {
                reader.join().unwrap_or_else(|_| {
                    Err(GenerationError::Read {
                        path: path.clone(),
                        source: io::Error::other("upload reader panicked"),
                    })
                })
            })
            .collect()
    })
}

fn read_upload(path: &Path) -> Result<String, GenerationError> {
    let bytes = fs::read(path).map_err(|source| GenerationError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(encode_data_url(sniff_mime_type(path, &bytes), &bytes))
}

/// Image signature first, then file extension.
pub fn sniff_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
        .or_else(|| mime_for_path(path))
        .unwrap_or(FALLBACK_MIME)
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())?;
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}
