use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Decodes an uploaded photo payload and writes it under the static folder
/// with a unique filename. Returns the relative path stored on the person
/// row, e.g. `uploads/<hex>.jpg`.
pub fn save_photo(static_dir: &str, data_base64: &str, extension: &str) -> Result<String> {
    let ext = extension.trim_start_matches('.').to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        bail!("Invalid image format. Only PNG, JPG, JPEG allowed.");
    }

    let bytes = BASE64.decode(data_base64.trim())?;
    if bytes.is_empty() {
        bail!("Empty image payload");
    }

    let unique_name = format!("{}.{}", Uuid::new_v4().to_simple(), ext);
    let upload_dir = Path::new(static_dir).join("uploads");
    fs::create_dir_all(&upload_dir)?;
    fs::write(upload_dir.join(&unique_name), bytes)?;

    Ok(format!("uploads/{}", unique_name))
}

/// Resolves a stored path to its on-disk location. Remote URLs and empty
/// values resolve to nothing, matching how roster imports stored them.
fn absolute_photo_path(static_dir: &str, stored: &str) -> Option<PathBuf> {
    let normalized = stored.replace('\\', "/");
    if normalized.is_empty()
        || normalized.starts_with("http://")
        || normalized.starts_with("https://")
    {
        return None;
    }

    if Path::new(&normalized).is_absolute() {
        return Some(PathBuf::from(normalized));
    }

    let trimmed = normalized.trim_start_matches('/');
    let relative = trimmed.strip_prefix("static/").unwrap_or(trimmed);
    Some(Path::new(static_dir).join(relative))
}

/// Best-effort removal of a person's photo file. Missing files and racy
/// deletes are not errors.
pub fn remove_photo(static_dir: &str, stored: Option<&str>) {
    let Some(stored) = stored else { return };
    let Some(path) = absolute_photo_path(static_dir, stored) else {
        return;
    };
    if path.exists() {
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove photo");
        }
    }
}
