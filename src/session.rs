use std::path::{Path, PathBuf};

use crate::error::{BoothError, BoothResult};

/// Name used in file names when the event name is blank.
pub const FALLBACK_FILE_STEM: &str = "event";

/// Make an event name safe for a file name.
///
/// Every character outside `[A-Za-z0-9-_]` becomes `_` and the result is
/// lowercased. Blank input gives `event`.
pub fn sanitize_for_file(event_name: &str) -> String {
    let trimmed = event_name.trim();
    if trimmed.is_empty() {
        return FALLBACK_FILE_STEM.to_string();
    }

    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `<sanitized-event-name>_strip_<yyyyMMdd_HHmmss>.jpg`
pub fn strip_file_name(event_name: &str, stamp: &str) -> String {
    format!("{}_strip_{}.jpg", sanitize_for_file(event_name), stamp)
}

/// Create the save directory if it does not exist yet.
pub fn ensure_save_dir(dir: &Path) -> BoothResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| BoothError::io(dir, e))?;
    log::info!("Created save directory {}", dir.display());
    Ok(())
}

/// Full path of the strip for one session.
pub fn strip_path(save_dir: &Path, event_name: &str, stamp: &str) -> PathBuf {
    save_dir.join(strip_file_name(event_name, stamp))
}
