use anyhow::{Context, Result};
use rusttype::Font;
use std::path::{Path, PathBuf};

/// Load a font for strip text.
///
/// Accepts a full path, a font file name searched in the system font
/// directories, or a family name such as `DejaVuSans`. Falls back to common
/// sans fonts when the requested one is missing.
pub fn load_font(font_query: &str) -> Result<Font<'static>> {
    let query_path = Path::new(font_query);
    if query_path.is_absolute() {
        return load_font_from_path(query_path);
    }

    let file_names = if is_font_filename(font_query) {
        vec![font_query.to_string()]
    } else {
        vec![format!("{}.ttf", font_query), format!("{}.otf", font_query)]
    };

    for dir in system_font_directories() {
        for file_name in &file_names {
            if let Some(path) = find_in_directory(&dir, file_name) {
                if let Ok(font) = load_font_from_path(&path) {
                    log::debug!("Using font {}", path.display());
                    return Ok(font);
                }
            }
        }
    }

    for path in FALLBACK_FONTS {
        if let Ok(font) = load_font_from_path(Path::new(path)) {
            log::warn!("Font '{}' not found, falling back to {}", font_query, path);
            return Ok(font);
        }
    }

    Err(anyhow::anyhow!(
        "No suitable fonts found for '{}'. Install a TrueType font or set strip.font to a font path.",
        font_query
    ))
}

const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/mnt/c/Windows/Fonts/arial.ttf",
];

fn load_font_from_path(path: &Path) -> Result<Font<'static>> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read font file: {}", path.display()))?;
    Font::try_from_vec(data)
        .ok_or_else(|| anyhow::anyhow!("Failed to parse font file: {}", path.display()))
}

fn is_font_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.ends_with(".ttf") || lower.ends_with(".otf") || lower.ends_with(".ttc")
}

/// Look for `file_name` in `dir` and one level of subdirectories.
fn find_in_directory(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let direct = dir.join(file_name);
    if direct.is_file() {
        return Some(direct);
    }

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    subdirs
        .into_iter()
        .map(|subdir| subdir.join(file_name))
        .find(|candidate| candidate.is_file())
}

fn system_font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [
        "/usr/share/fonts/truetype",
        "/usr/share/fonts/TTF",
        "/usr/share/fonts/opentype",
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/System/Library/Fonts",
        "/System/Library/Fonts/Supplemental",
        "/Library/Fonts",
        "/mnt/c/Windows/Fonts",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    if let Ok(home) = std::env::var("HOME") {
        dirs.push(Path::new(&home).join(".fonts"));
        dirs.push(Path::new(&home).join(".local/share/fonts"));
    }

    dirs
}
