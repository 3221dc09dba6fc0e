use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse a candidate path catalog into an ordered, deduplicated list of URL suffixes.
///
/// Supported formats per line:
/// - a path suffix: `/upload.php` (a missing leading `/` is added)
/// - comments: everything after `#` is ignored
/// - whitespace and blank lines are ignored
pub fn parse_paths_str(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for raw_line in s.lines() {
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }
        let path = if line.starts_with('/') {
            line.to_string()
        } else {
            format!("/{line}")
        };
        if seen.insert(path.clone()) {
            out.push(path);
        }
    }

    out
}

/// Load a path catalog from a file path. Errors if the file cannot be read.
pub fn load_paths_from_path(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read paths file: {}", path.as_ref().display()))?;
    Ok(parse_paths_str(&content))
}

/// Load a path catalog from a file, or return the default catalog if missing or empty.
pub fn load_paths_or_default(path: impl AsRef<Path>) -> Vec<String> {
    match load_paths_from_path(&path) {
        Ok(v) if !v.is_empty() => v,
        Ok(_) => {
            tracing::warn!(path = %path.as_ref().display(), "paths file is empty, using default catalog");
            default_paths()
        }
        Err(e) => {
            tracing::warn!("{e:#}; using default catalog");
            default_paths()
        }
    }
}

/// Common upload endpoint suffixes, probed in this order.
pub fn default_paths() -> Vec<String> {
    const DEFAULT: &[&str] = &[
        "/upload.php",
        "/uploader.php",
        "/file-upload.php",
        "/admin/upload.php",
        "/uploads/",
        "/upload/",
    ];
    DEFAULT.iter().map(|p| p.to_string()).collect()
}
