use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::types::Target;

/// Raw host strings from newline-delimited text. Blank lines and `#` lines are skipped.
pub fn parse_targets_lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Raw host strings from CSV content: first column of each row, trimmed, non-empty.
pub fn parse_targets_csv(s: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(s.as_bytes());

    let mut out = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("row {}: malformed CSV", idx + 1))?;
        if let Some(first) = record.get(0).map(str::trim) {
            if !first.is_empty() {
                out.push(first.to_string());
            }
        }
    }
    Ok(out)
}

/// Load raw host strings from a file. `.csv` files are read as CSV, anything else as text lines.
pub fn load_raw_targets_from_path(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read targets file: {}", path.display()))?;

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        parse_targets_csv(&content)
            .with_context(|| format!("failed to parse targets file: {}", path.display()))
    } else {
        Ok(parse_targets_lines(&content))
    }
}

/// Normalize raw host strings into targets, keeping input order.
pub fn normalize_targets<I, S>(raw: I) -> Vec<Target>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| Target::parse(s.as_ref()))
        .collect()
}

/// Load and normalize targets from a file.
pub fn load_targets_from_path(path: impl AsRef<Path>) -> Result<Vec<Target>> {
    Ok(normalize_targets(load_raw_targets_from_path(path)?))
}
