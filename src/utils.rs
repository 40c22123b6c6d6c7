//! Utility functions for file naming, string handling and file system checks.
//!
//! - Keyword summaries and timestamps for crawl output file names
//! - Derivation of the `_evaluated` output path
//! - String truncation for logging
//! - Output directory validation

use chrono::{DateTime, Local};
use itertools::Itertools;
use std::error::Error;
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Longest keyword summary embedded in a file name, in characters.
const MAX_SUMMARY_CHARS: usize = 100;
/// Number of keywords spelled out before the `_and_<n>_more` suffix.
const SUMMARY_KEYWORDS: usize = 3;

/// Build the keyword part of a crawl file name.
///
/// Keywords are de-duplicated and sorted. Up to three are joined with `_`;
/// past three, the first three are followed by `_and_<n>_more`. Spaces and
/// path separators become `_`, and anything longer than 100 characters is
/// cut and marked with `...`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(keyword_summary(&["b", "a"]), "a_b");
/// assert_eq!(keyword_summary(&["a", "b", "c", "d", "e"]), "a_b_c_and_2_more");
/// ```
pub fn keyword_summary<S: AsRef<str>>(keywords: &[S]) -> String {
    let unique: Vec<&str> = keywords
        .iter()
        .map(|k| k.as_ref().trim())
        .filter(|k| !k.is_empty())
        .sorted()
        .dedup()
        .collect();

    let mut summary = unique.iter().take(SUMMARY_KEYWORDS).join("_");
    if unique.len() > SUMMARY_KEYWORDS {
        summary.push_str(&format!("_and_{}_more", unique.len() - SUMMARY_KEYWORDS));
    }

    let summary = sanitize_file_component(&summary);
    if summary.chars().count() > MAX_SUMMARY_CHARS {
        let cut: String = summary.chars().take(MAX_SUMMARY_CHARS).collect();
        format!("{cut}...")
    } else {
        summary
    }
}

/// Replace whitespace and path separators so the value is safe inside a file name.
pub fn sanitize_file_component(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// File name for a raw crawl: `<prefix>_<keyword summary>_<YYYYmmdd_HHMMSS>.csv`.
pub fn crawl_file_name<S: AsRef<str>>(prefix: &str, keywords: &[S], at: DateTime<Local>) -> String {
    let summary = keyword_summary(keywords);
    let stamp = at.format("%Y%m%d_%H%M%S");
    if summary.is_empty() {
        format!("{prefix}_{stamp}.csv")
    } else {
        format!("{prefix}_{summary}_{stamp}.csv")
    }
}

/// Path of the evaluation output for `input`: `x.csv` → `x_evaluated.csv`,
/// in the same directory.
pub fn evaluated_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let evaluated = match name.strip_suffix(".csv") {
        Some(stem) => format!("{stem}_evaluated.csv"),
        None => format!("{name}_evaluated.csv"),
    };
    input.with_file_name(evaluated)
}

/// Express `path` relative to `root` when it lives underneath it.
pub fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Human-readable byte count, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.1} MB", b / (KB * KB))
    } else {
        format!("{:.1} GB", b / (KB * KB * KB))
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes appended. Cuts always land on a character boundary.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Probe with std fs for a simpler error surface
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
