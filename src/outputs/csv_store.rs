//! CSV persistence for article records.
//!
//! Files are UTF-8 with a byte-order mark, comma-delimited, with a header row
//! taken from the record type's field order. Rows are serialised in memory
//! with the `csv` crate and written in one `tokio::fs::write` call. A failed
//! write can still leave a partial file behind; success means only that this
//! one call completed.
//!
//! Besides reading and writing, the store answers two questions about a file:
//! whether it has already been fully evaluated ([`Table::is_fully_evaluated`])
//! and what its aggregate [`FileStatistics`] are.

use crate::error::StoreError;
use crate::models::FileStatistics;
use crate::utils::format_size;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub const KEYWORD_COLUMN: &str = "keyword";
pub const RELEVANCE_COLUMN: &str = "is_relevant";
pub const CATEGORY_COLUMN: &str = "category";

/// Where a write ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    /// The best-effort second copy, when one was requested and succeeded.
    pub copy_path: Option<PathBuf>,
}

/// A CSV file as raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Non-empty values of `name`, or `None` when the column is absent.
    fn values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let idx = self.column(name)?;
        Some(
            self.rows
                .iter()
                .filter_map(move |row| row.get(idx))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty()),
        )
    }

    /// True when the file has rows and every row carries both a relevance
    /// verdict and a category.
    pub fn is_fully_evaluated(&self) -> bool {
        let (Some(rel), Some(cat)) = (self.column(RELEVANCE_COLUMN), self.column(CATEGORY_COLUMN))
        else {
            return false;
        };
        !self.rows.is_empty()
            && self.rows.iter().all(|row| {
                let filled = |i: usize| row.get(i).is_some_and(|v| !v.trim().is_empty());
                filled(rel) && filled(cat)
            })
    }

    /// Statistics over this table. Blocks whose column is absent are omitted.
    pub fn statistics(&self) -> FileStatistics {
        let keyword_counts = self.values(KEYWORD_COLUMN).map(count_values);
        let category_counts = self.values(CATEGORY_COLUMN).map(count_values);

        let total = self.rows.len();
        let relevant_count = self
            .values(RELEVANCE_COLUMN)
            .map(|values| values.filter(|v| is_truthy(v)).count());
        let relevant_percent = relevant_count.map(|count| {
            if total == 0 {
                0.0
            } else {
                (count as f64 / total as f64 * 1000.0).round() / 10.0
            }
        });

        FileStatistics {
            total_rows: total,
            total_columns: self.headers.len(),
            column_names: self.headers.clone(),
            keyword_counts,
            relevant_count,
            relevant_percent,
            category_counts,
            already_processed: false,
        }
    }
}

fn count_values<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Write `records` to `path`, optionally copying the result into `copy_dir`.
///
/// Parent directories are created as needed. The copy is best-effort: its
/// failure is logged and leaves `copy_path` empty without failing the write.
///
/// # Errors
///
/// - [`StoreError::EmptyInput`] when `records` is empty
/// - [`StoreError::Csv`] / [`StoreError::Io`] when serialisation or the
///   primary write fails
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_records<T: Serialize>(
    records: &[T],
    path: &Path,
    copy_dir: Option<&Path>,
) -> Result<SavedFile, StoreError> {
    match write_primary(records, path).await {
        Ok(()) => info!("Wrote CSV"),
        Err(e) => {
            error!(error = %e, "Failed to write CSV");
            return Err(e);
        }
    }

    let copy_path = match copy_dir {
        Some(dir) => copy_into(path, dir).await,
        None => None,
    };
    Ok(SavedFile {
        path: path.to_path_buf(),
        copy_path,
    })
}

async fn write_primary<T: Serialize>(records: &[T], path: &Path) -> Result<(), StoreError> {
    if records.is_empty() {
        return Err(StoreError::EmptyInput);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let mut writer = csv::Writer::from_writer(BOM.to_vec());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    fs::write(path, bytes).await?;
    Ok(())
}

async fn copy_into(path: &Path, dir: &Path) -> Option<PathBuf> {
    let target = dir.join(path.file_name()?);
    let result = async {
        fs::create_dir_all(dir).await?;
        fs::copy(path, &target).await
    }
    .await;
    match result {
        Ok(_) => {
            info!(copy = %target.display(), "Copied CSV");
            Some(target)
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Could not copy CSV; primary file kept");
            None
        }
    }
}

async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path).await {
        Ok(mut bytes) => {
            if bytes.starts_with(BOM) {
                bytes.drain(..BOM.len());
            }
            Ok(Some(bytes))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read typed records. A missing file yields an empty list.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let Some(bytes) = read_bytes(path).await? else {
        debug!("CSV missing; nothing to read");
        return Ok(Vec::new());
    };
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let records = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(records)
}

/// Read a file as headers plus raw rows. A missing file yields an empty table.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn read_table(path: &Path) -> Result<Table, StoreError> {
    let Some(bytes) = read_bytes(path).await? else {
        return Ok(Table::default());
    };
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|row| row.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;
    Ok(Table { headers, rows })
}

/// Compute [`FileStatistics`] for the file at `path`.
///
/// # Errors
///
/// [`StoreError::NotFound`] for a missing file, [`StoreError::EmptyFile`]
/// when it has no data rows.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn statistics(path: &Path) -> Result<FileStatistics, StoreError> {
    if !fs::try_exists(path).await? {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let table = read_table(path).await?;
    if table.rows.is_empty() {
        return Err(StoreError::EmptyFile(path.to_path_buf()));
    }
    Ok(table.statistics())
}

/// One entry of the results directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub file_size_str: String,
    pub modified_time: String,
    /// The header carries an `is_relevant` column.
    pub has_evaluation: bool,
    /// The name carries the `_evaluated` suffix.
    pub is_evaluated: bool,
}

/// List the CSV files of `dir`, newest first. A missing directory yields an
/// empty list.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn list_files(dir: &Path) -> Result<Vec<FileInfo>, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Results directory not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<(DateTime<Local>, FileInfo)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let meta = entry.metadata().await?;
        let modified: DateTime<Local> = meta.modified()?.into();
        let has_evaluation = match read_table(&path).await {
            Ok(table) => table.column(RELEVANCE_COLUMN).is_some(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable CSV in listing");
                false
            }
        };
        let file_name = entry.file_name().to_string_lossy().into_owned();
        files.push((
            modified,
            FileInfo {
                is_evaluated: file_name.contains("_evaluated"),
                file_name,
                file_path: path.to_string_lossy().into_owned(),
                file_size: meta.len(),
                file_size_str: format_size(meta.len()),
                modified_time: modified.format("%Y-%m-%d %H:%M:%S").to_string(),
                has_evaluation,
            },
        ));
    }

    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, info)| info).collect())
}

/// The first rows of a file.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub total_rows: usize,
    pub total_columns: usize,
    pub column_names: Vec<String>,
    pub preview_data: Vec<Vec<String>>,
}

#[instrument(level = "info", skip_all, fields(path = %path.display(), max_rows = max_rows))]
pub async fn preview(path: &Path, max_rows: usize) -> Result<Preview, StoreError> {
    if !fs::try_exists(path).await? {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let table = read_table(path).await?;
    Ok(Preview {
        total_rows: table.rows.len(),
        total_columns: table.headers.len(),
        column_names: table.headers,
        preview_data: table.rows.into_iter().take(max_rows).collect(),
    })
}
