//! Store Directory Loader: store code -> display name side table.
//!
//! The master file ships either as a small workbook (the original project
//! used `store_master.xlsx`) or as delimited text; the extension decides.

use crate::error::{ReportError, Result};
use crate::sales::normalize_store_id;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub display_name: String,
    pub short_name: String,
}

/// Read-only store_id -> names mapping, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct StoreDirectory {
    entries: HashMap<String, StoreEntry>,
}

impl StoreDirectory {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, StoreEntry)>) -> Self {
        StoreDirectory {
            entries: entries.into_iter().collect(),
        }
    }

    /// Short display name for a store, empty when the store is unknown.
    pub fn short_name(&self, store_id: &str) -> &str {
        self.entries
            .get(store_id)
            .map(|e| e.short_name.as_str())
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load the store master. Fails with `StoreDirectoryUnavailable` when the
/// file is missing or unreadable.
pub fn load_store_directory(path: &Path) -> Result<StoreDirectory> {
    if !path.is_file() {
        return Err(ReportError::StoreDirectoryUnavailable {
            path: path.to_path_buf(),
        });
    }
    let is_xlsx = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);
    if is_xlsx {
        load_from_workbook(path)
    } else {
        load_from_csv(path)
    }
}

fn load_from_workbook(path: &Path) -> Result<StoreDirectory> {
    let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|_| {
        ReportError::StoreDirectoryUnavailable {
            path: path.to_path_buf(),
        }
    })?;
    let sheet = book
        .get_sheet(&0)
        .ok_or_else(|| ReportError::StoreDirectoryUnavailable {
            path: path.to_path_buf(),
        })?;

    let cols = sheet.get_highest_column();
    let mut store_col = None;
    let mut name_col = None;
    let mut short_col = None;
    for col in 1..=cols {
        match sheet.get_value((col, 1)).trim() {
            "store" | "store_id" => store_col = Some(col),
            "name" | "store_name" => name_col = Some(col),
            "short_name" => short_col = Some(col),
            _ => {}
        }
    }
    let store_col = store_col.ok_or_else(|| ReportError::MissingColumn {
        path: path.to_path_buf(),
        column: "store".to_string(),
    })?;
    let name_col = name_col.ok_or_else(|| ReportError::MissingColumn {
        path: path.to_path_buf(),
        column: "name".to_string(),
    })?;

    let mut entries = Vec::new();
    for row in 2..=sheet.get_highest_row() {
        let store_id = normalize_store_id(&sheet.get_value((store_col, row)));
        if store_id.is_empty() {
            continue;
        }
        let display_name = sheet.get_value((name_col, row)).trim().to_string();
        let short_name = short_col
            .map(|c| sheet.get_value((c, row)).trim().to_string())
            .unwrap_or_default();
        entries.push((store_id, make_entry(display_name, short_name)));
    }
    Ok(StoreDirectory::from_entries(entries))
}

fn load_from_csv(path: &Path) -> Result<StoreDirectory> {
    let bytes = std::fs::read(path).map_err(|_| ReportError::StoreDirectoryUnavailable {
        path: path.to_path_buf(),
    })?;
    let candidates = crate::sales::decode_candidates(&bytes);
    if candidates.is_empty() {
        return Err(ReportError::DecodeFailure {
            path: path.to_path_buf(),
        });
    }
    // Same retry as the sales loader: a mis-decode garbles the header row,
    // so on a missing column the next candidate gets its turn.
    let mut last_err = None;
    for text in &candidates {
        match parse_master_text(path, text) {
            Ok(entries) => return Ok(StoreDirectory::from_entries(entries)),
            Err(err @ ReportError::MissingColumn { .. }) => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or(ReportError::DecodeFailure {
        path: path.to_path_buf(),
    }))
}

fn parse_master_text(path: &Path, text: &str) -> Result<Vec<(String, StoreEntry)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.contains(&h.trim()))
    };
    let store_col = find(&["store", "store_id"]).ok_or_else(|| ReportError::MissingColumn {
        path: path.to_path_buf(),
        column: "store".to_string(),
    })?;
    let name_col = find(&["name", "store_name"]).ok_or_else(|| ReportError::MissingColumn {
        path: path.to_path_buf(),
        column: "name".to_string(),
    })?;
    let short_col = find(&["short_name"]);

    let mut entries = Vec::new();
    for row in reader.records() {
        let row = row?;
        let store_id = normalize_store_id(row.get(store_col).unwrap_or(""));
        if store_id.is_empty() {
            continue;
        }
        let display_name = row.get(name_col).unwrap_or("").to_string();
        let short_name = short_col
            .and_then(|c| row.get(c))
            .unwrap_or("")
            .to_string();
        entries.push((store_id, make_entry(display_name, short_name)));
    }
    Ok(entries)
}

// short_name falls back to the full display name.
fn make_entry(display_name: String, short_name: String) -> StoreEntry {
    let short_name = if short_name.is_empty() {
        display_name.clone()
    } else {
        short_name
    };
    StoreEntry {
        display_name,
        short_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_unavailable() {
        let err = load_store_directory(Path::new("/nonexistent/master.csv")).unwrap_err();
        assert!(matches!(err, ReportError::StoreDirectoryUnavailable { .. }));
    }

    #[test]
    fn csv_master_with_short_name_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store_master.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "store,name,short_name").unwrap();
        writeln!(f, "07,グリーンマート港北店,港北").unwrap();
        writeln!(f, "12,グリーンマート青葉台店,").unwrap();
        drop(f);

        let dir = load_store_directory(&path).unwrap();
        assert_eq!(dir.short_name("7"), "港北");
        // Empty short_name falls back to the full name.
        assert_eq!(dir.short_name("12"), "グリーンマート青葉台店");
        assert_eq!(dir.short_name("99"), "");
    }

    #[test]
    fn bom_prefixed_master_retries_the_utf8_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store_master.csv");
        // The CP932 reading of a UTF-8 BOM glues mojibake onto the first
        // header, so the loader must move on to the UTF-8 candidate.
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice(b"store,name,short_name\n7,Kohoku Store,Kohoku\n");
        std::fs::write(&path, &bytes).unwrap();

        let loaded = load_store_directory(&path).unwrap();
        assert_eq!(loaded.short_name("7"), "Kohoku");
    }

    #[test]
    fn xlsx_master_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store_master.xlsx");

        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        sheet.get_cell_mut((1, 1)).set_value("store");
        sheet.get_cell_mut((2, 1)).set_value("name");
        sheet.get_cell_mut((3, 1)).set_value("short_name");
        sheet.get_cell_mut((1, 2)).set_value("7");
        sheet.get_cell_mut((2, 2)).set_value("グリーンマート港北店");
        sheet.get_cell_mut((3, 2)).set_value("港北");
        umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

        let loaded = load_store_directory(&path).unwrap();
        assert_eq!(loaded.short_name("7"), "港北");
    }
}
