//! Output Splitter: one workbook per store, carved from the combined
//! report in a single pass (no re-open round trip).

use crate::error::{ReportError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Folder/file code for a store: numeric ids zero-padded to 2 digits,
/// non-numeric ids pass through unchanged.
pub fn folder_code(store_id: &str) -> String {
    match store_id.parse::<u64>() {
        Ok(n) => format!("{n:02}"),
        Err(_) => store_id.to_string(),
    }
}

/// Store id from a report sheet name `"{store}({page})"`.
fn sheet_store_id(name: &str) -> Option<&str> {
    name.split_once('(').map(|(store, _)| store)
}

/// Partition the combined workbook by store and write
/// `<split_root>/<code>/<code>_<category>単品データ.xlsx` per store,
/// cloned sheets keeping all formatting. Returns the written paths.
pub fn split_workbook(
    book: &Spreadsheet,
    split_root: &Path,
    category_name: &str,
) -> Result<Vec<PathBuf>> {
    // Group in combined-book order so per-store page order survives.
    let mut groups: Vec<(String, Vec<&Worksheet>)> = Vec::new();
    for sheet in book.get_sheet_collection() {
        let Some(store_id) = sheet_store_id(sheet.get_name()) else {
            log::warn!("sheet '{}' has no store prefix, not split", sheet.get_name());
            continue;
        };
        match groups.iter_mut().find(|(id, _)| id == store_id) {
            Some((_, sheets)) => sheets.push(sheet),
            None => groups.push((store_id.to_string(), vec![sheet])),
        }
    }

    let mut written = Vec::with_capacity(groups.len());
    for (store_id, sheets) in groups {
        let code = folder_code(&store_id);
        let dir = split_root.join(&code);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{code}_{category_name}単品データ.xlsx"));

        let mut out = umya_spreadsheet::new_file_empty_worksheet();
        for sheet in sheets {
            out.add_sheet(sheet.clone())
                .map_err(|e| ReportError::Workbook(e.to_string()))?;
        }
        umya_spreadsheet::writer::xlsx::write(&out, &path)?;
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
