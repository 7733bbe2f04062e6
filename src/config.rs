//! Run configuration: the category-name table and the report request.
//!
//! Nothing here is global state. The category map is loaded (or defaulted)
//! once by the caller and passed down into the pipeline.

use crate::error::{ReportError, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Category code -> display name.
pub type CategoryMap = BTreeMap<String, String>;

/// Built-in category table, used when no override file is supplied.
pub fn default_category_map() -> CategoryMap {
    [
        ("1", "寿司"),
        ("2", "弁当"),
        ("3", "温総菜"),
        ("4", "冷総菜"),
        ("5", "軽食"),
        ("6", "魚惣菜"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Load a `{"code": "name", ...}` JSON override file.
pub fn load_category_map(path: &Path) -> Result<CategoryMap> {
    let file = File::open(path).map_err(|e| ReportError::InvalidCategoryMap {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let map: CategoryMap =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ReportError::InvalidCategoryMap {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
    Ok(map)
}

/// Display name for a category code, falling back to the raw code.
pub fn category_name(map: &CategoryMap, code: &str) -> String {
    map.get(code).cloned().unwrap_or_else(|| code.to_string())
}

/// Everything one report run needs beyond the input tables.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub category_code: String,
    pub dates: Vec<NaiveDate>,
    pub top_n: usize,
    pub event_name: String,
    pub title_template: Option<String>,
    pub no_date_in_title: bool,
    pub split_dir: Option<PathBuf>,
}

impl ReportRequest {
    pub fn new(category_code: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        ReportRequest {
            category_code: category_code.into(),
            dates,
            top_n: 35,
            event_name: String::new(),
            title_template: None,
            no_date_in_title: false,
            split_dir: None,
        }
    }
}
