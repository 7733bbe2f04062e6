use std::path::PathBuf;

/// Errors that abort a report run.
///
/// Malformed individual rows are not errors: the loaders coerce or drop
/// them and count the damage in [`crate::sales::LoadStats`].
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no sales file for {year}-{month:02} under {root}")]
    DataUnavailable {
        root: PathBuf,
        year: i32,
        month: u32,
    },

    #[error("store directory not readable: {path}")]
    StoreDirectoryUnavailable { path: PathBuf },

    #[error("required column '{column}' missing in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("unable to decode {path} with any supported encoding")]
    DecodeFailure { path: PathBuf },

    #[error("template workbook not readable: {path}")]
    TemplateUnavailable { path: PathBuf },

    #[error("template workbook has no '{sheet}' sheet")]
    TemplateSheetMissing { sheet: String },

    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("invalid category map {path}: {reason}")]
    InvalidCategoryMap { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xlsx(#[from] umya_spreadsheet::XlsxError),
}

pub type Result<T> = std::result::Result<T, ReportError>;
