//! Sales Loader: monthly POS extracts -> normalized transaction table.
//!
//! Source files live at `<root>/<YYYY>/<prefix>_<YYYYMM>.csv`, carry
//! Japanese column headers and an unknown encoding (CP932 or UTF-8, with
//! or without BOM). Rows are renamed to the canonical schema, coerced,
//! and dedup-summed per (date, store, category, product) so duplicated
//! extract rows never inflate totals.

use crate::error::{ReportError, Result};
use chrono::{Datelike, NaiveDate};
use encoding_rs::SHIFT_JIS;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// One normalized sales transaction.
///
/// Invariant: one record per (date, store_id, category_code, product_code)
/// after [`load_sales`]; duplicates are summed with a first-seen name.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub date: NaiveDate,
    /// Normalized: trimmed, leading zeros stripped.
    pub store_id: String,
    pub category_code: String,
    pub product_code: String,
    pub product_name: String,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub discount: Decimal,
}

/// Row-level damage counters, surfaced in the log after a load.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadStats {
    pub files_read: usize,
    pub rows_read: usize,
    /// Rows dropped for an unparsable sale date.
    pub rows_dropped: usize,
    /// Numeric cells coerced to zero.
    pub values_coerced: usize,
    /// Source rows merged into an existing (date, store, category, product) group.
    pub duplicates_merged: usize,
}

#[derive(Debug, Clone)]
pub struct SalesTable {
    pub records: Vec<SalesRecord>,
    pub stats: LoadStats,
}

/// Source header -> canonical column.
const DATE_COL: &str = "売上日";
const STORE_COL: &str = "店舗コード";
const CATEGORY_COL: &str = "大分類コード";
const PRODUCT_COL: &str = "JANコード";
const NAME_COL: &str = "品名漢字";
const AMOUNT_COL: &str = "総売上金額";
const QTY_COL: &str = "総売上数量";
const DISCOUNT_COL: &str = "値引金額";

/// Load, normalize and deduplicate the monthly extracts covering `dates`.
///
/// With an empty `dates`, every discoverable monthly file under `root` is
/// loaded and no date filter is applied. Deduplication always runs.
pub fn load_sales(root: &Path, dates: &[NaiveDate]) -> Result<SalesTable> {
    let files = if dates.is_empty() {
        discover_monthly_files(root)?
    } else {
        locate_monthly_files(root, dates)?
    };

    let date_filter: HashSet<NaiveDate> = dates.iter().copied().collect();
    let mut stats = LoadStats::default();
    let mut records: Vec<SalesRecord> = Vec::new();
    // (date, store, category, product) -> index into `records`
    let mut index: HashMap<(NaiveDate, String, String, String), usize> = HashMap::new();

    for path in &files {
        let bytes = fs::read(path)?;
        let candidates = decode_candidates(&bytes);
        if candidates.is_empty() {
            return Err(ReportError::DecodeFailure {
                path: path.to_path_buf(),
            });
        }
        // "Parses without error" includes finding the source headers: a
        // CP932 mis-decode of a UTF-8 file yields mojibake headers, so the
        // next candidate gets its turn.
        let mut last_err = None;
        let mut parsed = false;
        for text in &candidates {
            match parse_file(path, text, &date_filter, &mut records, &mut index, &mut stats) {
                Ok(()) => {
                    parsed = true;
                    break;
                }
                Err(err @ ReportError::MissingColumn { .. }) => last_err = Some(err),
                Err(err) => return Err(err),
            }
        }
        if !parsed {
            return Err(last_err.unwrap_or(ReportError::DecodeFailure {
                path: path.to_path_buf(),
            }));
        }
        stats.files_read += 1;
    }

    log::info!(
        "loaded {} sales rows from {} file(s) -> {} unique records",
        stats.rows_read,
        stats.files_read,
        records.len()
    );
    if stats.rows_dropped > 0 || stats.values_coerced > 0 {
        log::warn!(
            "dirty input: {} row(s) dropped (bad date), {} value(s) coerced to zero",
            stats.rows_dropped,
            stats.values_coerced
        );
    }
    if stats.duplicates_merged > 0 {
        log::info!("merged {} duplicate source row(s)", stats.duplicates_merged);
    }

    Ok(SalesTable { records, stats })
}

/// One covering file per distinct (year, month) in `dates`.
fn locate_monthly_files(root: &Path, dates: &[NaiveDate]) -> Result<Vec<PathBuf>> {
    let months: BTreeSet<(i32, u32)> = dates.iter().map(|d| (d.year(), d.month())).collect();
    let mut files = Vec::new();
    for (year, month) in months {
        let candidates = monthly_candidates(&root.join(format!("{year:04}")), year, month);
        match candidates.into_iter().next() {
            Some(path) => files.push(path),
            None => {
                return Err(ReportError::DataUnavailable {
                    root: root.to_path_buf(),
                    year,
                    month,
                })
            }
        }
    }
    Ok(files)
}

/// All monthly files under `root`, for date-less discovery runs.
fn discover_monthly_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let dir = entry.path();
        let Some(year) = dir
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse::<i32>().ok())
        else {
            continue;
        };
        if !dir.is_dir() {
            continue;
        }
        for month in 1..=12 {
            files.extend(monthly_candidates(&dir, year, month));
        }
    }
    files.sort();
    files.dedup();
    if files.is_empty() {
        return Err(ReportError::DataUnavailable {
            root: root.to_path_buf(),
            year: 0,
            month: 0,
        });
    }
    Ok(files)
}

/// Files in `dir` whose stem ends `_<YYYYMM>`, sorted for determinism.
fn monthly_candidates(dir: &Path, year: i32, month: u32) -> Vec<PathBuf> {
    let suffix = format!("_{year:04}{month:02}");
    let mut out = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_csv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        let matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.ends_with(&suffix))
            .unwrap_or(false);
        if is_csv && matches {
            out.push(path);
        }
    }
    out.sort();
    out
}

/// Clean decodes of `bytes` in priority order: CP932 first, then UTF-8
/// (BOM tolerated). Duplicates (pure ASCII) collapse to one candidate.
pub(crate) fn decode_candidates(bytes: &[u8]) -> Vec<String> {
    let mut candidates = Vec::new();
    let (decoded, _, had_errors) = SHIFT_JIS.decode(bytes);
    if !had_errors {
        candidates.push(decoded.into_owned());
    }
    let stripped = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(stripped) {
        if candidates.first().map(String::as_str) != Some(text) {
            candidates.push(text.to_owned());
        }
    }
    candidates
}

struct ColumnIndex {
    date: usize,
    store: usize,
    category: usize,
    product: usize,
    name: usize,
    amount: usize,
    qty: usize,
    discount: Option<usize>,
}

fn resolve_columns(path: &Path, headers: &csv::StringRecord) -> Result<ColumnIndex> {
    let find = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ReportError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    Ok(ColumnIndex {
        date: find(DATE_COL)?,
        store: find(STORE_COL)?,
        category: find(CATEGORY_COL)?,
        product: find(PRODUCT_COL)?,
        name: find(NAME_COL)?,
        amount: find(AMOUNT_COL)?,
        qty: find(QTY_COL)?,
        discount: headers.iter().position(|h| h.trim() == DISCOUNT_COL),
    })
}

fn parse_file(
    path: &Path,
    text: &str,
    date_filter: &HashSet<NaiveDate>,
    records: &mut Vec<SalesRecord>,
    index: &mut HashMap<(NaiveDate, String, String, String), usize>,
    stats: &mut LoadStats,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let cols = resolve_columns(path, &headers)?;

    for row in reader.records() {
        let row = row?;
        stats.rows_read += 1;

        let Some(date) = parse_date(row.get(cols.date).unwrap_or("")) else {
            stats.rows_dropped += 1;
            continue;
        };
        if !date_filter.is_empty() && !date_filter.contains(&date) {
            continue;
        }

        let store_id = normalize_store_id(row.get(cols.store).unwrap_or(""));
        let category_code = row.get(cols.category).unwrap_or("").trim().to_string();
        let product_code = row.get(cols.product).unwrap_or("").trim().to_string();
        let product_name = row.get(cols.name).unwrap_or("").to_string();
        let amount = coerce_decimal(row.get(cols.amount), stats);
        let quantity = coerce_decimal(row.get(cols.qty), stats);
        let discount = cols
            .discount
            .map(|i| coerce_decimal(row.get(i), stats))
            .unwrap_or(Decimal::ZERO);

        let key = (date, store_id.clone(), category_code.clone(), product_code.clone());
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut records[i];
                existing.amount += amount;
                existing.quantity += quantity;
                existing.discount += discount;
                stats.duplicates_merged += 1;
            }
            None => {
                index.insert(key, records.len());
                records.push(SalesRecord {
                    date,
                    store_id,
                    category_code,
                    product_code,
                    product_name,
                    amount,
                    quantity,
                    discount,
                });
            }
        }
    }
    Ok(())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
}

/// Trim and strip leading zeros: "07" and "7" are the same store.
pub fn normalize_store_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() && !trimmed.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

fn coerce_decimal(raw: Option<&str>, stats: &mut LoadStats) -> Decimal {
    let raw = raw.unwrap_or("").trim();
    if raw.is_empty() {
        return Decimal::ZERO;
    }
    match raw.replace(',', "").parse::<Decimal>() {
        Ok(v) => v,
        Err(_) => {
            stats.values_coerced += 1;
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "売上日,店舗コード,大分類コード,JANコード,品名漢字,総売上金額,総売上数量,値引金額";

    fn parse(csv_text: &str, dates: &[NaiveDate]) -> SalesTable {
        let filter: HashSet<NaiveDate> = dates.iter().copied().collect();
        let mut stats = LoadStats::default();
        let mut records = Vec::new();
        let mut index = HashMap::new();
        parse_file(
            Path::new("test.csv"),
            csv_text,
            &filter,
            &mut records,
            &mut index,
            &mut stats,
        )
        .unwrap();
        SalesTable { records, stats }
    }

    #[test]
    fn duplicate_rows_are_summed_with_first_seen_name() {
        let text = format!(
            "{HEADER}\n\
             2025-01-03,07,4,4901234567890,ポテトサラダ,1000,10,50\n\
             2025-01-03,7,4,4901234567890,ポテトサラダ(旧),500,5,25\n"
        );
        let table = parse(&text, &[]);
        assert_eq!(table.records.len(), 1);
        let rec = &table.records[0];
        assert_eq!(rec.store_id, "7");
        assert_eq!(rec.product_name, "ポテトサラダ");
        assert_eq!(rec.amount, dec!(1500));
        assert_eq!(rec.quantity, dec!(15));
        assert_eq!(rec.discount, dec!(75));
        assert_eq!(table.stats.duplicates_merged, 1);
    }

    #[test]
    fn dedup_is_idempotent() {
        let text = format!(
            "{HEADER}\n\
             2025-01-03,7,4,A,きんぴら,300,3,0\n\
             2025-01-03,7,4,A,きんぴら,300,3,0\n\
             2025-01-03,7,4,B,ひじき,200,2,0\n"
        );
        let once = parse(&text, &[]);
        let total: Decimal = once.records.iter().map(|r| r.amount).sum();
        assert_eq!(total, dec!(800));
        // Re-running normalization over already unique records changes nothing.
        let again = parse(&text, &[]);
        let total_again: Decimal = again.records.iter().map(|r| r.amount).sum();
        assert_eq!(total, total_again);
        assert_eq!(once.records.len(), again.records.len());
    }

    #[test]
    fn bad_date_drops_row_and_bad_amount_coerces() {
        let text = format!(
            "{HEADER}\n\
             not-a-date,7,4,A,惣菜,100,1,0\n\
             2025-01-03,7,4,B,惣菜,abc,1,0\n"
        );
        let table = parse(&text, &[]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.stats.rows_dropped, 1);
        assert_eq!(table.stats.values_coerced, 1);
        assert_eq!(table.records[0].amount, Decimal::ZERO);
    }

    #[test]
    fn date_filter_restricts_rows() {
        let text = format!(
            "{HEADER}\n\
             2025-01-03,7,4,A,惣菜,100,1,0\n\
             2025-01-10,7,4,A,惣菜,200,2,0\n"
        );
        let keep = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let table = parse(&text, &[keep]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].date, keep);
    }

    #[test]
    fn slash_dates_are_accepted() {
        let text = format!("{HEADER}\n2025/01/03,7,4,A,惣菜,100,1,0\n");
        let table = parse(&text, &[]);
        assert_eq!(
            table.records[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()
        );
    }

    #[test]
    fn missing_discount_column_defaults_to_zero() {
        let text = "売上日,店舗コード,大分類コード,JANコード,品名漢字,総売上金額,総売上数量\n\
                    2025-01-03,7,4,A,惣菜,100,1\n";
        let table = parse(text, &[]);
        assert_eq!(table.records[0].discount, Decimal::ZERO);
    }

    #[test]
    fn cp932_bytes_decode_first() {
        // "売上" in CP932
        let bytes = [0x94, 0x84, 0x8f, 0xe3];
        assert_eq!(decode_candidates(&bytes)[0], "売上");
    }

    #[test]
    fn utf8_with_bom_is_a_candidate() {
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice("売上日,店舗コード".as_bytes());
        let candidates = decode_candidates(&bytes);
        // CP932 may garble this without flagging errors, but the correct
        // UTF-8 reading must be among the candidates.
        assert!(candidates.iter().any(|t| t.starts_with("売上日")));
    }

    #[test]
    fn ascii_collapses_to_one_candidate() {
        assert_eq!(decode_candidates(b"a,b,c\n1,2,3\n").len(), 1);
    }

    #[test]
    fn store_id_normalization() {
        assert_eq!(normalize_store_id(" 07 "), "7");
        assert_eq!(normalize_store_id("0"), "0");
        assert_eq!(normalize_store_id("ST-12"), "ST-12");
    }

    #[test]
    fn locate_fails_for_missing_month() {
        let dir = tempfile::tempdir().unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let err = locate_monthly_files(dir.path(), &[d]).unwrap_err();
        assert!(matches!(err, ReportError::DataUnavailable { year: 2025, month: 1, .. }));
    }

    #[test]
    fn locate_finds_prefixed_monthly_file() {
        let dir = tempfile::tempdir().unwrap();
        let year_dir = dir.path().join("2025");
        fs::create_dir(&year_dir).unwrap();
        fs::write(year_dir.join("SALES_202501.csv"), format!("{HEADER}\n")).unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let files = locate_monthly_files(dir.path(), &[d]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("2025/SALES_202501.csv"));
    }

    #[test]
    fn undecodable_file_is_a_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let year_dir = dir.path().join("2025");
        fs::create_dir(&year_dir).unwrap();
        // 0x81 lead byte with an invalid 0x20 trail: neither CP932 nor UTF-8
        // decodes this cleanly.
        fs::write(year_dir.join("SALES_202501.csv"), [0x81u8, 0x20]).unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let err = load_sales(dir.path(), &[d]).unwrap_err();
        assert!(matches!(err, ReportError::DecodeFailure { .. }));
    }

    #[test]
    fn decodable_bytes_without_headers_are_a_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let year_dir = dir.path().join("2025");
        fs::create_dir(&year_dir).unwrap();
        // 0x80 decodes under CP932 (to U+0080), so this is not a decode
        // failure; the file just lacks the expected headers.
        fs::write(year_dir.join("SALES_202501.csv"), [0x80u8]).unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let err = load_sales(dir.path(), &[d]).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { .. }));
    }
}
