//! Report Renderer: projects Top-N tables onto copies of the TEMPLATE
//! worksheet, one sheet per (store, page).
//!
//! Fixed layout, matching the distributed template workbook:
//! A1 title; row 2 block header; row 3 column headers; rows 4-38 the
//! ranked records; rows 40-42 the totals footer. A page holds four
//! day-blocks at column offsets 0/8/16/24.

use crate::aggregate::{store_order, TopNTable, TotalsIndex};
use crate::config::ReportRequest;
use crate::error::{ReportError, Result};
use crate::sales::SalesRecord;
use crate::stores::StoreDirectory;
use crate::title::{format_title, TitleArgs};
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::path::Path;
use umya_spreadsheet::{NumberingFormat, Spreadsheet, Worksheet};

pub const TEMPLATE_SHEET: &str = "TEMPLATE";
pub const DATES_PER_PAGE: usize = 4;
pub const MAX_RANKED_ROWS: usize = 35;

const BLOCK_OFFSETS: [u32; DATES_PER_PAGE] = [0, 8, 16, 24];
const COLUMN_HEADERS: [&str; 6] = ["順位", "商品名", "売上金額", "売上数量", "値引金額", "値引率"];
const HEADER_ROW: u32 = 2;
const COLUMN_HEADER_ROW: u32 = 3;
const DATA_START_ROW: u32 = 4;
// Footer starts three rows below the 35-row data area (rows 40-42).
const FOOTER_BASE_ROW: u32 = 39;

pub struct RenderInput<'a> {
    pub template_path: &'a Path,
    pub topn: &'a TopNTable,
    pub totals: &'a TotalsIndex,
    pub stores: &'a StoreDirectory,
    pub request: &'a ReportRequest,
    pub category_name: &'a str,
}

/// Render the combined workbook: for each store (ascending numeric id)
/// one sheet per chunk of four requested dates, then drop the template
/// sheet.
pub fn render_workbook(input: &RenderInput) -> Result<Spreadsheet> {
    let mut book = umya_spreadsheet::reader::xlsx::read(input.template_path).map_err(|_| {
        ReportError::TemplateUnavailable {
            path: input.template_path.to_path_buf(),
        }
    })?;
    let template = book
        .get_sheet_by_name(TEMPLATE_SHEET)
        .ok_or_else(|| ReportError::TemplateSheetMissing {
            sheet: TEMPLATE_SHEET.to_string(),
        })?
        .clone();

    let dates = requested_dates(input);
    let num_pages = dates.len().div_ceil(DATES_PER_PAGE);

    for store_id in store_order(input.topn) {
        let days = &input.topn[&store_id];
        let short_name = input.stores.short_name(&store_id);

        for page in 0..num_pages {
            let page_no = page + 1;
            let mut sheet = template.clone();
            sheet.set_name(format!("{store_id}({page_no})"));
            // Sheet duplication alone is not trusted to carry rules over;
            // re-apply explicitly (idempotent).
            clone_conditional_formats(&template, &mut sheet);

            let title = format_title(&TitleArgs {
                event_name: &input.request.event_name,
                category_code: &input.request.category_code,
                category_name: input.category_name,
                dates: &dates,
                page_no,
                template: input.request.title_template.as_deref(),
                no_date_in_title: input.request.no_date_in_title,
            });
            sheet.get_cell_mut("A1").set_value(title);

            let page_dates = &dates[page * DATES_PER_PAGE..(page * DATES_PER_PAGE
                + DATES_PER_PAGE)
                .min(dates.len())];
            for (block_idx, date) in page_dates.iter().enumerate() {
                let Some(rows) = days.get(date).filter(|rows| !rows.is_empty()) else {
                    continue;
                };
                fill_block(
                    &mut sheet,
                    BLOCK_OFFSETS[block_idx],
                    *date,
                    rows,
                    short_name,
                    input.category_name,
                    input.totals,
                    &store_id,
                );
            }

            book.add_sheet(sheet)
                .map_err(|e| ReportError::Workbook(e.to_string()))?;
        }
        log::debug!("rendered {num_pages} page(s) for store {store_id}");
    }

    book.remove_sheet_by_name(TEMPLATE_SHEET)
        .map_err(|e| ReportError::Workbook(e.to_string()))?;
    Ok(book)
}

/// The date list the pages are built from; falls back to every date in
/// the Top-N table when the request carries none.
fn requested_dates(input: &RenderInput) -> Vec<NaiveDate> {
    if !input.request.dates.is_empty() {
        return input.request.dates.clone();
    }
    let all: BTreeSet<NaiveDate> = input
        .topn
        .values()
        .flat_map(|days| days.keys().copied())
        .collect();
    all.into_iter().collect()
}

/// Copy the template's conditional-formatting rules onto `dst`.
///
/// Layouts are identical, so the rules apply to the same ranges. A `dst`
/// that already carries the full rule set is left untouched, so the
/// operation is idempotent.
pub fn clone_conditional_formats(src: &Worksheet, dst: &mut Worksheet) {
    let rules = src.get_conditional_formatting_collection();
    if dst.get_conditional_formatting_collection().len() == rules.len() {
        return;
    }
    for rule in rules.iter() {
        dst.add_conditional_formatting_collection(rule.clone());
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_block(
    sheet: &mut Worksheet,
    col_offset: u32,
    date: NaiveDate,
    rows: &[SalesRecord],
    short_name: &str,
    category_name: &str,
    totals: &TotalsIndex,
    store_id: &str,
) {
    // Block header: 2-digit year, MM/DD, store, category label.
    sheet
        .get_cell_mut((1 + col_offset, HEADER_ROW))
        .set_value(format!("{:02}", date.year() % 100));
    sheet
        .get_cell_mut((2 + col_offset, HEADER_ROW))
        .set_value(date.format("%m/%d").to_string());
    sheet
        .get_cell_mut((3 + col_offset, HEADER_ROW))
        .set_value(short_name);
    sheet
        .get_cell_mut((4 + col_offset, HEADER_ROW))
        .set_value(format!("{category_name}単品"));

    for (i, header) in COLUMN_HEADERS.iter().enumerate() {
        sheet
            .get_cell_mut((1 + col_offset + i as u32, COLUMN_HEADER_ROW))
            .set_value(*header);
    }

    for (idx, rec) in rows.iter().take(MAX_RANKED_ROWS).enumerate() {
        let rank = idx + 1;
        let row = DATA_START_ROW + idx as u32;
        let rate = if rec.amount.is_zero() {
            Decimal::ZERO
        } else {
            rec.discount / rec.amount
        };

        sheet
            .get_cell_mut((1 + col_offset, row))
            .set_value_number(rank as f64);
        sheet
            .get_cell_mut((2 + col_offset, row))
            .set_value(rec.product_name.as_str());
        sheet
            .get_cell_mut((3 + col_offset, row))
            .set_value_number(to_f64(rec.amount));
        sheet
            .get_cell_mut((4 + col_offset, row))
            .set_value_number(to_f64(rec.quantity));
        sheet
            .get_cell_mut((5 + col_offset, row))
            .set_value_number(to_f64(rec.discount));
        let rate_cell = sheet.get_cell_mut((6 + col_offset, row));
        rate_cell.set_value_number(to_f64(rate));
        rate_cell
            .get_style_mut()
            .get_number_format_mut()
            .set_format_code(NumberingFormat::FORMAT_PERCENTAGE_00);
    }

    // Footer: store-wide total, category total, composition ratio.
    let store_total = totals.store_total(date, store_id).trunc();
    let category_total = totals.category_total(date, store_id).trunc();
    let ratio = totals.composition_ratio(date, store_id);

    sheet
        .get_cell_mut((1 + col_offset, FOOTER_BASE_ROW + 1))
        .set_value("惣菜売上金額");
    sheet
        .get_cell_mut((1 + col_offset, FOOTER_BASE_ROW + 2))
        .set_value(format!("{category_name}売上金額"));
    sheet
        .get_cell_mut((1 + col_offset, FOOTER_BASE_ROW + 3))
        .set_value(format!("{category_name}構成比"));

    sheet
        .get_cell_mut((3 + col_offset, FOOTER_BASE_ROW + 1))
        .set_value_number(to_f64(store_total));
    sheet
        .get_cell_mut((3 + col_offset, FOOTER_BASE_ROW + 2))
        .set_value_number(to_f64(category_total));
    let ratio_cell = sheet.get_cell_mut((3 + col_offset, FOOTER_BASE_ROW + 3));
    ratio_cell.set_value_number(to_f64(ratio));
    ratio_cell
        .get_style_mut()
        .get_number_format_mut()
        .set_format_code(NumberingFormat::FORMAT_PERCENTAGE_00);
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
