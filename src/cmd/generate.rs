//! Generate command - the full load/aggregate/render/split pipeline.

use crate::aggregate::{aggregate_topn, compute_totals, store_order};
use crate::config::{self, ReportRequest};
use crate::render::{render_workbook, RenderInput, DATES_PER_PAGE};
use crate::sales::load_sales;
use crate::split::split_workbook;
use crate::stores::load_store_directory;
use clap::Args;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Root directory of monthly sales extracts (<root>/<YYYY>/<prefix>_<YYYYMM>.csv)
    #[arg(long, default_value = "data/material")]
    data_root: PathBuf,

    /// Store master file (.xlsx or delimited text)
    #[arg(long, default_value = "data/material/master/store_master.xlsx")]
    store_master: PathBuf,

    /// Template workbook containing the TEMPLATE sheet
    #[arg(long)]
    template: PathBuf,

    /// Category code (1-6 with the built-in map)
    #[arg(short, long)]
    category: String,

    /// Comma-separated report dates, e.g. 2025-01-03,2025-01-10
    #[arg(short, long)]
    dates: String,

    /// Output workbook path
    #[arg(short, long)]
    out: PathBuf,

    /// Event name for the title; non-empty switches to the event-first form
    #[arg(long, default_value = "")]
    event_name: String,

    /// Title template with {placeholders} ({yy}, {range}, {cat}, {page}, ...)
    #[arg(long)]
    title_template: Option<String>,

    /// Omit dates from the report title
    #[arg(long)]
    no_date_in_title: bool,

    /// Ranked rows per day block
    #[arg(long, default_value_t = 35)]
    top_n: usize,

    /// JSON file overriding the built-in category map
    #[arg(long)]
    category_map: Option<PathBuf>,

    /// Also write one workbook per store
    #[arg(long)]
    split_by_store: bool,

    /// Split output directory (default: <out dir>/split)
    #[arg(long)]
    split_dir: Option<PathBuf>,

    /// Open the result when done
    #[arg(long)]
    open: bool,

    /// Print the per-store summary as JSON instead of a table
    #[arg(long)]
    json: bool,
}

/// Per-store line of the post-run summary.
#[derive(Tabled, serde::Serialize)]
struct StoreSummaryRow {
    #[tabled(rename = "Store")]
    store: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Days")]
    days: usize,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Pages")]
    pages: usize,
}

#[derive(serde::Serialize)]
struct SummaryData {
    category: String,
    category_name: String,
    dates: Vec<String>,
    stores: Vec<StoreSummaryRow>,
}

impl GenerateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let dates = super::parse_date_list(&self.dates)?;
        let categories = match &self.category_map {
            Some(path) => config::load_category_map(path)?,
            None => config::default_category_map(),
        };
        let category_name = config::category_name(&categories, &self.category);
        log::info!(
            "generating {} ({}) report for {} date(s)",
            self.category,
            category_name,
            dates.len()
        );

        let sales = load_sales(&self.data_root, &dates)?;
        let stores = load_store_directory(&self.store_master)?;

        let mut request = ReportRequest::new(self.category.clone(), dates.clone());
        request.top_n = self.top_n;
        request.event_name = self.event_name.clone();
        request.title_template = self.title_template.clone();
        request.no_date_in_title = self.no_date_in_title;
        request.split_dir = self.split_dir.clone();

        let topn = aggregate_topn(&sales.records, &request.category_code, request.top_n, &dates);
        let totals = compute_totals(&sales.records, &request.category_code, &dates);

        let book = render_workbook(&RenderInput {
            template_path: &self.template,
            topn: &topn,
            totals: &totals,
            stores: &stores,
            request: &request,
            category_name: &category_name,
        })?;

        if let Some(parent) = self.out.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        umya_spreadsheet::writer::xlsx::write(&book, &self.out)?;
        println!("wrote {}", self.out.display());

        let pages = dates.len().div_ceil(DATES_PER_PAGE);
        self.print_summary(&topn, &stores, &dates, &category_name, pages)?;

        let split_target = if self.split_by_store {
            let split_dir = request.split_dir.clone().unwrap_or_else(|| {
                self.out
                    .parent()
                    .map(|p| p.join("split"))
                    .unwrap_or_else(|| PathBuf::from("split"))
            });
            let written = split_workbook(&book, &split_dir, &category_name)?;
            println!("split: {} workbook(s) under {}", written.len(), split_dir.display());
            Some(split_dir)
        } else {
            None
        };

        if self.open {
            let target = split_target.as_deref().unwrap_or(&self.out);
            if let Err(err) = opener::open(target) {
                log::warn!("could not open {}: {err}", target.display());
            }
        }
        Ok(())
    }

    fn print_summary(
        &self,
        topn: &crate::aggregate::TopNTable,
        stores: &crate::stores::StoreDirectory,
        dates: &[chrono::NaiveDate],
        category_name: &str,
        pages: usize,
    ) -> anyhow::Result<()> {
        let rows: Vec<StoreSummaryRow> = store_order(topn)
            .into_iter()
            .map(|store| {
                let days = &topn[&store];
                StoreSummaryRow {
                    name: stores.short_name(&store).to_string(),
                    days: days.len(),
                    rows: days.values().map(Vec::len).sum(),
                    pages,
                    store,
                }
            })
            .collect();

        if self.json {
            let data = SummaryData {
                category: self.category.clone(),
                category_name: category_name.to_string(),
                dates: dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
                stores: rows,
            };
            println!("{}", serde_json::to_string_pretty(&data)?);
            return Ok(());
        }
        if rows.is_empty() {
            println!("No sales matched the requested category/dates");
            return Ok(());
        }
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        Ok(())
    }
}
