//! Title command - preview a report title without running the pipeline.

use crate::config;
use crate::title::{format_title, TitleArgs};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TitleCommand {
    /// Category code
    #[arg(short, long)]
    category: String,

    /// Comma-separated report dates
    #[arg(short, long)]
    dates: String,

    /// Event name; non-empty switches to the event-first form
    #[arg(long, default_value = "")]
    event_name: String,

    /// Title template with {placeholders}
    #[arg(long)]
    title_template: Option<String>,

    /// Omit dates from the title
    #[arg(long)]
    no_date_in_title: bool,

    /// Page number to preview
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// JSON file overriding the built-in category map
    #[arg(long)]
    category_map: Option<PathBuf>,
}

impl TitleCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let dates = super::parse_date_list(&self.dates)?;
        let categories = match &self.category_map {
            Some(path) => config::load_category_map(path)?,
            None => config::default_category_map(),
        };
        let category_name = config::category_name(&categories, &self.category);

        let title = format_title(&TitleArgs {
            event_name: &self.event_name,
            category_code: &self.category,
            category_name: &category_name,
            dates: &dates,
            page_no: self.page,
            template: self.title_template.as_deref(),
            no_date_in_title: self.no_date_in_title,
        });
        println!("{title}");
        Ok(())
    }
}
