//! Title Formatter: report titles from a placeholder template.
//!
//! A non-empty event name always wins and uses the fixed event-first
//! form, ignoring any template. Otherwise `{name}` placeholders are
//! substituted; unknown placeholders are left as literal text so a
//! malformed template degrades instead of failing the render.

use chrono::{Datelike, NaiveDate};

const DEFAULT_TEMPLATE: &str = "{yy}年 {range} {cat}単品データ（{page}）";
const NO_DATE_TEMPLATE: &str = "{event} {cat}単品データ（{page}）";

#[derive(Debug, Clone)]
pub struct TitleArgs<'a> {
    pub event_name: &'a str,
    pub category_code: &'a str,
    pub category_name: &'a str,
    pub dates: &'a [NaiveDate],
    pub page_no: usize,
    pub template: Option<&'a str>,
    pub no_date_in_title: bool,
}

pub fn format_title(args: &TitleArgs) -> String {
    let event = args.event_name.trim();
    if !event.is_empty() {
        return format!(
            "{} {}単品データ（{}）",
            event, args.category_name, args.page_no
        );
    }

    let dates: Vec<NaiveDate> = if args.no_date_in_title {
        Vec::new()
    } else {
        args.dates.to_vec()
    };
    // Year and single-date placeholders derive from the latest date.
    let last = dates.iter().max().copied();
    let (date_full, date_short, year, yy) = match last {
        Some(d) => (
            d.format("%Y-%m-%d").to_string(),
            d.format("%m/%d").to_string(),
            d.format("%Y").to_string(),
            d.format("%y").to_string(),
        ),
        None => Default::default(),
    };

    let template = if args.no_date_in_title {
        NO_DATE_TEMPLATE
    } else {
        args.template
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TEMPLATE)
    };

    let dates_joined = dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(",");
    let dates_short = dates
        .iter()
        .map(|d| d.format("%m/%d").to_string())
        .collect::<Vec<_>>()
        .join(",");

    let values = [
        ("event", event.to_string()),
        ("cat", args.category_name.to_string()),
        ("category", args.category_code.to_string()),
        ("dates", dates_joined),
        ("dates_short", dates_short),
        ("range", date_range(&dates)),
        ("year", year),
        ("yy", yy),
        ("date", date_full),
        ("date_short", date_short),
        ("page", args.page_no.to_string()),
    ];

    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), &value);
    }
    out.trim().to_string()
}

/// `YYYY-MM` when the earliest and latest date share a month, otherwise
/// `YYYY-MM–YYYY-MM` spanning the two.
pub fn date_range(dates: &[NaiveDate]) -> String {
    let Some(first) = dates.iter().min() else {
        return String::new();
    };
    let last = dates.iter().max().unwrap();
    if first.year() == last.year() && first.month() == last.month() {
        format!("{}-{:02}", first.year(), first.month())
    } else {
        format!(
            "{}-{:02}–{}-{:02}",
            first.year(),
            first.month(),
            last.year(),
            last.month()
        )
    }
}
