pub mod generate;
pub mod title;

pub use generate::GenerateCommand;
pub use title::TitleCommand;

use chrono::NaiveDate;

/// Parse a comma-separated date list; `/` separators are tolerated.
pub fn parse_date_list(raw: &str) -> anyhow::Result<Vec<NaiveDate>> {
    let mut dates = Vec::new();
    for part in raw.split(',') {
        let part = part.trim().replace('/', "-");
        if part.is_empty() {
            continue;
        }
        let date = NaiveDate::parse_from_str(&part, "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("invalid date '{part}' (expected YYYY-MM-DD)"))?;
        dates.push(date);
    }
    if dates.is_empty() {
        anyhow::bail!("no dates given");
    }
    Ok(dates)
}
