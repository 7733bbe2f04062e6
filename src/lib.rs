//! Per-store daily Top-N best-seller reports from POS sales extracts.
//!
//! Pipeline: monthly CSV extracts -> [`sales`] normalized table ->
//! [`aggregate`] Top-N rankings and footer totals -> [`render`] paginated
//! workbook from the TEMPLATE sheet -> optional [`split`] per-store
//! workbooks. [`title`] builds the page titles, [`stores`] the store-name
//! side table, [`config`] the injected category map.

pub mod aggregate;
pub mod cmd;
pub mod config;
pub mod error;
pub mod render;
pub mod sales;
pub mod split;
pub mod stores;
pub mod title;
