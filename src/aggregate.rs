//! Aggregator: per-(store, day) Top-N rankings and footer totals.

use crate::sales::SalesRecord;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

/// store_id -> date -> up to N records, amount descending.
pub type TopNTable = BTreeMap<String, BTreeMap<NaiveDate, Vec<SalesRecord>>>;

/// Filter by category (and dates when given), group by (store, date),
/// rank by amount descending and truncate to `top_n`.
///
/// The sort is stable, so equal amounts keep their first-seen order from
/// the deduplicated load. Source files are read in sorted path order, which
/// makes that order deterministic.
pub fn aggregate_topn(
    records: &[SalesRecord],
    category_code: &str,
    top_n: usize,
    dates: &[NaiveDate],
) -> TopNTable {
    let date_set: HashSet<NaiveDate> = dates.iter().copied().collect();
    let mut table: TopNTable = BTreeMap::new();

    for rec in records {
        if rec.category_code != category_code {
            continue;
        }
        if !date_set.is_empty() && !date_set.contains(&rec.date) {
            continue;
        }
        table
            .entry(rec.store_id.clone())
            .or_default()
            .entry(rec.date)
            .or_default()
            .push(rec.clone());
    }

    for days in table.values_mut() {
        for group in days.values_mut() {
            group.sort_by(|a, b| b.amount.cmp(&a.amount));
            group.truncate(top_n);
        }
    }
    table
}

/// Footer totals per (date, store): store-wide and selected-category sums.
///
/// Always computed from the full record set scoped to the dates, never
/// from the Top-N truncation: dropping the long tail would corrupt the
/// composition ratio.
#[derive(Debug, Default, Clone)]
pub struct TotalsIndex {
    all: HashMap<(NaiveDate, String), Decimal>,
    category: HashMap<(NaiveDate, String), Decimal>,
}

impl TotalsIndex {
    pub fn store_total(&self, date: NaiveDate, store_id: &str) -> Decimal {
        self.all
            .get(&(date, store_id.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn category_total(&self, date: NaiveDate, store_id: &str) -> Decimal {
        self.category
            .get(&(date, store_id.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// category / store-wide, 0 when the store-wide total is 0.
    pub fn composition_ratio(&self, date: NaiveDate, store_id: &str) -> Decimal {
        let total = self.store_total(date, store_id);
        if total.is_zero() {
            Decimal::ZERO
        } else {
            self.category_total(date, store_id) / total
        }
    }
}

pub fn compute_totals(
    records: &[SalesRecord],
    category_code: &str,
    dates: &[NaiveDate],
) -> TotalsIndex {
    let date_set: HashSet<NaiveDate> = dates.iter().copied().collect();
    let mut totals = TotalsIndex::default();

    for rec in records {
        if !date_set.is_empty() && !date_set.contains(&rec.date) {
            continue;
        }
        let key = (rec.date, rec.store_id.clone());
        *totals.all.entry(key.clone()).or_default() += rec.amount;
        if rec.category_code == category_code {
            *totals.category.entry(key).or_default() += rec.amount;
        }
    }
    totals
}

/// Store ids in ascending numeric order; non-numeric ids follow,
/// lexicographically.
pub fn store_order(table: &TopNTable) -> Vec<String> {
    let mut ids: Vec<String> = table.keys().cloned().collect();
    ids.sort_by_key(|id| match id.parse::<i64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, id.clone()),
    });
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rec(date: (i32, u32, u32), store: &str, cat: &str, code: &str, amount: Decimal) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            store_id: store.to_string(),
            category_code: cat.to_string(),
            product_code: code.to_string(),
            product_name: format!("商品{code}"),
            amount,
            quantity: dec!(1),
            discount: Decimal::ZERO,
        }
    }

    #[test]
    fn topn_truncates_and_sorts_descending() {
        let records = vec![
            rec((2025, 1, 3), "7", "4", "A", dec!(100)),
            rec((2025, 1, 3), "7", "4", "B", dec!(300)),
            rec((2025, 1, 3), "7", "4", "C", dec!(200)),
        ];
        let table = aggregate_topn(&records, "4", 2, &[]);
        let day = &table["7"][&NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()];
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].product_code, "B");
        assert_eq!(day[1].product_code, "C");
    }

    #[test]
    fn topn_len_is_min_of_n_and_group_size() {
        let records = vec![
            rec((2025, 1, 3), "7", "4", "A", dec!(100)),
            rec((2025, 1, 3), "7", "4", "B", dec!(200)),
        ];
        let table = aggregate_topn(&records, "4", 35, &[]);
        let day = &table["7"][&NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()];
        assert_eq!(day.len(), 2);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let records = vec![
            rec((2025, 1, 3), "7", "4", "A", dec!(100)),
            rec((2025, 1, 3), "7", "4", "B", dec!(100)),
            rec((2025, 1, 3), "7", "4", "C", dec!(100)),
        ];
        let table = aggregate_topn(&records, "4", 3, &[]);
        let day = &table["7"][&NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()];
        let codes: Vec<_> = day.iter().map(|r| r.product_code.as_str()).collect();
        assert_eq!(codes, ["A", "B", "C"]);
    }

    #[test]
    fn category_and_date_filters_apply() {
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let records = vec![
            rec((2025, 1, 3), "7", "4", "A", dec!(100)),
            rec((2025, 1, 3), "7", "5", "B", dec!(100)),
            rec((2025, 1, 10), "7", "4", "C", dec!(100)),
        ];
        let table = aggregate_topn(&records, "4", 35, &[d1]);
        assert_eq!(table["7"].len(), 1);
        assert_eq!(table["7"][&d1].len(), 1);
        assert_eq!(table["7"][&d1][0].product_code, "A");
    }

    #[test]
    fn totals_use_full_set_not_topn() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let records = vec![
            rec((2025, 1, 3), "7", "4", "A", dec!(600)),
            rec((2025, 1, 3), "7", "4", "B", dec!(300)),
            rec((2025, 1, 3), "7", "4", "C", dec!(100)),
            rec((2025, 1, 3), "7", "9", "D", dec!(1000)),
        ];
        // Even with top_n = 1, footer totals cover the whole category.
        let totals = compute_totals(&records, "4", &[d]);
        assert_eq!(totals.category_total(d, "7"), dec!(1000));
        assert_eq!(totals.store_total(d, "7"), dec!(2000));
        assert_eq!(totals.composition_ratio(d, "7"), dec!(0.5));
    }

    #[test]
    fn ratio_is_zero_for_zero_store_total() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let totals = compute_totals(&[], "4", &[d]);
        assert_eq!(totals.composition_ratio(d, "7"), Decimal::ZERO);
    }

    #[test]
    fn store_order_is_numeric_then_lexicographic() {
        let mut table = TopNTable::new();
        for id in ["10", "7", "ST-12", "2"] {
            table.insert(id.to_string(), BTreeMap::new());
        }
        assert_eq!(store_order(&table), ["2", "7", "10", "ST-12"]);
    }
}
