use chrono::NaiveDate;
use serde::Serialize;

use crate::ledger::{Contribution, DEED_CATEGORIES, SADAQAH_CATEGORY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SadaqahTotals {
    pub entries: i64,
    pub amount_pkr: i64,
}

/// Summed counts for every fixed category, zero-filled. The result always
/// lists the three deed categories followed by Sadaqah, even on an empty
/// ledger.
pub fn category_totals(records: &[Contribution]) -> Vec<CategoryTotal> {
    DEED_CATEGORIES
        .iter()
        .chain(std::iter::once(&SADAQAH_CATEGORY))
        .map(|&category| CategoryTotal {
            category: category.to_string(),
            total: records
                .iter()
                .filter(|r| r.category == category)
                .map(|r| r.count)
                .sum(),
        })
        .collect()
}

/// Summed counts across records created on the given date.
pub fn today_total(records: &[Contribution], today: NaiveDate) -> i64 {
    let prefix = today.format("%Y-%m-%d").to_string();
    records
        .iter()
        .filter(|r| r.created_at.starts_with(&prefix))
        .map(|r| r.count)
        .sum()
}

/// Summed counts across the three deed categories (Sadaqah excluded).
pub fn deed_total(records: &[Contribution]) -> i64 {
    records
        .iter()
        .filter(|r| DEED_CATEGORIES.contains(&r.category.as_str()))
        .map(|r| r.count)
        .sum()
}

pub fn sadaqah_totals(records: &[Contribution]) -> SadaqahTotals {
    let mut entries = 0;
    let mut amount_pkr = 0;
    for record in records.iter().filter(|r| r.category == SADAQAH_CATEGORY) {
        entries += 1;
        amount_pkr += record.amount_pkr;
    }
    SadaqahTotals { entries, amount_pkr }
}
