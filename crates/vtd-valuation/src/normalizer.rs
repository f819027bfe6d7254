//! History Normalizer.
//!
//! Sorts a value series ascending by date (stable) and collapses runs of
//! consecutive points equal in both date and value. Non-adjacent duplicates
//! are kept. `normalize(normalize(x)) == normalize(x)`.

use vtd_portfolio::ValuePoint;

pub fn normalize(mut series: Vec<ValuePoint>) -> Vec<ValuePoint> {
    series.sort_by(|a, b| a.date.cmp(&b.date));
    series.dedup_by(|cur, prev| cur.date == prev.date && cur.value == prev.value);
    series
}
