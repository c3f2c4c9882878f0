//! Crime aggregation and district reconciliation
//!
//! For one (category, year):
//! 1. keep the records of that year
//! 2. sum the category per normalized district name
//! 3. fuzzy-match each name against the identity index, dropping misses
//! 4. sum values that land on the same canonical id
//!
//! Misses are expected (spelling drift between the two sources) and are
//! reported in the result, never raised.

use crate::fuzzy_matcher::FuzzyMatcher;
use crate::identity::{canonicalize, IdentityIndex};
use crate::records::{AggregateRow, CrimeRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Canonical id -> summed value
pub type ReconciledValues = BTreeMap<String, u64>;

/// Steps 1 and 2: filter to `year` and sum `category` per normalized
/// district. Rows are ordered by district name.
pub fn aggregate(records: &[CrimeRecord], category: &str, year: i32) -> Vec<AggregateRow> {
    let mut sums: BTreeMap<String, u64> = BTreeMap::new();
    let mut blank = 0usize;

    for record in records.iter().filter(|r| r.year == year) {
        let district = canonicalize(&record.district);
        if district.is_empty() {
            blank += 1;
            continue;
        }
        let value = record.count(category);
        let total = sums.entry(district).or_insert(0);
        add_saturating(total, value, &record.district);
    }

    if blank > 0 {
        debug!("Ignored {} rows with a blank district for {}", blank, year);
    }

    sums.into_iter()
        .map(|(district, value)| AggregateRow::new(district, value))
        .collect()
}

/// Sums clamp at `u64::MAX` instead of overflowing.
fn add_saturating(total: &mut u64, value: u64, district: &str) {
    match total.checked_add(value) {
        Some(sum) => *total = sum,
        None => {
            warn!("Count for '{}' exceeds {}, clamping", district, u64::MAX);
            *total = u64::MAX;
        }
    }
}

/// Map crime-table districts for one (category, year) onto canonical ids.
///
/// Returns an empty map when the year or the category has no rows.
pub fn reconcile(
    records: &[CrimeRecord],
    category: &str,
    year: i32,
    index: &IdentityIndex,
    threshold: f64,
) -> ReconciledValues {
    Reconciler::new(index, FuzzyMatcher::new(threshold))
        .run(records, category, year)
        .values
}

/// Full outcome of one reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub category: String,
    pub year: i32,
    pub values: ReconciledValues,
    /// Every aggregated district with its match, if any
    pub rows: Vec<AggregateRow>,
    /// Normalized names with no match above the threshold
    pub unmatched: Vec<String>,
}

impl Reconciliation {
    /// Canonical ids in the result, in key order
    pub fn locations(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reconciles crime rows against a fixed index with a fixed matcher.
///
/// Holds only shared references and copies, so one reconciler can serve
/// any number of (category, year) requests, including from several threads.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    index: &'a IdentityIndex,
    matcher: FuzzyMatcher,
}

impl<'a> Reconciler<'a> {
    pub fn new(index: &'a IdentityIndex, matcher: FuzzyMatcher) -> Self {
        Self { index, matcher }
    }

    pub fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    pub fn run(&self, records: &[CrimeRecord], category: &str, year: i32) -> Reconciliation {
        if !records.iter().any(|r| r.has_category(category)) {
            debug!("Category '{}' not present in any record", category);
            return Reconciliation {
                category: category.to_string(),
                year,
                values: ReconciledValues::new(),
                rows: Vec::new(),
                unmatched: Vec::new(),
            };
        }

        let mut rows = aggregate(records, category, year);
        let mut values = ReconciledValues::new();
        let mut unmatched = Vec::new();

        for row in &mut rows {
            match self.matcher.find_best_match(&row.raw_district, self.index) {
                Some(found) => {
                    // several raw names can land on one id; their values add up
                    let total = values.entry(found.canonical_id.clone()).or_insert(0);
                    add_saturating(total, row.crime_value, &found.canonical_id);
                    row.matched_id = Some(found.canonical_id);
                    row.score = Some(found.score);
                }
                None => {
                    debug!("No district match for '{}'", row.raw_district);
                    unmatched.push(row.raw_district.clone());
                }
            }
        }

        if !unmatched.is_empty() {
            info!(
                "{} of {} districts unmatched for {} in {} (threshold {:.2})",
                unmatched.len(),
                rows.len(),
                category,
                year,
                self.matcher.similarity_threshold
            );
        }

        Reconciliation {
            category: category.to_string(),
            year,
            values,
            rows,
            unmatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(district: &str, year: i32, category: &str, count: u64) -> CrimeRecord {
        CrimeRecord::new(district, year).with_count(category, count)
    }

    #[test]
    fn test_aggregate_groups_normalized_names() {
        let records = vec![
            rec("Pune", 2012, "RAPE", 10),
            rec("pune ", 2012, "RAPE", 5),
            rec("Nagpur", 2012, "RAPE", 3),
            rec("Pune", 2011, "RAPE", 100),
        ];
        let rows = aggregate(&records, "RAPE", 2012);
        assert_eq!(
            rows,
            vec![AggregateRow::new("nagpur", 3), AggregateRow::new("pune", 15)]
        );
    }

    #[test]
    fn test_aggregate_treats_missing_category_as_zero() {
        let records = vec![
            rec("Pune", 2012, "RAPE", 4),
            rec("Pune", 2012, "MURDER", 2),
        ];
        let rows = aggregate(&records, "RAPE", 2012);
        assert_eq!(rows, vec![AggregateRow::new("pune", 4)]);
    }

    #[test]
    fn test_reconcile_sums_duplicate_rows() {
        let records = vec![rec("Pune", 2012, "RAPE", 10), rec("pune ", 2012, "RAPE", 5)];
        let index = IdentityIndex::from_raw_names(["Pune"]);
        let values = reconcile(&records, "RAPE", 2012, &index, 0.85);
        assert_eq!(values, BTreeMap::from([("pune".to_string(), 15)]));
    }

    #[test]
    fn test_reconcile_merges_colliding_matches() {
        // both spellings score >= 0.85 against "ahmednagar"
        let records = vec![
            rec("Ahmadnagar", 2012, "RAPE", 5),
            rec("Ahmednagar", 2012, "RAPE", 7),
        ];
        let index = IdentityIndex::from_raw_names(["Ahmednagar"]);
        let values = reconcile(&records, "RAPE", 2012, &index, 0.85);
        assert_eq!(values.get("ahmednagar"), Some(&12));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_reconcile_absent_category_or_year_is_empty() {
        let records = vec![rec("Pune", 2012, "RAPE", 10)];
        let index = IdentityIndex::from_raw_names(["Pune"]);
        assert!(reconcile(&records, "MURDER", 2012, &index, 0.85).is_empty());
        assert!(reconcile(&records, "RAPE", 1999, &index, 0.85).is_empty());
        assert!(reconcile(&[], "RAPE", 2012, &index, 0.85).is_empty());
    }

    #[test]
    fn test_unmatched_rows_are_dropped_and_reported() {
        let records = vec![
            rec("Pune", 2012, "RAPE", 10),
            rec("Poona", 2012, "RAPE", 3),
        ];
        let index = IdentityIndex::from_raw_names(["Pune"]);
        let result = Reconciler::new(&index, FuzzyMatcher::default()).run(&records, "RAPE", 2012);

        assert_eq!(result.values, BTreeMap::from([("pune".to_string(), 10)]));
        assert_eq!(result.unmatched, vec!["poona".to_string()]);
        assert_eq!(result.rows.len(), 2);
        let poona = result.rows.iter().find(|r| r.raw_district == "poona").unwrap();
        assert_eq!(poona.matched_id, None);
        let pune = result.rows.iter().find(|r| r.raw_district == "pune").unwrap();
        assert_eq!(pune.matched_id.as_deref(), Some("pune"));
        assert_eq!(pune.score, Some(1.0));
        assert_eq!(result.locations(), vec!["pune".to_string()]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let records = vec![
            rec("Ahmadnagar", 2012, "RAPE", 5),
            rec("Pune", 2012, "RAPE", 10),
            rec("Bangalore Rural", 2012, "RAPE", 1),
        ];
        let index = IdentityIndex::from_raw_names(["Ahmednagar", "Pune", "Bengaluru Rural"]);
        let first = reconcile(&records, "RAPE", 2012, &index, 0.85);
        let second = reconcile(&records, "RAPE", 2012, &index, 0.85);
        assert_eq!(first, second);
    }

    #[test]
    fn test_huge_counts_saturate_instead_of_overflowing() {
        let big = i64::MAX as u64;
        let records = vec![
            rec("Pune", 2012, "RAPE", big),
            rec("pune ", 2012, "RAPE", big),
            rec("PUNE", 2012, "RAPE", big),
            rec("Poona", 2012, "RAPE", big),
        ];
        let rows = aggregate(&records, "RAPE", 2012);
        assert_eq!(rows[1], AggregateRow::new("pune", u64::MAX));

        // a second name landing on the same id also clamps
        let index = IdentityIndex::from_raw_names(["Pune"]);
        let values = reconcile(&records, "RAPE", 2012, &index, 0.4);
        assert_eq!(values, BTreeMap::from([("pune".to_string(), u64::MAX)]));
    }

    #[test]
    fn test_zero_valued_matches_are_kept() {
        let records = vec![
            rec("Pune", 2012, "RAPE", 0),
            CrimeRecord::new("Nagpur", 2012).with_count("MURDER", 4),
        ];
        let index = IdentityIndex::from_raw_names(["Pune", "Nagpur"]);
        let values = reconcile(&records, "RAPE", 2012, &index, 0.85);
        assert_eq!(
            values,
            BTreeMap::from([("nagpur".to_string(), 0), ("pune".to_string(), 0)])
        );
    }
}
