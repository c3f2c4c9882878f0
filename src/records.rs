use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the crime table: a district's counts for one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeRecord {
    pub district: String,
    pub year: i32,
    /// Category name -> count
    pub counts: BTreeMap<String, u64>,
}

impl CrimeRecord {
    pub fn new(district: impl Into<String>, year: i32) -> Self {
        Self {
            district: district.into(),
            year,
            counts: BTreeMap::new(),
        }
    }

    pub fn with_count(mut self, category: impl Into<String>, count: u64) -> Self {
        self.counts.insert(category.into(), count);
        self
    }

    /// Count for `category`, 0 when the record has no such category
    pub fn count(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.counts.contains_key(category)
    }
}

/// A normalized district's summed value, before and after matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// District label after normalization
    pub raw_district: String,
    pub crime_value: u64,
    /// Set by reconciliation; `None` rows are dropped from the result
    pub matched_id: Option<String>,
    pub score: Option<f64>,
}

impl AggregateRow {
    pub fn new(raw_district: impl Into<String>, crime_value: u64) -> Self {
        Self {
            raw_district: raw_district.into(),
            crime_value,
            matched_id: None,
            score: None,
        }
    }
}
