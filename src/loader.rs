//! Crime table loading
//!
//! Reads the district-wise crime CSV with polars and turns it into
//! [`CrimeRecord`]s for the allow-listed categories the file actually has.

use crate::categories::CategoryCatalog;
use crate::error::{AtlasError, Result};
use crate::records::CrimeRecord;
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub const DISTRICT_COLUMN: &str = "DISTRICT";
pub const YEAR_COLUMN: &str = "YEAR";

/// Loaded crime data plus what a viewer can select from it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrimeTable {
    pub records: Vec<CrimeRecord>,
    /// Allow-listed categories present in the data, in allow-list order
    pub categories: Vec<String>,
    /// Distinct years, ascending
    pub years: Vec<i32>,
}

impl CrimeTable {
    pub fn from_records(records: Vec<CrimeRecord>, categories: Vec<String>) -> Self {
        let years = records.iter().map(|r| r.year).unique().sorted().collect();
        Self {
            records,
            categories,
            years,
        }
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Load a crime CSV from disk.
pub fn load_crime_table(path: impl AsRef<Path>, catalog: &CategoryCatalog) -> Result<CrimeTable> {
    let path = path.as_ref();
    info!("Loading crime table from {}", path.display());

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()?
        .collect()?;

    let table = records_from_frame(&df, catalog)?;
    info!(
        "Loaded {} crime rows, {} categories, {} years",
        table.records.len(),
        table.categories.len(),
        table.years.len()
    );
    Ok(table)
}

/// Build a [`CrimeTable`] from an already-parsed frame.
///
/// Header names are matched after trimming. DISTRICT and YEAR are required;
/// null category cells are left out of the record (they sum as 0), while
/// non-numeric or negative counts are schema errors.
pub fn records_from_frame(df: &DataFrame, catalog: &CategoryCatalog) -> Result<CrimeTable> {
    let columns: HashMap<String, String> = df
        .get_column_names()
        .into_iter()
        .map(|name| (name.trim().to_string(), name.to_string()))
        .collect();

    let districts = column(df, &columns, DISTRICT_COLUMN)?.cast(&DataType::String)?;
    let districts = districts.str()?;

    let years = column(df, &columns, YEAR_COLUMN)?
        .strict_cast(&DataType::Int64)
        .map_err(|e| AtlasError::Schema(format!("column '{}' is not numeric: {}", YEAR_COLUMN, e)))?;
    let years = years.i64()?;

    let available: Vec<&str> = columns.keys().map(String::as_str).collect();
    let categories = catalog.resolve(&available);

    let mut counts_by_category = Vec::with_capacity(categories.len());
    for category in &categories {
        let series = column(df, &columns, category)?.strict_cast(&DataType::Int64).map_err(|e| {
            AtlasError::Schema(format!("column '{}' is not numeric: {}", category, e))
        })?;
        counts_by_category.push((category.as_str(), series));
    }

    let mut records = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let district = districts.get(row_idx).unwrap_or_default();
        let year = years
            .get(row_idx)
            .ok_or_else(|| AtlasError::Schema(format!("row {} has no {}", row_idx, YEAR_COLUMN)))?;
        let year = i32::try_from(year)
            .map_err(|_| AtlasError::Schema(format!("row {} has year {} out of range", row_idx, year)))?;

        let mut record = CrimeRecord::new(district, year);
        for (category, series) in &counts_by_category {
            let Some(value) = series.i64()?.get(row_idx) else {
                continue;
            };
            let count = u64::try_from(value).map_err(|_| {
                AtlasError::Schema(format!(
                    "row {} has negative count {} for '{}'",
                    row_idx, value, category
                ))
            })?;
            record.counts.insert(category.to_string(), count);
        }
        records.push(record);
    }

    Ok(CrimeTable::from_records(records, categories))
}

/// Look up a column by its trimmed header name.
fn column<'a>(df: &'a DataFrame, columns: &HashMap<String, String>, name: &str) -> Result<&'a Series> {
    let actual = columns
        .get(name)
        .ok_or_else(|| AtlasError::Schema(format!("missing required column '{}'", name)))?;
    Ok(df.column(actual)?)
}
