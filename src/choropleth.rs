//! Choropleth layers for every (category, year)
//!
//! The [`Atlas`] reconciles every selectable combination up front so a
//! viewer can switch category or year without touching the source files.
//! Rendering is left to the consumer of [`FigureSpec`].

use crate::boundary::DISTRICT_KEY_PROPERTY;
use crate::fuzzy_matcher::FuzzyMatcher;
use crate::identity::IdentityIndex;
use crate::loader::CrimeTable;
use crate::reconcile::{Reconciler, Reconciliation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

pub fn layer_title(category: &str, year: i32) -> String {
    format!("Danger Zones by {} in {}", category, year)
}

/// Data for one choropleth trace, keyed by canonical district id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoroplethLayer {
    pub category: String,
    pub year: i32,
    pub title: String,
    pub colorbar_title: String,
    pub locations: Vec<String>,
    pub z: Vec<u64>,
    pub hovertext: Vec<String>,
    pub unmatched: Vec<String>,
}

impl ChoroplethLayer {
    pub fn from_reconciliation(result: &Reconciliation) -> Self {
        let locations = result.locations();
        let z = result.values.values().copied().collect();
        Self {
            category: result.category.clone(),
            year: result.year,
            title: layer_title(&result.category, result.year),
            colorbar_title: result.category.clone(),
            hovertext: locations.clone(),
            locations,
            z,
            unmatched: result.unmatched.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuButton {
    pub label: String,
    /// Key into [`FigureSpec::layers`]
    pub layer: String,
}

/// Dropdown for one axis of the selection. Buttons point at layers that
/// keep the other axis at its initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub name: String,
    pub buttons: Vec<MenuButton>,
}

/// Everything a renderer needs: all layers plus the menus that select them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureSpec {
    pub generated_at: DateTime<Utc>,
    pub feature_id_key: String,
    pub initial_layer: String,
    pub categories: Vec<String>,
    pub years: Vec<i32>,
    pub menus: Vec<Menu>,
    pub layers: BTreeMap<String, ChoroplethLayer>,
}

pub fn layer_key(category: &str, year: i32) -> String {
    format!("{}|{}", category, year)
}

/// Precomputed layers for every category and year of a crime table
#[derive(Debug, Clone)]
pub struct Atlas {
    categories: Vec<String>,
    years: Vec<i32>,
    districts: Vec<String>,
    layers: BTreeMap<(String, i32), ChoroplethLayer>,
}

impl Atlas {
    pub fn build(table: &CrimeTable, index: &IdentityIndex, matcher: FuzzyMatcher) -> Self {
        let reconciler = Reconciler::new(index, matcher);
        let mut layers = BTreeMap::new();

        for category in &table.categories {
            for &year in &table.years {
                let result = reconciler.run(&table.records, category, year);
                layers.insert(
                    (category.clone(), year),
                    ChoroplethLayer::from_reconciliation(&result),
                );
            }
        }

        info!(
            "Built {} layers ({} categories x {} years) against {} districts",
            layers.len(),
            table.categories.len(),
            table.years.len(),
            index.len()
        );

        Self {
            categories: table.categories.clone(),
            years: table.years.clone(),
            districts: index.iter().map(str::to_string).collect(),
            layers,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Canonical ids of every boundary district
    pub fn districts(&self) -> &[String] {
        &self.districts
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn layer(&self, category: &str, year: i32) -> Option<&ChoroplethLayer> {
        self.layers.get(&(category.to_string(), year))
    }

    /// Layer for a known category, empty when the year has no data
    pub fn layer_or_empty(&self, category: &str, year: i32) -> ChoroplethLayer {
        self.layer(category, year).cloned().unwrap_or_else(|| ChoroplethLayer {
            category: category.to_string(),
            year,
            title: layer_title(category, year),
            colorbar_title: category.to_string(),
            locations: Vec::new(),
            z: Vec::new(),
            hovertext: Vec::new(),
            unmatched: Vec::new(),
        })
    }

    /// Figure description starting at the given category and year.
    ///
    /// Falls back to the first category and the latest year when the
    /// requested ones are absent.
    pub fn figure(&self, initial_category: Option<&str>, initial_year: Option<i32>) -> FigureSpec {
        let category = initial_category
            .filter(|c| self.has_category(c))
            .or_else(|| self.categories.first().map(String::as_str))
            .unwrap_or_default()
            .to_string();
        let year = initial_year
            .filter(|y| self.years.contains(y))
            .or_else(|| self.years.last().copied())
            .unwrap_or_default();

        let category_menu = Menu {
            name: "category".to_string(),
            buttons: self
                .categories
                .iter()
                .map(|c| MenuButton {
                    label: c.clone(),
                    layer: layer_key(c, year),
                })
                .collect(),
        };
        let year_menu = Menu {
            name: "year".to_string(),
            buttons: self
                .years
                .iter()
                .map(|y| MenuButton {
                    label: y.to_string(),
                    layer: layer_key(&category, *y),
                })
                .collect(),
        };

        FigureSpec {
            generated_at: Utc::now(),
            feature_id_key: format!("properties.{}", DISTRICT_KEY_PROPERTY),
            initial_layer: layer_key(&category, year),
            categories: self.categories.clone(),
            years: self.years.clone(),
            menus: vec![category_menu, year_menu],
            layers: self
                .layers
                .iter()
                .map(|((c, y), layer)| (layer_key(c, *y), layer.clone()))
                .collect(),
        }
    }
}
