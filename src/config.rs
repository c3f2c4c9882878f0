//! Runtime configuration
//!
//! Sources, lowest precedence first: built-in defaults, the JSON file named
//! by `CRIME_ATLAS_CONFIG`, `CRIME_ATLAS_*` environment variables (a `.env`
//! file is read first). Binaries apply their own flags on top.

use crate::boundary::DEFAULT_NAME_PROPERTY;
use crate::categories::{CategoryCatalog, DEFAULT_CATEGORIES};
use crate::error::{AtlasError, Result};
use crate::fuzzy_matcher::{FuzzyMatcher, DEFAULT_THRESHOLD};
use crate::similarity::SimilarityMetric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_PREFIX: &str = "CRIME_ATLAS_";
pub const CONFIG_PATH_VAR: &str = "CRIME_ATLAS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub threshold: f64,
    pub metric: SimilarityMetric,
    /// GeoJSON property holding the district name
    pub name_property: String,
    pub initial_year: i32,
    pub initial_category: Option<String>,
    pub categories: Vec<String>,
    pub bind_addr: SocketAddr,
    pub crimes_path: PathBuf,
    pub boundaries_path: PathBuf,
    pub model_path: Option<PathBuf>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            metric: SimilarityMetric::Sequence,
            name_property: DEFAULT_NAME_PROPERTY.to_string(),
            initial_year: 2012,
            initial_category: None,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            crimes_path: PathBuf::from("CrimesOnWomenData.csv"),
            boundaries_path: PathBuf::from("india_district.geojson"),
            model_path: None,
        }
    }
}

impl AtlasConfig {
    /// Defaults, then the optional config file, then the environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let kv: HashMap<String, String> = std::env::vars().collect();

        let base = match kv.get(CONFIG_PATH_VAR).map(|p| p.trim()) {
            Some(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        base.with_overrides(&kv)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: AtlasConfig = serde_json::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        config.validated()
    }

    /// Apply `CRIME_ATLAS_*` entries from `kv` on top of `self`.
    pub fn with_overrides(mut self, kv: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            kv.get(&format!("{}{}", ENV_PREFIX, key))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("THRESHOLD") {
            self.threshold = parse_value(v, "THRESHOLD")?;
        }
        if let Some(v) = get("METRIC") {
            self.metric = v.parse()?;
        }
        if let Some(v) = get("NAME_PROPERTY") {
            self.name_property = v.to_string();
        }
        if let Some(v) = get("INITIAL_YEAR") {
            self.initial_year = parse_value(v, "INITIAL_YEAR")?;
        }
        if let Some(v) = get("INITIAL_CATEGORY") {
            self.initial_category = Some(v.to_string());
        }
        if let Some(v) = get("CATEGORIES") {
            // category names contain commas in some datasets, so ';' separates
            self.categories = v.split(';').map(|c| c.trim().to_string()).collect();
        }
        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = parse_value(v, "BIND_ADDR")?;
        }
        if let Some(v) = get("CRIMES_PATH") {
            self.crimes_path = PathBuf::from(v);
        }
        if let Some(v) = get("BOUNDARIES_PATH") {
            self.boundaries_path = PathBuf::from(v);
        }
        if let Some(v) = get("MODEL_PATH") {
            self.model_path = Some(PathBuf::from(v));
        }

        self.validated()
    }

    pub fn validated(self) -> Result<Self> {
        validate_threshold(self.threshold)?;
        if self.name_property.trim().is_empty() {
            return Err(AtlasError::Config("name_property must not be empty".to_string()));
        }
        Ok(self)
    }

    pub fn matcher(&self) -> FuzzyMatcher {
        FuzzyMatcher::new(self.threshold).with_metric(self.metric)
    }

    pub fn catalog(&self) -> CategoryCatalog {
        CategoryCatalog::new(self.categories.iter().cloned())
    }
}

pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(AtlasError::Config(format!(
            "threshold must be within [0, 1], got {}",
            threshold
        )))
    }
}

fn parse_value<T>(raw: &str, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| {
        AtlasError::Config(format!("{}{}='{}' is invalid: {}", ENV_PREFIX, key, raw, e))
    })
}
