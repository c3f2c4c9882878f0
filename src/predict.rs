//! Two-feature scoring model served next to the map
//!
//! The map does not depend on it; the server only exposes it.

use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub trait Predictor: Send + Sync {
    fn predict(&self, features: [f64; 2]) -> Result<f64>;
}

/// `intercept + w0 * x0 + w1 * x1`, stored as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: [f64; 2],
    #[serde(default)]
    pub intercept: f64,
}

impl LinearModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let model: LinearModel = serde_json::from_str(&content)?;
        if !model.weights.iter().all(|w| w.is_finite()) || !model.intercept.is_finite() {
            return Err(AtlasError::Model(format!(
                "{} has non-finite coefficients",
                path.display()
            )));
        }
        info!("Loaded linear model from {}", path.display());
        Ok(model)
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: [f64; 2]) -> Result<f64> {
        if !features.iter().all(|x| x.is_finite()) {
            return Err(AtlasError::Model(format!(
                "features must be finite numbers, got {:?}",
                features
            )));
        }
        Ok(self.intercept + self.weights[0] * features[0] + self.weights[1] * features[1])
    }
}
