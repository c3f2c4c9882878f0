//! District boundary loading
//!
//! Each polygon feature carries an administrative name property
//! (`NAME_2` in the district file). That name becomes the feature's
//! canonical id, which is also written back into a `district` property so
//! map renderers can key polygons by it.

use crate::error::Result;
use crate::identity::{DistrictFeature, IdentityIndex};
use geojson::FeatureCollection;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_NAME_PROPERTY: &str = "NAME_2";
/// Property that holds the canonical id after [`BoundarySet::annotate`]
pub const DISTRICT_KEY_PROPERTY: &str = "district";

#[derive(Debug, Clone)]
pub struct BoundarySet {
    collection: FeatureCollection,
    features: Vec<DistrictFeature>,
}

impl BoundarySet {
    /// Extract district names from a parsed collection. Features without a
    /// string `name_property` are kept in the collection but get no id.
    pub fn from_collection(collection: FeatureCollection, name_property: &str) -> Self {
        let mut features = Vec::with_capacity(collection.features.len());
        for (idx, feature) in collection.features.iter().enumerate() {
            match feature.property(name_property).and_then(|v| v.as_str()) {
                Some(name) => features.push(DistrictFeature::new(name)),
                None => warn!("Boundary feature {} has no '{}' property", idx, name_property),
            }
        }
        Self {
            collection,
            features,
        }
    }

    pub fn parse(text: &str, name_property: &str) -> Result<Self> {
        let collection: FeatureCollection = text.parse()?;
        Ok(Self::from_collection(collection, name_property))
    }

    pub fn features(&self) -> &[DistrictFeature] {
        &self.features
    }

    pub fn collection(&self) -> &FeatureCollection {
        &self.collection
    }

    pub fn index(&self) -> IdentityIndex {
        IdentityIndex::from_features(&self.features)
    }

    /// Copy of the collection with every named feature's canonical id
    /// stored under [`DISTRICT_KEY_PROPERTY`].
    pub fn annotate(&self, name_property: &str) -> FeatureCollection {
        let mut collection = self.collection.clone();
        for feature in &mut collection.features {
            let canonical = feature
                .property(name_property)
                .and_then(|v| v.as_str())
                .map(|name| DistrictFeature::new(name).canonical_id);
            if let Some(canonical) = canonical {
                feature.set_property(DISTRICT_KEY_PROPERTY, canonical);
            }
        }
        collection
    }
}

/// Load and parse a GeoJSON boundary file.
pub fn load_boundaries(path: impl AsRef<Path>, name_property: &str) -> Result<BoundarySet> {
    let path = path.as_ref();
    info!("Loading district boundaries from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let boundaries = BoundarySet::parse(&text, name_property)?;
    info!(
        "Loaded {} boundary features, {} named",
        boundaries.collection.features.len(),
        boundaries.features.len()
    );
    Ok(boundaries)
}
