//! District identity index
//!
//! Canonical district identifiers are the join key between the crime table
//! and the boundary polygons. Both sides go through [`canonicalize`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Trim surrounding whitespace and lowercase.
pub fn canonicalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One polygon feature's administrative name and its derived join key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictFeature {
    pub raw_name: String,
    pub canonical_id: String,
}

impl DistrictFeature {
    pub fn new(raw_name: impl Into<String>) -> Self {
        let raw_name = raw_name.into();
        let canonical_id = canonicalize(&raw_name);
        Self {
            raw_name,
            canonical_id,
        }
    }
}

/// Read-only set of canonical district ids.
///
/// Ordered so that iteration (and therefore tie-breaking during fuzzy
/// matching) is lexicographic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityIndex {
    ids: BTreeSet<String>,
}

impl IdentityIndex {
    /// Build from raw boundary names. Names that are blank after
    /// normalization never become ids.
    pub fn from_raw_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = BTreeSet::new();
        let mut skipped = 0usize;
        for name in names {
            let id = canonicalize(name.as_ref());
            if id.is_empty() {
                skipped += 1;
                continue;
            }
            ids.insert(id);
        }
        if skipped > 0 {
            debug!("Skipped {} blank boundary names", skipped);
        }
        Self { ids }
    }

    pub fn from_features(features: &[DistrictFeature]) -> Self {
        Self::from_raw_names(features.iter().map(|f| f.raw_name.as_str()))
    }

    pub fn contains(&self, canonical_id: &str) -> bool {
        self.ids.contains(canonical_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("  Pune "), "pune");
        assert_eq!(canonicalize("North 24 Parganas"), "north 24 parganas");
        assert_eq!(canonicalize("\tBANGALORE RURAL\n"), "bangalore rural");
    }

    #[test]
    fn test_feature_derives_canonical_id() {
        let feature = DistrictFeature::new(" Mumbai Suburban");
        assert_eq!(feature.raw_name, " Mumbai Suburban");
        assert_eq!(feature.canonical_id, "mumbai suburban");
    }

    #[test]
    fn test_index_collapses_shared_ids() {
        let features = vec![
            DistrictFeature::new("Aurangabad"),
            DistrictFeature::new("aurangabad "),
            DistrictFeature::new("Pune"),
        ];
        let index = IdentityIndex::from_features(&features);
        assert_eq!(index.len(), 2);
        assert!(index.contains("aurangabad"));
        assert!(index.contains("pune"));
        assert_eq!(index.iter().collect::<Vec<_>>(), vec!["aurangabad", "pune"]);
    }

    #[test]
    fn test_empty_and_blank_input() {
        let index = IdentityIndex::from_raw_names(Vec::<String>::new());
        assert!(index.is_empty());

        let index = IdentityIndex::from_raw_names(["   ", ""]);
        assert!(index.is_empty());
    }
}
