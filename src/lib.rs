pub mod boundary;
pub mod categories;
pub mod choropleth;
pub mod config;
pub mod error;
pub mod fuzzy_matcher;
pub mod identity;
pub mod loader;
pub mod logging;
pub mod predict;
pub mod reconcile;
pub mod records;
pub mod server;
pub mod similarity;

pub use error::{AtlasError, Result};
pub use identity::{canonicalize, DistrictFeature, IdentityIndex};
pub use reconcile::{aggregate, reconcile, Reconciler, Reconciliation};
pub use records::{AggregateRow, CrimeRecord};
