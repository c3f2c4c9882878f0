//! HTTP server for the crime map viewer
//!
//! Loads both datasets once, precomputes every layer, then serves them.

use anyhow::{Context, Result};
use crime_atlas::boundary::load_boundaries;
use crime_atlas::choropleth::Atlas;
use crime_atlas::config::AtlasConfig;
use crime_atlas::loader::load_crime_table;
use crime_atlas::logging;
use crime_atlas::predict::{LinearModel, Predictor};
use crime_atlas::server::{serve, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let config = AtlasConfig::load()?;

    info!("Starting crime atlas server...");
    info!(
        "Matching with {} at threshold {:.2}",
        config.metric, config.threshold
    );

    let catalog = config.catalog();
    let table = load_crime_table(&config.crimes_path, &catalog)
        .with_context(|| format!("loading {}", config.crimes_path.display()))?;
    let boundaries = load_boundaries(&config.boundaries_path, &config.name_property)
        .with_context(|| format!("loading {}", config.boundaries_path.display()))?;
    let atlas = Atlas::build(&table, &boundaries.index(), config.matcher());

    let model: Option<Box<dyn Predictor>> = match &config.model_path {
        Some(path) => Some(Box::new(
            LinearModel::load(path).with_context(|| format!("loading {}", path.display()))?,
        )),
        None => {
            warn!("No model configured - /api/predict will return 503");
            None
        }
    };

    let state = Arc::new(AppState {
        atlas,
        catalog,
        model,
        initial_category: config.initial_category.clone(),
        initial_year: Some(config.initial_year),
    });

    let listener = TcpListener::bind(config.bind_addr).await?;
    serve(listener, state).await?;
    Ok(())
}
