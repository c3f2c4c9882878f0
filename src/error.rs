use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::prelude::PolarsError> for AtlasError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        AtlasError::Polars(err.to_string())
    }
}

impl From<geojson::Error> for AtlasError {
    fn from(err: geojson::Error) -> Self {
        AtlasError::GeoJson(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
