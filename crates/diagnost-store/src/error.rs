use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("recommendation source not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("{0}")]
    Other(String),
}
