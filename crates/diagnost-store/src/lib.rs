//! Recommendation lookup: diagnosis label → free-text recommendation.

mod error;
pub use error::StoreError;

mod recommendations;
pub use recommendations::{MemoryRecommendations, RecommendationStore};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckRecommendations;
