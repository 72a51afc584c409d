//! Engine configuration.

/// Configuration for the review-cycle engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Lowest accepted rating value, inclusive (default: 1).
    pub min_rating: i64,
    /// Highest accepted rating value, inclusive (default: 5).
    pub max_rating: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_rating: 1,
            max_rating: 5,
        }
    }
}
