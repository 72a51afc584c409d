//! Peerloop Engine — the review-cycle engine.
//!
//! This crate implements the three pieces with nontrivial invariants:
//! review-graph generation (combinatorial), submission validation
//! (temporal gating + schema checks), and analytics aggregation
//! (numeric projections over completed reviews). Services are generic
//! over the `peerloop-core` repository traits so the engine has no
//! dependency on the database crate.

pub mod analytics;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pairing;
pub mod submission;

pub use analytics::AnalyticsService;
pub use config::EngineConfig;
pub use error::EngineError;
pub use lifecycle::AssignmentService;
pub use submission::{SubmissionService, SubmitReview};
