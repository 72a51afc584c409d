//! Error types for the Peerloop system.
//!
//! Each variant maps to one HTTP status at the (out-of-scope) routing
//! layer: Validation → 400, NotFound and NoData → 404, Authorization
//! and WindowClosed → 403, Database and Internal → 500.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerloopError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authorization denied: {reason}")]
    Authorization { reason: String },

    #[error("Submission window closed: {reason}")]
    WindowClosed { reason: String },

    #[error("No data: {message}")]
    NoData { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PeerloopResult<T> = Result<T, PeerloopError>;
