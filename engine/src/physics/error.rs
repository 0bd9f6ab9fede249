//! Error types for the physics core.
//!
//! Nothing inside a simulation step is fallible: skipped pairs are silent and
//! degradations are logged. Errors only surface from configuration loading and
//! from world calls addressed by a handle.

use thiserror::Error;

use super::types::{BodyHandle, ConstraintHandle};

/// Unified error type for the physics core.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A collision shape has a non-positive or non-finite dimension.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Reading a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration JSON could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body handle does not refer to a live body.
    #[error("Unknown body handle {0:?}")]
    UnknownBody(BodyHandle),

    /// The constraint handle does not refer to a live constraint.
    #[error("Unknown constraint handle {0:?}")]
    UnknownConstraint(ConstraintHandle),

    /// A drag operation was issued for a body that is not being dragged.
    #[error("Body {0:?} is not being dragged")]
    NotDragging(BodyHandle),
}

/// Convenience alias for `Result<T, PhysicsError>`.
pub type PhysicsResult<T> = Result<T, PhysicsError>;
