//! Errors raised while building or querying a scene.

use spekt_math::InterpolationError;
use thiserror::Error;

/// Errors that can occur while constructing scene data or looking up
/// material properties.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Invalid mesh '{name}': {reason}")]
    InvalidMesh { name: String, reason: String },

    #[error("Unresolved reference to {kind} {index}")]
    UnresolvedReference { kind: &'static str, index: usize },

    #[error("Unresolved reference to {kind} '{name}'")]
    UnresolvedName { kind: &'static str, name: String },

    #[error("Attaching node {child} to node {parent} would create a cycle")]
    CyclicNode { parent: usize, child: usize },

    #[error("Node {child} already has parent {parent}")]
    MultipleParents { parent: usize, child: usize },

    #[error("Invalid displacement map: {0}")]
    InvalidDisplacement(String),

    #[error("Invalid IOR data: {0}")]
    InvalidIor(String),

    #[error("No IOR available for wavelength {wavelength} and temperature {temperature}")]
    IorOutOfDomain { wavelength: f32, temperature: f32 },
}

/// Result type for scene operations.
pub type CoreResult<T> = Result<T, CoreError>;
