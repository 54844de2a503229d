//! Errors raised while rendering.

use spekt_core::CoreError;
use thiserror::Error;

/// Errors that can occur while tracing rays or writing results.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Sensor is not compatible with the {model} material model")]
    Incompatible { model: &'static str },

    #[error("Hit background for ray id {id}")]
    BackgroundHit { id: usize },

    #[error("Ray {id} carries a {found} payload, expected unpolarized RGB")]
    MissingPayload { id: usize, found: &'static str },

    #[error("Ray {id} hit geometry without a material")]
    MissingMaterial { id: usize },

    #[error("Ray id {id} is outside the sensor's {pixels} pixels")]
    InvalidRayId { id: usize, pixels: usize },

    #[error("Invalid environment map: {0}")]
    InvalidEnvironment(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
