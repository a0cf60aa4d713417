//! Error types for practice-core.

use thiserror::Error;

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised at the edges of the engine: decoding persisted values,
/// validating content and loading settings.
///
/// The decision functions themselves (review, grading, selection) never
/// return these; corrupt input is sanitized instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid card state code {0}, expected 0-3")]
    InvalidStateCode(i64),

    #[error("invalid rating value {0}, expected 1-4")]
    InvalidRating(u8),

    #[error("invalid quality {0}, expected 0-5")]
    InvalidQuality(u8),

    #[error("exercise {slug} has no expected answer")]
    MissingExpectedAnswer { slug: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("failed to parse TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
}
