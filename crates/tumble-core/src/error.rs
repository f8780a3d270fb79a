//! Errors for the fallible, data-driven parts of the crate.

#[derive(Debug, thiserror::Error)]
pub enum TumbleError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shape for {part} has a polygon with {count} vertices, need at least 3")]
    DegeneratePolygon { part: String, count: usize },

    #[error("Shape for {part} has a pin with non-positive radius {radius}")]
    InvalidPinRadius { part: String, radius: f32 },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, TumbleError>;
