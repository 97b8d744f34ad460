//! Error types for SolarMatch

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolarError {
    // Input errors
    #[error("Invalid coordinates ({latitude}, {longitude}): {reason}")]
    InvalidCoordinates {
        latitude: f64,
        longitude: f64,
        reason: String,
    },

    // Pricing errors
    #[error("Invalid pricing table {table}: {reason}")]
    InvalidPricing { table: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SolarError>;
