//! Upstream data port
//!
//! The orchestrator only talks to the solar backend through this trait, so
//! tests and alternative backends can supply their own implementation.

use async_trait::async_trait;
use solarmatch_core::models::{Coordinates, HeatmapScheme, RawAnalysis};

use crate::error::Result;

/// Result of an image request that reached the upstream service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageFetch {
    /// Raw encoded image bytes
    Bytes(Vec<u8>),

    /// The service has no imagery for this location (not an error)
    Unavailable { reason: String },
}

/// Port for the upstream solar analysis service
#[async_trait]
pub trait SolarDataSource: Send + Sync {
    /// Fetch the numeric analysis for a location
    async fn fetch_analysis(&self, coords: Coordinates) -> Result<RawAnalysis>;

    /// Fetch the true-colour aerial image around a location
    async fn fetch_imagery(&self, coords: Coordinates, radius_meters: f64) -> Result<ImageFetch>;

    /// Fetch the colour-mapped annual flux heatmap around a location
    async fn fetch_heatmap(
        &self,
        coords: Coordinates,
        radius_meters: f64,
        scheme: HeatmapScheme,
    ) -> Result<ImageFetch>;

    /// Human-readable name of the backend, for logs
    fn source_name(&self) -> &str;
}
