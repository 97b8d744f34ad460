//! SolarMatch Acquire - Concurrent acquisition of analysis data and imagery
//!
//! This crate defines the upstream data port, its HTTP adapter, and the
//! orchestrator that runs the three acquisitions side by side while owning
//! the image handles they produce.

pub mod error;
pub mod handle;
pub mod http;
pub mod probe;
pub mod orchestrator;
pub mod ports;
pub mod state;

pub use error::{AcquireError, Result};
pub use handle::{HandleId, HandleRegistry, HandleStats, ImageHandle};
pub use http::HttpSolarSource;
pub use probe::{probe_image, ImageAsset};
pub use orchestrator::{AcquisitionOptions, Orchestrator, SlotEvent};
pub use ports::{ImageFetch, SolarDataSource};
pub use state::{AcquisitionState, ImagePayload, Slot, SlotStatus};
