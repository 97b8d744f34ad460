//! Per-slot acquisition state

use serde::Serialize;
use std::fmt;

use crate::handle::ImageHandle;

/// One of the three independently fetched resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Analysis,
    Primary,
    Heatmap,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Analysis, Slot::Primary, Slot::Heatmap];

    pub(crate) fn index(self) -> usize {
        match self {
            Slot::Analysis => 0,
            Slot::Primary => 1,
            Slot::Heatmap => 2,
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, Slot::Analysis)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::Analysis => "analysis",
            Slot::Primary => "aerial imagery",
            Slot::Heatmap => "flux heatmap",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a single acquisition
#[derive(Debug, Default)]
pub enum AcquisitionState<T> {
    #[default]
    Idle,
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> AcquisitionState<T> {
    pub fn status(&self) -> SlotStatus {
        match self {
            AcquisitionState::Idle => SlotStatus::Idle,
            AcquisitionState::Pending => SlotStatus::Pending,
            AcquisitionState::Ready(_) => SlotStatus::Ready,
            AcquisitionState::Failed(_) => SlotStatus::Failed,
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            AcquisitionState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            AcquisitionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AcquisitionState::Pending)
    }
}

/// Payload-free view of an [`AcquisitionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Idle,
    Pending,
    Ready,
    Failed,
}

/// What a ready image slot holds
#[derive(Debug)]
pub enum ImagePayload {
    Available(ImageHandle),
    /// Upstream has no imagery for the location
    Unavailable { reason: String },
}

impl ImagePayload {
    pub fn handle(&self) -> Option<&ImageHandle> {
        match self {
            ImagePayload::Available(handle) => Some(handle),
            ImagePayload::Unavailable { .. } => None,
        }
    }
}

impl AcquisitionState<ImagePayload> {
    /// The live handle held by this slot, if any
    pub fn handle(&self) -> Option<&ImageHandle> {
        self.ready().and_then(ImagePayload::handle)
    }
}
