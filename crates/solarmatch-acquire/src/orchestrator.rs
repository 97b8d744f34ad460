//! Concurrent acquisition orchestrator
//!
//! Runs the analysis, aerial imagery and heatmap fetches side by side on the
//! caller's task. Completions are applied one at a time as the owner drives
//! [`Orchestrator::next_completion`], so no locking is involved:
//!
//! - every slot carries a generation; a completion from an older generation
//!   is discarded before any handle is minted for it
//! - installing an image releases the handle it replaces in the same step
//! - after [`Orchestrator::release_all`] no further handle is ever installed

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use solarmatch_core::models::{Coordinates, HeatmapScheme, RawAnalysis};
use std::mem;
use std::sync::Arc;

use crate::error::Result;
use crate::handle::{HandleRegistry, HandleStats, ImageHandle};
use crate::ports::{ImageFetch, SolarDataSource};
use crate::probe::{probe_image, ImageAsset};
use crate::state::{AcquisitionState, ImagePayload, Slot, SlotStatus};

/// Per-request acquisition settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionOptions {
    pub radius_meters: f64,
    pub heatmap_scheme: HeatmapScheme,
    /// When false only the analysis is fetched and both image slots stay idle
    pub include_imagery: bool,
}

impl Default for AcquisitionOptions {
    fn default() -> Self {
        Self {
            radius_meters: 50.0,
            heatmap_scheme: HeatmapScheme::Hot,
            include_imagery: true,
        }
    }
}

/// What happened when a completion was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SlotEvent {
    /// The completion was installed into the slot
    Applied { slot: Slot, status: SlotStatus },
    /// The completion belonged to a superseded request or arrived after teardown
    Discarded { slot: Slot, generation: u64 },
}

enum Outcome {
    Analysis(Result<RawAnalysis>),
    Image(Result<ImageOutcome>),
}

enum ImageOutcome {
    Available(ImageAsset),
    Unavailable { reason: String },
}

struct Completion {
    slot: Slot,
    generation: u64,
    outcome: Outcome,
}

/// Owner of the three acquisitions and of the image handles they produce
pub struct Orchestrator {
    source: Arc<dyn SolarDataSource>,
    options: AcquisitionOptions,
    registry: HandleRegistry,
    analysis: AcquisitionState<RawAnalysis>,
    primary: AcquisitionState<ImagePayload>,
    heatmap: AcquisitionState<ImagePayload>,
    generations: [u64; 3],
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    torn_down: bool,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn SolarDataSource>, options: AcquisitionOptions) -> Self {
        Self {
            source,
            options,
            registry: HandleRegistry::new(),
            analysis: AcquisitionState::Idle,
            primary: AcquisitionState::Idle,
            heatmap: AcquisitionState::Idle,
            generations: [0; 3],
            in_flight: FuturesUnordered::new(),
            torn_down: false,
        }
    }

    pub fn options(&self) -> &AcquisitionOptions {
        &self.options
    }

    /// Start acquiring every slot for `coords`
    ///
    /// Returns immediately. Any earlier request still in flight becomes
    /// stale, and any handle currently held is released before its slot
    /// goes back to pending.
    pub fn request(&mut self, coords: Coordinates) {
        if self.torn_down {
            tracing::warn!(%coords, "Ignoring request on a torn-down orchestrator");
            return;
        }

        tracing::info!(%coords, source = self.source.source_name(), "Starting acquisition");

        let generation = self.bump(Slot::Analysis);
        self.analysis = AcquisitionState::Pending;
        let source = Arc::clone(&self.source);
        self.in_flight.push(Box::pin(async move {
            let outcome = Outcome::Analysis(source.fetch_analysis(coords).await);
            Completion {
                slot: Slot::Analysis,
                generation,
                outcome,
            }
        }));

        for slot in [Slot::Primary, Slot::Heatmap] {
            let generation = self.bump(slot);
            if !self.options.include_imagery {
                self.install_image(slot, AcquisitionState::Idle);
                continue;
            }
            self.install_image(slot, AcquisitionState::Pending);

            let source = Arc::clone(&self.source);
            let AcquisitionOptions {
                radius_meters,
                heatmap_scheme,
                ..
            } = self.options;
            self.in_flight.push(Box::pin(async move {
                let fetched = match slot {
                    Slot::Heatmap => source.fetch_heatmap(coords, radius_meters, heatmap_scheme).await,
                    _ => source.fetch_imagery(coords, radius_meters).await,
                };
                let outcome = fetched.and_then(|fetch| match fetch {
                    ImageFetch::Bytes(bytes) => probe_image(bytes).map(ImageOutcome::Available),
                    ImageFetch::Unavailable { reason } => Ok(ImageOutcome::Unavailable { reason }),
                });
                Completion {
                    slot,
                    generation,
                    outcome: Outcome::Image(outcome),
                }
            }));
        }
    }

    /// Wait for the next in-flight acquisition and apply it
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<SlotEvent> {
        let completion = self.in_flight.next().await?;
        Some(self.apply(completion))
    }

    /// Drive every in-flight acquisition to completion
    pub async fn settle(&mut self) -> Vec<SlotEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_completion().await {
            events.push(event);
        }
        events
    }

    /// Drop all in-flight fetches; pending slots return to idle
    pub fn abort_in_flight(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        tracing::debug!(count = self.in_flight.len(), "Aborting in-flight acquisitions");
        self.in_flight = FuturesUnordered::new();

        if self.analysis.is_pending() {
            self.analysis = AcquisitionState::Idle;
        }
        for slot in [Slot::Primary, Slot::Heatmap] {
            if self.image_state(slot).is_pending() {
                self.install_image(slot, AcquisitionState::Idle);
            }
        }
    }

    /// Release the handle held by `slot`, leaving the slot idle
    ///
    /// Returns true if a handle was released.
    pub fn release(&mut self, slot: Slot) -> bool {
        match slot {
            Slot::Analysis => {
                self.analysis = AcquisitionState::Idle;
                false
            }
            _ => {
                let held = self.image_state(slot).handle().is_some();
                self.install_image(slot, AcquisitionState::Idle);
                held
            }
        }
    }

    /// Tear down: release every held handle exactly once
    ///
    /// Fetches still in flight are left to resolve but will never install
    /// anything. Calling this more than once is harmless.
    pub fn release_all(&mut self) {
        if !self.torn_down {
            tracing::debug!(stats = ?self.registry.stats(), "Releasing all image handles");
        }
        self.torn_down = true;
        self.release(Slot::Primary);
        self.release(Slot::Heatmap);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn analysis(&self) -> &AcquisitionState<RawAnalysis> {
        &self.analysis
    }

    pub fn primary(&self) -> &AcquisitionState<ImagePayload> {
        &self.primary
    }

    pub fn heatmap(&self) -> &AcquisitionState<ImagePayload> {
        &self.heatmap
    }

    pub fn status(&self, slot: Slot) -> SlotStatus {
        match slot {
            Slot::Analysis => self.analysis.status(),
            _ => self.image_state(slot).status(),
        }
    }

    /// Live handle for an image slot, lent for the duration of the borrow
    pub fn handle(&self, slot: Slot) -> Option<&ImageHandle> {
        match slot {
            Slot::Analysis => None,
            _ => self.image_state(slot).handle(),
        }
    }

    pub fn handle_stats(&self) -> HandleStats {
        self.registry.stats()
    }

    fn bump(&mut self, slot: Slot) -> u64 {
        let generation = &mut self.generations[slot.index()];
        *generation += 1;
        *generation
    }

    fn image_state(&self, slot: Slot) -> &AcquisitionState<ImagePayload> {
        match slot {
            Slot::Heatmap => &self.heatmap,
            _ => &self.primary,
        }
    }

    /// Swap in a new image state and release whatever handle it replaced
    fn install_image(&mut self, slot: Slot, state: AcquisitionState<ImagePayload>) {
        let target = match slot {
            Slot::Heatmap => &mut self.heatmap,
            _ => &mut self.primary,
        };
        let previous = mem::replace(target, state);

        if let AcquisitionState::Ready(ImagePayload::Available(handle)) = previous {
            if let Err(e) = self.registry.release(handle) {
                tracing::warn!(%slot, "Replaced handle was not live: {}", e);
            }
        }
    }

    fn apply(&mut self, completion: Completion) -> SlotEvent {
        let Completion {
            slot,
            generation,
            outcome,
        } = completion;

        if self.torn_down || generation != self.generations[slot.index()] {
            tracing::debug!(
                %slot,
                generation,
                current = self.generations[slot.index()],
                torn_down = self.torn_down,
                "Discarding stale completion"
            );
            return SlotEvent::Discarded { slot, generation };
        }

        match outcome {
            Outcome::Analysis(Ok(raw)) => {
                self.analysis = AcquisitionState::Ready(raw);
            }
            Outcome::Analysis(Err(e)) => {
                tracing::warn!(%slot, "Acquisition failed: {}", e);
                self.analysis = AcquisitionState::Failed(e.to_string());
            }
            Outcome::Image(Ok(ImageOutcome::Available(asset))) => {
                let handle = self.registry.mint(asset);
                self.install_image(slot, AcquisitionState::Ready(ImagePayload::Available(handle)));
            }
            Outcome::Image(Ok(ImageOutcome::Unavailable { reason })) => {
                tracing::info!(%slot, "No imagery available: {}", reason);
                self.install_image(
                    slot,
                    AcquisitionState::Ready(ImagePayload::Unavailable { reason }),
                );
            }
            Outcome::Image(Err(e)) => {
                tracing::warn!(%slot, "Acquisition failed: {}", e);
                self.install_image(slot, AcquisitionState::Failed(e.to_string()));
            }
        }

        let status = self.status(slot);
        tracing::debug!(%slot, ?status, "Applied completion");
        SlotEvent::Applied { slot, status }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.registry.live_count() > 0 {
            tracing::warn!(
                live = self.registry.live_count(),
                "Orchestrator dropped without release_all; releasing held handles"
            );
            self.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use solarmatch_core::models::FluxStats;
    use std::io::Cursor;

    /// Answers every request immediately
    struct InstantSource {
        imagery: bool,
    }

    fn png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[async_trait]
    impl SolarDataSource for InstantSource {
        async fn fetch_analysis(&self, _coords: Coordinates) -> Result<RawAnalysis> {
            Ok(RawAnalysis {
                flux_stats: FluxStats {
                    mean: 1100.0,
                    ..Default::default()
                },
                ..Default::default()
            })
        }

        async fn fetch_imagery(&self, _coords: Coordinates, _radius: f64) -> Result<ImageFetch> {
            if self.imagery {
                Ok(ImageFetch::Bytes(png()))
            } else {
                Ok(ImageFetch::Unavailable {
                    reason: "no coverage".to_string(),
                })
            }
        }

        async fn fetch_heatmap(
            &self,
            coords: Coordinates,
            radius: f64,
            _scheme: HeatmapScheme,
        ) -> Result<ImageFetch> {
            self.fetch_imagery(coords, radius).await
        }

        fn source_name(&self) -> &str {
            "instant"
        }
    }

    fn dublin() -> Coordinates {
        Coordinates::new(53.3498, -6.2603).unwrap()
    }

    fn orchestrator(imagery: bool) -> Orchestrator {
        Orchestrator::new(
            Arc::new(InstantSource { imagery }),
            AcquisitionOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_request_then_settle() {
        let mut orch = orchestrator(true);
        orch.request(dublin());
        assert_eq!(orch.status(Slot::Analysis), SlotStatus::Pending);
        assert_eq!(orch.in_flight(), 3);

        let events = orch.settle().await;
        assert_eq!(events.len(), 3);
        for slot in Slot::ALL {
            assert_eq!(orch.status(slot), SlotStatus::Ready);
        }
        assert!(orch.handle(Slot::Primary).is_some());
        assert!(orch.handle(Slot::Heatmap).is_some());
        assert_eq!(orch.handle_stats().live, 2);

        orch.release_all();
        assert_eq!(orch.handle_stats().live, 0);
        assert_eq!(orch.handle_stats().released, 2);
    }

    #[tokio::test]
    async fn test_superseded_request_is_discarded() {
        let mut orch = orchestrator(true);
        orch.request(dublin());
        orch.request(dublin());

        let events = orch.settle().await;
        let discarded = events
            .iter()
            .filter(|e| matches!(e, SlotEvent::Discarded { generation: 1, .. }))
            .count();
        assert_eq!(discarded, 3);

        // Only the second generation ever minted anything
        let stats = orch.handle_stats();
        assert_eq!(stats.minted, 2);
        assert_eq!(stats.live, 2);
    }

    #[tokio::test]
    async fn test_rerequest_releases_previous_handles() {
        let mut orch = orchestrator(true);
        orch.request(dublin());
        orch.settle().await;
        let first = orch.handle(Slot::Primary).map(ImageHandle::id);

        orch.request(dublin());
        assert_eq!(orch.handle_stats().live, 0);
        assert_eq!(orch.status(Slot::Primary), SlotStatus::Pending);

        orch.settle().await;
        assert_ne!(orch.handle(Slot::Primary).map(ImageHandle::id), first);
        assert_eq!(orch.handle_stats().released, 2);
    }

    #[tokio::test]
    async fn test_release_all_is_idempotent_and_final() {
        let mut orch = orchestrator(true);
        orch.request(dublin());
        orch.release_all();
        orch.release_all();

        let events = orch.settle().await;
        assert!(events
            .iter()
            .all(|e| matches!(e, SlotEvent::Discarded { .. })));
        assert_eq!(orch.handle_stats().minted, 0);

        orch.request(dublin());
        assert_eq!(orch.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_is_ready_without_handle() {
        let mut orch = orchestrator(false);
        orch.request(dublin());
        orch.settle().await;

        assert_eq!(orch.status(Slot::Primary), SlotStatus::Ready);
        assert!(orch.handle(Slot::Primary).is_none());
        assert!(matches!(
            orch.primary().ready(),
            Some(ImagePayload::Unavailable { .. })
        ));
        assert_eq!(orch.handle_stats().minted, 0);
    }

    #[tokio::test]
    async fn test_imagery_not_requested_stays_idle() {
        let mut orch = Orchestrator::new(
            Arc::new(InstantSource { imagery: true }),
            AcquisitionOptions {
                include_imagery: false,
                ..Default::default()
            },
        );
        orch.request(dublin());
        assert_eq!(orch.in_flight(), 1);

        orch.settle().await;
        assert_eq!(orch.status(Slot::Analysis), SlotStatus::Ready);
        assert_eq!(orch.status(Slot::Primary), SlotStatus::Idle);
        assert_eq!(orch.status(Slot::Heatmap), SlotStatus::Idle);
    }

    #[test]
    fn test_abort_returns_pending_slots_to_idle() {
        let mut orch = orchestrator(true);
        orch.request(dublin());
        orch.abort_in_flight();

        assert_eq!(orch.in_flight(), 0);
        for slot in Slot::ALL {
            assert_eq!(orch.status(slot), SlotStatus::Idle);
        }
    }
}
