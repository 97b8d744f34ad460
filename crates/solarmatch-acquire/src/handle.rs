//! Owned image handles and the registry that mints and releases them
//!
//! An [`ImageHandle`] is neither `Clone` nor constructible outside this
//! module: the only way to obtain one is [`HandleRegistry::mint`], and the
//! only way to give it up is [`HandleRegistry::release`], which consumes it.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AcquireError, Result};
use crate::probe::ImageAsset;

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(1);

/// Identifier of a minted handle, unique across registries in the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId {
    registry: u64,
    serial: u64,
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img-{}-{}", self.registry, self.serial)
    }
}

/// Exclusively owned reference to fetched image data
#[derive(Debug)]
pub struct ImageHandle {
    id: HandleId,
    asset: ImageAsset,
}

impl ImageHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.asset.bytes
    }

    /// Natural width in pixels
    pub fn width(&self) -> u32 {
        self.asset.width
    }

    /// Natural height in pixels
    pub fn height(&self) -> u32 {
        self.asset.height
    }

    pub fn mime_type(&self) -> &'static str {
        self.asset.mime_type
    }

    /// Height over width of the natural image
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.asset.height) / f64::from(self.asset.width)
    }
}

/// Counters describing the handle lifecycle of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HandleStats {
    pub minted: u64,
    pub released: u64,
    pub live: usize,
}

/// Registry of live handles
#[derive(Debug)]
pub struct HandleRegistry {
    registry: u64,
    next_serial: u64,
    live: HashSet<HandleId>,
    released: u64,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            registry: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            next_serial: 0,
            live: HashSet::new(),
            released: 0,
        }
    }

    /// Take ownership of a probed asset and hand out a live handle for it
    pub fn mint(&mut self, asset: ImageAsset) -> ImageHandle {
        let id = HandleId {
            registry: self.registry,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.live.insert(id);
        tracing::debug!(%id, width = asset.width, height = asset.height, "Minted image handle");
        ImageHandle { id, asset }
    }

    /// Release a handle, freeing its data
    ///
    /// Fails if the handle was not minted by this registry or is no longer
    /// live; the data is dropped either way.
    pub fn release(&mut self, handle: ImageHandle) -> Result<()> {
        let id = handle.id;
        drop(handle);

        if self.live.remove(&id) {
            self.released += 1;
            tracing::debug!(%id, "Released image handle");
            Ok(())
        } else {
            tracing::warn!(%id, "Attempted to release a handle that is not live");
            Err(AcquireError::UnknownHandle { id: id.to_string() })
        }
    }

    pub fn is_live(&self, id: HandleId) -> bool {
        self.live.contains(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn stats(&self) -> HandleStats {
        HandleStats {
            minted: self.next_serial,
            released: self.released,
            live: self.live.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> ImageAsset {
        ImageAsset {
            bytes: vec![1, 2, 3],
            width: 400,
            height: 300,
            mime_type: "image/png",
        }
    }

    #[test]
    fn test_mint_and_release() {
        let mut registry = HandleRegistry::new();
        let handle = registry.mint(asset());
        let id = handle.id();

        assert!(registry.is_live(id));
        assert_eq!(handle.aspect_ratio(), 0.75);
        registry.release(handle).unwrap();

        assert!(!registry.is_live(id));
        assert_eq!(
            registry.stats(),
            HandleStats {
                minted: 1,
                released: 1,
                live: 0
            }
        );
    }

    #[test]
    fn test_release_foreign_handle_fails() {
        let mut ours = HandleRegistry::new();
        let mut theirs = HandleRegistry::new();
        let own = ours.mint(asset());
        let foreign = theirs.mint(asset());
        let foreign_id = foreign.id();

        assert!(ours.release(foreign).is_err());
        assert!(ours.is_live(own.id()));
        assert_eq!(ours.stats().released, 0);
        // The foreign registry still counts it as live: it was never released there
        assert!(theirs.is_live(foreign_id));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut registry = HandleRegistry::new();
        let a = registry.mint(asset());
        let b = registry.mint(asset());
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.live_count(), 2);
    }
}
