// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Turning detail selectors into concrete tiers, and tiers into payloads.
//!
//! [`TierResolver`] is the policy half: zoom breakpoints, the quality
//! ceiling and device capability caps pick a tier, snapped onto whatever
//! the asset's source actually provides. [`TierLoadExecutor`] is the
//! mechanism half the queue dispatches onto: derive from a cached higher
//! tier when possible, otherwise fetch and decode.

use crate::derive::derive_payload;
use crate::loader::LazyAssetLoader;
use crate::queue::{CompletedLoad, LoadExecutor, LoadTicket, LoadingQueue, Priority};
use async_trait::async_trait;
use orrery_cache::{AssetCache, CacheKey};
use orrery_core::asset::{AssetCategory, AssetDescriptor, AssetId, PayloadHandle, Tier};
use orrery_core::catalog::AssetCatalog;
use orrery_core::error::LoadError;
use orrery_core::platform::DeviceCapabilities;
use orrery_core::quality::{DetailSelector, SharedQuality};
use std::sync::Arc;

/// Maps a zoom factor onto the ideal tier through ascending breakpoints.
///
/// A zoom at or below a breakpoint takes the lower tier, so boundary
/// values conserve memory.
fn zoom_to_tier(zoom: f32, breakpoints: &[f32; 3]) -> Tier {
    if zoom <= breakpoints[0] {
        Tier::Low
    } else if zoom <= breakpoints[1] {
        Tier::Medium
    } else if zoom <= breakpoints[2] {
        Tier::High
    } else {
        Tier::Ultra
    }
}

/// Resolves detail selectors to tiers and admits the loads to produce them.
///
/// One resolver per pipeline; it owns no payload state of its own, only
/// policy inputs and handles to the cache and queue.
pub struct TierResolver {
    cache: Arc<AssetCache>,
    queue: Arc<LoadingQueue>,
    quality: Arc<SharedQuality>,
    breakpoints: [f32; 3],
    ultra_disabled: bool,
    max_texture_edge: Option<u32>,
}

impl TierResolver {
    /// Creates a resolver applying the given device capabilities.
    pub fn new(
        cache: Arc<AssetCache>,
        queue: Arc<LoadingQueue>,
        quality: Arc<SharedQuality>,
        capabilities: DeviceCapabilities,
        breakpoints: [f32; 3],
    ) -> Self {
        Self {
            cache,
            queue,
            quality,
            breakpoints,
            ultra_disabled: capabilities.device_tier.ultra_disabled(),
            max_texture_edge: capabilities.max_texture_edge,
        }
    }

    /// Resolves a selector to the tier actually worth loading.
    ///
    /// Zoom selectors map through the breakpoints and respect the current
    /// quality ceiling; explicit selectors bypass the quality level but
    /// never the device's hard limits. The result is always one of the
    /// asset's available tiers.
    pub fn resolve(&self, descriptor: &AssetDescriptor, selector: DetailSelector) -> Tier {
        let ideal = match selector {
            DetailSelector::Zoom(zoom) => {
                let by_zoom = zoom_to_tier(zoom, &self.breakpoints);
                let ceiling = self.quality.load().tier_ceiling(self.ultra_disabled);
                by_zoom.min(ceiling)
            }
            DetailSelector::Quality(level) => level.tier_ceiling(self.ultra_disabled),
            DetailSelector::Exact(tier) => {
                if self.ultra_disabled && tier == Tier::Ultra {
                    Tier::High
                } else {
                    tier
                }
            }
        };

        let capped = if descriptor.category == AssetCategory::Texture {
            self.cap_by_texture_edge(ideal)
        } else {
            ideal
        };
        descriptor.snap_tier(capped)
    }

    /// Admits the load of one (asset, tier) and returns its ticket.
    pub fn ensure(
        &self,
        descriptor: &AssetDescriptor,
        tier: Tier,
        priority: Priority,
    ) -> LoadTicket {
        let key = CacheKey::new(descriptor.id, tier);
        self.queue.request(key, descriptor.category, priority)
    }

    /// The resident tier closest to `target`, for serving while the real
    /// tier loads.
    pub fn substitute(&self, id: AssetId, target: Tier) -> Option<(Tier, PayloadHandle)> {
        self.cache.nearest_cached(id, target)
    }

    /// Whether Ultra tiers are off for this device.
    pub fn ultra_disabled(&self) -> bool {
        self.ultra_disabled
    }

    fn cap_by_texture_edge(&self, mut tier: Tier) -> Tier {
        let Some(max_edge) = self.max_texture_edge else {
            return tier;
        };
        while tier.texture_edge() > max_edge {
            match tier.lower() {
                Some(lower) => tier = lower,
                None => break,
            }
        }
        tier
    }
}

/// The production executor behind the loading queue.
///
/// Prefers deriving from a cached higher tier of the same asset; falls
/// back to a full fetch-and-decode through the loader.
pub struct TierLoadExecutor {
    catalog: Arc<AssetCatalog>,
    cache: Arc<AssetCache>,
    loader: LazyAssetLoader,
}

impl TierLoadExecutor {
    /// Creates the executor over the shared catalog, cache and loader.
    pub fn new(
        catalog: Arc<AssetCatalog>,
        cache: Arc<AssetCache>,
        loader: LazyAssetLoader,
    ) -> Self {
        Self {
            catalog,
            cache,
            loader,
        }
    }
}

#[async_trait]
impl LoadExecutor for TierLoadExecutor {
    async fn execute(&self, key: CacheKey) -> Result<CompletedLoad, LoadError> {
        let descriptor = self
            .catalog
            .get(&key.id)
            .ok_or(LoadError::UnknownAsset { id: key.id })?;

        if let Some((source_tier, handle)) = self.cache.nearest_higher(key.id, key.tier) {
            if let Some(payload) = derive_payload(&handle, source_tier, key.tier) {
                log::debug!("Derived {key} from cached {source_tier} tier");
                return Ok(CompletedLoad {
                    payload: PayloadHandle::new(payload),
                    derived: true,
                });
            }
        }

        let payload = self.loader.load(descriptor, key.tier).await?;
        Ok(CompletedLoad {
            payload: PayloadHandle::new(payload),
            derived: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodeRegistry;
    use crate::placeholder::PlaceholderSet;
    use async_trait::async_trait;
    use orrery_core::asset::{AssetPayload, SourceLocation, TexturePayload};
    use orrery_core::config::RetryConfig;
    use orrery_core::error::FetchError;
    use orrery_core::io::ByteSource;
    use orrery_core::platform::DeviceTier;
    use orrery_core::quality::QualityLevel;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    const BREAKPOINTS: [f32; 3] = [0.75, 1.5, 3.0];

    fn texture_descriptor(tiers: Vec<Tier>) -> AssetDescriptor {
        AssetDescriptor::new(
            AssetId::from_name("planets/saturn/rings"),
            AssetCategory::Texture,
            SourceLocation::Bundle(PathBuf::from("planets/saturn/rings.png")),
            tiers,
        )
    }

    fn mesh_descriptor() -> AssetDescriptor {
        AssetDescriptor::new(
            AssetId::from_name("planets/saturn/body"),
            AssetCategory::Mesh,
            SourceLocation::Bundle(PathBuf::from("planets/saturn/body.obj")),
            Vec::new(),
        )
    }

    fn resolver(capabilities: DeviceCapabilities, level: QualityLevel) -> TierResolver {
        let cache = Arc::new(AssetCache::new(1_000_000));
        let (tx, _rx) = flume::unbounded();
        let queue = LoadingQueue::new(
            Arc::new(NeverExecutor),
            Arc::clone(&cache),
            PlaceholderSet::new(),
            tx,
            4,
            tokio::runtime::Handle::current(),
        );
        TierResolver::new(
            cache,
            queue,
            Arc::new(SharedQuality::new(level)),
            capabilities,
            BREAKPOINTS,
        )
    }

    struct NeverExecutor;

    #[async_trait]
    impl LoadExecutor for NeverExecutor {
        async fn execute(&self, key: CacheKey) -> Result<CompletedLoad, LoadError> {
            panic!("no load should be dispatched for {key}");
        }
    }

    /// Serves one fixed PNG and counts fetches.
    struct CountingSource {
        calls: AtomicU32,
    }

    impl CountingSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ByteSource for CountingSource {
        async fn fetch_bytes(&self, _location: &SourceLocation) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([5, 5, 5, 255]));
            let mut buffer = Cursor::new(Vec::new());
            img.write_to(&mut buffer, image::ImageFormat::Png)
                .expect("png encode");
            Ok(buffer.into_inner())
        }
    }

    #[tokio::test]
    async fn zoom_maps_through_breakpoints_with_ties_down() {
        let resolver = resolver(DeviceCapabilities::default(), QualityLevel::High);
        let desc = texture_descriptor(Vec::new());

        let cases = [
            (0.5, Tier::Low),
            (0.75, Tier::Low),
            (1.0, Tier::Medium),
            (1.5, Tier::Medium),
            (2.0, Tier::High),
            (3.0, Tier::High),
            (4.0, Tier::Ultra),
        ];
        for (zoom, expected) in cases {
            assert_eq!(
                resolver.resolve(&desc, DetailSelector::Zoom(zoom)),
                expected,
                "zoom {zoom}"
            );
        }
    }

    #[tokio::test]
    async fn the_quality_ceiling_caps_zoomed_requests() {
        let resolver = resolver(DeviceCapabilities::default(), QualityLevel::Low);
        let desc = texture_descriptor(Vec::new());
        assert_eq!(
            resolver.resolve(&desc, DetailSelector::Zoom(10.0)),
            Tier::Medium
        );
    }

    #[tokio::test]
    async fn exact_selectors_bypass_the_quality_level() {
        let resolver = resolver(DeviceCapabilities::default(), QualityLevel::Low);
        let desc = texture_descriptor(Vec::new());
        assert_eq!(
            resolver.resolve(&desc, DetailSelector::Exact(Tier::Ultra)),
            Tier::Ultra
        );
    }

    #[tokio::test]
    async fn unaccelerated_devices_never_resolve_ultra() {
        let capabilities = DeviceCapabilities {
            device_tier: DeviceTier::NoAccel,
            max_texture_edge: None,
        };
        let resolver = resolver(capabilities, QualityLevel::High);
        let desc = texture_descriptor(Vec::new());
        assert_eq!(
            resolver.resolve(&desc, DetailSelector::Exact(Tier::Ultra)),
            Tier::High
        );
        assert!(resolver.ultra_disabled());
    }

    #[tokio::test]
    async fn the_texture_edge_limit_caps_texture_tiers_only() {
        let capabilities = DeviceCapabilities {
            device_tier: DeviceTier::Capable,
            max_texture_edge: Some(512),
        };
        let resolver = resolver(capabilities, QualityLevel::High);

        let texture = texture_descriptor(Vec::new());
        assert_eq!(
            resolver.resolve(&texture, DetailSelector::Zoom(10.0)),
            Tier::Medium
        );

        let mesh = mesh_descriptor();
        assert_eq!(
            resolver.resolve(&mesh, DetailSelector::Zoom(10.0)),
            Tier::Ultra
        );
    }

    #[tokio::test]
    async fn resolution_snaps_to_the_available_tiers() {
        let resolver = resolver(DeviceCapabilities::default(), QualityLevel::High);
        let desc = texture_descriptor(vec![Tier::Low, Tier::Ultra]);
        // Zoom 2.0 wants High; Ultra is the nearer available neighbor.
        assert_eq!(
            resolver.resolve(&desc, DetailSelector::Zoom(2.0)),
            Tier::Ultra
        );
    }

    #[tokio::test]
    async fn the_executor_derives_from_a_cached_higher_tier() {
        let desc = texture_descriptor(Vec::new());
        let catalog = Arc::new(AssetCatalog::from_descriptors(vec![desc.clone()]));
        let cache = Arc::new(AssetCache::new(1_000_000));
        let source = CountingSource::new();
        let executor = TierLoadExecutor::new(
            Arc::clone(&catalog),
            Arc::clone(&cache),
            LazyAssetLoader::new(
                source.clone(),
                DecodeRegistry::with_defaults(),
                RetryConfig::default(),
            ),
        );

        cache.put(
            CacheKey::new(desc.id, Tier::Ultra),
            PayloadHandle::new(AssetPayload::Texture(TexturePayload {
                width: 2048,
                height: 2048,
                pixels: vec![0u8; 2048 * 2048 * 4],
            })),
            2048 * 2048 * 4,
            false,
        );

        let done = executor
            .execute(CacheKey::new(desc.id, Tier::Low))
            .await
            .expect("derivation succeeds");
        assert!(done.derived);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        match &*done.payload {
            AssetPayload::Texture(tex) => assert_eq!(tex.width, 256),
            AssetPayload::Mesh(_) => panic!("expected a texture"),
        }
    }

    #[tokio::test]
    async fn the_executor_fetches_when_nothing_is_derivable() {
        let desc = texture_descriptor(Vec::new());
        let catalog = Arc::new(AssetCatalog::from_descriptors(vec![desc.clone()]));
        let cache = Arc::new(AssetCache::new(1_000_000));
        let source = CountingSource::new();
        let executor = TierLoadExecutor::new(
            catalog,
            cache,
            LazyAssetLoader::new(
                source.clone(),
                DecodeRegistry::with_defaults(),
                RetryConfig::default(),
            ),
        );

        let done = executor
            .execute(CacheKey::new(desc.id, Tier::Low))
            .await
            .expect("fetch succeeds");
        assert!(!done.derived);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_ids_fail_without_touching_the_source() {
        let catalog = Arc::new(AssetCatalog::from_descriptors(Vec::new()));
        let cache = Arc::new(AssetCache::new(1_000));
        let source = CountingSource::new();
        let executor = TierLoadExecutor::new(
            catalog,
            cache,
            LazyAssetLoader::new(
                source.clone(),
                DecodeRegistry::with_defaults(),
                RetryConfig::default(),
            ),
        );

        let err = executor
            .execute(CacheKey::new(AssetId::from_name("ghost"), Tier::Low))
            .await
            .expect_err("id is not in the catalog");
        assert!(matches!(err, LoadError::UnknownAsset { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
