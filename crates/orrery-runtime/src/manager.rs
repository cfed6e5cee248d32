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

//! The [`AssetManager`] facade and its builder.
//!
//! The manager composes the catalog, cache, loading queue, tier resolver
//! and quality controller into one object with a synchronous, never-blocking
//! request path. The renderer calls [`AssetManager::request`] every time it
//! needs an asset and always gets something usable back immediately: a
//! resident payload, a nearby resident tier, a ticket for the pending load,
//! the category placeholder, or a failure tag.

use anyhow::{bail, Context, Result};
use orrery_cache::{AssetCache, CacheKey, PinGuard};
use orrery_control::QualityController;
use orrery_core::asset::{AssetCategory, AssetDescriptor, AssetId, PayloadHandle, Tier};
use orrery_core::catalog::AssetCatalog;
use orrery_core::config::PipelineConfig;
use orrery_core::error::LoadFailureKind;
use orrery_core::event::{EventBus, PipelineEvent};
use orrery_core::io::ByteSource;
use orrery_core::platform::{CapabilityProbe, FixedCapabilityProbe};
use orrery_core::quality::{
    DetailSelector, QualityLevel, QualityTransition, SharedQuality, TransitionCause,
};
use orrery_core::telemetry::{FrameSample, PipelineReport};
use orrery_pipeline::decode::{DecodeLane, DecodeRegistry};
use orrery_pipeline::{
    BundleByteSource, LazyAssetLoader, LoadTicket, LoadingQueue, PlaceholderRef, PlaceholderSet,
    Priority, TierLoadExecutor, TierResolver,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// What one [`AssetManager::request`] call resolved to.
///
/// Every variant is immediately usable by the renderer. The call itself
/// never blocks and never returns "try again later" without a handle to
/// wait on.
#[derive(Debug)]
pub enum AssetStatus {
    /// A real payload is resident; draw it.
    ///
    /// `tier` names what is actually being served, which is a nearby
    /// resident tier whenever the resolved one is still loading.
    Success {
        /// Handle to the cached payload.
        payload: PayloadHandle,
        /// The tier of that payload.
        tier: Tier,
    },
    /// The load was admitted and is on its way; poll or await the ticket.
    Pending(LoadTicket),
    /// The load previously failed for good; draw the category placeholder.
    FallbackServed {
        /// The stand-in payload for the asset's category.
        placeholder: PlaceholderRef,
        /// Why the real load could not complete.
        kind: LoadFailureKind,
    },
    /// Nothing can be served and nothing is loading.
    ///
    /// Today this only means the id is not in the catalog.
    Failed(LoadFailureKind),
}

impl AssetStatus {
    /// Whether a real payload is being served.
    pub fn is_success(&self) -> bool {
        matches!(self, AssetStatus::Success { .. })
    }

    /// The served payload, when there is one.
    pub fn payload(&self) -> Option<&PayloadHandle> {
        match self {
            AssetStatus::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Wires the pipeline's collaborators into an [`AssetManager`].
///
/// Everything except the byte source has a stock default: the bundled
/// decode lanes, a probe reporting a fully capable device, the default
/// configuration and an empty catalog.
pub struct AssetManagerBuilder {
    config: PipelineConfig,
    catalog: AssetCatalog,
    source: Option<Arc<dyn ByteSource>>,
    registry: DecodeRegistry,
    probe: Box<dyn CapabilityProbe>,
}

impl AssetManagerBuilder {
    /// Starts a builder with stock defaults and no byte source.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            catalog: AssetCatalog::default(),
            source: None,
            registry: DecodeRegistry::with_defaults(),
            probe: Box::new(FixedCapabilityProbe::default()),
        }
    }

    /// Replaces the configuration. It is normalized during `build`.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers the asset catalog.
    pub fn with_catalog(mut self, catalog: AssetCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Supplies the byte source all fetches go through.
    pub fn with_source(mut self, source: Arc<dyn ByteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Shorthand for a [`BundleByteSource`] rooted at a local directory.
    pub fn with_bundle_root(self, root: impl Into<PathBuf>) -> Self {
        self.with_source(Arc::new(BundleByteSource::new(root)))
    }

    /// Registers or replaces the decode lane for a category.
    pub fn with_decode_lane(mut self, category: AssetCategory, lane: Arc<dyn DecodeLane>) -> Self {
        self.registry.register(category, lane);
        self
    }

    /// Replaces the capability probe consulted once during `build`.
    pub fn with_probe(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Builds the manager, probing the device and starting the task pool.
    ///
    /// The starting quality level is the weaker of the configured
    /// `adaptation.initial_level` and what the probe reports for the
    /// device. When called inside a tokio runtime the manager dispatches
    /// onto it; otherwise it starts and owns a small runtime of its own.
    ///
    /// # Errors
    /// Fails when no byte source was supplied or the owned runtime cannot
    /// start.
    pub fn build(self) -> Result<AssetManager> {
        let Some(source) = self.source else {
            bail!("an asset byte source is required; supply one with with_source or with_bundle_root");
        };
        let config = self.config.normalized();
        let capabilities = self.probe.probe();
        let level = config
            .adaptation
            .initial_level
            .min(capabilities.device_tier.initial_quality());
        log::info!(
            "Asset pipeline starting at quality {level} on a {:?} device",
            capabilities.device_tier
        );

        let (handle, runtime) = match tokio::runtime::Handle::try_current() {
            Ok(handle) => (handle, None),
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .thread_name("orrery-load")
                    .enable_time()
                    .build()
                    .context("failed to start the asset loading runtime")?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        let catalog = Arc::new(self.catalog);
        let cache = Arc::new(AssetCache::new(config.memory_budget_bytes));
        let quality = Arc::new(SharedQuality::new(level));
        let events = EventBus::new();
        let loader = LazyAssetLoader::new(source, self.registry, config.retry);
        let executor = Arc::new(TierLoadExecutor::new(
            catalog.clone(),
            cache.clone(),
            loader,
        ));
        let queue = LoadingQueue::new(
            executor,
            cache.clone(),
            PlaceholderSet::new(),
            events.sender(),
            config.max_in_flight,
            handle,
        );
        let resolver = TierResolver::new(
            cache.clone(),
            queue.clone(),
            quality.clone(),
            capabilities,
            config.zoom_breakpoints,
        );
        let controller = QualityController::new(config.adaptation, quality.clone());

        log::info!(
            "Asset pipeline ready: {} cataloged assets, {} byte budget",
            catalog.len(),
            cache.budget_bytes()
        );
        Ok(AssetManager {
            catalog,
            cache,
            queue,
            resolver,
            controller: Mutex::new(controller),
            quality,
            events,
            governance_noted: Mutex::new(HashSet::new()),
            _runtime: runtime,
        })
    }
}

impl Default for AssetManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The one object an embedding client holds to drive the asset pipeline.
///
/// All methods take `&self`; the manager is `Send + Sync` and can be shared
/// behind an `Arc` between the render thread and UI threads.
pub struct AssetManager {
    catalog: Arc<AssetCatalog>,
    cache: Arc<AssetCache>,
    queue: Arc<LoadingQueue>,
    resolver: TierResolver,
    controller: Mutex<QualityController>,
    quality: Arc<SharedQuality>,
    events: EventBus<PipelineEvent>,
    governance_noted: Mutex<HashSet<AssetId>>,
    _runtime: Option<tokio::runtime::Runtime>,
}

impl AssetManager {
    /// Resolves one asset request. Never blocks.
    ///
    /// The resolution order is: resident payload for the resolved tier,
    /// then memoized failure, then admission of the load. While the load
    /// runs, the nearest resident tier of the same asset is served when one
    /// exists; otherwise the caller gets the ticket.
    pub fn request(
        &self,
        id: AssetId,
        selector: DetailSelector,
        priority: Priority,
    ) -> AssetStatus {
        let Some(descriptor) = self.catalog.get(&id) else {
            log::debug!("Request for unknown asset {id}");
            return AssetStatus::Failed(LoadFailureKind::UnknownAsset);
        };
        self.note_ungoverned(descriptor);

        let tier = self.resolver.resolve(descriptor, selector);
        let key = CacheKey::new(id, tier);
        if let Some(payload) = self.cache.get(&key) {
            return AssetStatus::Success { payload, tier };
        }
        if let Some(kind) = self.queue.failure_for(&key) {
            return AssetStatus::FallbackServed {
                placeholder: self.queue.placeholder_for(descriptor.category),
                kind,
            };
        }

        let ticket = self.resolver.ensure(descriptor, tier, priority);
        if let Some((resident_tier, payload)) = self.resolver.substitute(id, tier) {
            log::debug!("Serving {id} at {resident_tier} while {tier} loads");
            drop(ticket);
            return AssetStatus::Success {
                payload,
                tier: resident_tier,
            };
        }
        AssetStatus::Pending(ticket)
    }

    /// Warms the cache for a set of assets at the current quality level.
    ///
    /// Loads are admitted at `Prefetch` priority and not awaited; unknown
    /// ids are skipped.
    pub fn preload(&self, ids: &[AssetId]) {
        let level = self.quality.load();
        for id in ids {
            let Some(descriptor) = self.catalog.get(id) else {
                log::debug!("Preload skipping unknown asset {id}");
                continue;
            };
            let tier = self
                .resolver
                .resolve(descriptor, DetailSelector::Quality(level));
            let key = CacheKey::new(*id, tier);
            if !self.cache.contains(&key) && self.queue.failure_for(&key).is_none() {
                drop(self.resolver.ensure(descriptor, tier, Priority::Prefetch));
            }
        }
    }

    /// Warms the cache for every asset carrying a tag, the chapter warm-up
    /// path.
    pub fn preload_tag(&self, tag: &str) {
        let ids = self.catalog.tagged(tag);
        log::info!("Preloading {} assets tagged '{tag}'", ids.len());
        self.preload(&ids);
    }

    /// Pins a resident entry against eviction for the guard's lifetime.
    ///
    /// Returns `None` when the (asset, tier) is not resident. The pinned
    /// set doubles as the "currently displayed" set that quality changes
    /// re-fetch.
    pub fn pin(&self, id: AssetId, tier: Tier) -> Option<PinGuard> {
        PinGuard::acquire(&self.cache, CacheKey::new(id, tier))
    }

    /// Feeds one frame-time sample into quality adaptation.
    ///
    /// When the sample completes a qualifying run the quality level shifts,
    /// a [`PipelineEvent::QualityChanged`] is published, and every pinned
    /// asset whose target tier changed gets a re-fetch admitted.
    pub fn ingest_frame_sample(&self, sample: FrameSample) {
        let transition = self.controller.lock().unwrap().ingest(sample);
        if let Some(transition) = transition {
            self.apply_transition(transition);
        }
    }

    /// Pins the quality level manually, or releases the pin with `None`.
    ///
    /// While overridden, frame samples are recorded but never shift the
    /// level.
    pub fn set_quality_override(&self, level: Option<QualityLevel>) {
        let transition = self.controller.lock().unwrap().set_override(level);
        if let Some(transition) = transition {
            self.apply_transition(transition);
        }
    }

    /// The current process-wide quality level.
    pub fn quality_level(&self) -> QualityLevel {
        self.quality.load()
    }

    /// A combined diagnostics snapshot of cache, queue and quality state.
    pub fn status(&self) -> PipelineReport {
        PipelineReport {
            cache: self.cache.status(),
            queue: self.queue.report(),
            quality_level: self.quality.load(),
        }
    }

    /// The warning side channel.
    ///
    /// Carries [`PipelineEvent`] notices (fallbacks, budget overruns,
    /// quality changes) for a UI layer to display. One consumer should
    /// drain it; the channel is unbounded and never blocks the pipeline.
    pub fn events(&self) -> flume::Receiver<PipelineEvent> {
        self.events.receiver().clone()
    }

    /// The registered catalog.
    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Flushes unpinned cache entries and forgets memoized failures.
    ///
    /// The reset path for content updates: previously fatal loads get a
    /// fresh attempt afterwards.
    pub fn clear(&self) {
        self.cache.clear();
        self.queue.clear_failures();
    }

    fn apply_transition(&self, transition: QualityTransition) {
        self.events.publish(PipelineEvent::QualityChanged {
            from: transition.from,
            to: transition.to,
            cause: transition.cause,
        });
        if transition.cause == TransitionCause::Degraded {
            log::info!(
                "Degrading displayed assets from quality {} to {}",
                transition.from,
                transition.to
            );
        }
        // Pinned entries are what the renderer is displaying right now;
        // re-admit each at the tier the new level resolves to. The swap
        // happens on a later request, once the replacement is resident.
        for key in self.cache.pinned_keys() {
            let Some(descriptor) = self.catalog.get(&key.id) else {
                continue;
            };
            let target = self
                .resolver
                .resolve(descriptor, DetailSelector::Quality(transition.to));
            if target == key.tier || self.cache.contains(&CacheKey::new(key.id, target)) {
                continue;
            }
            log::debug!("Re-fetching pinned {} at {target} after quality change", key.id);
            drop(self.resolver.ensure(descriptor, target, Priority::Prefetch));
        }
    }

    fn note_ungoverned(&self, descriptor: &AssetDescriptor) {
        if descriptor.age_appropriate && descriptor.accuracy_validated {
            return;
        }
        let mut noted = self.governance_noted.lock().unwrap();
        if noted.insert(descriptor.id) {
            log::debug!(
                "Asset {} is not fully content-reviewed (age_appropriate: {}, accuracy_validated: {})",
                descriptor.id,
                descriptor.age_appropriate,
                descriptor.accuracy_validated
            );
        }
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        log::info!("Asset pipeline shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::platform::DeviceTier;
    use tempfile::tempdir;

    #[test]
    fn building_without_a_source_is_an_error() {
        let result = AssetManagerBuilder::new().build();
        let message = result.err().expect("build should fail").to_string();
        assert!(message.contains("byte source"));
    }

    #[test]
    fn the_builder_owns_a_runtime_outside_async_contexts() {
        let dir = tempdir().expect("tempdir");
        let manager = AssetManagerBuilder::new()
            .with_bundle_root(dir.path())
            .build()
            .expect("build should succeed");
        assert!(manager._runtime.is_some());
        assert_eq!(manager.quality_level(), QualityLevel::High);
        assert_eq!(manager.status().cache.entry_count, 0);
    }

    #[tokio::test]
    async fn the_builder_borrows_an_ambient_runtime() {
        let dir = tempdir().expect("tempdir");
        let manager = AssetManagerBuilder::new()
            .with_bundle_root(dir.path())
            .build()
            .expect("build should succeed");
        assert!(manager._runtime.is_none());
    }

    #[test]
    fn the_probe_caps_the_starting_level() {
        let dir = tempdir().expect("tempdir");
        let manager = AssetManagerBuilder::new()
            .with_bundle_root(dir.path())
            .with_probe(FixedCapabilityProbe::for_tier(DeviceTier::Constrained))
            .build()
            .expect("build should succeed");
        assert_eq!(manager.quality_level(), QualityLevel::Medium);
    }

    #[test]
    fn a_lower_configured_start_wins_over_the_probe() {
        let dir = tempdir().expect("tempdir");
        let mut config = PipelineConfig::default();
        config.adaptation.initial_level = QualityLevel::Low;
        let manager = AssetManagerBuilder::new()
            .with_bundle_root(dir.path())
            .with_config(config)
            .build()
            .expect("build should succeed");
        assert_eq!(manager.quality_level(), QualityLevel::Low);
    }

    #[tokio::test]
    async fn unknown_assets_fail_without_touching_the_queue() {
        let dir = tempdir().expect("tempdir");
        let manager = AssetManagerBuilder::new()
            .with_bundle_root(dir.path())
            .build()
            .expect("build should succeed");
        let status = manager.request(
            AssetId::from_name("not/in/the/catalog"),
            DetailSelector::Zoom(1.0),
            Priority::Critical,
        );
        assert!(matches!(
            status,
            AssetStatus::Failed(LoadFailureKind::UnknownAsset)
        ));
        assert_eq!(manager.status().queue.pending_count, 0);
    }
}
