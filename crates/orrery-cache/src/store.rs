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

//! The budgeted LRU store for decoded payloads.

use orrery_core::asset::{AssetId, PayloadHandle, Tier};
use orrery_core::telemetry::CacheReport;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// The cache key: one logical asset at one resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The logical asset.
    pub id: AssetId,
    /// The resolution tier of the resident payload.
    pub tier: Tier,
}

impl CacheKey {
    /// Builds a key from its parts.
    pub fn new(id: AssetId, tier: Tier) -> Self {
        Self { id, tier }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.tier)
    }
}

/// What one insertion or eviction sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionOutcome {
    /// Entries removed by the sweep.
    pub evicted_count: usize,
    /// Bytes those entries accounted for.
    pub freed_bytes: usize,
    /// Whether usage still exceeds the budget after the sweep.
    pub over_budget: bool,
}

#[derive(Debug)]
struct CacheEntry {
    payload: PayloadHandle,
    size_bytes: usize,
    /// Monotonic tick of the most recent access; smallest tick evicts first.
    last_access: u64,
    pin_count: u32,
    derived: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    total_bytes: usize,
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    over_budget: bool,
}

impl CacheState {
    fn touch(&mut self, key: &CacheKey) -> Option<PayloadHandle> {
        self.clock += 1;
        let clock = self.clock;
        let entry = self.entries.get_mut(key)?;
        entry.last_access = clock;
        Some(entry.payload.clone())
    }

    /// Evicts oldest-access unpinned entries until usage fits the budget.
    ///
    /// `keep` shields the entry a `put` just inserted, so an insertion is
    /// never undone by its own sweep. Leaves `over_budget` set when nothing
    /// evictable remains above the budget line.
    fn evict_to_budget(&mut self, budget_bytes: usize, keep: Option<CacheKey>) -> EvictionOutcome {
        let mut outcome = EvictionOutcome::default();
        while self.total_bytes > budget_bytes {
            let victim = self
                .entries
                .iter()
                .filter(|(key, entry)| entry.pin_count == 0 && Some(**key) != keep)
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| *key);

            let Some(key) = victim else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
                self.evictions += 1;
                outcome.evicted_count += 1;
                outcome.freed_bytes += entry.size_bytes;
                log::debug!("Evicted {key} ({} bytes)", entry.size_bytes);
            }
        }

        let now_over = self.total_bytes > budget_bytes;
        if now_over && !self.over_budget {
            log::warn!(
                "Cache over budget with nothing evictable ({} of {} bytes)",
                self.total_bytes,
                budget_bytes
            );
        }
        self.over_budget = now_over;
        outcome.over_budget = now_over;
        outcome
    }
}

/// The memory-bounded store of decoded payloads.
///
/// Keyed by [`CacheKey`]; the byte budget is a soft target enforced by
/// least-recently-used eviction after every insertion. An insertion is never
/// rejected or undone by its own sweep: when everything else resident is
/// pinned the cache runs over budget and reports it instead of dropping the
/// new entry.
///
/// All mutation is serialized behind the cache's own lock, so the handle is
/// shared freely (`Arc<AssetCache>`) between the facade, the queue workers,
/// and the resolver.
#[derive(Debug)]
pub struct AssetCache {
    budget_bytes: usize,
    state: Mutex<CacheState>,
}

impl AssetCache {
    /// Creates an empty cache with the given soft byte budget.
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            budget_bytes,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// The configured soft budget in bytes.
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    /// Looks up the payload for a key, refreshing its LRU position.
    ///
    /// Counts toward the hit/miss telemetry; internal probes that should
    /// not skew the hit rate use [`AssetCache::contains`] or the
    /// nearest-tier lookups instead.
    pub fn get(&self, key: &CacheKey) -> Option<PayloadHandle> {
        let mut state = self.state.lock().unwrap();
        match state.touch(key) {
            Some(payload) => {
                state.hits += 1;
                Some(payload)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Looks up the payload for a key without counting hit/miss telemetry.
    ///
    /// Refreshes the LRU position like [`AssetCache::get`]. The loading
    /// queue re-probes with this after the facade already recorded the
    /// miss, so one request is one telemetry sample.
    pub fn touch(&self, key: &CacheKey) -> Option<PayloadHandle> {
        self.state.lock().unwrap().touch(key)
    }

    /// Whether a key is resident. No LRU or telemetry side effects.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().unwrap().entries.contains_key(key)
    }

    /// Inserts or replaces the payload for a key, then evicts to budget.
    ///
    /// The sweep never picks the entry being inserted, so a `put` always
    /// leaves its key resident even if that overruns the budget. Replacing
    /// keeps the existing pin count: pins name the key, not one particular
    /// payload revision. Returns what the eviction sweep did.
    pub fn put(
        &self,
        key: CacheKey,
        payload: PayloadHandle,
        size_bytes: usize,
        derived: bool,
    ) -> EvictionOutcome {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let last_access = state.clock;

        let pin_count = match state.entries.remove(&key) {
            Some(previous) => {
                state.total_bytes = state.total_bytes.saturating_sub(previous.size_bytes);
                previous.pin_count
            }
            None => 0,
        };

        state.total_bytes += size_bytes;
        state.entries.insert(
            key,
            CacheEntry {
                payload,
                size_bytes,
                last_access,
                pin_count,
                derived,
            },
        );
        state.evict_to_budget(self.budget_bytes, Some(key))
    }

    /// Evicts oldest-access unpinned entries until usage fits the budget.
    ///
    /// Runs implicitly after every `put`; exposed for administrative sweeps
    /// after unpinning.
    pub fn evict_if_over_budget(&self) -> EvictionOutcome {
        self.state
            .lock()
            .unwrap()
            .evict_to_budget(self.budget_bytes, None)
    }

    /// Marks a resident entry as displayed; pinned entries never evict.
    ///
    /// Returns `false` when the key is not resident.
    pub fn pin(&self, key: &CacheKey) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.pin_count += 1;
                true
            }
            None => false,
        }
    }

    /// Releases one pin on a resident entry.
    pub fn unpin(&self, key: &CacheKey) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.entries.get_mut(key) {
            if entry.pin_count == 0 {
                log::warn!("Unpin of {key} without a matching pin");
            } else {
                entry.pin_count -= 1;
            }
        }
    }

    /// Keys of every currently pinned entry.
    ///
    /// The quality controller treats these as "currently displayed" when it
    /// issues re-fetches after a level transition.
    pub fn pinned_keys(&self) -> Vec<CacheKey> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .filter(|(_, entry)| entry.pin_count > 0)
            .map(|(key, _)| *key)
            .collect()
    }

    /// The smallest resident tier strictly above `tier` for an asset.
    ///
    /// Feeds tier derivation. Refreshes the source entry's LRU position but
    /// does not count toward hit/miss telemetry.
    pub fn nearest_higher(&self, id: AssetId, tier: Tier) -> Option<(Tier, PayloadHandle)> {
        let mut state = self.state.lock().unwrap();
        let mut candidate = tier;
        while let Some(higher) = candidate.higher() {
            candidate = higher;
            let key = CacheKey::new(id, candidate);
            if let Some(payload) = state.touch(&key) {
                return Some((candidate, payload));
            }
        }
        None
    }

    /// The resident tier closest in rank to `target` for an asset.
    ///
    /// Backs substitute serving while the resolved tier loads: ties prefer
    /// the lower tier. Refreshes the chosen entry's LRU position without
    /// touching hit/miss telemetry.
    pub fn nearest_cached(&self, id: AssetId, target: Tier) -> Option<(Tier, PayloadHandle)> {
        let mut state = self.state.lock().unwrap();
        let mut best: Option<(Tier, u8)> = None;
        for tier in Tier::ALL {
            if !state.entries.contains_key(&CacheKey::new(id, tier)) {
                continue;
            }
            let distance = tier.rank().abs_diff(target.rank());
            // Strict `<` keeps the earlier (lower) tier on equal distance.
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((tier, distance));
            }
        }
        let (tier, _) = best?;
        let payload = state.touch(&CacheKey::new(id, tier))?;
        Some((tier, payload))
    }

    /// Destroys all unpinned entries. Pinned entries stay resident.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.pin_count > 0);
        state.total_bytes = state
            .entries
            .values()
            .map(|entry| entry.size_bytes)
            .sum();
        state.over_budget = state.total_bytes > self.budget_bytes;
        log::info!(
            "Cache cleared: {} entries removed, {} pinned retained",
            before - state.entries.len(),
            state.entries.len()
        );
    }

    /// A snapshot of occupancy and effectiveness counters.
    pub fn status(&self) -> CacheReport {
        let state = self.state.lock().unwrap();
        CacheReport {
            entry_count: state.entries.len(),
            pinned_count: state
                .entries
                .values()
                .filter(|entry| entry.pin_count > 0)
                .count(),
            memory_usage_bytes: state.total_bytes,
            memory_budget_bytes: self.budget_bytes,
            hit_count: state.hits,
            miss_count: state.misses,
            eviction_count: state.evictions,
            over_budget: state.over_budget,
        }
    }

    /// Number of resident entries whose payload was derived, not fetched.
    pub fn derived_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.entries.values().filter(|entry| entry.derived).count()
    }
}

/// RAII pin on one cache entry; dropping the guard releases the pin.
///
/// Held by the renderer for exactly as long as an asset is displayed, which
/// is what makes [`AssetCache::pinned_keys`] a usable visibility set.
#[derive(Debug)]
pub struct PinGuard {
    cache: Arc<AssetCache>,
    key: CacheKey,
}

impl PinGuard {
    /// Pins a resident entry and returns a guard that unpins on drop.
    ///
    /// Returns `None` when the key is not resident.
    pub fn acquire(cache: &Arc<AssetCache>, key: CacheKey) -> Option<PinGuard> {
        if cache.pin(&key) {
            Some(PinGuard {
                cache: Arc::clone(cache),
                key,
            })
        } else {
            None
        }
    }

    /// The key this guard pins.
    pub fn key(&self) -> CacheKey {
        self.key
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.cache.unpin(&self.key);
    }
}
