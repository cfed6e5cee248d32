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

//! Decode lanes turning fetched bytes into renderer-ready payloads.

mod mesh;
mod texture;

pub use mesh::*;
pub use texture::*;

use ahash::AHashMap;
use orrery_core::asset::{AssetCategory, AssetPayload, Tier};
use orrery_core::error::DecodeError;
use std::sync::Arc;

/// A decoder for one asset category.
///
/// Implementors do the CPU-intensive work of parsing raw file data into a
/// usable payload, shaped for the requested tier. Decoding is pure: the
/// same bytes and tier always produce the same result, which is what makes
/// decode failures safe to memoize.
pub trait DecodeLane: Send + Sync {
    /// Parses a byte slice into a payload at the given tier.
    ///
    /// # Arguments
    /// * `bytes` - The raw byte data fetched from the asset's source.
    /// * `tier` - The resolution tier the payload should be shaped for.
    ///
    /// # Returns
    /// The decoded payload, or a [`DecodeError`] when the bytes are not a
    /// valid instance of this lane's format.
    fn decode(&self, bytes: &[u8], tier: Tier) -> Result<AssetPayload, DecodeError>;
}

/// The set of decode lanes, keyed by asset category.
#[derive(Clone, Default)]
pub struct DecodeRegistry {
    lanes: AHashMap<AssetCategory, Arc<dyn DecodeLane>>,
}

impl DecodeRegistry {
    /// Creates an empty registry. Assets of any category will fail to load
    /// until a lane is registered for it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in texture and mesh lanes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AssetCategory::Texture, Arc::new(TextureDecodeLane));
        registry.register(AssetCategory::Mesh, Arc::new(ObjMeshDecodeLane));
        registry
    }

    /// Registers (or replaces) the lane for a category.
    pub fn register(&mut self, category: AssetCategory, lane: Arc<dyn DecodeLane>) {
        if self.lanes.insert(category, lane).is_some() {
            log::debug!("Replaced the decode lane for {category} assets");
        }
    }

    /// The lane registered for a category, if any.
    pub fn lane_for(&self, category: AssetCategory) -> Option<Arc<dyn DecodeLane>> {
        self.lanes.get(&category).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_both_categories() {
        let registry = DecodeRegistry::with_defaults();
        assert!(registry.lane_for(AssetCategory::Texture).is_some());
        assert!(registry.lane_for(AssetCategory::Mesh).is_some());
    }

    #[test]
    fn empty_registry_has_no_lanes() {
        let registry = DecodeRegistry::new();
        assert!(registry.lane_for(AssetCategory::Texture).is_none());
    }
}
