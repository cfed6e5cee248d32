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

use super::{id::AssetId, tier::Tier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The broad category of an asset, selecting its decode lane and placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetCategory {
    /// Image data decoded to RGBA8 pixels.
    Texture,
    /// Triangulated geometry with optional normals and texture coordinates.
    Mesh,
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetCategory::Texture => write!(f, "texture"),
            AssetCategory::Mesh => write!(f, "mesh"),
        }
    }
}

/// Where the raw bytes of an asset live.
///
/// The pipeline itself never interprets these beyond handing them to the
/// configured byte source, so an embedding can introduce its own scheme by
/// supplying a source that understands it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLocation {
    /// A path relative to the content bundle shipped with the client.
    Bundle(PathBuf),
    /// A URL fetched from a remote content server.
    Remote(String),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Bundle(path) => write!(f, "bundle:{}", path.display()),
            SourceLocation::Remote(url) => write!(f, "remote:{url}"),
        }
    }
}

/// Serializable catalog record describing one asset.
///
/// This is the "identity card" the pipeline consults before any bytes are
/// fetched: which decode lane applies, where the bytes live, which tiers the
/// source can produce, and the content-governance flags the educational
/// review process stamps onto every record.
///
/// Descriptors are immutable once registered and live for the process
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// The unique, stable identifier for this asset.
    pub id: AssetId,

    /// The category that selects the decode lane and the fallback placeholder.
    pub category: AssetCategory,

    /// Where the raw bytes are fetched from.
    pub source: SourceLocation,

    /// The tiers the source material can produce, lowest first.
    ///
    /// Always sorted and deduplicated; use [`AssetDescriptor::new`] to get
    /// the normalization for free.
    pub available_tiers: Vec<Tier>,

    /// Whether the content review marked this asset suitable for all ages.
    pub age_appropriate: bool,

    /// Whether the scientific accuracy of this asset has been validated.
    pub accuracy_validated: bool,

    /// Semantic tags for querying, e.g. chapter labels used by preloading.
    pub tags: Vec<String>,
}

impl AssetDescriptor {
    /// Creates a descriptor with a normalized (sorted, deduplicated) tier set.
    ///
    /// An empty `available_tiers` is normalized to every tier, which is the
    /// common case for sources decoded from a single full-resolution file.
    pub fn new(
        id: AssetId,
        category: AssetCategory,
        source: SourceLocation,
        mut available_tiers: Vec<Tier>,
    ) -> Self {
        if available_tiers.is_empty() {
            available_tiers = Tier::ALL.to_vec();
        } else {
            available_tiers.sort();
            available_tiers.dedup();
        }
        Self {
            id,
            category,
            source,
            available_tiers,
            age_appropriate: true,
            accuracy_validated: true,
            tags: Vec::new(),
        }
    }

    /// Adds a semantic tag and returns the descriptor, for catalog builders.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Marks the content-governance flags, for catalog builders.
    pub fn with_governance(mut self, age_appropriate: bool, accuracy_validated: bool) -> Self {
        self.age_appropriate = age_appropriate;
        self.accuracy_validated = accuracy_validated;
        self
    }

    /// Whether the source can produce the given tier.
    pub fn supports_tier(&self, tier: Tier) -> bool {
        self.available_tiers.contains(&tier)
    }

    /// The highest tier the source can produce.
    ///
    /// `new` guarantees a non-empty, sorted tier set, so this never fails for
    /// descriptors built through it.
    pub fn max_tier(&self) -> Tier {
        self.available_tiers.last().copied().unwrap_or(Tier::Low)
    }

    /// Snaps a desired tier onto the available set.
    ///
    /// Picks the available tier with the smallest rank distance to `desired`;
    /// on a tie the lower tier wins to conserve memory.
    pub fn snap_tier(&self, desired: Tier) -> Tier {
        let mut best = self.available_tiers.first().copied().unwrap_or(Tier::Low);
        let mut best_distance = u8::MAX;
        for &tier in &self.available_tiers {
            let distance = tier.rank().abs_diff(desired.rank());
            // Strict `<` keeps the earlier (lower) tier on equal distance.
            if distance < best_distance {
                best = tier;
                best_distance = distance;
            }
        }
        best
    }
}
