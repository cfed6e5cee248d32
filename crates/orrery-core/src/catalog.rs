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

//! Static registry of asset descriptors for fast, in-memory lookups.
//!
//! This module provides the [`AssetCatalog`], which holds the immutable
//! descriptor records of every asset a content bundle ships. It is the
//! pipeline's source of truth before any bytes move: category, source
//! location, and available tiers all come from here. The catalog is
//! typically decoded from a packed binary index produced by the content
//! build, and supports O(1) lookups by [`AssetId`].

use crate::asset::{AssetDescriptor, AssetId};
use std::collections::HashMap;

/// The runtime representation of the packed asset index (`catalog.bin`).
///
/// Descriptors are immutable once registered and live for the process
/// lifetime, so the catalog hands out references rather than clones.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    /// Maps asset ids to their descriptors. O(1) average-time lookups.
    index: HashMap<AssetId, AssetDescriptor>,
}

impl AssetCatalog {
    /// Builds a catalog from descriptors registered programmatically.
    ///
    /// A duplicate id keeps the first registration and logs the collision;
    /// content builds are expected to have resolved duplicates already.
    pub fn from_descriptors(descriptors: Vec<AssetDescriptor>) -> Self {
        let mut index = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let id = descriptor.id;
            if index.contains_key(&id) {
                log::warn!("Duplicate asset id {id} in catalog; keeping the first record");
                continue;
            }
            index.insert(id, descriptor);
        }
        Self { index }
    }

    /// Builds a catalog by decoding a packed binary index from its raw bytes.
    ///
    /// This is the entry point for shipped bundles. The bytes are a
    /// bincode-encoded list of [`AssetDescriptor`] records.
    ///
    /// # Errors
    /// Returns a `DecodeError` if the byte slice is not a valid encoded
    /// descriptor list.
    pub fn from_index_bytes(index_bytes: &[u8]) -> Result<Self, bincode::error::DecodeError> {
        let config = bincode::config::standard();
        let (descriptors, _): (Vec<AssetDescriptor>, _) =
            bincode::serde::decode_from_slice(index_bytes, config)?;
        log::info!("Asset catalog decoded with {} records", descriptors.len());
        Ok(Self::from_descriptors(descriptors))
    }

    /// Retrieves the descriptor for a given asset id.
    pub fn get(&self, id: &AssetId) -> Option<&AssetDescriptor> {
        self.index.get(id)
    }

    /// Whether the catalog knows the given asset id.
    pub fn contains(&self, id: &AssetId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All asset ids carrying the given tag, in arbitrary order.
    ///
    /// Tags label chapters and topics; this query backs chapter-level
    /// preloading.
    pub fn tagged(&self, tag: &str) -> Vec<AssetId> {
        self.index
            .values()
            .filter(|descriptor| descriptor.tags.iter().any(|t| t == tag))
            .map(|descriptor| descriptor.id)
            .collect()
    }

    /// Iterates over every registered descriptor, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.index.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetCategory, SourceLocation, Tier};
    use std::path::PathBuf;

    fn descriptor(name: &str) -> AssetDescriptor {
        AssetDescriptor::new(
            AssetId::from_name(name),
            AssetCategory::Texture,
            SourceLocation::Bundle(PathBuf::from(format!("{name}.png"))),
            vec![Tier::Low, Tier::High],
        )
    }

    #[test]
    fn lookup_returns_registered_descriptor() {
        let desc = descriptor("planets/mars/albedo");
        let id = desc.id;
        let catalog = AssetCatalog::from_descriptors(vec![desc]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&id).map(|d| d.id), Some(id));
        assert!(catalog.get(&AssetId::from_name("missing")).is_none());
    }

    #[test]
    fn duplicate_ids_keep_the_first_record() {
        let first = descriptor("planets/venus/albedo").with_tag("first");
        let second = descriptor("planets/venus/albedo").with_tag("second");
        let id = first.id;
        let catalog = AssetCatalog::from_descriptors(vec![first, second]);
        assert_eq!(catalog.len(), 1);
        let kept = catalog.get(&id).expect("record should exist");
        assert_eq!(kept.tags, vec!["first".to_string()]);
    }

    #[test]
    fn index_bytes_round_trip() {
        let descriptors = vec![
            descriptor("chapter1/sun"),
            descriptor("chapter1/mercury").with_tag("chapter-1"),
        ];
        let config = bincode::config::standard();
        let bytes =
            bincode::serde::encode_to_vec(&descriptors, config).expect("encoding should work");

        let catalog = AssetCatalog::from_index_bytes(&bytes).expect("decoding should work");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tagged("chapter-1").len(), 1);
    }

    #[test]
    fn tagged_finds_all_matching_assets() {
        let catalog = AssetCatalog::from_descriptors(vec![
            descriptor("a").with_tag("chapter-2"),
            descriptor("b").with_tag("chapter-2"),
            descriptor("c").with_tag("chapter-3"),
        ]);
        assert_eq!(catalog.tagged("chapter-2").len(), 2);
        assert_eq!(catalog.tagged("chapter-3").len(), 1);
        assert!(catalog.tagged("chapter-4").is_empty());
    }
}
