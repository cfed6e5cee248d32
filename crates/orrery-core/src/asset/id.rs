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

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for name-derived asset identifiers.
///
/// Catalog tooling derives ids from logical names (version 5) so the same
/// name always maps to the same id across builds of a content bundle.
const ASSET_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6f, 0x72, 0x72, 0x65, 0x72, 0x79, 0x2d, 0x61, 0x73, 0x73, 0x65, 0x74, 0x2d, 0x69, 0x64,
    0x73,
]);

/// A globally unique, persistent identifier for a logical asset.
///
/// This identifies the "idea" of an asset, decoupled from any physical file
/// path or network location. It is the primary key of the catalog and of the
/// cache (paired with a [`super::Tier`]).
///
/// Content can be moved or re-hosted without breaking references as long as
/// its id is preserved in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Creates a new, random (version 4) `AssetId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a stable (version 5) `AssetId` from a logical asset name.
    ///
    /// The same name always produces the same id, which is what catalog
    /// builders and placeholder registration rely on.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&ASSET_ID_NAMESPACE, name.as_bytes()))
    }
}

impl Default for AssetId {
    /// Creates a new, random (version 4) `AssetId`.
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
