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

//! Built-in fallback payloads served when a load fails for good.

use orrery_core::asset::{
    AssetCategory, AssetId, AssetPayload, MeshPayload, PayloadHandle, TexturePayload,
};

const TEXTURE_PLACEHOLDER_NAME: &str = "placeholder/texture";
const MESH_PLACEHOLDER_NAME: &str = "placeholder/mesh";

/// Checkerboard edge length in pixels.
const CHECKER_SIZE: u32 = 64;
/// Checkerboard cell edge length in pixels.
const CHECKER_CELL: u32 = 8;

/// A shared reference to one placeholder payload.
///
/// The id is stable across processes and versions (derived from the
/// placeholder's name), so saved scenes and logs can recognize it.
#[derive(Debug, Clone)]
pub struct PlaceholderRef {
    /// The placeholder's own stable asset id.
    pub id: AssetId,
    /// The category this placeholder stands in for.
    pub category: AssetCategory,
    /// The renderable fallback payload.
    pub payload: PayloadHandle,
}

/// The full set of placeholders, one per asset category.
///
/// Built once at pipeline startup and shared from there; placeholder
/// payloads are never inserted into the cache, so they can never be
/// evicted out from under a fallback.
#[derive(Debug, Clone)]
pub struct PlaceholderSet {
    texture: PlaceholderRef,
    mesh: PlaceholderRef,
}

impl PlaceholderSet {
    /// Builds the magenta checkerboard texture and unit cube mesh.
    pub fn new() -> Self {
        Self {
            texture: PlaceholderRef {
                id: AssetId::from_name(TEXTURE_PLACEHOLDER_NAME),
                category: AssetCategory::Texture,
                payload: PayloadHandle::new(AssetPayload::Texture(checkerboard())),
            },
            mesh: PlaceholderRef {
                id: AssetId::from_name(MESH_PLACEHOLDER_NAME),
                category: AssetCategory::Mesh,
                payload: PayloadHandle::new(AssetPayload::Mesh(unit_cube())),
            },
        }
    }

    /// The placeholder standing in for a category.
    pub fn for_category(&self, category: AssetCategory) -> &PlaceholderRef {
        match category {
            AssetCategory::Texture => &self.texture,
            AssetCategory::Mesh => &self.mesh,
        }
    }

    /// Whether an id names one of the placeholders.
    pub fn contains(&self, id: &AssetId) -> bool {
        self.texture.id == *id || self.mesh.id == *id
    }
}

impl Default for PlaceholderSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The unmistakable magenta and black checkerboard.
fn checkerboard() -> TexturePayload {
    let mut pixels = Vec::with_capacity((CHECKER_SIZE * CHECKER_SIZE * 4) as usize);
    for y in 0..CHECKER_SIZE {
        for x in 0..CHECKER_SIZE {
            let even = ((x / CHECKER_CELL) + (y / CHECKER_CELL)) % 2 == 0;
            if even {
                pixels.extend_from_slice(&[255, 0, 255, 255]);
            } else {
                pixels.extend_from_slice(&[0, 0, 0, 255]);
            }
        }
    }
    TexturePayload {
        width: CHECKER_SIZE,
        height: CHECKER_SIZE,
        pixels,
    }
}

/// A unit cube centered on the origin.
fn unit_cube() -> MeshPayload {
    let positions = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let indices = vec![
        0, 2, 1, 0, 3, 2, // back
        4, 5, 6, 4, 6, 7, // front
        0, 4, 7, 0, 7, 3, // left
        1, 2, 6, 1, 6, 5, // right
        0, 1, 5, 0, 5, 4, // bottom
        3, 7, 6, 3, 6, 2, // top
    ];
    MeshPayload {
        positions,
        normals: None,
        tex_coords: None,
        indices,
    }
}
