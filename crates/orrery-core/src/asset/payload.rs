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

use super::descriptor::AssetCategory;
use std::mem;
use std::ops::Deref;
use std::sync::Arc;

/// A decoded texture, CPU-side, ready for upload by the renderer.
///
/// Pixels are tightly packed RGBA8, row-major, `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturePayload {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 pixel data.
    pub pixels: Vec<u8>,
}

impl TexturePayload {
    /// Byte size of the pixel buffer.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
    }
}

/// Decoded triangulated geometry with a single shared index buffer.
///
/// Attribute vectors, when present, run parallel to `positions`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPayload {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals, parallel to `positions` when present.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Vertex texture coordinates, parallel to `positions` when present.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    /// Triangle list indices into the vertex attributes.
    pub indices: Vec<u32>,
}

impl MeshPayload {
    /// Number of triangles in the index list.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Byte size of all attribute and index buffers.
    pub fn size_bytes(&self) -> usize {
        let mut total = self.positions.len() * mem::size_of::<[f32; 3]>();
        if let Some(normals) = &self.normals {
            total += normals.len() * mem::size_of::<[f32; 3]>();
        }
        if let Some(tex_coords) = &self.tex_coords {
            total += tex_coords.len() * mem::size_of::<[f32; 2]>();
        }
        total + self.indices.len() * mem::size_of::<u32>()
    }
}

/// A decoded, renderer-consumable payload of any category.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    /// RGBA8 texture data.
    Texture(TexturePayload),
    /// Triangulated mesh data.
    Mesh(MeshPayload),
}

impl AssetPayload {
    /// The category this payload belongs to.
    pub fn category(&self) -> AssetCategory {
        match self {
            AssetPayload::Texture(_) => AssetCategory::Texture,
            AssetPayload::Mesh(_) => AssetCategory::Mesh,
        }
    }

    /// Approximate owned size in bytes, used for cache accounting.
    ///
    /// Counts the bulk buffers only; the fixed struct overhead is noise next
    /// to pixel and vertex data.
    pub fn size_bytes(&self) -> usize {
        match self {
            AssetPayload::Texture(texture) => texture.size_bytes(),
            AssetPayload::Mesh(mesh) => mesh.size_bytes(),
        }
    }
}

/// A thread-safe, reference-counted handle to a decoded payload.
///
/// Acts as a smart pointer with shared ownership: cloning is cheap and never
/// duplicates the underlying data. The payload is deallocated when the last
/// handle drops, which may be well after the cache has evicted its entry.
#[derive(Debug, Clone)]
pub struct PayloadHandle(Arc<AssetPayload>);

impl PayloadHandle {
    /// Wraps a freshly decoded payload in a shared handle.
    pub fn new(payload: AssetPayload) -> Self {
        Self(Arc::new(payload))
    }

    /// Whether two handles point at the same underlying payload.
    ///
    /// Read-through tests use this to verify the cache returns the stored
    /// data rather than a copy.
    pub fn ptr_eq(a: &PayloadHandle, b: &PayloadHandle) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for PayloadHandle {
    type Target = AssetPayload;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_texture() -> AssetPayload {
        AssetPayload::Texture(TexturePayload {
            width: 2,
            height: 2,
            pixels: vec![0u8; 16],
        })
    }

    #[test]
    fn texture_size_counts_pixels() {
        assert_eq!(small_texture().size_bytes(), 16);
    }

    #[test]
    fn mesh_size_counts_all_buffers() {
        let mesh = MeshPayload {
            positions: vec![[0.0; 3]; 3],
            normals: Some(vec![[0.0; 3]; 3]),
            tex_coords: None,
            indices: vec![0, 1, 2],
        };
        // 3 positions (36) + 3 normals (36) + 3 indices (12).
        assert_eq!(mesh.size_bytes(), 84);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn handle_clones_share_the_payload() {
        let a = PayloadHandle::new(small_texture());
        let b = a.clone();
        assert!(PayloadHandle::ptr_eq(&a, &b));
        assert_eq!(a.size_bytes(), b.size_bytes());
    }

    #[test]
    fn payload_reports_its_category() {
        assert_eq!(small_texture().category(), AssetCategory::Texture);
    }
}
