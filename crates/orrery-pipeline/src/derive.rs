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

//! Deriving lower-tier payloads from already-decoded higher tiers.
//!
//! When a higher tier of an asset is resident in the cache, producing a
//! lower tier is a pure CPU transform: textures downscale and meshes thin
//! their triangle list. The load executor prefers this over a fresh fetch.

use ahash::AHashMap;
use image::imageops::FilterType;
use orrery_core::asset::{AssetPayload, MeshPayload, TexturePayload, Tier};

/// The triangle-keeping stride for a tier: 1 keeps every triangle, 2 every
/// second one, and so on. `High` and `Ultra` carry full geometry.
pub fn mesh_stride(tier: Tier) -> usize {
    match tier {
        Tier::Low => 4,
        Tier::Medium => 2,
        Tier::High | Tier::Ultra => 1,
    }
}

/// Keeps every `stride`-th triangle and compacts the vertex attributes to
/// the vertices those triangles still reference.
pub fn decimate_triangles(mesh: &MeshPayload, stride: usize) -> MeshPayload {
    let stride = stride.max(1);
    let kept: Vec<u32> = mesh
        .indices
        .chunks_exact(3)
        .step_by(stride)
        .flatten()
        .copied()
        .collect();

    let mut remap: AHashMap<u32, u32> = AHashMap::new();
    let mut positions = Vec::new();
    let mut normals = mesh.normals.as_ref().map(|_| Vec::new());
    let mut tex_coords = mesh.tex_coords.as_ref().map(|_| Vec::new());
    let mut indices = Vec::with_capacity(kept.len());

    for index in kept {
        let mapped = match remap.get(&index) {
            Some(&mapped) => mapped,
            None => {
                let mapped = positions.len() as u32;
                positions.push(mesh.positions[index as usize]);
                if let (Some(dst), Some(src)) = (normals.as_mut(), mesh.normals.as_ref()) {
                    dst.push(src[index as usize]);
                }
                if let (Some(dst), Some(src)) = (tex_coords.as_mut(), mesh.tex_coords.as_ref()) {
                    dst.push(src[index as usize]);
                }
                remap.insert(index, mapped);
                mapped
            }
        };
        indices.push(mapped);
    }

    MeshPayload {
        positions,
        normals,
        tex_coords,
        indices,
    }
}

/// Derives a `target`-tier payload from a payload cached at `source_tier`.
///
/// Only derivation downward makes sense; returns `None` when `source_tier`
/// is not strictly above `target`. A source that already fits the target's
/// shape is cloned rather than re-fetched.
pub fn derive_payload(
    source: &AssetPayload,
    source_tier: Tier,
    target: Tier,
) -> Option<AssetPayload> {
    if source_tier.rank() <= target.rank() {
        return None;
    }
    match source {
        AssetPayload::Texture(texture) => {
            shrink_texture(texture, target.texture_edge()).map(AssetPayload::Texture)
        }
        AssetPayload::Mesh(mesh) => {
            let relative = mesh_stride(target) / mesh_stride(source_tier);
            let derived = if relative > 1 {
                decimate_triangles(mesh, relative)
            } else {
                mesh.clone()
            };
            Some(AssetPayload::Mesh(derived))
        }
    }
}

/// Downscales so the longest edge fits `edge`; clones when already small.
fn shrink_texture(texture: &TexturePayload, edge: u32) -> Option<TexturePayload> {
    let longest = texture.width.max(texture.height);
    if longest <= edge {
        return Some(texture.clone());
    }
    let img = image::RgbaImage::from_raw(texture.width, texture.height, texture.pixels.clone())?;
    let scale = edge as f32 / longest as f32;
    let width = ((texture.width as f32 * scale).round() as u32).max(1);
    let height = ((texture.height as f32 * scale).round() as u32).max(1);
    let resized = image::imageops::resize(&img, width, height, FilterType::Triangle);
    Some(TexturePayload {
        width,
        height,
        pixels: resized.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fan_mesh(triangles: usize) -> MeshPayload {
        let mut positions = vec![[0.0, 0.0, 0.0]];
        let mut indices = Vec::new();
        for i in 0..=triangles {
            positions.push([i as f32, 1.0, 0.0]);
        }
        for i in 0..triangles as u32 {
            indices.extend_from_slice(&[0, i + 1, i + 2]);
        }
        MeshPayload {
            positions,
            normals: None,
            tex_coords: None,
            indices,
        }
    }

    fn flat_texture(width: u32, height: u32) -> TexturePayload {
        TexturePayload {
            width,
            height,
            pixels: vec![128u8; (width * height * 4) as usize],
        }
    }

    #[test]
    fn decimation_keeps_every_nth_triangle() {
        let mesh = fan_mesh(8);
        let thinned = decimate_triangles(&mesh, 4);
        assert_eq!(thinned.triangle_count(), 2);
        // Triangles 0 and 4 reference five distinct vertices.
        assert_eq!(thinned.positions.len(), 5);
        assert!(thinned.indices.iter().all(|&i| (i as usize) < thinned.positions.len()));
    }

    #[test]
    fn stride_one_preserves_the_mesh() {
        let mesh = fan_mesh(3);
        let same = decimate_triangles(&mesh, 1);
        assert_eq!(same.triangle_count(), 3);
        assert_eq!(same.positions.len(), mesh.positions.len());
    }

    #[test]
    fn texture_derivation_downscales() {
        let source = AssetPayload::Texture(flat_texture(2048, 1024));
        let derived = derive_payload(&source, Tier::Ultra, Tier::Low).expect("derivable");
        match derived {
            AssetPayload::Texture(ref tex) => {
                assert_eq!((tex.width, tex.height), (256, 128));
            }
            AssetPayload::Mesh(_) => panic!("expected a texture"),
        }
        assert!(derived.size_bytes() < source.size_bytes());
    }

    #[test]
    fn small_sources_derive_by_cloning() {
        let source = AssetPayload::Texture(flat_texture(16, 16));
        let derived = derive_payload(&source, Tier::Ultra, Tier::Low).expect("derivable");
        assert_eq!(derived.size_bytes(), source.size_bytes());
    }

    #[test]
    fn mesh_derivation_thins_relative_to_the_source() {
        let source = AssetPayload::Mesh(fan_mesh(8));
        let derived = derive_payload(&source, Tier::High, Tier::Medium).expect("derivable");
        match derived {
            AssetPayload::Mesh(mesh) => assert_eq!(mesh.triangle_count(), 4),
            AssetPayload::Texture(_) => panic!("expected a mesh"),
        }
    }

    #[test]
    fn derivation_never_goes_upward() {
        let source = AssetPayload::Texture(flat_texture(16, 16));
        assert!(derive_payload(&source, Tier::Low, Tier::High).is_none());
        assert!(derive_payload(&source, Tier::Medium, Tier::Medium).is_none());
    }
}
