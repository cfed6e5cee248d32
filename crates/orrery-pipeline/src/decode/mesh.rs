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

//! The decode lane for OBJ mesh assets.

use super::DecodeLane;
use crate::derive::{decimate_triangles, mesh_stride};
use ahash::AHashMap;
use orrery_core::asset::{AssetCategory, AssetPayload, MeshPayload, Tier};
use orrery_core::error::DecodeError;

/// Decodes OBJ files into triangulated geometry shaped for a tier.
///
/// Faces are triangulated and re-indexed to a single shared index buffer.
/// Lower tiers thin the triangle list after decoding, so one full-detail
/// OBJ file serves every tier.
#[derive(Clone)]
pub struct ObjMeshDecodeLane;

impl ObjMeshDecodeLane {
    fn malformed(details: impl ToString) -> DecodeError {
        DecodeError::Malformed {
            category: AssetCategory::Mesh,
            details: details.to_string(),
        }
    }
}

impl DecodeLane for ObjMeshDecodeLane {
    fn decode(&self, bytes: &[u8], tier: Tier) -> Result<AssetPayload, DecodeError> {
        let obj_text = std::str::from_utf8(bytes)
            .map_err(|_| Self::malformed("OBJ file is not valid UTF-8"))?;

        let (models, _materials) = tobj::load_obj_buf(
            &mut std::io::Cursor::new(obj_text),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok((Vec::new(), AHashMap::new())),
        )
        .map_err(Self::malformed)?;

        if models.is_empty() {
            return Err(DecodeError::EmptyGeometry);
        }
        if models.len() > 1 {
            log::debug!("OBJ contains {} models, using the first", models.len());
        }
        let mesh = &models[0].mesh;

        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|v| [v[0], v[1], v[2]])
            .collect();
        if positions.is_empty() || mesh.indices.is_empty() {
            return Err(DecodeError::EmptyGeometry);
        }

        let normals = if !mesh.normals.is_empty() {
            Some(
                mesh.normals
                    .chunks_exact(3)
                    .map(|n| [n[0], n[1], n[2]])
                    .collect(),
            )
        } else {
            None
        };

        let tex_coords = if !mesh.texcoords.is_empty() {
            Some(
                mesh.texcoords
                    .chunks_exact(2)
                    .map(|t| [t[0], t[1]])
                    .collect(),
            )
        } else {
            None
        };

        let full = MeshPayload {
            positions,
            normals,
            tex_coords,
            indices: mesh.indices.clone(),
        };

        let stride = mesh_stride(tier);
        let shaped = if stride > 1 {
            decimate_triangles(&full, stride)
        } else {
            full
        };
        Ok(AssetPayload::Mesh(shaped))
    }
}
