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

//! The decode lane for texture assets.

use super::DecodeLane;
use image::imageops::FilterType;
use orrery_core::asset::{AssetCategory, AssetPayload, TexturePayload, Tier};
use orrery_core::error::DecodeError;

/// Decodes image files into RGBA8 pixel data shaped for a tier.
///
/// Any container format the `image` crate understands is accepted. The
/// decoded image is downscaled so its longest edge fits the tier's texture
/// edge; images already small enough pass through untouched, tiers never
/// upscale.
#[derive(Clone)]
pub struct TextureDecodeLane;

impl DecodeLane for TextureDecodeLane {
    fn decode(&self, bytes: &[u8], tier: Tier) -> Result<AssetPayload, DecodeError> {
        let img = image::load_from_memory(bytes).map_err(|err| DecodeError::Malformed {
            category: AssetCategory::Texture,
            details: err.to_string(),
        })?;

        // Keep in sRGB space.
        let mut rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        let edge = tier.texture_edge();
        let longest = width.max(height);
        if longest > edge {
            let scale = edge as f32 / longest as f32;
            let new_width = ((width as f32 * scale).round() as u32).max(1);
            let new_height = ((height as f32 * scale).round() as u32).max(1);
            log::debug!(
                "Downscaling texture {width}x{height} to {new_width}x{new_height} for tier {tier}"
            );
            rgba_img =
                image::imageops::resize(&rgba_img, new_width, new_height, FilterType::Triangle);
        }

        let (width, height) = rgba_img.dimensions();
        Ok(AssetPayload::Texture(TexturePayload {
            width,
            height,
            pixels: rgba_img.into_raw(),
        }))
    }
}
