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

//! Provides the foundational types of the asset pipeline.
//!
//! This module defines the "common language" every other crate speaks: stable
//! asset identifiers, resolution tiers, catalog descriptors, and the decoded
//! payload containers the renderer ultimately consumes. It has no knowledge
//! of how assets are fetched, decoded, or cached.
//!
//! The key pieces are:
//! - [`AssetId`]: a stable, unique identifier for a logical asset.
//! - [`Tier`]: the ordered resolution/quality bucket an asset variant lives in.
//! - [`AssetDescriptor`]: the immutable catalog record for one asset.
//! - [`AssetPayload`] and [`PayloadHandle`]: decoded data and its shared handle.

mod descriptor;
mod id;
mod payload;
mod tier;

pub use descriptor::*;
pub use id::*;
pub use payload::*;
pub use tier::*;
