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

//! # Orrery Cache
//!
//! The memory-bounded store of decoded payloads. One [`AssetCache`] holds
//! every resident (asset, tier) payload behind a soft byte budget enforced
//! by least-recently-used eviction, with pinning for entries the renderer
//! is actively displaying. All other pipeline crates mutate cached state
//! exclusively through this interface.

#![warn(missing_docs)]

mod store;

pub use store::*;
