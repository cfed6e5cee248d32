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

//! # Orrery Pipeline
//!
//! The loading machinery between the asset catalog and the cache: byte
//! sources, decode lanes, the retrying loader, tier derivation, the
//! placeholder set, the bounded loading queue and tier resolution. The
//! runtime facade composes these pieces; nothing in here renders or talks
//! to the UI directly.

#![warn(missing_docs)]

pub mod decode;

mod derive;
mod loader;
mod placeholder;
mod queue;
mod resolution;
mod source;

pub use derive::*;
pub use loader::*;
pub use placeholder::*;
pub use queue::*;
pub use resolution::*;
pub use source::*;
