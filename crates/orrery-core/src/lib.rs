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

//! # Orrery Core
//!
//! Foundational crate containing the contracts, core types, and interface
//! traits that define the asset pipeline's architecture. Nothing in here
//! loads, stores, or schedules anything; higher-level crates implement the
//! behavior against these types.

#![warn(missing_docs)]

pub mod asset;
pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod io;
pub mod platform;
pub mod quality;
pub mod telemetry;

pub use asset::{AssetId, PayloadHandle, Tier};
pub use quality::QualityLevel;
