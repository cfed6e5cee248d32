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

//! # Orrery Runtime
//!
//! The public-facing surface of the asset pipeline. [`AssetManager`] is the
//! one object an embedding client holds: it owns the cache, the loading
//! queue, tier resolution and quality control, and exposes the synchronous
//! request path the renderer calls every frame.
//!
//! Construction goes through [`AssetManagerBuilder`], which wires the
//! collaborators (byte source, decode lanes, capability probe,
//! configuration) into an explicit component graph with no globals.

#![warn(missing_docs)]

mod manager;

pub use manager::{AssetManager, AssetManagerBuilder, AssetStatus};

pub mod prelude {
    //! Everything an embedding client typically imports.

    pub use crate::{AssetManager, AssetManagerBuilder, AssetStatus};
    pub use orrery_cache::PinGuard;
    pub use orrery_core::asset::{
        AssetCategory, AssetDescriptor, AssetId, AssetPayload, PayloadHandle, SourceLocation, Tier,
    };
    pub use orrery_core::catalog::AssetCatalog;
    pub use orrery_core::config::{AdaptationConfig, PipelineConfig, RetryConfig};
    pub use orrery_core::error::LoadFailureKind;
    pub use orrery_core::event::PipelineEvent;
    pub use orrery_core::platform::{
        CapabilityProbe, DeviceCapabilities, DeviceTier, FixedCapabilityProbe,
    };
    pub use orrery_core::quality::{DetailSelector, QualityLevel, TransitionCause};
    pub use orrery_core::telemetry::{FrameSample, PipelineReport};
    pub use orrery_pipeline::{BundleByteSource, LoadOutcome, LoadTicket, PlaceholderRef, Priority};
}
