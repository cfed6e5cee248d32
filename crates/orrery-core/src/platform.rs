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

//! Abstractions over device capability detection.
//!
//! Capability detection is environment-specific (a browser client probes
//! differently than a desktop build), so the pipeline consumes it through
//! the one-shot [`CapabilityProbe`] trait and stays portable across
//! targets. The probe runs exactly once, at initialization, to pick the
//! starting quality level.

use crate::quality::QualityLevel;

/// Coarse classification of the device's rendering capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceTier {
    /// No usable hardware acceleration detected.
    ///
    /// The pipeline starts at the lowest quality and never serves Ultra
    /// tiers on such a device.
    NoAccel,
    /// Accelerated but limited (integrated mobile GPU, low memory).
    Constrained,
    /// Fully capable of the highest fidelity content.
    #[default]
    Capable,
}

impl DeviceTier {
    /// The quality level the pipeline starts at on this device.
    pub fn initial_quality(self) -> QualityLevel {
        match self {
            DeviceTier::NoAccel => QualityLevel::Low,
            DeviceTier::Constrained => QualityLevel::Medium,
            DeviceTier::Capable => QualityLevel::High,
        }
    }

    /// Whether Ultra-tier variants are permanently off for this device.
    pub fn ultra_disabled(self) -> bool {
        matches!(self, DeviceTier::NoAccel)
    }
}

/// What a capability probe learned about the host device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    /// The coarse device classification.
    pub device_tier: DeviceTier,
    /// Largest texture edge the device accepts, when the probe knows it.
    pub max_texture_edge: Option<u32>,
}

/// Trait for the one-shot device capability query.
///
/// Consulted exactly once, at pipeline initialization; the result fixes the
/// starting quality level and whether Ultra tiers exist at all on this
/// device.
pub trait CapabilityProbe: Send + Sync {
    /// Probes the device and reports its capabilities.
    fn probe(&self) -> DeviceCapabilities;
}

/// A probe returning a pre-determined answer.
///
/// Used by embedders that already know their platform and by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCapabilityProbe {
    capabilities: DeviceCapabilities,
}

impl FixedCapabilityProbe {
    /// Creates a probe that always reports the given capabilities.
    pub fn new(capabilities: DeviceCapabilities) -> Self {
        Self { capabilities }
    }

    /// Shorthand probe for a device tier with no texture-edge limit.
    pub fn for_tier(device_tier: DeviceTier) -> Self {
        Self::new(DeviceCapabilities {
            device_tier,
            max_texture_edge: None,
        })
    }
}

impl CapabilityProbe for FixedCapabilityProbe {
    fn probe(&self) -> DeviceCapabilities {
        self.capabilities
    }
}
