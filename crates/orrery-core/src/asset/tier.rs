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

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered resolution/quality bucket for an asset variant.
///
/// A higher tier always means higher fidelity and a higher memory cost. For
/// textures the tier fixes the longest edge in pixels; for meshes the same
/// ordering selects a triangle-density bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Tier {
    /// Smallest variant (256 px texture edge); distant or thumbnail use.
    #[default]
    Low,
    /// Mid variant (512 px texture edge).
    Medium,
    /// Detailed variant (1024 px texture edge); the common on-screen tier.
    High,
    /// Full-fidelity variant (2048 px texture edge); close inspection only.
    Ultra,
}

impl Tier {
    /// All tiers, lowest fidelity first.
    pub const ALL: [Tier; 4] = [Tier::Low, Tier::Medium, Tier::High, Tier::Ultra];

    /// The longest texture edge, in pixels, decoded for this tier.
    pub fn texture_edge(self) -> u32 {
        match self {
            Tier::Low => 256,
            Tier::Medium => 512,
            Tier::High => 1024,
            Tier::Ultra => 2048,
        }
    }

    /// Position in the fidelity order, `Low == 0` through `Ultra == 3`.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// The next tier down, or `None` at `Low`.
    pub fn lower(self) -> Option<Tier> {
        match self {
            Tier::Low => None,
            Tier::Medium => Some(Tier::Low),
            Tier::High => Some(Tier::Medium),
            Tier::Ultra => Some(Tier::High),
        }
    }

    /// The next tier up, or `None` at `Ultra`.
    pub fn higher(self) -> Option<Tier> {
        match self {
            Tier::Low => Some(Tier::Medium),
            Tier::Medium => Some(Tier::High),
            Tier::High => Some(Tier::Ultra),
            Tier::Ultra => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
            Tier::Ultra => "ultra",
        };
        write!(f, "{name}")
    }
}
