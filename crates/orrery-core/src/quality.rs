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

//! Process-wide quality state and the request detail selector.
//!
//! [`QualityLevel`] is a single-writer value: only the quality controller
//! mutates it, everything else reads it through a [`SharedQuality`] mirror.
//! Requests express how much detail they want with a [`DetailSelector`];
//! tier resolution turns that plus the current quality level into a
//! concrete tier.

use crate::asset::Tier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// The process-wide rendering quality level.
///
/// Coarser than [`Tier`]: the level biases which tier a zoom resolves to,
/// it does not name a tier directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum QualityLevel {
    /// Struggling device; cap fidelity aggressively.
    Low,
    /// Middle ground for constrained devices.
    Medium,
    /// Full fidelity.
    #[default]
    High,
}

impl QualityLevel {
    /// The highest tier resolution may pick at this level.
    ///
    /// `ultra_disabled` additionally caps everything at `High`, the device
    /// deficiency case.
    pub fn tier_ceiling(self, ultra_disabled: bool) -> Tier {
        let ceiling = match self {
            QualityLevel::Low => Tier::Medium,
            QualityLevel::Medium => Tier::High,
            QualityLevel::High => Tier::Ultra,
        };
        if ultra_disabled && ceiling == Tier::Ultra {
            Tier::High
        } else {
            ceiling
        }
    }

    /// One level down, or `None` at `Low`.
    pub fn step_down(self) -> Option<QualityLevel> {
        match self {
            QualityLevel::Low => None,
            QualityLevel::Medium => Some(QualityLevel::Low),
            QualityLevel::High => Some(QualityLevel::Medium),
        }
    }

    /// One level up, or `None` at `High`.
    pub fn step_up(self) -> Option<QualityLevel> {
        match self {
            QualityLevel::Low => Some(QualityLevel::Medium),
            QualityLevel::Medium => Some(QualityLevel::High),
            QualityLevel::High => None,
        }
    }

    fn from_u8(value: u8) -> QualityLevel {
        match value {
            0 => QualityLevel::Low,
            1 => QualityLevel::Medium,
            _ => QualityLevel::High,
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
        };
        write!(f, "{name}")
    }
}

/// How much detail a request wants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetailSelector {
    /// Continuous zoom/distance signal from the camera; resolution maps it
    /// onto a tier through the configured breakpoints.
    Zoom(f32),
    /// An explicit quality level; resolution picks that level's default
    /// tier regardless of the current global level.
    Quality(QualityLevel),
    /// An exact tier, bypassing zoom mapping (administrative and re-fetch
    /// paths; still snapped to the asset's available tiers).
    Exact(Tier),
}

/// Thread-safe mirror of the current [`QualityLevel`].
///
/// Single writer (the quality controller), any number of readers. Relaxed
/// ordering is enough: the value is a preference, not a synchronization
/// point.
#[derive(Debug, Default)]
pub struct SharedQuality {
    level: AtomicU8,
}

impl SharedQuality {
    /// Creates a mirror starting at the given level.
    pub fn new(level: QualityLevel) -> Self {
        Self {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Reads the current level.
    pub fn load(&self) -> QualityLevel {
        QualityLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Writes a new level. Controller use only.
    pub fn store(&self, level: QualityLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }
}

/// What drove a quality transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// Sustained bad frame times forced a downgrade.
    Degraded,
    /// Sustained good frame times earned an upgrade.
    Recovered,
    /// A manual override pinned the level.
    Override,
}

/// A completed change of the process-wide quality level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTransition {
    /// Level before the change.
    pub from: QualityLevel,
    /// Level after the change.
    pub to: QualityLevel,
    /// What drove the change.
    pub cause: TransitionCause,
}
