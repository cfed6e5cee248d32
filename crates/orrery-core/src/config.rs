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

//! Tunable parameters for the whole pipeline.
//!
//! Every numeric threshold the pipeline uses lives here rather than inline
//! at its point of use, so deployments can tune memory, concurrency, retry,
//! and adaptation behavior without a rebuild. Hosts either construct
//! [`PipelineConfig`] in code or ship a RON file and load it with
//! [`PipelineConfig::from_ron_str`].

use crate::quality::QualityLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cache budget: enough for a chapter of planet textures at High.
const DEFAULT_MEMORY_BUDGET_BYTES: usize = 256 * 1024 * 1024;

/// Default cap on simultaneously in-flight fetch/decode tasks.
const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Default zoom breakpoints; at or below each value the matching tier wins.
const DEFAULT_ZOOM_BREAKPOINTS: [f32; 3] = [0.75, 1.5, 3.0];

/// Default number of fetch attempts before a load is declared fatal.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

/// Default ceiling on any single retry delay.
const DEFAULT_MAX_BACKOFF_MS: u64 = 4_000;

/// Default consecutive-sample run required before a quality transition.
const DEFAULT_REQUIRED_RUN: u32 = 5;

/// Default rolling window length for frame-time diagnostics.
const DEFAULT_SAMPLE_WINDOW: usize = 120;

/// Frame times above this are "struggling" samples (about 30 FPS).
const DEFAULT_DOWNGRADE_FRAME_MS: f32 = 33.3;

/// Frame times below this are "comfortable" samples (above 60 FPS).
const DEFAULT_UPGRADE_FRAME_MS: f32 = 15.0;

/// Retry policy for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total fetch attempts per load, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; later retries double it.
    pub initial_backoff_ms: u64,
    /// Ceiling applied to every computed backoff delay.
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    /// The backoff delay to sleep after a failed attempt.
    ///
    /// `attempt` is 1-based (the attempt that just failed). Delays double
    /// per attempt and saturate at `max_backoff_ms`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Hysteresis thresholds for performance-driven quality adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Consecutive qualifying samples required before a level transition.
    pub required_run: u32,
    /// Rolling window length kept for smoothed diagnostics.
    pub window: usize,
    /// Frame times above this count toward a downgrade.
    pub downgrade_frame_ms: f32,
    /// Frame times below this count toward an upgrade.
    pub upgrade_frame_ms: f32,
    /// Starting level when no capability probe overrides it.
    pub initial_level: QualityLevel,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            required_run: DEFAULT_REQUIRED_RUN,
            window: DEFAULT_SAMPLE_WINDOW,
            downgrade_frame_ms: DEFAULT_DOWNGRADE_FRAME_MS,
            upgrade_frame_ms: DEFAULT_UPGRADE_FRAME_MS,
            initial_level: QualityLevel::High,
        }
    }
}

/// Top-level configuration for the asset pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Soft cache budget in bytes; eviction keeps usage at or under this.
    pub memory_budget_bytes: usize,
    /// Cap on simultaneously in-flight fetch/decode tasks.
    pub max_in_flight: usize,
    /// Ascending zoom breakpoints mapping zoom factors onto tiers.
    ///
    /// A zoom at or below `zoom_breakpoints[0]` resolves to `Low`, at or
    /// below `[1]` to `Medium`, at or below `[2]` to `High`, anything
    /// beyond to `Ultra`. "At or below" makes a boundary value take the
    /// lower tier.
    pub zoom_breakpoints: [f32; 3],
    /// Retry policy for transient fetch failures.
    pub retry: RetryConfig,
    /// Quality adaptation thresholds.
    pub adaptation: AdaptationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            zoom_breakpoints: DEFAULT_ZOOM_BREAKPOINTS,
            retry: RetryConfig::default(),
            adaptation: AdaptationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration from RON text, then normalizes it.
    ///
    /// # Errors
    /// Returns the RON parse error with its source span.
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        let config: PipelineConfig = ron::from_str(text)?;
        Ok(config.normalized())
    }

    /// Clamps degenerate values into a usable range.
    ///
    /// Zero caps and runs become 1, breakpoints are sorted ascending, and
    /// inverted adaptation thresholds are swapped back. Each repair logs a
    /// warning so a bad deployment config is visible.
    pub fn normalized(mut self) -> Self {
        if self.max_in_flight == 0 {
            log::warn!("max_in_flight of 0 would stall all loads; clamping to 1");
            self.max_in_flight = 1;
        }
        if self.retry.max_attempts == 0 {
            log::warn!("retry.max_attempts of 0 would never fetch; clamping to 1");
            self.retry.max_attempts = 1;
        }
        if self.adaptation.required_run == 0 {
            log::warn!("adaptation.required_run of 0 would flap on every sample; clamping to 1");
            self.adaptation.required_run = 1;
        }
        if self.adaptation.window == 0 {
            self.adaptation.window = self.adaptation.required_run as usize;
        }
        let mut sorted = self.zoom_breakpoints;
        sorted.sort_by(|a, b| a.total_cmp(b));
        if sorted != self.zoom_breakpoints {
            log::warn!("zoom_breakpoints were not ascending; sorting them");
            self.zoom_breakpoints = sorted;
        }
        if self.adaptation.upgrade_frame_ms > self.adaptation.downgrade_frame_ms {
            log::warn!(
                "adaptation thresholds inverted (upgrade {} ms > downgrade {} ms); swapping",
                self.adaptation.upgrade_frame_ms,
                self.adaptation.downgrade_frame_ms
            );
            std::mem::swap(
                &mut self.adaptation.upgrade_frame_ms,
                &mut self.adaptation.downgrade_frame_ms,
            );
        }
        self
    }
}
