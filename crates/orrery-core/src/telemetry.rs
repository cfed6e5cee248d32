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

//! Diagnostic report types exposed through the facade's `status()`.
//!
//! Reports are plain copyable snapshots: the cache, the queue, and the
//! quality state each fill in their slice, and the facade stitches them
//! into one [`PipelineReport`] the UI's cache-status panel renders from.
//! Ingested frame timings travel the other way as [`FrameSample`] values.

use crate::quality::QualityLevel;

/// One externally measured frame timing pushed into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    /// Wall-clock duration of the frame, in milliseconds.
    pub frame_time_ms: f32,
}

impl FrameSample {
    /// Builds a sample from a frame duration in milliseconds.
    pub fn from_frame_time_ms(frame_time_ms: f32) -> Self {
        Self { frame_time_ms }
    }

    /// Builds a sample from an instantaneous frames-per-second reading.
    ///
    /// Non-positive FPS values clamp to a very slow frame rather than
    /// dividing by zero.
    pub fn from_fps(fps: f32) -> Self {
        let frame_time_ms = if fps > 0.0 { 1_000.0 / fps } else { f32::MAX };
        Self { frame_time_ms }
    }
}

/// A snapshot of cache occupancy and effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheReport {
    /// Number of resident entries.
    pub entry_count: usize,
    /// Number of resident entries currently pinned.
    pub pinned_count: usize,
    /// Bytes currently resident.
    pub memory_usage_bytes: usize,
    /// The configured soft budget in bytes.
    pub memory_budget_bytes: usize,
    /// Lookups answered from the cache since startup.
    pub hit_count: u64,
    /// Lookups that missed since startup.
    pub miss_count: u64,
    /// Entries evicted since startup.
    pub eviction_count: u64,
    /// Whether usage currently exceeds the budget (all-pinned overflow).
    pub over_budget: bool,
}

impl CacheReport {
    /// Fraction of lookups answered from the cache, 0.0 when none happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }

    /// Resident bytes as a fraction of the budget, 0.0 for a zero budget.
    pub fn utilization(&self) -> f64 {
        if self.memory_budget_bytes == 0 {
            0.0
        } else {
            self.memory_usage_bytes as f64 / self.memory_budget_bytes as f64
        }
    }
}

/// A snapshot of loading-queue activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Requests admitted but not yet dispatched.
    pub pending_count: usize,
    /// Requests currently running on the task pool.
    pub in_flight_count: usize,
    /// Requests that completed successfully since startup.
    pub completed_count: u64,
    /// Callers that attached to an existing request since startup.
    pub coalesced_count: u64,
    /// Requests aborted before dispatch because all callers cancelled.
    pub cancelled_count: u64,
    /// Requests that ended in fallback since startup.
    pub failed_count: u64,
}

/// The combined diagnostics snapshot returned by the facade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineReport {
    /// Cache occupancy and effectiveness.
    pub cache: CacheReport,
    /// Loading-queue activity.
    pub queue: QueueReport,
    /// The current process-wide quality level.
    pub quality_level: QualityLevel,
}

impl PipelineReport {
    /// Shorthand for the cache's hit rate.
    pub fn hit_rate(&self) -> f64 {
        self.cache.hit_rate()
    }
}
