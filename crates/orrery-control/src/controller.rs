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

//! The hysteresis-driven quality level controller.

use crate::window::SampleWindow;
use orrery_core::config::AdaptationConfig;
use orrery_core::quality::{QualityLevel, QualityTransition, SharedQuality, TransitionCause};
use orrery_core::telemetry::FrameSample;
use std::sync::Arc;

/// Decides when the process-wide quality level should move.
///
/// A transition needs a full run of consecutive qualifying samples: frame
/// times above the downgrade threshold build toward a downgrade, frame
/// times below the upgrade threshold build toward an upgrade, and anything
/// in between resets both runs. One borderline frame therefore never flips
/// the level back and forth.
///
/// The controller is the single writer of the [`SharedQuality`] value.
/// It returns the transition it decided on; acting on it is the caller's
/// business.
pub struct QualityController {
    config: AdaptationConfig,
    shared: Arc<SharedQuality>,
    window: SampleWindow,
    bad_run: u32,
    good_run: u32,
    overridden: bool,
}

impl QualityController {
    /// Creates a controller writing to the given shared quality value.
    pub fn new(config: AdaptationConfig, shared: Arc<SharedQuality>) -> Self {
        let window = SampleWindow::new(config.window);
        Self {
            config,
            shared,
            window,
            bad_run: 0,
            good_run: 0,
            overridden: false,
        }
    }

    /// Ingests one frame timing and returns the transition it triggered.
    ///
    /// Samples at exactly a threshold count as neutral. While a manual
    /// override is active, samples still feed the rolling window but can
    /// not move the level.
    pub fn ingest(&mut self, sample: FrameSample) -> Option<QualityTransition> {
        self.window.push(sample.frame_time_ms);
        if self.overridden {
            return None;
        }

        if sample.frame_time_ms > self.config.downgrade_frame_ms {
            self.bad_run += 1;
            self.good_run = 0;
        } else if sample.frame_time_ms < self.config.upgrade_frame_ms {
            self.good_run += 1;
            self.bad_run = 0;
        } else {
            self.bad_run = 0;
            self.good_run = 0;
        }

        if self.bad_run >= self.config.required_run {
            self.reset_runs();
            return self.shift(QualityLevel::step_down, TransitionCause::Degraded);
        }
        if self.good_run >= self.config.required_run {
            self.reset_runs();
            return self.shift(QualityLevel::step_up, TransitionCause::Recovered);
        }
        None
    }

    /// Pins the level manually, or releases the pin with `None`.
    ///
    /// Returns the transition when pinning actually changes the level.
    /// Releasing never changes the level by itself; adaptation simply
    /// resumes from the pinned value.
    pub fn set_override(&mut self, level: Option<QualityLevel>) -> Option<QualityTransition> {
        self.reset_runs();
        match level {
            Some(target) => {
                self.overridden = true;
                let from = self.shared.load();
                if from != target {
                    self.shared.store(target);
                    log::info!("Quality level pinned at {target} (was {from})");
                    return Some(QualityTransition {
                        from,
                        to: target,
                        cause: TransitionCause::Override,
                    });
                }
                None
            }
            None => {
                self.overridden = false;
                log::info!("Quality override released at {}", self.shared.load());
                None
            }
        }
    }

    /// The current quality level.
    pub fn level(&self) -> QualityLevel {
        self.shared.load()
    }

    /// Whether a manual override is pinning the level.
    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    /// The smoothed frame time over the rolling window.
    pub fn average_frame_ms(&self) -> Option<f32> {
        self.window.average()
    }

    fn reset_runs(&mut self) {
        self.bad_run = 0;
        self.good_run = 0;
    }

    fn shift(
        &mut self,
        step: fn(QualityLevel) -> Option<QualityLevel>,
        cause: TransitionCause,
    ) -> Option<QualityTransition> {
        let from = self.shared.load();
        let to = step(from)?;
        self.shared.store(to);
        log::info!("Quality level {from} → {to}");
        Some(QualityTransition { from, to, cause })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLOW_MS: f32 = 40.0;
    const FAST_MS: f32 = 10.0;

    fn controller(initial: QualityLevel) -> QualityController {
        let config = AdaptationConfig {
            required_run: 5,
            window: 120,
            downgrade_frame_ms: 33.3,
            upgrade_frame_ms: 15.0,
            initial_level: initial,
        };
        QualityController::new(config, Arc::new(SharedQuality::new(initial)))
    }

    fn ingest_many(
        controller: &mut QualityController,
        frame_time_ms: f32,
        count: usize,
    ) -> Vec<QualityTransition> {
        (0..count)
            .filter_map(|_| controller.ingest(FrameSample::from_frame_time_ms(frame_time_ms)))
            .collect()
    }

    #[test]
    fn a_broken_run_changes_nothing() {
        let mut ctl = controller(QualityLevel::High);
        assert!(ingest_many(&mut ctl, SLOW_MS, 4).is_empty());
        assert!(ctl.ingest(FrameSample::from_frame_time_ms(FAST_MS)).is_none());
        assert_eq!(ctl.level(), QualityLevel::High);
    }

    #[test]
    fn a_full_slow_run_degrades_once() {
        let mut ctl = controller(QualityLevel::High);
        let transitions = ingest_many(&mut ctl, SLOW_MS, 5);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].from, QualityLevel::High);
        assert_eq!(transitions[0].to, QualityLevel::Medium);
        assert_eq!(transitions[0].cause, TransitionCause::Degraded);
        assert_eq!(ctl.level(), QualityLevel::Medium);
    }

    #[test]
    fn recovery_requires_its_own_full_run() {
        let mut ctl = controller(QualityLevel::High);
        ingest_many(&mut ctl, SLOW_MS, 5);
        assert!(ingest_many(&mut ctl, FAST_MS, 4).is_empty());
        let transitions = ingest_many(&mut ctl, FAST_MS, 1);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].cause, TransitionCause::Recovered);
        assert_eq!(ctl.level(), QualityLevel::High);
    }

    #[test]
    fn neutral_samples_reset_both_runs() {
        let mut ctl = controller(QualityLevel::High);
        ingest_many(&mut ctl, SLOW_MS, 4);
        // Between the thresholds: neither slow nor fast.
        ctl.ingest(FrameSample::from_frame_time_ms(20.0));
        assert!(ingest_many(&mut ctl, SLOW_MS, 4).is_empty());
        assert_eq!(ingest_many(&mut ctl, SLOW_MS, 1).len(), 1);
    }

    #[test]
    fn threshold_values_count_as_neutral() {
        let mut ctl = controller(QualityLevel::High);
        ingest_many(&mut ctl, SLOW_MS, 4);
        ctl.ingest(FrameSample::from_frame_time_ms(33.3));
        assert!(ingest_many(&mut ctl, SLOW_MS, 4).is_empty());
    }

    #[test]
    fn the_floor_absorbs_further_degradation() {
        let mut ctl = controller(QualityLevel::Low);
        assert!(ingest_many(&mut ctl, SLOW_MS, 10).is_empty());
        assert_eq!(ctl.level(), QualityLevel::Low);
    }

    #[test]
    fn consecutive_degradations_walk_the_ladder() {
        let mut ctl = controller(QualityLevel::High);
        ingest_many(&mut ctl, SLOW_MS, 5);
        assert_eq!(ctl.level(), QualityLevel::Medium);
        ingest_many(&mut ctl, SLOW_MS, 5);
        assert_eq!(ctl.level(), QualityLevel::Low);
    }

    #[test]
    fn an_override_pins_the_level_against_samples() {
        let mut ctl = controller(QualityLevel::High);
        let transition = ctl.set_override(Some(QualityLevel::Low));
        assert_eq!(transition.map(|t| t.cause), Some(TransitionCause::Override));
        assert!(ctl.is_overridden());

        assert!(ingest_many(&mut ctl, FAST_MS, 10).is_empty());
        assert_eq!(ctl.level(), QualityLevel::Low);

        ctl.set_override(None);
        let transitions = ingest_many(&mut ctl, FAST_MS, 5);
        assert_eq!(transitions.len(), 1);
        assert_eq!(ctl.level(), QualityLevel::Medium);
    }

    #[test]
    fn overriding_to_the_current_level_reports_nothing() {
        let mut ctl = controller(QualityLevel::Medium);
        assert!(ctl.set_override(Some(QualityLevel::Medium)).is_none());
        assert!(ctl.is_overridden());
    }

    #[test]
    fn the_window_tracks_the_smoothed_frame_time() {
        let mut ctl = controller(QualityLevel::High);
        ingest_many(&mut ctl, 20.0, 3);
        assert_eq!(ctl.average_frame_ms(), Some(20.0));
    }
}
