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

//! A fixed-capacity rolling window of frame timings.

use std::collections::VecDeque;

/// The last N frame times, for smoothed diagnostics.
///
/// Transition decisions run on consecutive-sample runs, not on this
/// average; the window exists so status displays and logs can show a
/// stable number instead of per-frame noise.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleWindow {
    /// Creates a window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest when full.
    pub fn push(&mut self, frame_time_ms: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_time_ms);
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been ingested yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The mean of the held samples, or `None` when empty.
    pub fn average(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
    }

    /// Drops every held sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_window_rolls_over_at_capacity() {
        let mut window = SampleWindow::new(3);
        for value in [1.0, 2.0, 3.0, 4.0] {
            window.push(value);
        }
        assert_eq!(window.len(), 3);
        // 1.0 was evicted; (2 + 3 + 4) / 3.
        assert_eq!(window.average(), Some(3.0));
    }

    #[test]
    fn an_empty_window_has_no_average() {
        let window = SampleWindow::new(4);
        assert!(window.is_empty());
        assert_eq!(window.average(), None);
    }

    #[test]
    fn clear_empties_the_window() {
        let mut window = SampleWindow::new(2);
        window.push(16.0);
        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut window = SampleWindow::new(0);
        window.push(5.0);
        window.push(7.0);
        assert_eq!(window.len(), 1);
        assert_eq!(window.average(), Some(7.0));
    }
}
