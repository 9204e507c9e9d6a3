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

//! Telemetry snapshots exposed by the streamer.

use std::time::Duration;

const LATENCY_WINDOW: usize = 64;

/// A fixed-size ring of recent high-resolution load durations.
#[derive(Debug)]
pub struct LatencyWindow {
    samples: [Duration; LATENCY_WINDOW],
    head: usize,
    count: usize,
}

impl LatencyWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self {
            samples: [Duration::ZERO; LATENCY_WINDOW],
            head: 0,
            count: 0,
        }
    }

    /// Records one load duration, overwriting the oldest once full.
    pub fn record(&mut self, took: Duration) {
        self.samples[self.head] = took;
        self.head = (self.head + 1) % LATENCY_WINDOW;
        self.count = (self.count + 1).min(LATENCY_WINDOW);
    }

    /// Number of samples currently held.
    pub fn count(&self) -> usize {
        self.count
    }

    fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.samples.iter().copied().take(self.count)
    }

    /// Summarizes the window.
    pub fn summarize(&self) -> LatencySummary {
        if self.count == 0 {
            return LatencySummary::default();
        }
        let total: Duration = self.iter().sum();
        LatencySummary {
            samples: self.count,
            average: total / self.count as u32,
            max: self.iter().max().unwrap_or(Duration::ZERO),
        }
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregated load-latency figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    /// Number of loads in the window.
    pub samples: usize,
    /// Mean load duration.
    pub average: Duration,
    /// Worst load duration.
    pub max: Duration,
}

/// A point-in-time snapshot of the streamer's counters and flags.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Cached entries across all buckets.
    pub level_count: usize,
    /// Estimated bytes accounted by the most recent admission pass.
    pub resident_bytes: usize,
    /// The budget the most recent admission pass ran against.
    pub budget_bytes: usize,
    /// Asynchronous load jobs currently in flight.
    pub outstanding_jobs: usize,
    /// Entries created during the last completed frame.
    pub created_last_frame: u32,
    /// Existing entries touched during the last completed frame.
    pub touched_last_frame: u32,
    /// Feature-flag echo.
    pub async_enabled: bool,
    /// Feature-flag echo.
    pub throttling_enabled: bool,
    /// Feature-flag echo.
    pub budget_enabled: bool,
    /// Feature-flag echo.
    pub throw_on_missing: bool,
    /// Feature-flag echo.
    pub potato_mode: bool,
    /// Recent high-resolution load latency.
    pub load_latency: LatencySummary,
}
