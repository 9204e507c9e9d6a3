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

//! Construction-time configuration for the streamer.

use serde::{Deserialize, Serialize};

/// Tuning knobs and initial feature-flag values for a
/// [`TextureStreamer`](crate::system::TextureStreamer).
///
/// All flags remain adjustable at runtime through the streamer's setters;
/// this struct only seeds them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Number of independently locked cache shards.
    pub bucket_count: usize,
    /// Maximum entries per shard before capacity eviction.
    pub bucket_capacity: usize,
    /// Initial byte budget; each `update` call may override it.
    pub budget_bytes: usize,
    /// An entry fetched within this many frames counts as active.
    pub active_window_frames: u64,
    /// Maximum concurrently outstanding asynchronous load jobs.
    pub max_in_flight_jobs: usize,
    /// Allow asynchronous high-resolution loads.
    pub async_enabled: bool,
    /// Drop brand-new cache entries past the per-frame creation quota.
    pub throttling_enabled: bool,
    /// Enforce the byte budget each frame.
    pub budget_enabled: bool,
    /// Abort on load failures instead of substituting placeholders.
    pub throw_on_missing: bool,
    /// Never hold high-resolution data (low-memory targets).
    pub potato_mode: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bucket_count: 8,
            bucket_capacity: 256,
            budget_bytes: 256 * 1024 * 1024,
            active_window_frames: 10,
            max_in_flight_jobs: 8,
            async_enabled: true,
            throttling_enabled: true,
            budget_enabled: true,
            throw_on_missing: false,
            potato_mode: false,
        }
    }
}
