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

//! # Vesper Stream
//!
//! The texture streaming cache: keeps GPU texture memory under a hard byte
//! budget while asynchronously streaming high-resolution data in from
//! storage, giving visually-active textures priority over off-screen ones.
//!
//! The cache is sharded into [`StreamBucket`]s keyed by a stable descriptor
//! hash. Each entry is a [`TextureLevel`] state machine that loads a cheap
//! low-resolution representation synchronously on first touch and streams
//! the full-resolution data in the background. Once per frame the
//! [`TextureStreamer`] snapshots every level, sorts by a packed priority
//! key, and greedily admits or evicts high-resolution data against the
//! configured budget.

pub mod bucket;
pub mod config;
pub mod context;
pub mod desc;
pub mod level;
pub mod stats;
pub mod system;

pub use bucket::{FetchPolicy, StreamBucket};
pub use config::StreamConfig;
pub use context::LoaderContext;
pub use desc::TextureDesc;
pub use level::{LevelState, TextureInfos, TextureLevel};
pub use stats::{LatencySummary, StreamStats};
pub use system::TextureStreamer;

#[cfg(test)]
pub(crate) mod test_support;
