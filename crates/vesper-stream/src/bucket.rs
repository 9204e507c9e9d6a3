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

//! One shard of the hash-partitioned cache.

use crate::context::LoaderContext;
use crate::desc::TextureDesc;
use crate::level::{LevelState, TextureInfos, TextureLevel};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use vesper_core::texture::TextureHandle;

/// Per-fetch behavior switches, snapshotted from the streamer's feature
/// flags at the call site.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// Drop brand-new descriptors once the per-frame creation quota is hit.
    pub throttling: bool,
    /// When `false`, missing high-resolution data is loaded inline so the
    /// caller always sees the best representation (tooling/screenshot mode).
    pub budget_enabled: bool,
    /// Never load high-resolution data at all.
    pub potato: bool,
}

/// A fixed-capacity, mutex-guarded shard mapping descriptor hashes to
/// [`TextureLevel`]s.
///
/// The mutex only covers map lookup and insertion, never I/O. Creation
/// and touch counts feed the per-frame backpressure telemetry and reset
/// on `Swap`.
pub struct StreamBucket {
    capacity: usize,
    levels: Mutex<HashMap<u64, Arc<TextureLevel>>>,
    created_this_frame: AtomicU32,
    touched_this_frame: AtomicU32,
}

impl StreamBucket {
    /// Creates an empty bucket holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            levels: Mutex::new(HashMap::with_capacity(capacity)),
            created_this_frame: AtomicU32::new(0),
            touched_this_frame: AtomicU32::new(0),
        }
    }

    /// Finds or creates the entry for `desc`, never throttled. Used by
    /// the gather path, which must make progress to report dimensions.
    pub fn find_or_create(&self, desc: &TextureDesc) -> Arc<TextureLevel> {
        let mut levels = self.levels.lock().unwrap();
        if let Some(level) = levels.get(&desc.hash()) {
            self.touched_this_frame.fetch_add(1, Ordering::Relaxed);
            return level.clone();
        }
        self.insert_locked(&mut levels, desc)
    }

    /// Finds the entry for `desc`, creating it unless throttling is on
    /// and this bucket has already created half its capacity's worth of
    /// brand-new entries this frame. Lookups of existing entries are
    /// never throttled.
    pub fn try_find_or_create(
        &self,
        desc: &TextureDesc,
        throttling: bool,
    ) -> Option<Arc<TextureLevel>> {
        let mut levels = self.levels.lock().unwrap();
        if let Some(level) = levels.get(&desc.hash()) {
            self.touched_this_frame.fetch_add(1, Ordering::Relaxed);
            return Some(level.clone());
        }
        if throttling
            && self.created_this_frame.load(Ordering::Relaxed) >= (self.capacity / 2) as u32
        {
            // Backpressure against creation storms: the request is
            // dropped for this frame, not queued.
            return None;
        }
        Some(self.insert_locked(&mut levels, desc))
    }

    fn insert_locked(
        &self,
        levels: &mut HashMap<u64, Arc<TextureLevel>>,
        desc: &TextureDesc,
    ) -> Arc<TextureLevel> {
        if levels.len() >= self.capacity {
            // Capacity eviction: drop the slot with the stalest fetch.
            if let Some(victim) = levels
                .iter()
                .min_by_key(|(_, level)| level.last_active_frame())
                .map(|(hash, _)| *hash)
            {
                levels.remove(&victim);
                log::debug!("bucket full, evicted level {victim:#x}");
            }
        }
        let level = Arc::new(TextureLevel::new(desc.clone()));
        levels.insert(desc.hash(), level.clone());
        self.created_this_frame.fetch_add(1, Ordering::Relaxed);
        level
    }

    /// Find-or-create, load the cheap representation, and report
    /// dimensions. Never throttled and never loads high-resolution data.
    pub fn gather(&self, desc: &TextureDesc, ctx: &LoaderContext) -> TextureInfos {
        let level = self.find_or_create(desc);
        level.load_low(ctx);
        level.infos()
    }

    /// The fetch fast path: find-or-create-or-skip, make sure the cheap
    /// representation exists, optionally load high-resolution data inline
    /// when budget enforcement is off, mark the entry active, and return
    /// the best resident texture.
    pub fn fetch(
        &self,
        desc: &TextureDesc,
        pixel_footprint: u32,
        frame: u64,
        policy: &FetchPolicy,
        ctx: &LoaderContext,
    ) -> Option<TextureHandle> {
        let level = self.try_find_or_create(desc, policy.throttling)?;
        level.load_low(ctx);
        if !policy.budget_enabled && !policy.potato && level.state() != LevelState::Ready {
            level.load_high(ctx);
        }
        level.mark_active(frame, pixel_footprint);
        level.texture()
    }

    /// Whether the entry exists and holds resident high-resolution data.
    pub fn is_ready(&self, hash: u64) -> bool {
        self.levels
            .lock()
            .unwrap()
            .get(&hash)
            .map(|level| level.state() == LevelState::Ready)
            .unwrap_or(false)
    }

    /// A snapshot of every entry, for the admission pass.
    pub fn snapshot(&self) -> Vec<Arc<TextureLevel>> {
        self.levels.lock().unwrap().values().cloned().collect()
    }

    /// The number of cached entries.
    pub fn len(&self) -> usize {
        self.levels.lock().unwrap().len()
    }

    /// Whether the bucket holds no entries.
    pub fn is_empty(&self) -> bool {
        self.levels.lock().unwrap().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.levels.lock().unwrap().clear();
    }

    /// Snapshots and resets the per-frame creation/touch counters.
    pub fn take_frame_counters(&self) -> (u32, u32) {
        (
            self.created_this_frame.swap(0, Ordering::Relaxed),
            self.touched_this_frame.swap(0, Ordering::Relaxed),
        )
    }
}

impl std::fmt::Debug for StreamBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBucket")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{container_bytes, test_context};
    use vesper_core::texture::{TextureFlags, TextureKind};

    fn desc(path: &str) -> TextureDesc {
        TextureDesc::new(path, TextureKind::Default, TextureFlags::NONE)
    }

    fn policy() -> FetchPolicy {
        FetchPolicy {
            throttling: true,
            budget_enabled: true,
            potato: false,
        }
    }

    #[test]
    fn test_find_or_create_deduplicates() {
        let bucket = StreamBucket::new(16);
        let a = bucket.find_or_create(&desc("textures/a.tst"));
        let b = bucket.find_or_create(&desc("textures/a.tst"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.take_frame_counters(), (1, 1));
    }

    #[test]
    fn test_throttling_drops_new_entries_past_half_capacity() {
        let bucket = StreamBucket::new(256);
        let mut created = 0;
        let mut dropped = 0;
        for i in 0..200 {
            let d = desc(&format!("textures/new-{i}.tst"));
            match bucket.try_find_or_create(&d, true) {
                Some(_) => created += 1,
                None => dropped += 1,
            }
        }
        assert_eq!(created, 128);
        assert_eq!(dropped, 72);

        // Existing entries are still served while throttled.
        assert!(bucket
            .try_find_or_create(&desc("textures/new-0.tst"), true)
            .is_some());

        // Swap resets the quota.
        bucket.take_frame_counters();
        assert!(bucket
            .try_find_or_create(&desc("textures/late.tst"), true)
            .is_some());
    }

    #[test]
    fn test_gather_is_never_throttled() {
        let bucket = StreamBucket::new(4);
        let (ctx, storage, _factory) = test_context();
        for i in 0..4 {
            let path = format!("textures/{i}.tst");
            storage.insert(path.clone(), container_bytes(8, 8, 32));
            // Half of capacity 4 is 2; gather must keep creating anyway.
            let infos = bucket.gather(&desc(&path), &ctx);
            assert_eq!(infos.width, 8);
        }
    }

    #[test]
    fn test_capacity_eviction_prefers_stale_entries() {
        let bucket = StreamBucket::new(2);
        let fresh = desc("textures/fresh.tst");
        let stale = desc("textures/stale.tst");
        let newcomer = desc("textures/new.tst");

        bucket.find_or_create(&stale).mark_active(1, 10);
        bucket.find_or_create(&fresh).mark_active(50, 10);
        bucket.find_or_create(&newcomer);

        assert_eq!(bucket.len(), 2);
        let hashes: Vec<u64> = bucket.snapshot().iter().map(|l| l.desc().hash()).collect();
        assert!(hashes.contains(&fresh.hash()));
        assert!(hashes.contains(&newcomer.hash()));
        assert!(!hashes.contains(&stale.hash()));
    }

    #[test]
    fn test_fetch_loads_high_inline_when_budget_disabled() {
        let bucket = StreamBucket::new(16);
        let (ctx, storage, factory) = test_context();
        let d = desc("textures/a.tst");
        storage.insert("textures/a.tst", container_bytes(32, 32, 32));

        let inline = FetchPolicy {
            throttling: false,
            budget_enabled: false,
            potato: false,
        };
        let handle = bucket.fetch(&d, 100, 1, &inline, &ctx).unwrap();
        assert!(bucket.is_ready(d.hash()));
        assert_eq!(handle.width, 32);
        // One low-quality and one full-quality container creation.
        assert_eq!(factory.containers_created(), 2);
    }

    #[test]
    fn test_fetch_respects_potato_mode() {
        let bucket = StreamBucket::new(16);
        let (ctx, storage, _factory) = test_context();
        let d = desc("textures/a.tst");
        storage.insert("textures/a.tst", container_bytes(32, 32, 32));

        let potato = FetchPolicy {
            throttling: false,
            budget_enabled: false,
            potato: true,
        };
        assert!(bucket.fetch(&d, 100, 1, &potato, &ctx).is_some());
        assert!(!bucket.is_ready(d.hash()));
    }

    #[test]
    fn test_fetch_under_budget_enforcement_stays_low() {
        let bucket = StreamBucket::new(16);
        let (ctx, storage, _factory) = test_context();
        let d = desc("textures/a.tst");
        storage.insert("textures/a.tst", container_bytes(32, 32, 32));

        let handle = bucket.fetch(&d, 100, 1, &policy(), &ctx).unwrap();
        assert_eq!(handle.width, 32);
        // Budget enforcement defers high-res work to the admission pass.
        assert!(!bucket.is_ready(d.hash()));
    }
}
