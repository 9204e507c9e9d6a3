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

//! The streaming coordinator: owns the bucket shards, runs the per-frame
//! admission pass, and bridges to the external job scheduler.

use crate::bucket::{FetchPolicy, StreamBucket};
use crate::config::StreamConfig;
use crate::context::LoaderContext;
use crate::desc::TextureDesc;
use crate::level::{LevelState, TextureInfos, TextureLevel};
use crate::stats::{LatencyWindow, StreamStats};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use vesper_core::device::TextureFactory;
use vesper_core::scheduler::{JobPriority, JobScheduler};
use vesper_core::storage::StorageProvider;
use vesper_core::texture::{TextureHandle, TextureKind, TextureOptions};

/// How long a teardown may wait on in-flight jobs before complaining.
const CLEAR_WAIT_WARN: Duration = Duration::from_secs(1);

/// The process-wide texture streaming cache.
///
/// One instance is owned by the application root next to the device
/// lifecycle and handed to renderer call sites. A single thread drives
/// [`update`](Self::update), [`swap`](Self::swap) and the device
/// lifecycle; [`fetch`](Self::fetch) and [`gather`](Self::gather) are
/// safe to call concurrently with in-flight load jobs.
pub struct TextureStreamer {
    buckets: Vec<StreamBucket>,
    ctx: Arc<LoaderContext>,
    scheduler: Arc<dyn JobScheduler>,
    frame_index: u64,
    active_window: u64,
    budget_bytes: usize,
    usage_bytes: usize,
    async_enabled: bool,
    throttling_enabled: bool,
    budget_enabled: bool,
    potato_mode: bool,
    disable_async_frames: u32,
    max_in_flight: usize,
    outstanding_jobs: Arc<AtomicUsize>,
    latency: Arc<Mutex<LatencyWindow>>,
    created_last_frame: u32,
    touched_last_frame: u32,
    placeholder: Option<TextureHandle>,
    missing: Option<TextureHandle>,
}

impl TextureStreamer {
    /// Builds the streamer and its bucket shards. The device factory is
    /// bound later through [`on_create_device`](Self::on_create_device).
    pub fn new(
        config: StreamConfig,
        storage: Arc<dyn StorageProvider>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        let bucket_count = config.bucket_count.max(1);
        let buckets = (0..bucket_count)
            .map(|_| StreamBucket::new(config.bucket_capacity.max(1)))
            .collect();
        let ctx = Arc::new(LoaderContext::new(storage));
        ctx.set_throw_on_missing(config.throw_on_missing);
        log::info!(
            "texture streamer initialised: {bucket_count} buckets x {} entries, budget {} MiB",
            config.bucket_capacity,
            config.budget_bytes >> 20
        );
        Self {
            buckets,
            ctx,
            scheduler,
            frame_index: 0,
            active_window: config.active_window_frames.max(1),
            budget_bytes: config.budget_bytes,
            usage_bytes: 0,
            async_enabled: config.async_enabled,
            throttling_enabled: config.throttling_enabled,
            budget_enabled: config.budget_enabled,
            potato_mode: config.potato_mode,
            disable_async_frames: 0,
            max_in_flight: config.max_in_flight_jobs.max(1),
            outstanding_jobs: Arc::new(AtomicUsize::new(0)),
            latency: Arc::new(Mutex::new(LatencyWindow::new())),
            created_last_frame: 0,
            touched_last_frame: 0,
            placeholder: None,
            missing: None,
        }
    }

    // --- Device lifecycle ---

    /// Binds the device factory and builds the placeholder textures.
    pub fn on_create_device(&mut self, factory: Arc<dyn TextureFactory>) {
        self.ctx.set_factory(Some(factory));
        self.build_placeholders();
    }

    /// Rebuilds device-owned helper textures after a device reset.
    pub fn on_reset_device(&mut self) {
        self.build_placeholders();
    }

    /// Drops everything referencing the lost device.
    pub fn on_lost_device(&mut self) {
        self.placeholder = None;
        self.missing = None;
        self.clear();
    }

    /// Full teardown: clears the cache (waiting out in-flight jobs) and
    /// unbinds the factory.
    pub fn on_destroy_device(&mut self) {
        self.clear();
        self.placeholder = None;
        self.missing = None;
        self.ctx.set_factory(None);
    }

    fn build_placeholders(&mut self) {
        let Some(factory) = self.ctx.factory() else {
            return;
        };
        let options = TextureOptions {
            no_filter: true,
            ..TextureOptions::default()
        };

        let grey = solid_pixels(4, 0xFF80_8080);
        match factory.create_texture_raw(4, 4, &grey, &options) {
            Ok(handle) => self.placeholder = Some(handle),
            Err(err) => log::warn!("failed to create grey placeholder: {err}"),
        }

        let checker = checker_pixels(8, 0xFFFF_00FF, 0xFF00_0000);
        match factory.create_texture_raw(8, 8, &checker, &options) {
            Ok(handle) => self.missing = Some(handle),
            Err(err) => log::warn!("failed to create missing placeholder: {err}"),
        }
    }

    // --- Frame housekeeping ---

    /// Per-frame bookkeeping: snapshots and resets the per-bucket
    /// creation/touch counters and advances the async-disable window.
    pub fn swap(&mut self) {
        let mut created = 0;
        let mut touched = 0;
        for bucket in &self.buckets {
            let (c, t) = bucket.take_frame_counters();
            created += c;
            touched += t;
        }
        self.created_last_frame = created;
        self.touched_last_frame = touched;
        if self.disable_async_frames > 0 {
            self.disable_async_frames -= 1;
        }
    }

    /// Empties the cache. Blocks until every in-flight job has finished
    /// so no job can touch a released device resource.
    pub fn clear(&mut self) {
        let started = Instant::now();
        let mut warned = false;
        while self.outstanding_jobs.load(Ordering::SeqCst) > 0 {
            std::thread::sleep(Duration::from_millis(1));
            if !warned && started.elapsed() > CLEAR_WAIT_WARN {
                log::warn!(
                    "clear() waiting on {} outstanding load jobs",
                    self.outstanding_jobs.load(Ordering::SeqCst)
                );
                warned = true;
            }
        }
        for bucket in &self.buckets {
            bucket.clear();
        }
        self.usage_bytes = 0;
    }

    /// Aggressive whole-cache release for memory-constrained targets.
    /// A no-op elsewhere unless potato mode forces it.
    pub fn garbage_collect(&mut self) {
        if cfg!(target_pointer_width = "32") || self.potato_mode {
            log::info!("garbage collecting texture cache");
            self.clear();
        }
    }

    /// Releases every resident high-resolution texture so the next
    /// update re-streams it from storage.
    pub fn reload_high(&mut self) {
        for bucket in &self.buckets {
            for level in bucket.snapshot() {
                level.unload_high();
            }
        }
    }

    /// Advances the frame and, when budget enforcement is on, runs the
    /// admission pass against `budget_bytes`.
    ///
    /// Returns `true` while any on-screen entry is still waiting on its
    /// high-resolution data, so callers can keep a loading indicator up.
    pub fn update(&mut self, elapsed: Duration, budget_bytes: usize) -> bool {
        self.frame_index += 1;
        if !self.budget_enabled {
            return false;
        }
        self.budget_bytes = budget_bytes;
        let pending = self.adjust_levels();
        log::trace!(
            "frame {}: {} / {} bytes, pending={pending}, dt={elapsed:?}",
            self.frame_index,
            self.usage_bytes,
            self.budget_bytes
        );
        pending
    }

    /// The admission-control pass: snapshot, sort by priority, then walk
    /// once, greedily admitting entries until the budget is spent and
    /// unloading resident entries past the cutoff.
    ///
    /// The walk never refuses the first entry, so the highest-priority
    /// texture always makes progress even when it alone exceeds the
    /// budget; the overshoot is tracked, not capped.
    fn adjust_levels(&mut self) -> bool {
        let mut snapshot: Vec<Arc<TextureLevel>> = Vec::new();
        for bucket in &self.buckets {
            snapshot.extend(bucket.snapshot());
        }
        for level in &snapshot {
            level.cache_order(self.frame_index, self.active_window);
        }
        snapshot.sort_by(|a, b| b.cached_order().cmp(&a.cached_order()));

        let can_kick = self.ctx.has_factory() && !self.potato_mode;
        let mut usage = 0usize;
        let mut pending_active = false;

        for level in &snapshot {
            let total = level.total_size();
            // The head of the list is never refused, whatever its size:
            // the highest-priority texture must always make progress.
            if usage == 0 || usage + total < self.budget_bytes {
                // Admitted: account the full would-be size.
                usage += total;
                if level.state() != LevelState::Ready && can_kick {
                    if !level.is_kicked() {
                        self.kick_level(level);
                    }
                    if level.is_active(self.frame_index, self.active_window) {
                        pending_active = true;
                    }
                }
            } else {
                // Over budget: only the resident bytes still count.
                usage += level.current_size();
                level.unload_high();
            }
        }

        self.usage_bytes = usage;
        pending_active
    }

    /// Submits or runs one high-resolution load.
    ///
    /// Async execution requires the feature flag, no active disable
    /// window, an async-eligible descriptor, and a free job slot;
    /// anything else loads synchronously on the calling thread.
    fn kick_level(&self, level: &Arc<TextureLevel>) {
        let active = level.is_active(self.frame_index, self.active_window);
        let can_async = self.async_enabled
            && self.disable_async_frames == 0
            && level.desc().is_async()
            && self.outstanding_jobs.load(Ordering::SeqCst) < self.max_in_flight;

        if can_async {
            self.outstanding_jobs.fetch_add(1, Ordering::SeqCst);
            level.set_kicked(true);
            level.note_kick_start();

            let ctx = self.ctx.clone();
            let job_level = level.clone();
            let outstanding = self.outstanding_jobs.clone();
            let latency = self.latency.clone();
            let priority = if active {
                JobPriority::Medium
            } else {
                JobPriority::Idle
            };

            self.scheduler.schedule(
                priority,
                Box::new(move || {
                    let started = Instant::now();
                    job_level.load_high(&ctx);
                    let took = started.elapsed();
                    job_level.note_completion(took);
                    latency.lock().unwrap().record(took);
                    outstanding.fetch_sub(1, Ordering::SeqCst);
                    job_level.set_kicked(false);
                }),
            );
        } else {
            let started = Instant::now();
            level.load_high(&self.ctx);
            let took = started.elapsed();
            level.note_completion(took);
            self.latency.lock().unwrap().record(took);
        }
    }

    // --- Cache access ---

    fn bucket_for(&self, hash: u64) -> &StreamBucket {
        &self.buckets[(hash % self.buckets.len() as u64) as usize]
    }

    /// Reports dimensions and the size estimate for `desc`, creating and
    /// low-loading the entry if needed. Never throttled.
    pub fn gather(&self, desc: &TextureDesc) -> TextureInfos {
        self.bucket_for(desc.hash()).gather(desc, &self.ctx)
    }

    /// Returns the best available texture for `desc`, marking the entry
    /// active with the caller's on-screen pixel estimate. Substitutes a
    /// placeholder when nothing usable is resident.
    pub fn fetch(&self, desc: &TextureDesc, pixel_footprint: u32) -> Option<TextureHandle> {
        let policy = FetchPolicy {
            throttling: self.throttling_enabled,
            budget_enabled: self.budget_enabled,
            potato: self.potato_mode,
        };
        let handle = self.bucket_for(desc.hash()).fetch(
            desc,
            pixel_footprint,
            self.frame_index,
            &policy,
            &self.ctx,
        );
        handle.or_else(|| self.substitute(desc))
    }

    /// Whether the entry exists and its high-resolution data is resident.
    pub fn is_ready(&self, desc: &TextureDesc) -> bool {
        self.bucket_for(desc.hash()).is_ready(desc.hash())
    }

    fn substitute(&self, desc: &TextureDesc) -> Option<TextureHandle> {
        if cfg!(debug_assertions) {
            if let Some(missing) = &self.missing {
                return Some(missing.clone());
            }
        }
        if !desc.is_interface() && desc.kind() == TextureKind::Default {
            return self.placeholder.clone();
        }
        None
    }

    // --- Feature flags ---

    /// Enables or disables asynchronous loads.
    pub fn set_async(&mut self, enabled: bool) {
        self.async_enabled = enabled;
    }

    /// Enables or disables new-entry creation throttling.
    pub fn set_throttling(&mut self, enabled: bool) {
        self.throttling_enabled = enabled;
    }

    /// Enables or disables budget enforcement.
    pub fn set_budget(&mut self, enabled: bool) {
        self.budget_enabled = enabled;
    }

    /// Enables or disables fail-fast on load failures.
    pub fn set_throw(&mut self, enabled: bool) {
        self.ctx.set_throw_on_missing(enabled);
    }

    /// Enables or disables potato mode (no high-resolution data at all).
    pub fn set_potato(&mut self, enabled: bool) {
        self.potato_mode = enabled;
    }

    /// Forces synchronous loads for the next `frames` frames. Used
    /// around camera cuts where async pop-in would be jarring.
    pub fn disable_async(&mut self, frames: u32) {
        self.disable_async_frames = self.disable_async_frames.max(frames);
    }

    /// The frame counter advanced by [`update`](Self::update).
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// A snapshot of counters, byte totals, latency and flags.
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            level_count: self.buckets.iter().map(|b| b.len()).sum(),
            resident_bytes: self.usage_bytes,
            budget_bytes: self.budget_bytes,
            outstanding_jobs: self.outstanding_jobs.load(Ordering::SeqCst),
            created_last_frame: self.created_last_frame,
            touched_last_frame: self.touched_last_frame,
            async_enabled: self.async_enabled,
            throttling_enabled: self.throttling_enabled,
            budget_enabled: self.budget_enabled,
            throw_on_missing: self.ctx.throw_on_missing(),
            potato_mode: self.potato_mode,
            load_latency: self.latency.lock().unwrap().summarize(),
        }
    }
}

impl std::fmt::Debug for TextureStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureStreamer")
            .field("frame", &self.frame_index)
            .field("buckets", &self.buckets.len())
            .field("budget_bytes", &self.budget_bytes)
            .field("usage_bytes", &self.usage_bytes)
            .finish()
    }
}

/// `size * size` pixels of one RGBA color (byte order R,G,B,A as the
/// little-endian bytes of the given word).
fn solid_pixels(size: u32, rgba: u32) -> Vec<u8> {
    let pixels = vec![rgba; (size * size) as usize];
    bytemuck::cast_slice(&pixels).to_vec()
}

/// A `size * size` two-color checkerboard.
fn checker_pixels(size: u32, a: u32, b: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            pixels.push(if (x + y) % 2 == 0 { a } else { b });
        }
    }
    bytemuck::cast_slice(&pixels).to_vec()
}
