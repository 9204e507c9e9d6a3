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

//! The per-descriptor cache entry and its lock-free state machine.

use crate::context::LoaderContext;
use crate::desc::TextureDesc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};
use vesper_core::error::TextureError;
use vesper_core::storage::{sidecar_path, SidecarHeader};
use vesper_core::texture::{ImageHeader, TextureHandle};

/// Fixed byte footprint attributed to a resident low-resolution
/// representation. Thumbnails are tiny; a flat estimate keeps the budget
/// math cheap.
pub const LOW_RES_FOOTPRINT: usize = 4 * 1024;

/// How long a metadata wait may run before a diagnostic warning is logged.
const META_WAIT_WARN: Duration = Duration::from_secs(2);

/// The lifecycle state of a [`TextureLevel`].
///
/// `Initialising` and `Loading` are busy states: the thread that won the
/// transition into them is the only one allowed to mutate the entry until
/// it stores the follow-up state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LevelState {
    /// Nothing loaded yet.
    Empty = 0,
    /// A thread is performing the synchronous low-resolution load.
    Initialising = 1,
    /// Metadata and the low-resolution representation are available.
    Startup = 2,
    /// A thread is loading or releasing the high-resolution data.
    Loading = 3,
    /// The high-resolution representation is resident.
    Ready = 4,
}

impl LevelState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LevelState::Initialising,
            2 => LevelState::Startup,
            3 => LevelState::Loading,
            4 => LevelState::Ready,
            _ => LevelState::Empty,
        }
    }
}

/// Dimensions and the budgeting size estimate of a texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureInfos {
    /// Full-resolution width in pixels.
    pub width: u32,
    /// Full-resolution height in pixels.
    pub height: u32,
    /// Estimated bytes of the full mip chain, computed from the
    /// dimensions and pixel depth. This is a budgeting figure, not the
    /// compressed on-disk size.
    pub full_byte_size: usize,
}

impl TextureInfos {
    /// Builds infos from a probed container header.
    pub fn from_header(header: &ImageHeader) -> Self {
        Self {
            width: header.width,
            height: header.height,
            full_byte_size: mip_chain_bytes(header.width, header.height, header.bits_per_pixel),
        }
    }

    /// Builds infos from a parsed sidecar.
    pub fn from_sidecar(sidecar: &SidecarHeader) -> Self {
        Self {
            width: sidecar.width,
            height: sidecar.height,
            full_byte_size: mip_chain_bytes(sidecar.width, sidecar.height, sidecar.bits_per_pixel),
        }
    }
}

/// Sums the geometric mip series down to 1x1.
fn mip_chain_bytes(width: u32, height: u32, bits_per_pixel: u32) -> usize {
    let mut w = width as usize;
    let mut h = height as usize;
    let bpp = bits_per_pixel as usize;
    let mut total = 0;
    loop {
        total += (w * h * bpp) / 8;
        if w <= 1 && h <= 1 {
            break;
        }
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    total
}

/// The cache entry for one descriptor: two texture slots, a state
/// machine, and the per-frame activity metadata the admission pass sorts
/// on.
///
/// Every state transition is claimed through a compare-and-swap into a
/// busy state, so at most one thread ever loads or unloads a given entry
/// while readers stay lock-free on the fast path.
pub struct TextureLevel {
    desc: TextureDesc,
    state: AtomicU8,
    meta: Mutex<Option<TextureInfos>>,
    meta_ready: Condvar,
    // Mirror of `meta`'s byte estimate so the per-frame budget pass never
    // takes the metadata lock.
    full_size: AtomicUsize,
    low: RwLock<Option<TextureHandle>>,
    high: RwLock<Option<TextureHandle>>,
    last_active_frame: AtomicU64,
    pixel_footprint: AtomicU32,
    cached_order: AtomicU64,
    is_kicked: AtomicBool,
    kick_started: Mutex<Option<Instant>>,
    completion: Mutex<Option<Duration>>,
}

impl TextureLevel {
    /// Creates an empty entry for `desc`.
    pub fn new(desc: TextureDesc) -> Self {
        Self {
            desc,
            state: AtomicU8::new(LevelState::Empty as u8),
            meta: Mutex::new(None),
            meta_ready: Condvar::new(),
            full_size: AtomicUsize::new(0),
            low: RwLock::new(None),
            high: RwLock::new(None),
            last_active_frame: AtomicU64::new(0),
            pixel_footprint: AtomicU32::new(0),
            cached_order: AtomicU64::new(0),
            is_kicked: AtomicBool::new(false),
            kick_started: Mutex::new(None),
            completion: Mutex::new(None),
        }
    }

    /// The descriptor this entry caches.
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    /// The current lifecycle state.
    pub fn state(&self) -> LevelState {
        LevelState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn try_transition(&self, from: LevelState, to: LevelState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Performs the synchronous first-touch load: metadata plus the cheap
    /// low-resolution representation.
    ///
    /// A silent no-op unless the entry is `Empty` and this thread wins the
    /// claim. The transition to `Startup` always completes, even on
    /// failure, so metadata waiters are never stranded.
    pub fn load_low(&self, ctx: &LoaderContext) {
        if !self.try_transition(LevelState::Empty, LevelState::Initialising) {
            return;
        }

        let infos = match self.run_low_load(ctx) {
            Ok(infos) => infos,
            Err(err) => {
                self.report_failure("low-res", &err, ctx);
                TextureInfos::default()
            }
        };

        self.full_size.store(infos.full_byte_size, Ordering::Relaxed);
        *self.meta.lock().unwrap() = Some(infos);
        self.meta_ready.notify_all();
        self.state.store(LevelState::Startup as u8, Ordering::Release);
    }

    fn run_low_load(&self, ctx: &LoaderContext) -> Result<TextureInfos, TextureError> {
        let factory = ctx.factory().ok_or(TextureError::NoDevice)?;
        let mut options = self.desc.options();
        options.low_quality = true;

        match ctx.storage().read(&sidecar_path(self.desc.path())) {
            Ok(bytes) => {
                let sidecar = SidecarHeader::parse(&bytes)?;
                let low = factory.create_texture_raw(
                    sidecar.thumb_width,
                    sidecar.thumb_height,
                    &sidecar.thumbnail,
                    &options,
                )?;
                *self.low.write().unwrap() = Some(low);
                Ok(TextureInfos::from_sidecar(&sidecar))
            }
            Err(err) if err.is_not_found() => {
                // No sidecar: fall back to probing the full payload.
                let bytes = ctx.storage().read(self.desc.path())?;
                let header = factory.parse_header(&bytes)?;
                let low = factory.create_texture(self.desc.kind(), &bytes, &options)?;
                *self.low.write().unwrap() = Some(low);
                Ok(TextureInfos::from_header(&header))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Loads the full-resolution representation. A silent no-op unless
    /// the entry is at `Startup` and this thread wins the claim.
    pub fn load_high(&self, ctx: &LoaderContext) {
        if !self.try_transition(LevelState::Startup, LevelState::Loading) {
            return;
        }

        match self.run_high_load(ctx) {
            Ok(handle) => {
                *self.high.write().unwrap() = Some(handle);
                self.state.store(LevelState::Ready as u8, Ordering::Release);
            }
            Err(err) => {
                self.report_failure("high-res", &err, ctx);
                self.state.store(LevelState::Startup as u8, Ordering::Release);
            }
        }
    }

    fn run_high_load(&self, ctx: &LoaderContext) -> Result<TextureHandle, TextureError> {
        let factory = ctx.factory().ok_or(TextureError::NoDevice)?;
        let bytes = ctx.storage().read(self.desc.path())?;
        factory.create_texture(self.desc.kind(), &bytes, &self.desc.options())
    }

    /// Releases the full-resolution representation, returning the entry
    /// to `Startup`. A silent no-op unless the entry is `Ready`.
    pub fn unload_high(&self) {
        if !self.try_transition(LevelState::Ready, LevelState::Loading) {
            return;
        }
        *self.high.write().unwrap() = None;
        self.state.store(LevelState::Startup as u8, Ordering::Release);
    }

    fn report_failure(&self, stage: &str, err: &TextureError, ctx: &LoaderContext) {
        if ctx.throw_on_missing() {
            panic!("{stage} load failed for '{}': {err}", self.desc.path());
        }
        match err {
            // Missing data is an expected runtime condition; the entry
            // simply keeps no usable texture.
            TextureError::Storage(storage_err) if storage_err.is_not_found() => {
                log::debug!("{stage} load skipped for '{}': {err}", self.desc.path());
            }
            _ => {
                log::warn!("{stage} load failed for '{}': {err}", self.desc.path());
            }
        }
    }

    /// Blocks until metadata is published, then returns it.
    ///
    /// Callers must have triggered the low-resolution load (directly or
    /// through another thread) before waiting here; the publishing side
    /// always completes, even when the load fails. Long waits log a
    /// diagnostic warning but keep waiting.
    pub fn infos(&self) -> TextureInfos {
        let mut meta = self.meta.lock().unwrap();
        loop {
            if let Some(infos) = *meta {
                return infos;
            }
            let (guard, timeout) = self.meta_ready.wait_timeout(meta, META_WAIT_WARN).unwrap();
            meta = guard;
            if timeout.timed_out() && meta.is_none() {
                log::warn!(
                    "still waiting on metadata for '{}' after {:?}",
                    self.desc.path(),
                    META_WAIT_WARN
                );
            }
        }
    }

    /// The best representation currently resident: high-resolution when
    /// `Ready`, else the low-resolution thumbnail, else nothing. Never
    /// blocks.
    pub fn texture(&self) -> Option<TextureHandle> {
        if self.state() == LevelState::Ready {
            if let Some(handle) = self.high.read().unwrap().clone() {
                return Some(handle);
            }
        }
        self.low.read().unwrap().clone()
    }

    /// The bytes this entry would occupy if admitted: the low-resolution
    /// footprint plus the full-chain estimate, quartered while mip-skip
    /// applies and the high-resolution data is not yet resident.
    pub fn total_size(&self) -> usize {
        let full = self.full_size.load(Ordering::Relaxed);
        let high = if self.desc.allow_mip_skip() && self.state() != LevelState::Ready {
            full / 4
        } else {
            full
        };
        LOW_RES_FOOTPRINT + high
    }

    /// The bytes actually resident right now.
    pub fn current_size(&self) -> usize {
        let mut resident = 0;
        if self.low.read().unwrap().is_some() {
            resident += LOW_RES_FOOTPRINT;
        }
        if self.state() == LevelState::Ready {
            resident += self.full_size.load(Ordering::Relaxed);
        }
        resident
    }

    /// Records a fetch request: stamps the frame and folds the caller's
    /// on-screen pixel estimate into the running maximum. The maximum
    /// never decays.
    pub fn mark_active(&self, frame: u64, pixel_footprint: u32) {
        self.last_active_frame.store(frame, Ordering::Relaxed);
        self.pixel_footprint.fetch_max(pixel_footprint, Ordering::Relaxed);
    }

    /// Whether a fetch touched this entry within the activity window
    /// ending at `frame`.
    pub fn is_active(&self, frame: u64, window: u64) -> bool {
        frame.saturating_sub(self.last_active_frame.load(Ordering::Relaxed)) < window
    }

    /// The frame of the most recent fetch request.
    pub fn last_active_frame(&self) -> u64 {
        self.last_active_frame.load(Ordering::Relaxed)
    }

    /// Computes and caches the packed priority key for this frame.
    ///
    /// From least to most significant: size in MiB (16 bits), requested
    /// pixel footprint (16 bits), interface bit, activity bit. Sorting
    /// descending therefore ranks active > interface > more demanded
    /// pixels > more bytes.
    pub fn cache_order(&self, frame: u64, active_window: u64) -> u64 {
        let size_mb = ((self.total_size() >> 20) as u64).min(0xFFFF);
        let pixels = (self.pixel_footprint.load(Ordering::Relaxed) as u64).min(0xFFFF);
        let mut key = size_mb | (pixels << 16);
        if self.desc.is_interface() {
            key |= 1 << 32;
        }
        if self.is_active(frame, active_window) {
            key |= 1 << 40;
        }
        self.cached_order.store(key, Ordering::Relaxed);
        key
    }

    /// The key computed by the most recent [`cache_order`](Self::cache_order) call.
    pub fn cached_order(&self) -> u64 {
        self.cached_order.load(Ordering::Relaxed)
    }

    /// Whether an asynchronous load job is currently in flight.
    pub fn is_kicked(&self) -> bool {
        self.is_kicked.load(Ordering::Acquire)
    }

    /// Marks or clears the in-flight job flag.
    pub fn set_kicked(&self, value: bool) {
        self.is_kicked.store(value, Ordering::Release);
    }

    /// Stamps the moment a load job was submitted.
    pub fn note_kick_start(&self) {
        *self.kick_started.lock().unwrap() = Some(Instant::now());
    }

    /// When the in-flight load job was submitted, if any.
    pub fn kick_started_at(&self) -> Option<Instant> {
        *self.kick_started.lock().unwrap()
    }

    /// Records how long the most recent high-resolution load took.
    pub fn note_completion(&self, took: Duration) {
        *self.completion.lock().unwrap() = Some(took);
    }

    /// Duration of the most recent completed high-resolution load.
    pub fn last_completion(&self) -> Option<Duration> {
        *self.completion.lock().unwrap()
    }
}

impl std::fmt::Debug for TextureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureLevel")
            .field("path", &self.desc.path())
            .field("state", &self.state())
            .field("kicked", &self.is_kicked())
            .finish()
    }
}
