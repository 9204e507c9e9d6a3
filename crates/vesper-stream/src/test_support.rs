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

//! In-memory collaborator doubles shared by the unit tests.

use crate::context::LoaderContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vesper_core::device::TextureFactory;
use vesper_core::error::{StorageError, TextureError};
use vesper_core::scheduler::{Job, JobPriority, JobScheduler};
use vesper_core::storage::{SidecarHeader, StorageProvider};
use vesper_core::texture::{GpuTexture, ImageHeader, TextureHandle, TextureKind, TextureOptions};

/// Magic of the fake container format used by the tests.
const TEST_MAGIC: [u8; 4] = *b"TST0";

/// Encodes a fake container: magic, then width/height/bpp as LE u32.
pub fn container_bytes(width: u32, height: u32, bits_per_pixel: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&TEST_MAGIC);
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&bits_per_pixel.to_le_bytes());
    out
}

/// Encodes a sidecar payload with a zeroed thumbnail.
pub fn sidecar_bytes(
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    thumb_width: u32,
    thumb_height: u32,
) -> Vec<u8> {
    SidecarHeader {
        width,
        height,
        bits_per_pixel,
        thumb_width,
        thumb_height,
        thumbnail: vec![0; (thumb_width * thumb_height * 4) as usize],
    }
    .encode()
}

/// An in-memory storage provider with an optional artificial read delay.
#[derive(Default)]
pub struct MemStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    delay: Mutex<Duration>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, bytes: Vec<u8>) {
        self.entries.lock().unwrap().insert(path.into(), bytes);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

impl StorageProvider for MemStorage {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.entries
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_string(),
            })
    }
}

/// A factory that understands the fake container format and counts
/// creations instead of touching a device.
#[derive(Debug, Default)]
pub struct CountingFactory {
    containers: AtomicUsize,
    raws: AtomicUsize,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn containers_created(&self) -> usize {
        self.containers.load(Ordering::SeqCst)
    }

    pub fn raw_created(&self) -> usize {
        self.raws.load(Ordering::SeqCst)
    }
}

impl TextureFactory for CountingFactory {
    fn parse_header(&self, bytes: &[u8]) -> Result<ImageHeader, TextureError> {
        if bytes.len() < 16 || bytes[0..4] != TEST_MAGIC {
            let mut magic = [0u8; 4];
            magic.copy_from_slice(&bytes.get(0..4).unwrap_or(&[0; 4])[..4]);
            return Err(TextureError::UnknownContainer { magic });
        }
        let field = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        Ok(ImageHeader {
            width: field(4),
            height: field(8),
            bits_per_pixel: field(12),
        })
    }

    fn create_texture(
        &self,
        _kind: TextureKind,
        bytes: &[u8],
        _options: &TextureOptions,
    ) -> Result<TextureHandle, TextureError> {
        let header = self.parse_header(bytes)?;
        self.containers.fetch_add(1, Ordering::SeqCst);
        Ok(TextureHandle::new(GpuTexture {
            width: header.width,
            height: header.height,
            byte_size: (header.width as usize * header.height as usize * header.bits_per_pixel as usize) / 8,
            label: "counting-container".to_string(),
        }))
    }

    fn create_texture_raw(
        &self,
        width: u32,
        height: u32,
        rgba: &[u8],
        _options: &TextureOptions,
    ) -> Result<TextureHandle, TextureError> {
        if rgba.len() != (width * height * 4) as usize {
            return Err(TextureError::Decode {
                label: "counting-raw".to_string(),
                details: "pixel length mismatch".to_string(),
            });
        }
        self.raws.fetch_add(1, Ordering::SeqCst);
        Ok(TextureHandle::new(GpuTexture {
            width,
            height,
            byte_size: rgba.len(),
            label: "counting-raw".to_string(),
        }))
    }
}

/// A scheduler that queues jobs until the test drains them, making
/// asynchronous flows deterministic.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<(JobPriority, Job)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every queued job on the calling thread; returns how many ran.
    pub fn run_all(&self) -> usize {
        let jobs: Vec<_> = self.queue.lock().unwrap().drain(..).collect();
        let count = jobs.len();
        for (_, job) in jobs {
            job();
        }
        count
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Priorities of the queued jobs, in submission order.
    pub fn queued_priorities(&self) -> Vec<JobPriority> {
        self.queue.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }
}

impl JobScheduler for ManualScheduler {
    fn schedule(&self, priority: JobPriority, job: Job) {
        self.queue.lock().unwrap().push((priority, job));
    }
}

/// Builds a loader context around fresh in-memory doubles.
pub fn test_context() -> (Arc<LoaderContext>, Arc<MemStorage>, Arc<CountingFactory>) {
    let storage = Arc::new(MemStorage::new());
    let factory = Arc::new(CountingFactory::new());
    let ctx = Arc::new(LoaderContext::new(storage.clone()));
    ctx.set_factory(Some(factory.clone()));
    (ctx, storage, factory)
}
