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

//! End-to-end streaming tests over the real filesystem storage, worker
//! pool, and headless device factory.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use vesper_core::storage::{sidecar_path, SidecarHeader};
use vesper_core::texture::{TextureFlags, TextureKind};
use vesper_infra::{FsStorage, HeadlessFactory, WorkerPool};
use vesper_stream::{StreamConfig, TextureDesc, TextureStreamer};

const MIB: usize = 1024 * 1024;

/// A minimal DDS payload: magic plus the 124-byte header.
fn dds_bytes(width: u32, height: u32, bit_count: u32) -> Vec<u8> {
    let mut out = vec![0u8; 128];
    out[0..4].copy_from_slice(b"DDS ");
    out[4..8].copy_from_slice(&124u32.to_le_bytes());
    out[12..16].copy_from_slice(&height.to_le_bytes());
    out[16..20].copy_from_slice(&width.to_le_bytes());
    out[88..92].copy_from_slice(&bit_count.to_le_bytes());
    out
}

fn write(dir: &Path, name: &str, bytes: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

/// Writes a texture payload and its sidecar with a 16x16 thumbnail.
fn write_texture(dir: &Path, name: &str, width: u32, height: u32, bit_count: u32) {
    write(dir, name, &dds_bytes(width, height, bit_count));
    let sidecar = SidecarHeader {
        width,
        height,
        bits_per_pixel: bit_count,
        thumb_width: 16,
        thumb_height: 16,
        thumbnail: vec![0x40; 16 * 16 * 4],
    };
    write(dir, &sidecar_path(name), &sidecar.encode());
}

fn streamer_over(dir: &Path, config: StreamConfig) -> TextureStreamer {
    let storage = Arc::new(FsStorage::new(dir));
    let scheduler = Arc::new(WorkerPool::new(2));
    let mut streamer = TextureStreamer::new(config, storage, scheduler);
    streamer.on_create_device(Arc::new(HeadlessFactory::new()));
    streamer
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    done()
}

/// No-skip descriptor so the budgeted size equals the full estimate.
fn desc(name: &str) -> TextureDesc {
    TextureDesc::new(name, TextureKind::Default, TextureFlags::FROM_DISK)
}

#[test]
fn test_streams_high_resolution_in_background() -> Result<()> {
    let dir = tempdir()?;
    write_texture(dir.path(), "textures/terrain.dds", 1024, 1024, 24);
    let mut streamer = streamer_over(dir.path(), StreamConfig::default());
    let terrain = desc("textures/terrain.dds");

    // First touch serves the sidecar thumbnail.
    let low = streamer.fetch(&terrain, 500).expect("low-res texture");
    assert_eq!((low.width, low.height), (16, 16));

    // The admission pass kicks the background load.
    assert!(streamer.update(Duration::from_millis(16), 64 * MIB));
    assert!(wait_until(Duration::from_secs(5), || streamer.is_ready(&terrain)));

    let high = streamer.fetch(&terrain, 500).expect("high-res texture");
    assert_eq!((high.width, high.height), (1024, 1024));

    // With everything resident, the next pass reports no pending work.
    assert!(!streamer.update(Duration::from_millis(16), 64 * MIB));
    Ok(())
}

#[test]
fn test_gather_reports_dimensions_from_sidecar_alone() -> Result<()> {
    let dir = tempdir()?;
    // Sidecar only: the full payload does not exist.
    let sidecar = SidecarHeader {
        width: 2048,
        height: 2048,
        bits_per_pixel: 32,
        thumb_width: 16,
        thumb_height: 16,
        thumbnail: vec![0; 16 * 16 * 4],
    };
    write(dir.path(), "textures/ghost.dds.header", &sidecar.encode());

    let streamer = streamer_over(dir.path(), StreamConfig::default());
    let infos = streamer.gather(&desc("textures/ghost.dds"));
    assert_eq!((infos.width, infos.height), (2048, 2048));
    assert!(infos.full_byte_size >= 2048 * 2048 * 4);
    Ok(())
}

#[test]
fn test_budget_admits_two_of_three() -> Result<()> {
    let dir = tempdir()?;
    let names = ["textures/a.dds", "textures/b.dds", "textures/c.dds"];
    for name in names {
        write_texture(dir.path(), name, 1024, 1024, 24);
    }
    let mut streamer = streamer_over(dir.path(), StreamConfig::default());
    let descs: Vec<_> = names.iter().map(|n| desc(n)).collect();

    for d in &descs {
        streamer.fetch(d, 100);
    }
    streamer.update(Duration::from_millis(16), 10 * MIB);

    let ready_count = || descs.iter().filter(|d| streamer.is_ready(d)).count();
    assert!(wait_until(Duration::from_secs(5), || ready_count() == 2));
    assert!(wait_until(Duration::from_secs(5), || {
        streamer.stats().outstanding_jobs == 0
    }));
    // The third stays at its low resolution until the budget allows it.
    assert_eq!(ready_count(), 2);
    Ok(())
}

#[test]
fn test_eviction_returns_loser_to_low_res() -> Result<()> {
    let dir = tempdir()?;
    write_texture(dir.path(), "textures/keep.dds", 1024, 1024, 24);
    write_texture(dir.path(), "textures/drop.dds", 1024, 1024, 24);
    let mut streamer = streamer_over(dir.path(), StreamConfig::default());
    let keep = desc("textures/keep.dds");
    let drop = desc("textures/drop.dds");

    streamer.fetch(&keep, 100);
    streamer.fetch(&drop, 100);
    streamer.update(Duration::from_millis(16), 20 * MIB);
    assert!(wait_until(Duration::from_secs(5), || {
        streamer.is_ready(&keep) && streamer.is_ready(&drop)
    }));

    // Age `drop` out of the activity window, then shrink the budget.
    for _ in 0..12 {
        streamer.fetch(&keep, 100);
        streamer.update(Duration::from_millis(16), 20 * MIB);
        streamer.swap();
    }
    streamer.fetch(&keep, 100);
    streamer.update(Duration::from_millis(16), 5 * MIB);

    assert!(streamer.is_ready(&keep));
    assert!(!streamer.is_ready(&drop));
    // The loser still serves its thumbnail.
    let fallback = streamer.fetch(&drop, 1).expect("low-res fallback");
    assert_eq!(fallback.width, 16);
    Ok(())
}

#[test]
fn test_alias_chain_reaches_the_real_payload() -> Result<()> {
    let dir = tempdir()?;
    write_texture(dir.path(), "textures/real.dds", 512, 256, 32);
    write(dir.path(), "textures/alias.dds", b"*textures/real.dds");

    let streamer = streamer_over(dir.path(), StreamConfig::default());
    // No sidecar for the alias: the low load falls back to the full
    // payload, following the indirection.
    let infos = streamer.gather(&desc("textures/alias.dds"));
    assert_eq!((infos.width, infos.height), (512, 256));
    Ok(())
}

#[test]
fn test_missing_texture_substitutes_placeholder() -> Result<()> {
    let dir = tempdir()?;
    let streamer = streamer_over(dir.path(), StreamConfig::default());
    let ghost = desc("textures/ghost.dds");

    let infos = streamer.gather(&ghost);
    assert_eq!(infos.width, 0);
    // The fetch still hands back something drawable.
    assert!(streamer.fetch(&ghost, 10).is_some());
    Ok(())
}

#[test]
fn test_budget_disabled_loads_inline() -> Result<()> {
    let dir = tempdir()?;
    write_texture(dir.path(), "textures/tool.dds", 256, 256, 32);
    let mut streamer = streamer_over(
        dir.path(),
        StreamConfig {
            budget_enabled: false,
            ..StreamConfig::default()
        },
    );
    let tool = desc("textures/tool.dds");

    let handle = streamer.fetch(&tool, 50).expect("inline high-res");
    assert_eq!(handle.width, 256);
    assert!(streamer.is_ready(&tool));
    assert!(!streamer.update(Duration::from_millis(16), 64 * MIB));
    Ok(())
}

#[test]
fn test_destroy_device_clears_everything() -> Result<()> {
    let dir = tempdir()?;
    write_texture(dir.path(), "textures/a.dds", 512, 512, 32);
    let mut streamer = streamer_over(dir.path(), StreamConfig::default());
    let a = desc("textures/a.dds");

    streamer.fetch(&a, 100);
    streamer.update(Duration::from_millis(16), 64 * MIB);
    streamer.on_destroy_device();

    let stats = streamer.stats();
    assert_eq!(stats.level_count, 0);
    assert_eq!(stats.outstanding_jobs, 0);
    Ok(())
}
