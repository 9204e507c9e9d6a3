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

//! The immutable descriptor that identifies a texture load request.

use vesper_core::texture::{TextureFlags, TextureKind, TextureOptions};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Path prefixes that mark a texture as part of the UI layer.
const INTERFACE_PREFIXES: [&str; 2] = ["ui/", "interface/"];

/// Path prefixes that are always loaded synchronously: loading-screen
/// imagery must be visible before the worker pool is guaranteed to spin.
const SYNC_PREFIXES: [&str; 2] = ["loading/", "loadscreens/"];

/// An immutable, hashable request key describing what to load and how.
///
/// Two descriptors built from the same `(path, kind, flags)` always carry
/// the same hash; the hash is the primary cache key and the shard router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    path: String,
    kind: TextureKind,
    flags: TextureFlags,
    hash: u64,
    is_interface: bool,
    is_async: bool,
    allow_mip_skip: bool,
}

impl TextureDesc {
    /// Builds a descriptor. Always succeeds and is cheap: one string hash
    /// plus two path-prefix scans, no side effects.
    pub fn new(path: impl Into<String>, kind: TextureKind, flags: TextureFlags) -> Self {
        let path = path.into();
        let hash = stable_hash(&path, kind, flags);
        let is_interface = INTERFACE_PREFIXES.iter().any(|p| path.starts_with(p))
            || path.contains("/interface/");
        let is_async = !SYNC_PREFIXES.iter().any(|p| path.starts_with(p))
            && !flags.contains(TextureFlags::READABLE);
        let allow_mip_skip = kind == TextureKind::Default
            && !flags.contains(TextureFlags::RAW)
            && !flags.contains(TextureFlags::FROM_DISK);

        Self {
            path,
            kind,
            flags,
            hash,
            is_interface,
            is_async,
            allow_mip_skip,
        }
    }

    /// The logical resource path of the request.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Which device creation routine to use downstream.
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// The request flags.
    pub fn flags(&self) -> TextureFlags {
        self.flags
    }

    /// The stable 64-bit cache key derived from `(path, kind, flags)`.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// `true` if the path matches the UI-texture heuristics. Interface
    /// textures sort ahead of world textures of equal activity.
    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// `false` for paths that require synchronous loads (loading-screen
    /// imagery, CPU-readable textures); `true` otherwise.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// `true` when top mip levels may be dropped under memory pressure.
    /// Only plain 2D container loads qualify.
    pub fn allow_mip_skip(&self) -> bool {
        self.allow_mip_skip
    }

    /// Device creation options derived from the request flags.
    pub fn options(&self) -> TextureOptions {
        TextureOptions {
            srgb: self.flags.contains(TextureFlags::SRGB),
            no_filter: self.flags.contains(TextureFlags::NO_FILTER),
            premultiply_alpha: self.flags.contains(TextureFlags::PREMULTIPLY_ALPHA),
            readable: self.flags.contains(TextureFlags::READABLE),
            low_quality: false,
        }
    }
}

/// FNV-1a over the path bytes, the kind discriminant, and the flag bits.
///
/// `std`'s `DefaultHasher` is unsuitable here: its output may change
/// between processes, and this hash is a persistent routing key that must
/// distribute evenly across bucket shards.
fn stable_hash(path: &str, kind: TextureKind, flags: TextureFlags) -> u64 {
    let mut hash = FNV_OFFSET;
    let mut step = |byte: u8| {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    };
    for byte in path.bytes() {
        step(byte);
    }
    step(kind.discriminant());
    for byte in flags.bits().to_le_bytes() {
        step(byte);
    }
    hash
}
