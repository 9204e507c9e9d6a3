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

//! Defines data structures related to GPU texture resources.

use std::ops::Deref;
use std::sync::Arc;

/// The dimensionality of a texture, selecting which device creation
/// routine runs downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// An ordinary two-dimensional texture.
    Default,
    /// A cubemap texture (6 faces).
    Cube,
    /// A three-dimensional (volumetric) texture.
    Volume,
}

impl TextureKind {
    /// A stable small integer used when hashing descriptors.
    pub const fn discriminant(self) -> u8 {
        match self {
            TextureKind::Default => 0,
            TextureKind::Cube => 1,
            TextureKind::Volume => 2,
        }
    }
}

/// Flags describing how a texture load request should be interpreted.
///
/// Multiple flags can be combined using bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureFlags {
    bits: u32,
}

impl TextureFlags {
    /// No flags.
    pub const NONE: Self = Self { bits: 0 };
    /// The payload is raw pixel data, not an image container.
    pub const RAW: Self = Self { bits: 1 << 0 };
    /// The payload must be read straight from disk, bypassing packed data.
    pub const FROM_DISK: Self = Self { bits: 1 << 1 };
    /// The texture must stay CPU-readable after upload.
    pub const READABLE: Self = Self { bits: 1 << 2 };
    /// Sample the texture in sRGB space.
    pub const SRGB: Self = Self { bits: 1 << 3 };
    /// Premultiply alpha during upload.
    pub const PREMULTIPLY_ALPHA: Self = Self { bits: 1 << 4 };
    /// Disable texture filtering (point sampling).
    pub const NO_FILTER: Self = Self { bits: 1 << 5 };

    /// Creates a new set of flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags contain all bits of `other`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if no flag is set.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for TextureFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for TextureFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// The result of a dimension-only probe of an image container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Width of the full-resolution image in pixels.
    pub width: u32,
    /// Height of the full-resolution image in pixels.
    pub height: u32,
    /// Bits per pixel of the decoded representation.
    pub bits_per_pixel: u32,
}

/// Options applied when creating a texture on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureOptions {
    /// Sample in sRGB space.
    pub srgb: bool,
    /// Point sampling instead of filtered sampling.
    pub no_filter: bool,
    /// Premultiply alpha during upload.
    pub premultiply_alpha: bool,
    /// Keep the texture CPU-readable.
    pub readable: bool,
    /// Upload a reduced-resolution representation instead of the full
    /// mip chain. Used for the cheap first-touch load.
    pub low_quality: bool,
}

/// The device-side representation of an uploaded texture.
///
/// Instances are only ever created by a [`TextureFactory`](crate::device::TextureFactory)
/// and shared through [`TextureHandle`]s.
#[derive(Debug)]
pub struct GpuTexture {
    /// Width in pixels of the uploaded representation.
    pub width: u32,
    /// Height in pixels of the uploaded representation.
    pub height: u32,
    /// Bytes of GPU memory the representation occupies.
    pub byte_size: usize,
    /// A debug label, typically the source path.
    pub label: String,
}

/// A thread-safe, reference-counted handle to a GPU texture.
///
/// Cloning a handle is cheap: it only increments the reference count. The
/// device resource is released when the last handle is dropped.
#[derive(Debug)]
pub struct TextureHandle(Arc<GpuTexture>);

impl TextureHandle {
    /// Wraps a freshly created device texture in a shared handle.
    pub fn new(texture: GpuTexture) -> Self {
        Self(Arc::new(texture))
    }

    /// Returns `true` if both handles refer to the same device texture.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Clone for TextureHandle {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Deref for TextureHandle {
    type Target = GpuTexture;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
