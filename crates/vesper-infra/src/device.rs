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

//! A texture factory that never touches a GPU.

use crate::containers::{self, Container};
use std::sync::atomic::{AtomicUsize, Ordering};
use vesper_core::device::TextureFactory;
use vesper_core::error::TextureError;
use vesper_core::texture::{
    GpuTexture, ImageHeader, TextureHandle, TextureKind, TextureOptions,
};

/// A [`TextureFactory`] for tools, asset validation and tests: it probes
/// and decodes like a real backend but "uploads" by recording sizes.
///
/// Low-quality creations model the thumbnail path by quartering each
/// dimension, the same reduction the budget pass assumes for mip-skip.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    created: AtomicUsize,
    uploaded_bytes: AtomicUsize,
}

impl HeadlessFactory {
    /// Creates a factory with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total textures created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Total bytes "uploaded" so far.
    pub fn uploaded_bytes(&self) -> usize {
        self.uploaded_bytes.load(Ordering::SeqCst)
    }

    fn record(&self, byte_size: usize) {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.uploaded_bytes.fetch_add(byte_size, Ordering::SeqCst);
    }
}

impl TextureFactory for HeadlessFactory {
    fn parse_header(&self, bytes: &[u8]) -> Result<ImageHeader, TextureError> {
        containers::probe(bytes)
    }

    fn create_texture(
        &self,
        kind: TextureKind,
        bytes: &[u8],
        options: &TextureOptions,
    ) -> Result<TextureHandle, TextureError> {
        let header = containers::probe(bytes)?;

        // Fully decode the formats the image crate covers, so corrupt
        // payloads fail here the same way they would on a real backend.
        if matches!(
            Container::detect(bytes),
            Some(Container::Png) | Some(Container::Jpeg)
        ) {
            image::load_from_memory(bytes).map_err(|err| TextureError::Decode {
                label: format!("{kind:?}"),
                details: err.to_string(),
            })?;
        }

        let (width, height) = if options.low_quality {
            ((header.width / 4).max(1), (header.height / 4).max(1))
        } else {
            (header.width, header.height)
        };
        let byte_size = width as usize * height as usize * header.bits_per_pixel as usize / 8;
        self.record(byte_size);
        Ok(TextureHandle::new(GpuTexture {
            width,
            height,
            byte_size,
            label: format!("headless/{kind:?}"),
        }))
    }

    fn create_texture_raw(
        &self,
        width: u32,
        height: u32,
        rgba: &[u8],
        _options: &TextureOptions,
    ) -> Result<TextureHandle, TextureError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(TextureError::Decode {
                label: "raw".to_string(),
                details: format!("expected {expected} bytes, got {}", rgba.len()),
            });
        }
        self.record(rgba.len());
        Ok(TextureHandle::new(GpuTexture {
            width,
            height,
            byte_size: rgba.len(),
            label: "headless/raw".to_string(),
        }))
    }
}
