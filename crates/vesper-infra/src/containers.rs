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

//! Dimension-only probing of image containers by magic-number dispatch.

use std::io::Cursor;
use vesper_core::error::TextureError;
use vesper_core::texture::ImageHeader;

const DDS_MAGIC: [u8; 4] = *b"DDS ";
const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const KTX_MAGIC: [u8; 4] = [0xAB, b'K', b'T', b'X'];

/// The container formats the probe understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// DirectDraw Surface.
    Dds,
    /// Portable Network Graphics.
    Png,
    /// JPEG/JFIF.
    Jpeg,
    /// Khronos KTX (version 1).
    Ktx,
}

impl Container {
    /// Identifies the container from its leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 4 && bytes[0..4] == DDS_MAGIC {
            Some(Container::Dds)
        } else if bytes.len() >= 4 && bytes[0..4] == PNG_MAGIC {
            Some(Container::Png)
        } else if bytes.len() >= 3 && bytes[0..3] == JPEG_MAGIC {
            Some(Container::Jpeg)
        } else if bytes.len() >= 4 && bytes[0..4] == KTX_MAGIC {
            Some(Container::Ktx)
        } else {
            None
        }
    }
}

/// Probes `bytes` for dimensions and pixel depth without decoding the
/// payload.
///
/// PNG and JPEG dimensions are read through the `image` crate's
/// no-decode reader; DDS and KTX headers are fixed-offset reads.
pub fn probe(bytes: &[u8]) -> Result<ImageHeader, TextureError> {
    match Container::detect(bytes) {
        Some(Container::Dds) => probe_dds(bytes),
        Some(Container::Ktx) => probe_ktx(bytes),
        Some(Container::Png) | Some(Container::Jpeg) => probe_via_image(bytes),
        None => {
            let mut magic = [0u8; 4];
            for (slot, byte) in magic.iter_mut().zip(bytes.iter()) {
                *slot = *byte;
            }
            Err(TextureError::UnknownContainer { magic })
        }
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn truncated(container: &str) -> TextureError {
    TextureError::Decode {
        label: container.to_string(),
        details: "truncated header".to_string(),
    }
}

/// DDS: 4-byte magic, then the 124-byte DDS_HEADER. Height and width sit
/// at offsets 12 and 16; the pixel format's RGB bit count at offset 88.
fn probe_dds(bytes: &[u8]) -> Result<ImageHeader, TextureError> {
    if bytes.len() < 128 {
        return Err(truncated("dds"));
    }
    let height = read_u32_le(bytes, 12);
    let width = read_u32_le(bytes, 16);
    let bit_count = read_u32_le(bytes, 88);
    Ok(ImageHeader {
        width,
        height,
        // Block-compressed surfaces report zero here; budget as 32 bpp,
        // which over-estimates rather than under-reserves.
        bits_per_pixel: if bit_count == 0 { 32 } else { bit_count },
    })
}

/// KTX1: 12-byte identifier, an endianness marker at offset 12, then
/// nine u32 fields; pixelWidth and pixelHeight are the 7th and 8th.
fn probe_ktx(bytes: &[u8]) -> Result<ImageHeader, TextureError> {
    if bytes.len() < 48 {
        return Err(truncated("ktx"));
    }
    let little_endian = read_u32_le(bytes, 12) == 0x0403_0201;
    let field = |offset: usize| {
        let raw = read_u32_le(bytes, offset);
        if little_endian {
            raw
        } else {
            raw.swap_bytes()
        }
    };
    Ok(ImageHeader {
        width: field(36),
        height: field(40).max(1),
        bits_per_pixel: 32,
    })
}

fn probe_via_image(bytes: &[u8]) -> Result<ImageHeader, TextureError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| TextureError::Decode {
            label: "image".to_string(),
            details: err.to_string(),
        })?;
    let (width, height) = reader.into_dimensions().map_err(|err| TextureError::Decode {
        label: "image".to_string(),
        details: err.to_string(),
    })?;
    Ok(ImageHeader {
        width,
        height,
        bits_per_pixel: 32,
    })
}
