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

//! The contract between the streaming cache and the raw storage layer,
//! plus the `.header` sidecar convention shared by both sides.

use crate::error::{StorageError, TextureError};

/// The suffix appended to a texture path to locate its sidecar entry.
pub const SIDECAR_SUFFIX: &str = ".header";

/// Provides raw byte access to logical resource paths.
///
/// Implementations resolve alias indirections internally: callers always
/// receive the final payload, never an alias record.
pub trait StorageProvider: Send + Sync {
    /// Reads the full contents of the entry at `path`.
    /// ## Errors
    /// * `StorageError::NotFound` - The entry does not exist.
    /// * `StorageError::AliasChainTooDeep` - Alias indirections exceeded the hop limit.
    /// * `StorageError::Io` - Any other read failure.
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Returns the sidecar path for a texture path.
pub fn sidecar_path(path: &str) -> String {
    format!("{path}{SIDECAR_SUFFIX}")
}

const SIDECAR_MAGIC: [u8; 4] = *b"VSH1";
const SIDECAR_META_LEN: usize = 24;

/// The parsed contents of a `.header` sidecar entry.
///
/// A sidecar carries the full-resolution metadata of a texture together
/// with a small pre-extracted RGBA thumbnail, so first-touch loads never
/// read the full payload. The asset pipeline writes these next to each
/// texture; [`parse`](SidecarHeader::parse) is the runtime reader and
/// [`encode`](SidecarHeader::encode) exists for pipeline and test fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarHeader {
    /// Width of the full-resolution texture in pixels.
    pub width: u32,
    /// Height of the full-resolution texture in pixels.
    pub height: u32,
    /// Bits per pixel of the decoded full-resolution texture.
    pub bits_per_pixel: u32,
    /// Width of the embedded thumbnail in pixels.
    pub thumb_width: u32,
    /// Height of the embedded thumbnail in pixels.
    pub thumb_height: u32,
    /// Raw RGBA8 thumbnail pixels, `thumb_width * thumb_height * 4` bytes.
    pub thumbnail: Vec<u8>,
}

impl SidecarHeader {
    /// Parses a sidecar payload.
    /// ## Errors
    /// * `TextureError::Decode` - The magic is wrong, the meta block is
    ///   truncated, or the thumbnail length does not match its dimensions.
    pub fn parse(bytes: &[u8]) -> Result<Self, TextureError> {
        let fail = |details: &str| TextureError::Decode {
            label: "sidecar".to_string(),
            details: details.to_string(),
        };

        if bytes.len() < SIDECAR_META_LEN {
            return Err(fail("truncated meta block"));
        }
        if bytes[0..4] != SIDECAR_MAGIC {
            return Err(fail("bad magic"));
        }

        let field = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        let width = field(4);
        let height = field(8);
        let bits_per_pixel = field(12);
        let thumb_width = field(16);
        let thumb_height = field(20);

        let thumb_len = thumb_width as usize * thumb_height as usize * 4;
        let thumbnail = &bytes[SIDECAR_META_LEN..];
        if thumbnail.len() != thumb_len {
            return Err(fail("thumbnail length mismatch"));
        }

        Ok(Self {
            width,
            height,
            bits_per_pixel,
            thumb_width,
            thumb_height,
            thumbnail: thumbnail.to_vec(),
        })
    }

    /// Encodes this sidecar into its on-disk payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIDECAR_META_LEN + self.thumbnail.len());
        out.extend_from_slice(&SIDECAR_MAGIC);
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.bits_per_pixel.to_le_bytes());
        out.extend_from_slice(&self.thumb_width.to_le_bytes());
        out.extend_from_slice(&self.thumb_height.to_le_bytes());
        out.extend_from_slice(&self.thumbnail);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SidecarHeader {
        SidecarHeader {
            width: 2048,
            height: 1024,
            bits_per_pixel: 32,
            thumb_width: 2,
            thumb_height: 2,
            thumbnail: vec![0xAB; 16],
        }
    }

    #[test]
    fn test_sidecar_round_trip() {
        let header = sample();
        let parsed = SidecarHeader::parse(&header.encode()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_sidecar_rejects_bad_magic() {
        let mut bytes = sample().encode();
        bytes[0] = b'X';
        assert!(SidecarHeader::parse(&bytes).is_err());
    }

    #[test]
    fn test_sidecar_rejects_short_thumbnail() {
        let mut bytes = sample().encode();
        bytes.truncate(bytes.len() - 1);
        assert!(SidecarHeader::parse(&bytes).is_err());
    }

    #[test]
    fn test_sidecar_path_suffix() {
        assert_eq!(sidecar_path("textures/rock.dds"), "textures/rock.dds.header");
    }
}
