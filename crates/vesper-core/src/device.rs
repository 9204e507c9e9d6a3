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

//! The contract between the streaming cache and the GPU device backend.

use crate::error::TextureError;
use crate::texture::{ImageHeader, TextureHandle, TextureKind, TextureOptions};
use std::fmt::Debug;

/// Creates GPU textures from encoded containers or raw pixel data.
///
/// This is the narrow boundary behind which the multi-backend device
/// abstraction lives. The streaming cache never sees a device object,
/// only this factory.
pub trait TextureFactory: Send + Sync + Debug {
    /// Probes the container header for dimensions and pixel depth without
    /// decoding the payload.
    /// ## Arguments
    /// * `bytes` - The encoded container bytes (DDS/PNG/JPG/KTX).
    /// ## Errors
    /// * `TextureError` - If the magic is unknown or the header is truncated.
    fn parse_header(&self, bytes: &[u8]) -> Result<ImageHeader, TextureError>;

    /// Decodes an image container and uploads it as a texture of the
    /// given kind.
    /// ## Arguments
    /// * `kind` - Which creation routine to use (2D, cube, volume).
    /// * `bytes` - The encoded container bytes.
    /// * `options` - Sampling and upload options.
    /// ## Errors
    /// * `TextureError` - If the container cannot be decoded or the upload fails.
    fn create_texture(
        &self,
        kind: TextureKind,
        bytes: &[u8],
        options: &TextureOptions,
    ) -> Result<TextureHandle, TextureError>;

    /// Uploads raw RGBA8 pixel data as a 2D texture. Used for sidecar
    /// thumbnails and generated placeholders.
    /// ## Arguments
    /// * `width`, `height` - Pixel dimensions; `rgba` must hold `width * height * 4` bytes.
    /// ## Errors
    /// * `TextureError` - If the byte length does not match the dimensions.
    fn create_texture_raw(
        &self,
        width: u32,
        height: u32,
        rgba: &[u8],
        options: &TextureOptions,
    ) -> Result<TextureHandle, TextureError>;
}
