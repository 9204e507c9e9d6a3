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

//! Defines the hierarchy of error types for the texture streaming subsystem.

use std::fmt;

/// An error produced by a [`StorageProvider`](crate::storage::StorageProvider).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The requested entry does not exist. Callers treat this as a
    /// non-fatal condition: the texture simply has no backing data.
    NotFound {
        /// The path that could not be resolved.
        path: String,
    },
    /// An alias indirection chain exceeded the hard hop limit. A chain
    /// this deep is either corrupt data or a cycle.
    AliasChainTooDeep {
        /// The path that started the chain.
        path: String,
        /// The number of hops followed before giving up.
        hops: u32,
    },
    /// Any other I/O failure while reading the entry.
    Io {
        /// The path being read when the failure occurred.
        path: String,
        /// The underlying I/O error message.
        details: String,
    },
}

impl StorageError {
    /// Returns `true` if this error means the entry simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { path } => {
                write!(f, "Storage entry not found: '{path}'")
            }
            StorageError::AliasChainTooDeep { path, hops } => {
                write!(
                    f,
                    "Alias chain starting at '{path}' exceeded {hops} hops (cycle or corrupt data)"
                )
            }
            StorageError::Io { path, details } => {
                write!(f, "I/O failure reading '{path}': {details}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// An error related to parsing or creating a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// The byte stream does not begin with any known container magic.
    UnknownContainer {
        /// The first bytes of the stream, for diagnostics.
        magic: [u8; 4],
    },
    /// The container was recognised but its contents could not be decoded.
    Decode {
        /// A descriptive label for the texture, if available.
        label: String,
        /// Detailed error messages from the decoder.
        details: String,
    },
    /// The backing storage failed to produce the bytes.
    Storage(StorageError),
    /// No GPU device is currently bound, so nothing can be created.
    NoDevice,
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::UnknownContainer { magic } => {
                write!(f, "Unrecognised image container (magic: {magic:02x?})")
            }
            TextureError::Decode { label, details } => {
                write!(f, "Failed to decode texture '{label}': {details}")
            }
            TextureError::Storage(err) => write!(f, "{err}"),
            TextureError::NoDevice => write!(f, "No GPU device bound"),
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for TextureError {
    fn from(err: StorageError) -> Self {
        TextureError::Storage(err)
    }
}
