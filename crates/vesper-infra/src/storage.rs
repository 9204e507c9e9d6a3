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

//! Filesystem-backed storage with alias-chain resolution.

use std::path::PathBuf;
use vesper_core::error::StorageError;
use vesper_core::storage::StorageProvider;

/// Hop count at which a chain is suspicious enough to warn about.
const ALIAS_WARN_HOPS: u32 = 20;
/// Hop count past which a chain is treated as corrupt and aborted.
const ALIAS_MAX_HOPS: u32 = 64;

/// Reads logical paths from a root directory.
///
/// A payload whose first byte is `'*'` is an alias: the remainder names
/// another path, followed transitively until a real payload is found.
/// Chains deeper than [`ALIAS_WARN_HOPS`] log a warning; past
/// [`ALIAS_MAX_HOPS`] the read fails, so a cyclic chain terminates
/// instead of looping.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Creates a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageProvider for FsStorage {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut current = path.to_string();
        let mut hops = 0u32;
        loop {
            let bytes = match std::fs::read(self.root.join(&current)) {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StorageError::NotFound { path: current });
                }
                Err(err) => {
                    return Err(StorageError::Io {
                        path: current,
                        details: err.to_string(),
                    });
                }
            };

            if bytes.first() != Some(&b'*') {
                return Ok(bytes);
            }

            hops += 1;
            if hops == ALIAS_WARN_HOPS {
                log::warn!("alias chain from '{path}' reached {hops} hops");
            }
            if hops > ALIAS_MAX_HOPS {
                return Err(StorageError::AliasChainTooDeep {
                    path: path.to_string(),
                    hops,
                });
            }

            current = match std::str::from_utf8(&bytes[1..]) {
                Ok(target) => target.trim().to_string(),
                Err(_) => {
                    return Err(StorageError::Io {
                        path: current,
                        details: "alias target is not valid UTF-8".to_string(),
                    });
                }
            };
        }
    }
}
