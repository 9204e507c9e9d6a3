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

//! The collaborator bundle handed to every load and unload operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use vesper_core::device::TextureFactory;
use vesper_core::storage::StorageProvider;

/// Shared access to the storage layer and the currently bound GPU device
/// factory.
///
/// One instance is owned by the streamer and cloned (via `Arc`) into every
/// background job, so loads that outlive a frame still see a consistent
/// view of the device. The factory slot is empty until the device is
/// created and empties again on device destruction.
pub struct LoaderContext {
    storage: Arc<dyn StorageProvider>,
    factory: RwLock<Option<Arc<dyn TextureFactory>>>,
    throw_on_missing: AtomicBool,
}

impl LoaderContext {
    /// Creates a context with no device bound yet.
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            storage,
            factory: RwLock::new(None),
            throw_on_missing: AtomicBool::new(false),
        }
    }

    /// The storage layer.
    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// The currently bound factory, if a device exists.
    pub fn factory(&self) -> Option<Arc<dyn TextureFactory>> {
        self.factory.read().unwrap().clone()
    }

    /// `true` once a device has been created and not yet destroyed.
    pub fn has_factory(&self) -> bool {
        self.factory.read().unwrap().is_some()
    }

    /// Binds or unbinds the device factory.
    pub fn set_factory(&self, factory: Option<Arc<dyn TextureFactory>>) {
        *self.factory.write().unwrap() = factory;
    }

    /// Whether load failures should abort instead of substituting
    /// placeholders. Used by CI asset-validation runs.
    pub fn throw_on_missing(&self) -> bool {
        self.throw_on_missing.load(Ordering::Relaxed)
    }

    /// Toggles fail-fast behavior for load failures.
    pub fn set_throw_on_missing(&self, value: bool) {
        self.throw_on_missing.store(value, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderContext")
            .field("has_factory", &self.has_factory())
            .field("throw_on_missing", &self.throw_on_missing())
            .finish()
    }
}
