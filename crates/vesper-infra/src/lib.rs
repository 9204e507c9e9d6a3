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

//! # Vesper Infra
//!
//! Concrete implementations of the streaming cache's external
//! collaborators: filesystem storage with alias-chain resolution, image
//! container header probing, a priority worker pool, and a headless
//! texture factory for tools and tests.

pub mod containers;
pub mod device;
pub mod scheduler;
pub mod storage;

pub use device::HeadlessFactory;
pub use scheduler::WorkerPool;
pub use storage::FsStorage;
