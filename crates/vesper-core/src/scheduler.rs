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

//! The contract between the streaming cache and the external job scheduler.

/// A unit of background work. Fire-and-forget: there is no return value
/// and no future to await.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The scheduling class of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPriority {
    /// Work a visible frame is waiting on.
    Medium,
    /// Work that may run whenever a worker has nothing better to do.
    Idle,
}

/// Accepts background jobs for asynchronous execution.
///
/// Implementations run jobs concurrently with the submitting thread and
/// with each other; submitters must carry their own synchronization.
pub trait JobScheduler: Send + Sync {
    /// Enqueues `job` at the given priority.
    fn schedule(&self, priority: JobPriority, job: Job);
}
