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

//! A fixed-size worker pool implementing the job scheduler contract.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;
use vesper_core::scheduler::{Job, JobPriority, JobScheduler};

/// A two-queue worker pool: workers drain medium-priority jobs before
/// touching idle ones.
///
/// Jobs are fire-and-forget. Dropping the pool disconnects both queues
/// and joins the workers; jobs still queued at that point are discarded.
pub struct WorkerPool {
    medium: Option<Sender<Job>>,
    idle: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `worker_count` named worker threads.
    pub fn new(worker_count: usize) -> Self {
        let (medium_tx, medium_rx) = unbounded::<Job>();
        let (idle_tx, idle_rx) = unbounded::<Job>();

        let workers = (0..worker_count.max(1))
            .map(|index| {
                let medium = medium_rx.clone();
                let idle = idle_rx.clone();
                std::thread::Builder::new()
                    .name(format!("vesper-stream-{index}"))
                    .spawn(move || worker_loop(medium, idle))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        log::info!("worker pool started with {} threads", worker_count.max(1));
        Self {
            medium: Some(medium_tx),
            idle: Some(idle_tx),
            workers,
        }
    }

    fn sender(&self, priority: JobPriority) -> Option<&Sender<Job>> {
        match priority {
            JobPriority::Medium => self.medium.as_ref(),
            JobPriority::Idle => self.idle.as_ref(),
        }
    }
}

impl JobScheduler for WorkerPool {
    fn schedule(&self, priority: JobPriority, job: Job) {
        if let Some(sender) = self.sender(priority) {
            if sender.send(job).is_err() {
                log::error!("job dropped: worker pool already shut down");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Both senders drop together, disconnecting the workers.
        self.medium.take();
        self.idle.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("worker thread panicked during shutdown");
            }
        }
    }
}

fn worker_loop(medium: Receiver<Job>, idle: Receiver<Job>) {
    loop {
        // Bias: take pending medium-priority work before anything idle.
        match medium.try_recv() {
            Ok(job) => {
                job();
                continue;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        crossbeam_channel::select! {
            recv(medium) -> msg => match msg {
                Ok(job) => job(),
                Err(_) => break,
            },
            recv(idle) -> msg => {
                if let Ok(job) = msg {
                    job();
                }
                // A disconnected idle queue alone means shutdown is in
                // progress; the next medium try_recv observes it.
            },
        }
    }
}
