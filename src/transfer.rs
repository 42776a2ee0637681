//! Moves a region of chunks between worlds, one chunk per drain step.
//!
//! A transfer is a recurring task on a [`Timer`]. Each time it fires it pops
//! the front [`WorkItem`] and hands it to the [`ChunkCopier`]. Failures are
//! reported and skipped. The task stops itself once the queue runs dry.
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender};

use crate::error::CopyError;
use crate::region::{build_queue, Bounds, WorkItem};
use crate::timer::{Flow, Task, TaskHandle, Ticks, Timer};
use crate::prelude::*;
use crate::world::ChunkCopier;

/// Ticks between two chunks when nothing else is configured. Half a second.
pub const DEFAULT_INTERVAL: Ticks = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Scheduled, first step hasn't fired
    Idle,
    Running,
    Completed,
    Cancelled,
}
impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled)
    }
}

#[derive(Debug)]
pub enum JobEvent {
    ItemFailed { item: WorkItem, error: CopyError },
    Completed { copied: u64, failed: u64 },
    Cancelled { remaining: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub interval: Ticks,
    /// Extra attempts for a failing chunk before it is skipped.
    pub retries: u32,
}
impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            retries: 0,
        }
    }
}

#[derive(Debug)]
struct Progress {
    state: Cell<JobState>,
    done: Cell<u64>,
}

struct TransferJob {
    queue: VecDeque<WorkItem>,
    retries: u32,
    attempts: u32,
    copied: u64,
    failed: u64,
    progress: Rc<Progress>,
    events: Sender<JobEvent>,
}
impl TransferJob {
    fn step(&mut self, copier: &mut impl ChunkCopier) -> Flow {
        self.progress.state.set(JobState::Running);
        let Some(item) = self.queue.pop_front() else {
            return self.complete();
        };
        match copier.copy(item.source, item.destination) {
            Ok(()) => {
                log::trace!("copied chunk {}", item.pos());
                self.copied += 1;
            }
            Err(error) if self.attempts < self.retries => {
                self.attempts += 1;
                log::debug!("retrying chunk {} ({}/{}): {error}", item.pos(), self.attempts, self.retries);
                self.queue.push_front(item);
                return Flow::Continue;
            }
            Err(error) => {
                log::warn!("skipping chunk {}: {error}", item.pos());
                self.failed += 1;
                let _ = self.events.send(JobEvent::ItemFailed { item, error });
            }
        }
        self.attempts = 0;
        self.progress.done.set(self.copied + self.failed);
        if self.queue.is_empty() {
            self.complete()
        } else {
            Flow::Continue
        }
    }
    fn complete(&mut self) -> Flow {
        log::info!("transfer finished, {} copied, {} failed", self.copied, self.failed);
        self.progress.state.set(JobState::Completed);
        let _ = self.events.send(JobEvent::Completed {
            copied: self.copied,
            failed: self.failed,
        });
        Flow::Stop
    }
}
impl<C: ChunkCopier> Task<C> for TransferJob {
    fn run(&mut self, copier: &mut C) -> Flow {
        self.step(copier)
    }
    fn cancelled(&mut self, _: &mut C) {
        let remaining = self.queue.len() as u64;
        log::info!("transfer cancelled with {remaining} chunks left");
        self.progress.state.set(JobState::Cancelled);
        let _ = self.events.send(JobEvent::Cancelled { remaining });
    }
}

/// The caller's side of a running transfer.
#[derive(Debug)]
pub struct JobHandle {
    task: TaskHandle,
    progress: Rc<Progress>,
    events: Receiver<JobEvent>,
    source: WorldId,
    destination: WorldId,
    bounds: Bounds,
    total: u64,
}
impl JobHandle {
    /// Stops the transfer before its next step. Chunks already copied stay
    /// copied. Returns `false` if the job had already finished or was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        if self.progress.state.get().is_terminal() {
            return false;
        }
        self.task.cancel()
    }
    pub fn state(&self) -> JobState {
        match self.progress.state.get() {
            JobState::Completed => JobState::Completed,
            _ if self.task.is_cancelled() => JobState::Cancelled,
            state => state,
        }
    }
    /// (done, total). Skipped chunks count as done.
    pub fn progress(&self) -> (u64, u64) {
        (self.progress.done.get(), self.total)
    }
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }
    pub fn source(&self) -> WorldId {
        self.source
    }
    pub fn destination(&self) -> WorldId {
        self.destination
    }
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// Queues every chunk between the two corners and starts draining them on
/// the next tick. Returns straight away; the copying happens on `timer`.
///
/// The whole queue is built up front, so the region has to be sized with
/// [`Bounds::chunk_count`] before calling this.
pub fn start_transfer<C: ChunkCopier>(
    timer: &mut impl Timer<C>,
    source: WorldId,
    destination: WorldId,
    a: ChunkPos,
    b: ChunkPos,
    options: TransferOptions,
) -> JobHandle {
    let bounds = Bounds::normalize(a, b);
    let queue = build_queue(source, destination, bounds);
    let total = queue.len() as u64;
    log::info!(
        "transferring {total} chunks from {source:?} to {destination:?}, one every {} ticks",
        options.interval,
    );
    let progress = Rc::new(Progress {
        state: Cell::new(JobState::Idle),
        done: Cell::new(0),
    });
    let (tx, rx) = crossbeam_channel::unbounded();
    let job = TransferJob {
        queue,
        retries: options.retries,
        attempts: 0,
        copied: 0,
        failed: 0,
        progress: progress.clone(),
        events: tx,
    };
    let task = timer.schedule_recurring(1, options.interval, Box::new(job));
    JobHandle {
        task,
        progress,
        events: rx,
        source,
        destination,
        bounds,
        total,
    }
}
