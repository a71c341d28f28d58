//! Core identifier and state types for the scheduler.
//!
//! Job identity is an opaque, generation-checked arena index. A handle
//! into a freed slot stops resolving instead of aliasing whatever job
//! occupies the slot next.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a job tracked by a [`Scheduler`](crate::Scheduler).
///
/// Handles are cheap to copy and safe to hold past the job's lifetime:
/// once the job's table entry is consumed, the handle fails its
/// generation check and every API treats it as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    index: u32,
    generation: u32,
}

impl JobHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) fn index(&self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Scheduling state of a job.
///
/// `Ready` jobs sit in the ready queue; at most one job is `Running` at
/// any instant; `Waiting` jobs left the queue and come back only through
/// [`Scheduler::resume`](crate::Scheduler::resume) or a completed waitee;
/// `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Queued and eligible for dispatch.
    Ready,
    /// Currently executing in the foreground slot.
    Running,
    /// Suspended outside the ready queue.
    Waiting,
    /// Terminal.
    Done,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Ready => "ready",
            JobStatus::Running => "running",
            JobStatus::Waiting => "waiting",
            JobStatus::Done => "done",
        };
        f.write_str(s)
    }
}
