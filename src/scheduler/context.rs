//! In-job synchronization primitives.
//!
//! Each primitive is a hand-written future with an explicit
//! suspension-point state machine: the first poll performs the
//! queue/status transition and returns `Pending` once; the kernel's next
//! dispatch of the job re-polls it, which delivers the buffered values.
//! Nothing here registers a waker — wakeups are the kernel's dispatch
//! discipline, not the executor's.

use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Weak;
use std::task::{Context, Poll};

use super::state::SchedulerState;
use crate::core::job::JobError;
use crate::core::types::{JobHandle, JobStatus};
use crate::events::Event;

/// Capability handed to every job body for talking to its scheduler.
///
/// Holds a weak reference so job bodies stored inside the scheduler do
/// not keep it alive; if the scheduler is gone, every primitive resolves
/// to [`JobError::SchedulerGone`].
#[derive(Clone)]
pub struct JobContext {
    pub(crate) state: Weak<RefCell<SchedulerState>>,
    pub(crate) handle: JobHandle,
}

impl JobContext {
    /// The handle of the job this context belongs to.
    pub fn handle(&self) -> JobHandle {
        self.handle
    }

    /// Suspend until something calls
    /// [`Scheduler::resume`](crate::Scheduler::resume) on this job, then
    /// return the values the resumer supplied.
    pub fn park(&self) -> Park {
        Park {
            ctx: self.clone(),
            suspended: false,
        }
    }

    /// Block on another job's completion and return its output values.
    ///
    /// If `waitee` is already done, its buffered values are returned
    /// immediately, without suspending, and its retained table entry is
    /// consumed. A stale handle is an error rather than a silent
    /// permanent block.
    pub fn wait(&self, waitee: JobHandle) -> Wait {
        Wait {
            ctx: self.clone(),
            waitee,
            suspended: false,
        }
    }

    /// Cooperative burst check: if the current dispatch has run past the
    /// burst budget, requeue this job at the tail and yield until the
    /// kernel comes back around; otherwise return immediately.
    ///
    /// This is the only fairness mechanism there is — the scheduler never
    /// interrupts a job that does not call it.
    pub fn timeout(&self) -> Timeout {
        Timeout {
            ctx: self.clone(),
            suspended: false,
        }
    }
}

/// Future returned by [`JobContext::park`].
#[must_use = "futures do nothing unless awaited"]
pub struct Park {
    ctx: JobContext,
    suspended: bool,
}

impl Future for Park {
    type Output = Result<Vec<Value>, JobError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(state) = this.ctx.state.upgrade() else {
            return Poll::Ready(Err(JobError::SchedulerGone));
        };
        let handle = this.ctx.handle;

        if !this.suspended {
            let events = {
                let mut st = state.borrow_mut();
                let Some(record) = st.table.get_mut(handle) else {
                    return Poll::Ready(Err(JobError::UnknownJob(handle)));
                };
                record.status = JobStatus::Waiting;
                st.unqueue_running(handle);
                st.events.clone()
            };
            events.emit(Event::job_parked(handle, None));
            this.suspended = true;
            return Poll::Pending;
        }

        let mut st = state.borrow_mut();
        let Some(record) = st.table.get_mut(handle) else {
            return Poll::Ready(Err(JobError::UnknownJob(handle)));
        };
        Poll::Ready(Ok(std::mem::take(&mut record.pass_in)))
    }
}

/// Future returned by [`JobContext::wait`].
#[must_use = "futures do nothing unless awaited"]
pub struct Wait {
    ctx: JobContext,
    waitee: JobHandle,
    suspended: bool,
}

impl Future for Wait {
    type Output = Result<Vec<Value>, JobError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(state) = this.ctx.state.upgrade() else {
            return Poll::Ready(Err(JobError::SchedulerGone));
        };
        let handle = this.ctx.handle;
        let waitee = this.waitee;

        if this.suspended {
            // Re-polled after the waitee's completion resumed us; the
            // signal buffered its output as our pass-in.
            let mut st = state.borrow_mut();
            let Some(record) = st.table.get_mut(handle) else {
                return Poll::Ready(Err(JobError::UnknownJob(handle)));
            };
            return Poll::Ready(Ok(std::mem::take(&mut record.pass_in)));
        }

        let events = {
            let mut st = state.borrow_mut();
            let waitee_status = match st.table.get(waitee) {
                Some(record) => record.status,
                None => return Poll::Ready(Err(JobError::UnknownJob(waitee))),
            };

            if waitee_status == JobStatus::Done {
                // Done entries are only retained for callback-less jobs;
                // consume it and hand over its buffered output.
                let values = st
                    .table
                    .remove(waitee)
                    .map(|record| record.pass_out)
                    .unwrap_or_default();
                return Poll::Ready(Ok(values));
            }

            st.waiting.enroll(waitee, handle);
            let Some(record) = st.table.get_mut(handle) else {
                return Poll::Ready(Err(JobError::UnknownJob(handle)));
            };
            record.status = JobStatus::Waiting;
            st.unqueue_running(handle);
            st.events.clone()
        };
        events.emit(Event::job_parked(handle, Some(waitee)));
        this.suspended = true;
        Poll::Pending
    }
}

/// Future returned by [`JobContext::timeout`].
#[must_use = "futures do nothing unless awaited"]
pub struct Timeout {
    ctx: JobContext,
    suspended: bool,
}

impl Future for Timeout {
    type Output = Result<(), JobError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.suspended {
            return Poll::Ready(Ok(()));
        }
        let Some(state) = this.ctx.state.upgrade() else {
            return Poll::Ready(Err(JobError::SchedulerGone));
        };
        let handle = this.ctx.handle;

        let events = {
            let mut st = state.borrow_mut();
            let burst = st.config.burst_time();
            let Some(record) = st.table.get_mut(handle) else {
                return Poll::Ready(Err(JobError::UnknownJob(handle)));
            };
            let elapsed = record
                .started_at
                .map(|started| started.elapsed())
                .unwrap_or_default();
            if elapsed < burst {
                return Poll::Ready(Ok(()));
            }
            record.status = JobStatus::Ready;
            st.unqueue_running(handle);
            st.ready.push(handle);
            st.events.clone()
        };
        events.emit(Event::job_requeued(handle));
        this.suspended = true;
        Poll::Pending
    }
}
