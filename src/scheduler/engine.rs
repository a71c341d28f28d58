//! Scheduler engine: the public API and the kernel cycle loop.
//!
//! The kernel is itself a suspendable execution — an async task on the
//! host's current-thread executor. It drains the ready queue inside each
//! cycle's active window, then arms the host timer for the idle
//! remainder and suspends until it fires. The first `spawn` on an idle
//! instance bootstraps a fresh kernel task.

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::context::JobContext;
use super::state::SchedulerState;
use crate::config::{ConfigError, SchedulerConfig};
use crate::core::job::{Job, JobRecord, JobResult};
use crate::core::types::{JobHandle, JobStatus};
use crate::events::{Event, EventBus};

/// Errors that can occur at the scheduler API surface or inside the
/// kernel.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The handle does not resolve to a live job.
    #[error("unknown job: {0}")]
    UnknownJob(JobHandle),

    /// The job exists but is not in the `Waiting` state.
    #[error("job {0} is not waiting")]
    NotWaiting(JobHandle),

    /// Internal state inconsistency. Fatal for the kernel that hits it:
    /// the loop logs and stops re-arming itself.
    #[error("scheduler state inconsistent: {0}")]
    Inconsistent(String),
}

/// A cooperative, single-threaded job scheduler.
///
/// The scheduler is an explicit value, not a global: clone it freely and
/// pass it wherever jobs are created — independent instances coexist,
/// each with its own kernel, which the tests rely on.
///
/// Jobs run strictly FIFO inside a per-cycle time budget and yield only
/// voluntarily (see [`JobContext`]). A job that never yields blocks all
/// siblings until it finishes.
///
/// # Execution environment
///
/// [`spawn`](Self::spawn) arms the kernel with `tokio::task::spawn_local`,
/// so the scheduler must be used from within a `tokio::task::LocalSet` on
/// a current-thread runtime ([`testing::run_local`](crate::testing::run_local)
/// sets one up).
#[derive(Clone)]
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl Scheduler {
    /// Create a scheduler with the default timing configuration.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState::new(SchedulerConfig::default()))),
        }
    }

    /// Create a scheduler with an explicit configuration.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Rc::new(RefCell::new(SchedulerState::new(config))),
        })
    }

    /// The lifecycle event bus for this instance.
    pub fn events(&self) -> Rc<EventBus> {
        self.state.borrow().events.clone()
    }

    /// A copy of this instance's timing configuration.
    pub fn config(&self) -> SchedulerConfig {
        self.state.borrow().config.clone()
    }

    /// Register a job, queue it at the ready-queue tail, and return its
    /// handle. If no kernel task is active, one is spawned and
    /// bootstrapped to start on the next host-executor tick.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio::task::LocalSet` when the kernel
    /// needs to be armed.
    pub fn spawn(&self, job: Job) -> JobHandle {
        let Job {
            name,
            args,
            callback,
            body,
        } = job;

        let (handle, events, bootstrap) = {
            let mut st = self.state.borrow_mut();
            let handle = st.table.insert(JobRecord::new(name.clone(), callback));
            st.ready.push(handle);
            let bootstrap = !st.kernel_active;
            if bootstrap {
                st.kernel_active = true;
            }
            (handle, st.events.clone(), bootstrap)
        };

        // Build the body future outside the borrow: constructing it may
        // touch the scheduler through a captured clone.
        let ctx = JobContext {
            state: Rc::downgrade(&self.state),
            handle,
        };
        let fut = body(ctx, args);
        {
            let mut st = self.state.borrow_mut();
            if let Some(record) = st.table.get_mut(handle) {
                record.body = Some(fut);
            }
        }

        events.emit(Event::job_created(handle, name));
        if bootstrap {
            tokio::task::spawn_local(kernel_loop(Rc::clone(&self.state)));
        }
        handle
    }

    /// Resume a waiting job, buffering `values` for its next dispatch.
    /// Only effective while the job is `Waiting`.
    pub fn resume(&self, handle: JobHandle, values: Vec<Value>) -> Result<(), SchedulerError> {
        let events = {
            let mut st = self.state.borrow_mut();
            st.resume_waiting(handle, values)?;
            st.events.clone()
        };
        events.emit(Event::job_resumed(handle));
        Ok(())
    }

    /// Pull a job's buffered output values.
    ///
    /// For a completed, callback-less job this returns its final values
    /// exactly once and deletes the table entry; every later call returns
    /// `None`. A job that completes without a callback and is never
    /// pulled (or waited on) keeps its entry for the scheduler's
    /// lifetime — pulling is the caller's side of the contract.
    pub fn take_results(&self, handle: JobHandle) -> Option<Vec<Value>> {
        let mut st = self.state.borrow_mut();
        let record = st.table.get(handle)?;
        let status = record.status;
        let buffered = record.pass_out.clone();
        if status == JobStatus::Done {
            st.table.remove(handle);
        }
        Some(buffered)
    }

    /// Current status of a job, or `None` once its entry was consumed.
    pub fn status(&self, handle: JobHandle) -> Option<JobStatus> {
        self.state.borrow().table.get(handle).map(|r| r.status)
    }

    /// Number of tracked jobs, completed-but-unconsumed ones included.
    pub fn job_count(&self) -> usize {
        self.state.borrow().table.len()
    }

    /// Number of jobs currently blocked on `handle`'s completion.
    pub fn waiter_count(&self, handle: JobHandle) -> usize {
        self.state.borrow().waiting.waiter_count(handle)
    }

    /// True when no job has scheduling work left.
    pub fn is_idle(&self) -> bool {
        self.state.borrow().table.unfinished() == 0
    }

    /// Wait until the scheduler is idle. Pull-style hosts call this
    /// before collecting results; tests use it instead of fixed sleeps.
    pub async fn settled(&self) {
        while !self.is_idle() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// The kernel: one task per active scheduler instance.
///
/// Exits normally when no unfinished jobs remain (the next spawn re-arms
/// it) and fatally on an internal defect (logged, never re-armed).
async fn kernel_loop(state: Rc<RefCell<SchedulerState>>) {
    // Bootstrap: start on the next host tick, not synchronously inside
    // the spawn call that armed us.
    tokio::task::yield_now().await;
    debug!("kernel started");

    loop {
        let cycle_start = Instant::now();
        if let Err(defect) = run_active_window(&state, cycle_start) {
            // kernel_active stays set so spawn cannot revive a poisoned
            // instance.
            error!(error = %defect, "kernel defect, job processing halted");
            return;
        }

        if state.borrow().table.unfinished() == 0 {
            state.borrow_mut().kernel_active = false;
            debug!("kernel idle, parking until next spawn");
            return;
        }

        let cycle_time = state.borrow().config.cycle_time();
        let elapsed = cycle_start.elapsed();
        // Idle remainder of the cycle; an overrun is mirrored into the
        // next cycle instead of being skipped.
        let delay = if elapsed <= cycle_time {
            cycle_time - elapsed
        } else {
            elapsed - cycle_time
        };
        tokio::time::sleep(delay).await;
    }
}

/// Drain the ready queue until the active window closes. The budget is
/// checked once per pass, so a job that never yields runs past it.
fn run_active_window(
    state: &Rc<RefCell<SchedulerState>>,
    cycle_start: Instant,
) -> Result<(), SchedulerError> {
    let up_time = state.borrow().config.up_time();
    while state.borrow().ready.has_next() {
        if cycle_start.elapsed() >= up_time {
            break;
        }
        let head = match state.borrow().ready.peek() {
            Some(handle) => handle,
            None => break,
        };
        dispatch(state, head)?;
    }
    Ok(())
}

/// Resume the job at the queue head. The head is peeked, not popped: the
/// job stays there across repeated resumes within a cycle unless it
/// requeues itself, waits, or completes.
fn dispatch(state: &Rc<RefCell<SchedulerState>>, handle: JobHandle) -> Result<(), SchedulerError> {
    let (fut, events) = {
        let mut st = state.borrow_mut();
        let events = st.events.clone();
        let Some(record) = st.table.get_mut(handle) else {
            return Err(SchedulerError::Inconsistent(format!(
                "queued job {handle} has no table entry"
            )));
        };
        match record.status {
            JobStatus::Done | JobStatus::Waiting => {
                // Stale queue entry; drop it so the cycle keeps moving.
                debug!(job = %handle, status = %record.status, "dropping stale queue entry");
                st.ready.pop();
                return Ok(());
            }
            JobStatus::Ready | JobStatus::Running => {}
        }
        record.status = JobStatus::Running;
        record.started_at = Some(Instant::now());
        record.pass_out.clear();
        let Some(fut) = record.body.take() else {
            return Err(SchedulerError::Inconsistent(format!(
                "job {handle} has no execution state"
            )));
        };
        (fut, events)
    };
    events.emit(Event::job_dispatched(handle));

    let mut fut = fut;
    let mut cx = Context::from_waker(Waker::noop());
    match fut.as_mut().poll(&mut cx) {
        Poll::Ready(result) => end_job(state, handle, result),
        Poll::Pending => {
            let mut st = state.borrow_mut();
            if let Some(record) = st.table.get_mut(handle) {
                record.body = Some(fut);
                if record.status == JobStatus::Running {
                    // Suspended at a foreign await point: still queued at
                    // the head, eligible for an immediate re-poll.
                    record.status = JobStatus::Ready;
                }
            }
            Ok(())
        }
    }
}

/// Terminal transition: buffer the final values, unblock all waiters,
/// and run the completion callback in isolation.
fn end_job(
    state: &Rc<RefCell<SchedulerState>>,
    handle: JobHandle,
    result: JobResult,
) -> Result<(), SchedulerError> {
    let (events, name, values, success, callback, resumed) = {
        let mut st = state.borrow_mut();
        let events = st.events.clone();
        let Some(record) = st.table.get_mut(handle) else {
            return Err(SchedulerError::Inconsistent(format!(
                "completed job {handle} has no table entry"
            )));
        };
        let name = record.name.clone();
        let (values, success) = match result {
            Ok(values) => (values, true),
            Err(e) => {
                warn!(job = %name, error = %e, "job failed");
                (vec![Value::String(e.to_string())], false)
            }
        };
        record.status = JobStatus::Done;
        record.pass_out = values.clone();
        let callback = record.callback.take();
        st.unqueue_running(handle);

        // Signal: wake every job blocked on this one, FIFO, with the
        // final values as their pass-in.
        let waiters = st.waiting.drain(handle);
        let mut resumed = Vec::with_capacity(waiters.len());
        for waiter in waiters {
            match st.resume_waiting(waiter, values.clone()) {
                Ok(()) => resumed.push(waiter),
                Err(e) => warn!(job = %handle, waiter = %waiter, error = %e, "failed to wake waiter"),
            }
        }
        (events, name, values, success, callback, resumed)
    };

    for waiter in &resumed {
        events.emit(Event::job_resumed(*waiter));
    }
    events.emit(Event::job_completed(handle, success));

    if let Some(callback) = callback {
        // Callback failures are isolated: logged, never propagated to the
        // kernel or to other jobs.
        if let Err(e) = callback(&values) {
            warn!(job = %name, error = %e, "completion callback failed");
            events.emit(Event::callback_failed(handle, e.to_string()));
        }
        state.borrow_mut().table.remove(handle);
    }
    Ok(())
}
