//! Job definition, result conventions, and the table record.
//!
//! A job body is an async closure given a [`JobContext`] and its initial
//! arguments. Suspension happens only at the context's primitives (or a
//! foreign await point); the value buffers exchanged across those
//! boundaries live in the job's table record.

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use thiserror::Error;

use super::types::{JobHandle, JobStatus};
use crate::scheduler::context::JobContext;

/// Errors surfaced to and from job bodies.
#[derive(Debug, Error)]
pub enum JobError {
    /// The body failed. Treated as completion: waiters unblock and the
    /// message becomes the job's sole output value.
    #[error("{0}")]
    Failed(String),

    /// A primitive was given a handle that no longer resolves to a job.
    #[error("unknown job handle {0}")]
    UnknownJob(JobHandle),

    /// The scheduler was dropped while this job was suspended.
    #[error("scheduler no longer exists")]
    SchedulerGone,
}

impl JobError {
    /// Shorthand for a body failure with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Outcome of a job body: output values on success, an error payload on
/// failure. The tagged form replaces a success-flag-prefixed value list.
pub type JobResult = Result<Vec<Value>, JobError>;

/// Error a completion callback may return. Isolated and logged; never
/// propagated to the kernel or to other jobs.
pub type CallbackError = Box<dyn std::error::Error>;

/// Completion callback, invoked once with the job's final values.
pub type Callback = Box<dyn FnOnce(&[Value]) -> Result<(), CallbackError>>;

/// Boxed, resumable execution state of a job. Single-threaded by
/// construction: nothing here is `Send`.
pub(crate) type JobFuture = Pin<Box<dyn Future<Output = JobResult>>>;

pub(crate) type JobBody = Box<dyn FnOnce(JobContext, Vec<Value>) -> JobFuture>;

/// A unit of suspendable work, built by the client and handed to
/// [`Scheduler::spawn`](crate::Scheduler::spawn).
///
/// ```no_run
/// use spool::{Job, Scheduler};
/// use serde_json::json;
///
/// let scheduler = Scheduler::new();
/// scheduler.spawn(
///     Job::new("greeter", |_ctx, args| async move { Ok(args) })
///         .with_args(vec![json!("hello")])
///         .with_callback(|values| {
///             println!("finished with {values:?}");
///             Ok(())
///         }),
/// );
/// ```
pub struct Job {
    pub(crate) name: String,
    pub(crate) args: Vec<Value>,
    pub(crate) callback: Option<Callback>,
    pub(crate) body: JobBody,
}

impl Job {
    /// Create a job from a diagnostic name and an async body.
    ///
    /// The body receives a [`JobContext`] for in-job primitives and the
    /// initial arguments set via [`with_args`](Self::with_args) (empty
    /// by default).
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(JobContext, Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = JobResult> + 'static,
    {
        Self {
            name: name.into(),
            args: Vec::new(),
            callback: None,
            body: Box::new(move |ctx, args| Box::pin(body(ctx, args))),
        }
    }

    /// Set the arguments delivered to the body's first resume.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Register a completion callback.
    ///
    /// The callback receives the job's final values (or the error payload
    /// when the body failed) and its table entry is deleted right after
    /// it runs; jobs without a callback retain their entry for
    /// [`take_results`](crate::Scheduler::take_results).
    pub fn with_callback<C>(mut self, callback: C) -> Self
    where
        C: FnOnce(&[Value]) -> Result<(), CallbackError> + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// The diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Mutable per-job state tracked by the job table.
pub(crate) struct JobRecord {
    pub(crate) name: String,
    pub(crate) status: JobStatus,
    /// Timestamp of the last dispatch, for burst-time accounting.
    pub(crate) started_at: Option<Instant>,
    /// Values delivered on the next resume. Single-use.
    pub(crate) pass_in: Vec<Value>,
    /// Values produced by the most recent suspension or completion.
    /// Overwritten, never appended, on each dispatch.
    pub(crate) pass_out: Vec<Value>,
    pub(crate) callback: Option<Callback>,
    /// `None` only while the kernel is actively polling the body.
    pub(crate) body: Option<JobFuture>,
}

impl JobRecord {
    pub(crate) fn new(name: String, callback: Option<Callback>) -> Self {
        Self {
            name,
            status: JobStatus::Ready,
            started_at: None,
            pass_in: Vec::new(),
            pass_out: Vec::new(),
            callback,
            body: None,
        }
    }
}
