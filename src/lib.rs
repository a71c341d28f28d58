//! spool — a cooperative, single-threaded job scheduler for embedding in
//! a host event loop.
//!
//! Jobs are async bodies resumed strictly FIFO inside a fixed per-cycle
//! time budget. They yield voluntarily ([`JobContext::timeout`]), block
//! on each other ([`JobContext::wait`]), park until externally resumed
//! ([`JobContext::park`]), and deliver results by completion callback or
//! by pull ([`Scheduler::take_results`]). There is no parallelism, no
//! preemption, and no locking: a job that never yields blocks all
//! siblings until it finishes.
//!
//! The scheduler needs a current-thread tokio runtime with a `LocalSet`
//! (its kernel re-arms itself through the host timer between cycles);
//! [`testing::run_local`] sets one up.
//!
//! ```no_run
//! use serde_json::json;
//! use spool::{Job, Scheduler};
//!
//! # async fn demo() {
//! let scheduler = Scheduler::new();
//! let hello = scheduler.spawn(
//!     Job::new("hello", |_ctx, args| async move { Ok(args) })
//!         .with_args(vec![json!("hi")]),
//! );
//! scheduler.settled().await;
//! assert_eq!(scheduler.take_results(hello), Some(vec![json!("hi")]));
//! # }
//! ```

mod core;

pub mod config;
pub mod events;
pub mod scheduler;
pub mod testing;

pub use crate::core::job::{Callback, CallbackError, Job, JobError, JobResult};
pub use crate::core::types::{JobHandle, JobStatus};
pub use config::{ConfigError, SchedulerConfig};
pub use events::{Event, EventBus, EventHandler};
pub use scheduler::context::JobContext;
pub use scheduler::engine::{Scheduler, SchedulerError};
pub use serde_json::Value;
