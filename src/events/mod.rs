//! Lifecycle events and event handling.
//!
//! A synchronous, single-threaded event bus: handlers run inline at the
//! emit point, on the one logical thread the scheduler owns. The kernel
//! emits outside its own state borrows, so handlers may call back into
//! the scheduler (spawn, resume, pull results).

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::core::types::JobHandle;

/// Lifecycle events emitted as jobs move through the scheduler.
#[derive(Debug, Clone)]
pub enum Event {
    /// A job was registered and queued.
    JobCreated {
        handle: JobHandle,
        name: String,
        timestamp: Instant,
    },

    /// The kernel handed the foreground slot to a job.
    JobDispatched { handle: JobHandle, timestamp: Instant },

    /// A job exhausted its burst budget and requeued itself at the tail.
    JobRequeued { handle: JobHandle, timestamp: Instant },

    /// A job suspended to wait, either bare or on another job.
    JobParked {
        handle: JobHandle,
        waitee: Option<JobHandle>,
        timestamp: Instant,
    },

    /// A waiting job was made runnable again.
    JobResumed { handle: JobHandle, timestamp: Instant },

    /// A job reached its terminal state.
    JobCompleted {
        handle: JobHandle,
        success: bool,
        timestamp: Instant,
    },

    /// A completion callback returned an error. Isolated; the job itself
    /// still completed.
    CallbackFailed {
        handle: JobHandle,
        error: String,
        timestamp: Instant,
    },
}

impl Event {
    /// The job this event is about.
    pub fn job(&self) -> JobHandle {
        match self {
            Event::JobCreated { handle, .. }
            | Event::JobDispatched { handle, .. }
            | Event::JobRequeued { handle, .. }
            | Event::JobParked { handle, .. }
            | Event::JobResumed { handle, .. }
            | Event::JobCompleted { handle, .. }
            | Event::CallbackFailed { handle, .. } => *handle,
        }
    }

    /// When the event was emitted.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::JobCreated { timestamp, .. }
            | Event::JobDispatched { timestamp, .. }
            | Event::JobRequeued { timestamp, .. }
            | Event::JobParked { timestamp, .. }
            | Event::JobResumed { timestamp, .. }
            | Event::JobCompleted { timestamp, .. }
            | Event::CallbackFailed { timestamp, .. } => *timestamp,
        }
    }

    pub(crate) fn job_created(handle: JobHandle, name: String) -> Self {
        Event::JobCreated {
            handle,
            name,
            timestamp: Instant::now(),
        }
    }

    pub(crate) fn job_dispatched(handle: JobHandle) -> Self {
        Event::JobDispatched {
            handle,
            timestamp: Instant::now(),
        }
    }

    pub(crate) fn job_requeued(handle: JobHandle) -> Self {
        Event::JobRequeued {
            handle,
            timestamp: Instant::now(),
        }
    }

    pub(crate) fn job_parked(handle: JobHandle, waitee: Option<JobHandle>) -> Self {
        Event::JobParked {
            handle,
            waitee,
            timestamp: Instant::now(),
        }
    }

    pub(crate) fn job_resumed(handle: JobHandle) -> Self {
        Event::JobResumed {
            handle,
            timestamp: Instant::now(),
        }
    }

    pub(crate) fn job_completed(handle: JobHandle, success: bool) -> Self {
        Event::JobCompleted {
            handle,
            success,
            timestamp: Instant::now(),
        }
    }

    pub(crate) fn callback_failed(handle: JobHandle, error: String) -> Self {
        Event::CallbackFailed {
            handle,
            error,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
pub trait EventHandler {
    /// Handle an event. Runs inline on the scheduler's thread; keep it
    /// short.
    fn handle(&self, event: &Event);
}

/// Distributes events to registered handlers in registration order.
pub struct EventBus {
    handlers: RefCell<Vec<Rc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub fn register(&self, handler: Rc<dyn EventHandler>) {
        self.handlers.borrow_mut().push(handler);
    }

    /// Emit an event to all registered handlers.
    ///
    /// Handlers are snapshotted first, so a handler may register further
    /// handlers without observing its own emission.
    pub fn emit(&self, event: Event) {
        let handlers: Vec<_> = self.handlers.borrow().clone();
        for handler in &handlers {
            handler.handle(&event);
        }
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
