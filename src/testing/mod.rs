//! Testing utilities for hosts embedding the scheduler.
//!
//! - [`run_local`]: drives a future on a fresh current-thread runtime
//!   inside a `LocalSet`, the environment the scheduler requires
//! - [`RecordingHandler`]: captures lifecycle events for order assertions
//! - [`wait_until`]: bounded polling for a condition, instead of fixed
//!   sleeps

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::events::{Event, EventHandler};

/// Run a future to completion on a current-thread tokio runtime inside a
/// `tokio::task::LocalSet`, so [`Scheduler::spawn`](crate::Scheduler::spawn)
/// can arm its kernel task.
///
/// Tasks still pending when the future finishes are dropped with the
/// `LocalSet` — including a parked kernel.
pub fn run_local<F: Future>(fut: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build current-thread runtime");
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, fut)
}

/// Event handler that records everything it sees.
pub struct RecordingHandler {
    events: RefCell<Vec<Event>>,
}

impl RecordingHandler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            events: RefCell::new(Vec::new()),
        })
    }

    /// Snapshot of all recorded events, in emission order.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Number of recorded events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }
}

impl EventHandler for RecordingHandler {
    fn handle(&self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Poll `condition` every millisecond until it holds or `timeout`
/// elapses.
///
/// # Panics
///
/// Panics when the timeout is reached first; this is a test helper.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let start = tokio::time::Instant::now();
    while !condition() {
        if start.elapsed() > timeout {
            panic!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
