//! Shared mutable scheduler state.
//!
//! One `RefCell` of this sits behind every scheduler clone, every job
//! context, and the kernel task. Borrows are short: nothing holds one
//! across a poll of client code or an event emission.

use std::rc::Rc;

use serde_json::Value;

use super::engine::SchedulerError;
use crate::config::SchedulerConfig;
use crate::core::queue::ReadyQueue;
use crate::core::table::JobTable;
use crate::core::types::{JobHandle, JobStatus};
use crate::core::waitlist::WaitList;
use crate::events::EventBus;

pub(crate) struct SchedulerState {
    pub(crate) config: SchedulerConfig,
    pub(crate) table: JobTable,
    pub(crate) ready: ReadyQueue,
    pub(crate) waiting: WaitList,
    pub(crate) events: Rc<EventBus>,
    /// True while a kernel task exists for this instance. Deliberately
    /// left set after a kernel defect, so spawn cannot re-arm a poisoned
    /// instance.
    pub(crate) kernel_active: bool,
}

impl SchedulerState {
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            table: JobTable::new(),
            ready: ReadyQueue::new(),
            waiting: WaitList::new(),
            events: Rc::new(EventBus::new()),
            kernel_active: false,
        }
    }

    /// Make a waiting job runnable again: buffer `values` as its next
    /// pass-in and requeue it at the tail. Only effective on `Waiting`
    /// jobs.
    pub(crate) fn resume_waiting(
        &mut self,
        handle: JobHandle,
        values: Vec<Value>,
    ) -> Result<(), SchedulerError> {
        let Some(record) = self.table.get_mut(handle) else {
            return Err(SchedulerError::UnknownJob(handle));
        };
        if record.status != JobStatus::Waiting {
            return Err(SchedulerError::NotWaiting(handle));
        }
        record.status = JobStatus::Ready;
        record.pass_in = values;
        self.ready.push(handle);
        Ok(())
    }

    /// Remove the currently running job from the ready queue. The
    /// dispatch discipline keeps it at the head; anything else is
    /// repaired and logged.
    pub(crate) fn unqueue_running(&mut self, handle: JobHandle) {
        match self.ready.peek() {
            Some(head) if head == handle => {
                self.ready.pop();
            }
            _ => {
                if self.ready.remove(handle) {
                    tracing::warn!(job = %handle, "running job was not at the queue head");
                }
            }
        }
    }
}
