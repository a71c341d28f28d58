//! Registry of jobs, keyed by generation-checked handles.

use super::job::JobRecord;
use super::types::{JobHandle, JobStatus};

struct Slot {
    generation: u32,
    record: Option<JobRecord>,
}

/// Slot arena mapping [`JobHandle`]s to job records.
///
/// A slot's generation is bumped on removal, so a handle issued for one
/// occupant never resolves to a later one. Slots are reused only after
/// their record has been consumed.
pub(crate) struct JobTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl JobTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Register a record and issue its handle.
    pub(crate) fn insert(&mut self, record: JobRecord) -> JobHandle {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.record = Some(record);
                JobHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    record: Some(record),
                });
                JobHandle::new(index, 0)
            }
        }
    }

    pub(crate) fn get(&self, handle: JobHandle) -> Option<&JobRecord> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.record.as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: JobHandle) -> Option<&mut JobRecord> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.record.as_mut()
    }

    /// Consume a record. The slot's generation is bumped so the handle
    /// (and any copies of it) stop resolving.
    pub(crate) fn remove(&mut self, handle: JobHandle) -> Option<JobRecord> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index() as u32);
        Some(record)
    }

    /// Number of tracked jobs, completed-but-unconsumed ones included.
    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.record.is_some()).count()
    }

    /// Jobs with scheduling work left (anything not `Done`). The kernel
    /// parks itself when this reaches zero.
    pub(crate) fn unfinished(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|s| s.record.as_ref())
            .filter(|r| r.status != JobStatus::Done)
            .count()
    }
}
