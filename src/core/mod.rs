//! Core data structures: handles, job records, and the scheduling
//! collections the kernel operates on.

pub mod job;
pub mod queue;
pub mod table;
pub mod types;
pub mod waitlist;
