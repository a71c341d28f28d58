//! Common test utilities shared across integration tests.

use spool::SchedulerConfig;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Install a tracing subscriber honoring `RUST_LOG`, if none is set yet.
/// Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short cycles with a zero burst budget, so every `timeout()` check
/// yields — the setup for round-robin assertions.
pub fn round_robin_config() -> SchedulerConfig {
    SchedulerConfig::new()
        .with_cycle_time(Duration::from_millis(20))
        .with_up_ratio(0.9)
        .with_burst_ratio(0.0)
}

/// Short cycles with the default burst behavior.
pub fn fast_config() -> SchedulerConfig {
    SchedulerConfig::new()
        .with_cycle_time(Duration::from_millis(20))
        .with_up_ratio(0.9)
        .with_burst_ratio(0.5)
}

/// Shared execution-order log for instrumenting job bodies.
pub type OrderLog = Rc<RefCell<Vec<&'static str>>>;

pub fn order_log() -> OrderLog {
    Rc::new(RefCell::new(Vec::new()))
}
