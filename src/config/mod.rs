//! Scheduler configuration: typed timing settings plus YAML loading.

mod error;
mod types;
mod yaml;

pub use error::ConfigError;
pub use types::SchedulerConfig;
