#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod executor;
pub mod probe;
pub mod runner;
pub mod scenario;
pub mod scheduler;

pub use qrload_core as core;

pub use error::{ProbeError, RunError};
pub use executor::{Execute, HttpExecutor};
pub use probe::ServiceProbe;
pub use runner::Runner;
pub use scenario::{PayloadSource, ScenarioSpec};
pub use scheduler::{BatchPlan, BatchResult, ConcurrencyScheduler, ScheduledRun};

pub mod prelude {
    pub use crate::{
        Execute, HttpExecutor, PayloadSource, ProbeError, RunError, Runner, ScenarioSpec,
        ServiceProbe,
    };
    pub use qrload_core::{
        AggregateStats, ConfigError, LatencySummary, Outcome, RequestSpec, RunReport,
        ScenarioConfig, CACHE_CLEAR_ENDPOINT, CACHE_STATS_ENDPOINT, GENERATE_ENDPOINT,
        HEALTH_ENDPOINT,
    };
}
