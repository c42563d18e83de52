pub mod args;
pub mod client;
pub mod config;
pub mod domain;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod utils;

pub use args::Args;
pub use client::{FarsightClient, Lookup, LookupError, PassiveDns, ResolutionRecord};
pub use config::Config;
pub use pipeline::RunOptions;
pub use stats::{IocReport, PeriodResult, RunResult};
