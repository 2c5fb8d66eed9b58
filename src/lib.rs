// LLM API Benchmark - Library root for testing

pub mod batch;
pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod report;
pub mod runner;
pub mod sse;
pub mod timer;

pub use batch::BatchComparator;
pub use config::TargetConfig;
pub use metrics::{aggregate, AggregateMetrics, RunSample};
pub use report::{BatchResult, BenchmarkReport, RankBy};
pub use runner::RunExecutor;
pub use timer::StreamTimer;
