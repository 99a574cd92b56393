pub mod metrics;
pub mod monitor;
pub mod runner;
pub mod stages;
pub mod thresholds;
pub mod vu;

pub use metrics::{MetricKind, MetricsRegistry};
pub use runner::{PerformanceTestRunner, RunOutcome, RunnerOptions, StopReason};
pub use stages::LoadProfile;
pub use thresholds::{Threshold, ThresholdSet};
pub use vu::VuContext;
