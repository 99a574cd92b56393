use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const HTTP_REQS: &str = "http_reqs";
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
pub const HTTP_REQ_WAITING: &str = "http_req_waiting";
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
pub const DATA_RECEIVED: &str = "data_received";
pub const DATA_SENT: &str = "data_sent";
pub const ITERATIONS: &str = "iterations";
pub const ITERATION_DURATION: &str = "iteration_duration";
pub const CHECKS: &str = "checks";
pub const VUS: &str = "vus";
pub const VUS_MAX: &str = "vus_max";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Rate,
    Trend,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Rate => "rate",
            MetricKind::Trend => "trend",
        };
        f.write_str(name)
    }
}

/// What the samples of a metric measure; drives formatting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Default,
    /// Milliseconds
    Time,
    /// Bytes
    Data,
}

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("metric '{name}' is a {existing}, cannot record it as a {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
    #[error("invalid metric name '{0}'")]
    InvalidName(String),
}

/// An aggregation that can be read off a metric, e.g. `avg` or `p(90)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Count,
    Rate,
    Value,
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
}

impl Aggregation {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "count" => Some(Aggregation::Count),
            "rate" => Some(Aggregation::Rate),
            "value" => Some(Aggregation::Value),
            "avg" => Some(Aggregation::Avg),
            "min" => Some(Aggregation::Min),
            "max" => Some(Aggregation::Max),
            "med" => Some(Aggregation::Med),
            _ => {
                let inner = raw.strip_prefix("p(")?.strip_suffix(')')?;
                let p: f64 = inner.trim().parse().ok()?;
                (0.0..=100.0)
                    .contains(&p)
                    .then_some(Aggregation::Percentile(p))
            }
        }
    }

    pub fn supported_by(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Counter => matches!(self, Aggregation::Count | Aggregation::Rate),
            MetricKind::Gauge => matches!(
                self,
                Aggregation::Value | Aggregation::Min | Aggregation::Max
            ),
            MetricKind::Rate => matches!(self, Aggregation::Rate),
            MetricKind::Trend => matches!(
                self,
                Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Max
                    | Aggregation::Med
                    | Aggregation::Percentile(_)
            ),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Count => f.write_str("count"),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Value => f.write_str("value"),
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Percentile(p) => write!(f, "p({})", p),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendSink {
    samples: Vec<f64>,
    sum: f64,
    min: f64,
    max: f64,
}

impl TrendSink {
    fn add(&mut self, value: f64) {
        if self.samples.is_empty() {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.samples.push(value);
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn avg(&self) -> Option<f64> {
        (!self.samples.is_empty()).then(|| self.sum / self.samples.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        (!self.samples.is_empty()).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (!self.samples.is_empty()).then_some(self.max)
    }

    /// Percentile with linear interpolation between closest ranks.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let rank = (p / 100.0) * (sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let weight = rank - lower as f64;
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
    }
}

#[derive(Debug, Clone)]
pub enum Sink {
    Counter { sum: f64, samples: u64 },
    Gauge { value: f64, min: f64, max: f64, samples: u64 },
    Rate { passes: u64, total: u64 },
    Trend(TrendSink),
}

impl Sink {
    fn empty(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Sink::Counter { sum: 0.0, samples: 0 },
            MetricKind::Gauge => Sink::Gauge {
                value: 0.0,
                min: 0.0,
                max: 0.0,
                samples: 0,
            },
            MetricKind::Rate => Sink::Rate {
                passes: 0,
                total: 0,
            },
            MetricKind::Trend => Sink::Trend(TrendSink::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Metric {
    pub contains: ValueType,
    pub sink: Sink,
}

impl Metric {
    pub fn new(kind: MetricKind, contains: ValueType) -> Self {
        Self {
            contains,
            sink: Sink::empty(kind),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self.sink {
            Sink::Counter { .. } => MetricKind::Counter,
            Sink::Gauge { .. } => MetricKind::Gauge,
            Sink::Rate { .. } => MetricKind::Rate,
            Sink::Trend(_) => MetricKind::Trend,
        }
    }

    pub fn sample_count(&self) -> u64 {
        match &self.sink {
            Sink::Counter { samples, .. } | Sink::Gauge { samples, .. } => *samples,
            Sink::Rate { total, .. } => *total,
            Sink::Trend(trend) => trend.count() as u64,
        }
    }

    pub fn has_samples(&self) -> bool {
        self.sample_count() > 0
    }

    /// Reads an aggregation; `None` when the metric has no samples or the
    /// aggregation does not apply to this kind.
    pub fn aggregate(&self, aggregation: Aggregation, elapsed: Duration) -> Option<f64> {
        if !self.has_samples() || !aggregation.supported_by(self.kind()) {
            return None;
        }
        match (&self.sink, aggregation) {
            (Sink::Counter { sum, .. }, Aggregation::Count) => Some(*sum),
            (Sink::Counter { sum, .. }, Aggregation::Rate) => {
                let secs = elapsed.as_secs_f64();
                Some(if secs > 0.0 { sum / secs } else { 0.0 })
            }
            (Sink::Gauge { value, .. }, Aggregation::Value) => Some(*value),
            (Sink::Gauge { min, .. }, Aggregation::Min) => Some(*min),
            (Sink::Gauge { max, .. }, Aggregation::Max) => Some(*max),
            (Sink::Rate { passes, total }, Aggregation::Rate) => {
                Some(*passes as f64 / *total as f64)
            }
            (Sink::Trend(trend), Aggregation::Avg) => trend.avg(),
            (Sink::Trend(trend), Aggregation::Min) => trend.min(),
            (Sink::Trend(trend), Aggregation::Max) => trend.max(),
            (Sink::Trend(trend), Aggregation::Med) => trend.percentile(50.0),
            (Sink::Trend(trend), Aggregation::Percentile(p)) => trend.percentile(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTally {
    pub passes: u64,
    pub fails: u64,
}

/// One finished HTTP request as seen by the metric registry.
#[derive(Debug, Clone)]
pub struct HttpSample {
    pub duration: Duration,
    pub waiting: Duration,
    pub failed: bool,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Run-wide store of every metric and check tally. Samples are only ever
/// appended.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    start_time: Instant,
    metrics: IndexMap<String, Metric>,
    checks: IndexMap<String, CheckTally>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            start_time: Instant::now(),
            metrics: IndexMap::new(),
            checks: IndexMap::new(),
        };

        let builtins = [
            (HTTP_REQS, MetricKind::Counter, ValueType::Default),
            (HTTP_REQ_DURATION, MetricKind::Trend, ValueType::Time),
            (HTTP_REQ_WAITING, MetricKind::Trend, ValueType::Time),
            (HTTP_REQ_FAILED, MetricKind::Rate, ValueType::Default),
            (DATA_RECEIVED, MetricKind::Counter, ValueType::Data),
            (DATA_SENT, MetricKind::Counter, ValueType::Data),
            (ITERATIONS, MetricKind::Counter, ValueType::Default),
            (ITERATION_DURATION, MetricKind::Trend, ValueType::Time),
            (CHECKS, MetricKind::Rate, ValueType::Default),
            (VUS, MetricKind::Gauge, ValueType::Default),
            (VUS_MAX, MetricKind::Gauge, ValueType::Default),
        ];
        for (name, kind, contains) in builtins {
            registry
                .metrics
                .insert(name.to_string(), Metric::new(kind, contains));
        }

        registry
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Declares a metric up front. Re-registering with the same kind is a no-op.
    pub fn register(
        &mut self,
        name: &str,
        kind: MetricKind,
        contains: ValueType,
    ) -> Result<(), MetricError> {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace()) {
            return Err(MetricError::InvalidName(name.to_string()));
        }
        match self.metrics.get(name) {
            Some(existing) if existing.kind() != kind => Err(MetricError::KindMismatch {
                name: name.to_string(),
                existing: existing.kind(),
                requested: kind,
            }),
            Some(_) => Ok(()),
            None => {
                self.metrics
                    .insert(name.to_string(), Metric::new(kind, contains));
                Ok(())
            }
        }
    }

    fn sink_mut(&mut self, name: &str, kind: MetricKind) -> Result<&mut Sink, MetricError> {
        self.register(name, kind, ValueType::Default)?;
        // register() guarantees the entry exists
        let metric = self
            .metrics
            .get_mut(name)
            .ok_or_else(|| MetricError::InvalidName(name.to_string()))?;
        Ok(&mut metric.sink)
    }

    pub fn add_counter(&mut self, name: &str, value: f64) -> Result<(), MetricError> {
        if let Sink::Counter { sum, samples } = self.sink_mut(name, MetricKind::Counter)? {
            *sum += value;
            *samples += 1;
        }
        Ok(())
    }

    pub fn add_gauge(&mut self, name: &str, value: f64) -> Result<(), MetricError> {
        if let Sink::Gauge {
            value: current,
            min,
            max,
            samples,
        } = self.sink_mut(name, MetricKind::Gauge)?
        {
            if *samples == 0 {
                *min = value;
                *max = value;
            } else {
                *min = min.min(value);
                *max = max.max(value);
            }
            *current = value;
            *samples += 1;
        }
        Ok(())
    }

    pub fn add_rate(&mut self, name: &str, passed: bool) -> Result<(), MetricError> {
        if let Sink::Rate { passes, total } = self.sink_mut(name, MetricKind::Rate)? {
            if passed {
                *passes += 1;
            }
            *total += 1;
        }
        Ok(())
    }

    pub fn add_trend(&mut self, name: &str, value: f64) -> Result<(), MetricError> {
        if let Sink::Trend(trend) = self.sink_mut(name, MetricKind::Trend)? {
            trend.add(value);
        }
        Ok(())
    }

    pub fn record_http(&mut self, sample: &HttpSample) -> Result<(), MetricError> {
        self.add_counter(HTTP_REQS, 1.0)?;
        self.add_trend(HTTP_REQ_DURATION, duration_ms(sample.duration))?;
        self.add_trend(HTTP_REQ_WAITING, duration_ms(sample.waiting))?;
        self.add_rate(HTTP_REQ_FAILED, sample.failed)?;
        self.add_counter(DATA_SENT, sample.bytes_sent as f64)?;
        self.add_counter(DATA_RECEIVED, sample.bytes_received as f64)?;
        Ok(())
    }

    pub fn record_iteration(&mut self, duration: Duration) -> Result<(), MetricError> {
        self.add_counter(ITERATIONS, 1.0)?;
        self.add_trend(ITERATION_DURATION, duration_ms(duration))
    }

    pub fn record_check(&mut self, name: &str, passed: bool) -> Result<(), MetricError> {
        let tally = self.checks.entry(name.to_string()).or_default();
        if passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
        self.add_rate(CHECKS, passed)
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&String, &Metric)> {
        self.metrics.iter()
    }

    pub fn checks(&self) -> &IndexMap<String, CheckTally> {
        &self.checks
    }

    pub fn counter_value(&self, name: &str) -> u64 {
        match self.metrics.get(name).map(|m| &m.sink) {
            Some(Sink::Counter { sum, .. }) => *sum as u64,
            _ => 0,
        }
    }
}

pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = MetricsRegistry::new();
        assert_eq!(
            registry.get(HTTP_REQ_DURATION).unwrap().kind(),
            MetricKind::Trend
        );
        assert_eq!(
            registry.get(HTTP_REQ_DURATION).unwrap().contains,
            ValueType::Time
        );
        assert_eq!(
            registry.get(HTTP_REQ_FAILED).unwrap().kind(),
            MetricKind::Rate
        );
        assert!(!registry.get(HTTP_REQS).unwrap().has_samples());
    }

    #[test]
    fn test_trend_aggregations() {
        let mut registry = MetricsRegistry::new();
        for v in [100.0, 200.0, 300.0, 400.0, 500.0] {
            registry.add_trend("latency", v).unwrap();
        }
        let metric = registry.get("latency").unwrap();
        let elapsed = Duration::from_secs(1);

        assert_eq!(metric.aggregate(Aggregation::Avg, elapsed), Some(300.0));
        assert_eq!(metric.aggregate(Aggregation::Min, elapsed), Some(100.0));
        assert_eq!(metric.aggregate(Aggregation::Max, elapsed), Some(500.0));
        assert_eq!(metric.aggregate(Aggregation::Med, elapsed), Some(300.0));
        // rank = 0.9 * 4 = 3.6 -> 400 + 0.6 * 100
        let p90 = metric
            .aggregate(Aggregation::Percentile(90.0), elapsed)
            .unwrap();
        assert!((p90 - 460.0).abs() < 1e-9);
        assert_eq!(metric.aggregate(Aggregation::Rate, elapsed), None);
    }

    #[test]
    fn test_rate_and_counter() {
        let mut registry = MetricsRegistry::new();
        registry.add_rate("success_rate", true).unwrap();
        registry.add_rate("success_rate", true).unwrap();
        registry.add_rate("success_rate", true).unwrap();
        registry.add_rate("success_rate", false).unwrap();
        registry.add_counter("hits", 5.0).unwrap();
        registry.add_counter("hits", 5.0).unwrap();

        let elapsed = Duration::from_secs(2);
        let rate = registry.get("success_rate").unwrap();
        assert_eq!(rate.aggregate(Aggregation::Rate, elapsed), Some(0.75));
        assert_eq!(rate.sample_count(), 4);

        let hits = registry.get("hits").unwrap();
        assert_eq!(hits.aggregate(Aggregation::Count, elapsed), Some(10.0));
        assert_eq!(hits.aggregate(Aggregation::Rate, elapsed), Some(5.0));
        assert_eq!(registry.counter_value("hits"), 10);
    }

    #[test]
    fn test_gauge_tracks_bounds() {
        let mut registry = MetricsRegistry::new();
        for v in [3.0, 7.0, 1.0] {
            registry.add_gauge(VUS, v).unwrap();
        }
        let vus = registry.get(VUS).unwrap();
        let elapsed = Duration::from_secs(1);
        assert_eq!(vus.aggregate(Aggregation::Value, elapsed), Some(1.0));
        assert_eq!(vus.aggregate(Aggregation::Min, elapsed), Some(1.0));
        assert_eq!(vus.aggregate(Aggregation::Max, elapsed), Some(7.0));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut registry = MetricsRegistry::new();
        let err = registry.add_trend(HTTP_REQ_FAILED, 1.0).unwrap_err();
        assert_eq!(
            err,
            MetricError::KindMismatch {
                name: HTTP_REQ_FAILED.to_string(),
                existing: MetricKind::Rate,
                requested: MetricKind::Trend,
            }
        );
        assert!(registry
            .register("bad name", MetricKind::Counter, ValueType::Default)
            .is_err());
    }

    #[test]
    fn test_record_http_and_checks() {
        let mut registry = MetricsRegistry::new();
        registry
            .record_http(&HttpSample {
                duration: Duration::from_millis(120),
                waiting: Duration::from_millis(100),
                failed: false,
                bytes_sent: 90,
                bytes_received: 2048,
            })
            .unwrap();
        registry.record_check("status ok", true).unwrap();
        registry.record_check("status ok", false).unwrap();

        assert_eq!(registry.counter_value(HTTP_REQS), 1);
        assert_eq!(registry.counter_value(DATA_RECEIVED), 2048);
        assert_eq!(
            registry.checks().get("status ok"),
            Some(&CheckTally {
                passes: 1,
                fails: 1
            })
        );
        assert_eq!(registry.get(CHECKS).unwrap().sample_count(), 2);
    }

    #[test]
    fn test_aggregation_parse() {
        assert_eq!(Aggregation::parse("avg"), Some(Aggregation::Avg));
        assert_eq!(
            Aggregation::parse("p(99.9)"),
            Some(Aggregation::Percentile(99.9))
        );
        assert_eq!(Aggregation::parse("p(101)"), None);
        assert_eq!(Aggregation::parse("mean"), None);
        assert_eq!(Aggregation::Percentile(90.0).to_string(), "p(90)");
    }

    #[test]
    fn test_empty_metric_has_no_aggregate() {
        let registry = MetricsRegistry::new();
        let metric = registry.get(HTTP_REQ_DURATION).unwrap();
        assert_eq!(
            metric.aggregate(Aggregation::Avg, Duration::from_secs(1)),
            None
        );
    }
}
