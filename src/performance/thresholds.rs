use crate::config::ThresholdSpec;
use crate::performance::metrics::{Aggregation, MetricKind, MetricsRegistry};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("invalid threshold expression '{0}', expected e.g. 'p(95)<500' or 'rate>0.9'")]
    Parse(String),
    #[error("threshold '{expression}' refers to unknown metric '{metric}'")]
    UnknownMetric { metric: String, expression: String },
    #[error("aggregation '{aggregation}' is not available on {kind} metric '{metric}'")]
    Unsupported {
        metric: String,
        kind: MetricKind,
        aggregation: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            "==" | "===" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            _ => None,
        }
    }

    fn holds(&self, actual: f64, expected: f64) -> bool {
        match self {
            Operator::Lt => actual < expected,
            Operator::Le => actual <= expected,
            Operator::Gt => actual > expected,
            Operator::Ge => actual >= expected,
            Operator::Eq => actual == expected,
            Operator::Ne => actual != expected,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        };
        f.write_str(op)
    }
}

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(count|rate|value|avg|min|max|med|p\(\s*\d+(?:\.\d+)?\s*\))\s*(<=|>=|===|==|!=|<|>)\s*(-?\d+(?:\.\d+)?)\s*$",
        )
        .expect("threshold regex is valid")
    })
}

/// A single pass/fail expression such as `p(90)<6800`.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub source: String,
    pub aggregation: Aggregation,
    pub operator: Operator,
    pub value: f64,
}

impl Threshold {
    pub fn parse(expression: &str) -> Result<Self, ThresholdError> {
        let parse_err = || ThresholdError::Parse(expression.to_string());
        let caps = expression_regex()
            .captures(expression)
            .ok_or_else(parse_err)?;

        let aggregation = Aggregation::parse(&caps[1].replace(' ', "")).ok_or_else(parse_err)?;
        let operator = Operator::parse(&caps[2]).ok_or_else(parse_err)?;
        let value: f64 = caps[3].parse().map_err(|_| parse_err())?;

        Ok(Self {
            source: expression.trim().to_string(),
            aggregation,
            operator,
            value,
        })
    }

    /// `Ok(None)` means there is nothing to judge yet (no samples).
    pub fn evaluate(
        &self,
        metric_name: &str,
        registry: &MetricsRegistry,
        elapsed: Duration,
    ) -> Result<Option<bool>, ThresholdError> {
        let metric = registry
            .get(metric_name)
            .ok_or_else(|| ThresholdError::UnknownMetric {
                metric: metric_name.to_string(),
                expression: self.source.clone(),
            })?;

        if !self.aggregation.supported_by(metric.kind()) {
            return Err(ThresholdError::Unsupported {
                metric: metric_name.to_string(),
                kind: metric.kind(),
                aggregation: self.aggregation.to_string(),
            });
        }

        Ok(metric
            .aggregate(self.aggregation, elapsed)
            .map(|actual| self.operator.holds(actual, self.value)))
    }
}

#[derive(Debug, Clone)]
struct ThresholdEntry {
    metric: String,
    threshold: Threshold,
    abort_on_fail: bool,
    delay_abort_eval: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    pub metric: String,
    pub expression: String,
    pub ok: bool,
    pub abort_on_fail: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdReport {
    pub outcomes: Vec<ThresholdOutcome>,
    pub should_abort: bool,
}

impl ThresholdReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.ok)
    }

    pub fn failed_metrics(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .outcomes
            .iter()
            .filter(|o| !o.ok)
            .map(|o| o.metric.as_str())
            .collect();
        names.dedup();
        names
    }

    pub fn for_metric<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = &'a ThresholdOutcome> {
        self.outcomes.iter().filter(move |o| o.metric == metric)
    }
}

/// All thresholds of a run, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ThresholdSet {
    entries: Vec<ThresholdEntry>,
}

impl ThresholdSet {
    pub fn from_config(
        thresholds: &IndexMap<String, Vec<ThresholdSpec>>,
    ) -> Result<Self, ThresholdError> {
        let mut entries = Vec::new();
        for (metric, specs) in thresholds {
            for spec in specs {
                entries.push(ThresholdEntry {
                    metric: metric.clone(),
                    threshold: Threshold::parse(spec.expression())?,
                    abort_on_fail: spec.abort_on_fail(),
                    delay_abort_eval: spec.delay_abort_eval(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every threshold must point at a registered metric of a compatible kind.
    pub fn validate_against(&self, registry: &MetricsRegistry) -> Result<(), ThresholdError> {
        for entry in &self.entries {
            entry
                .threshold
                .evaluate(&entry.metric, registry, registry.elapsed())?;
        }
        Ok(())
    }

    /// Aggregations referenced by thresholds on `metric`, so summaries can show them.
    pub fn aggregations_for(&self, metric: &str) -> Vec<Aggregation> {
        self.entries
            .iter()
            .filter(|e| e.metric == metric)
            .map(|e| e.threshold.aggregation)
            .collect()
    }

    pub fn evaluate(&self, registry: &MetricsRegistry, elapsed: Duration) -> ThresholdReport {
        let mut report = ThresholdReport::default();

        for entry in &self.entries {
            let ok = match entry.threshold.evaluate(&entry.metric, registry, elapsed) {
                Ok(Some(ok)) => ok,
                Ok(None) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "threshold could not be evaluated");
                    false
                }
            };

            if !ok && entry.abort_on_fail && elapsed >= entry.delay_abort_eval {
                report.should_abort = true;
            }

            report.outcomes.push(ThresholdOutcome {
                metric: entry.metric.clone(),
                expression: entry.threshold.source.clone(),
                ok,
                abort_on_fail: entry.abort_on_fail,
            });
        }

        report
    }
}
