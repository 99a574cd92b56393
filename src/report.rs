use crate::config::{ScenarioConfig, Stage};
use crate::performance::metrics::{
    Aggregation, MetricKind, MetricsRegistry, Sink, ValueType, ITERATIONS, VUS_MAX,
};
use crate::performance::runner::StopReason;
use crate::performance::thresholds::{ThresholdReport, ThresholdSet};
use crate::utils::{format_duration, format_millis, format_size};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use owo_colors::{OwoColorize, Style};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdSummary {
    pub expression: String,
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub contains: ValueType,
    pub values: IndexMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<ThresholdSummary>,
}

impl MetricSummary {
    pub fn thresholds_ok(&self) -> Option<bool> {
        (!self.thresholds.is_empty()).then(|| self.thresholds.iter().all(|t| t.ok))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckSummary {
    pub fn pass_percent(&self) -> f64 {
        let total = self.passes + self.fails;
        if total == 0 {
            0.0
        } else {
            self.passes as f64 / total as f64 * 100.0
        }
    }
}

/// Aggregated results handed to the summary hook once the run is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryData {
    pub scenario: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub test_run_duration_ms: f64,
    pub stop_reason: StopReason,
    pub interrupted_iterations: u64,
    pub stages: Vec<Stage>,
    pub trend_stats: Vec<String>,
    pub metrics: IndexMap<String, MetricSummary>,
    pub checks: Vec<CheckSummary>,
    pub thresholds_passed: bool,
}

impl SummaryData {
    pub fn collect(
        registry: &MetricsRegistry,
        thresholds: &ThresholdSet,
        report: &ThresholdReport,
        config: &ScenarioConfig,
        stop_reason: StopReason,
        interrupted_iterations: u64,
        elapsed: Duration,
    ) -> Self {
        let mut names: Vec<&String> = registry
            .metrics()
            .filter(|(name, metric)| {
                metric.has_samples() || report.for_metric(name.as_str()).next().is_some()
            })
            .map(|(name, _)| name)
            .collect();
        names.sort();

        let mut metrics = IndexMap::new();
        for name in names {
            let Some(metric) = registry.get(name) else {
                continue;
            };

            let mut values = IndexMap::new();
            match &metric.sink {
                Sink::Counter { sum, .. } => {
                    values.insert("count".to_string(), *sum);
                    let secs = elapsed.as_secs_f64();
                    values.insert(
                        "rate".to_string(),
                        if secs > 0.0 { sum / secs } else { 0.0 },
                    );
                }
                Sink::Gauge {
                    value, min, max, ..
                } => {
                    values.insert("value".to_string(), *value);
                    values.insert("min".to_string(), *min);
                    values.insert("max".to_string(), *max);
                }
                Sink::Rate { passes, total } => {
                    let rate = if *total > 0 {
                        *passes as f64 / *total as f64
                    } else {
                        0.0
                    };
                    values.insert("rate".to_string(), rate);
                    values.insert("passes".to_string(), *passes as f64);
                    values.insert("fails".to_string(), (*total - *passes) as f64);
                }
                Sink::Trend(_) => {
                    let mut stats: Vec<Aggregation> = config
                        .summary
                        .trend_stats
                        .iter()
                        .filter_map(|s| Aggregation::parse(s))
                        .collect();
                    for extra in thresholds.aggregations_for(name) {
                        if !stats.contains(&extra) {
                            stats.push(extra);
                        }
                    }
                    for stat in stats {
                        if let Some(v) = metric.aggregate(stat, elapsed) {
                            values.insert(stat.to_string(), v);
                        }
                    }
                }
            }

            let threshold_summaries = report
                .for_metric(name)
                .map(|o| ThresholdSummary {
                    expression: o.expression.clone(),
                    ok: o.ok,
                })
                .collect();

            metrics.insert(
                name.clone(),
                MetricSummary {
                    kind: metric.kind(),
                    contains: metric.contains,
                    values,
                    thresholds: threshold_summaries,
                },
            );
        }

        let checks = registry
            .checks()
            .iter()
            .map(|(name, tally)| CheckSummary {
                name: name.clone(),
                passes: tally.passes,
                fails: tally.fails,
            })
            .collect();

        Self {
            scenario: config.name.clone(),
            url: config.url.clone(),
            timestamp: Utc::now(),
            test_run_duration_ms: elapsed.as_secs_f64() * 1000.0,
            stop_reason,
            interrupted_iterations,
            stages: config.stages.clone(),
            trend_stats: config.summary.trend_stats.clone(),
            metrics,
            checks,
            thresholds_passed: report.passed(),
        }
    }

    /// Summary of a run that recorded nothing.
    pub fn empty(config: &ScenarioConfig, report: &ThresholdReport) -> Self {
        Self::collect(
            &MetricsRegistry::new(),
            &ThresholdSet::default(),
            report,
            config,
            StopReason::ScheduleComplete,
            0,
            Duration::ZERO,
        )
    }

    pub fn completed_iterations(&self) -> u64 {
        self.metrics
            .get(ITERATIONS)
            .and_then(|m| m.values.get("count"))
            .copied()
            .unwrap_or(0.0) as u64
    }

    pub fn max_vus(&self) -> u64 {
        self.metrics
            .get(VUS_MAX)
            .and_then(|m| m.values.get("max"))
            .copied()
            .unwrap_or(0.0) as u64
    }

    pub fn failed_threshold_metrics(&self) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|(_, m)| m.thresholds_ok() == Some(false))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Where a rendered summary goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SummaryTarget {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl From<&str> for SummaryTarget {
    fn from(raw: &str) -> Self {
        match raw {
            "stdout" => SummaryTarget::Stdout,
            "stderr" => SummaryTarget::Stderr,
            path => SummaryTarget::File(PathBuf::from(path)),
        }
    }
}

impl fmt::Display for SummaryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryTarget::Stdout => f.write_str("stdout"),
            SummaryTarget::Stderr => f.write_str("stderr"),
            SummaryTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub type SummaryOutputs = IndexMap<SummaryTarget, String>;

/// Writes every output to its destination, creating parent directories for
/// files. Returns the files written.
pub fn write_outputs(outputs: &SummaryOutputs) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (target, content) in outputs {
        match target {
            SummaryTarget::Stdout => print!("{}", content),
            SummaryTarget::Stderr => eprint!("{}", content),
            SummaryTarget::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create directory {}", parent.display())
                    })?;
                }
                fs::write(path, content)
                    .with_context(|| format!("Failed to write summary to {}", path.display()))?;
                written.push(path.clone());
            }
        }
    }
    Ok(written)
}

pub fn json_summary(data: &SummaryData) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn format_value(value: f64, contains: ValueType) -> String {
    match contains {
        ValueType::Time => format_millis(value),
        ValueType::Data => format_size(value),
        ValueType::Default => format_number(value),
    }
}

/// Formatted `(label, value)` cells for one metric, shared by the text and
/// HTML renderers.
fn metric_cells(metric: &MetricSummary) -> Vec<(String, String)> {
    let get = |key: &str| metric.values.get(key).copied().unwrap_or(0.0);
    match metric.kind {
        MetricKind::Counter => {
            let rate = match metric.contains {
                ValueType::Data => format!("{}/s", format_size(get("rate"))),
                _ => format!("{:.2}/s", get("rate")),
            };
            vec![
                ("count".to_string(), format_value(get("count"), metric.contains)),
                ("rate".to_string(), rate),
            ]
        }
        MetricKind::Gauge => ["value", "min", "max"]
            .iter()
            .map(|k| (k.to_string(), format_value(get(k), metric.contains)))
            .collect(),
        MetricKind::Rate => vec![
            ("rate".to_string(), format!("{:.2}%", get("rate") * 100.0)),
            ("passes".to_string(), format_number(get("passes"))),
            ("fails".to_string(), format_number(get("fails"))),
        ],
        MetricKind::Trend => metric
            .values
            .iter()
            .map(|(k, v)| (k.clone(), format_value(*v, metric.contains)))
            .collect(),
    }
}

pub struct TextSummaryOptions {
    pub indent: String,
    pub enable_colors: bool,
}

impl Default for TextSummaryOptions {
    fn default() -> Self {
        Self {
            indent: " ".to_string(),
            enable_colors: true,
        }
    }
}

/// Applies styles only when colors are enabled.
struct Painter {
    enabled: bool,
}

impl Painter {
    fn paint(&self, s: &str, style: Style) -> String {
        if self.enabled {
            s.style(style).to_string()
        } else {
            s.to_string()
        }
    }

    fn green(&self, s: &str) -> String {
        self.paint(s, Style::new().green())
    }

    fn red(&self, s: &str) -> String {
        self.paint(s, Style::new().red())
    }

    fn cyan(&self, s: &str) -> String {
        self.paint(s, Style::new().cyan())
    }

    fn dim(&self, s: &str) -> String {
        self.paint(s, Style::new().dimmed())
    }
}

/// Console summary: checks, then one line per metric sorted by name, then
/// the run footer.
pub fn text_summary(data: &SummaryData, options: &TextSummaryOptions) -> String {
    let paint = Painter {
        enabled: options.enable_colors,
    };
    let indent = options.indent.as_str();
    let mut out = String::new();

    let stages = data
        .stages
        .iter()
        .map(|s| format!("{}→{}", format_duration(s.duration), s.target))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out);
    let _ = writeln!(out, "{indent}  scenario: {} ({})", data.scenario, data.url);
    let _ = writeln!(out, "{indent}  stages..: {}", stages);
    let _ = writeln!(out);

    for check in &data.checks {
        if check.fails == 0 {
            let _ = writeln!(out, "{indent}    {}", paint.green(&format!("✓ {}", check.name)));
        } else {
            let _ = writeln!(out, "{indent}    {}", paint.red(&format!("✗ {}", check.name)));
            let _ = writeln!(
                out,
                "{indent}     {}  {:.0}% — {} / {}",
                paint.dim("↳"),
                check.pass_percent(),
                paint.green(&format!("✓ {}", check.passes)),
                paint.red(&format!("✗ {}", check.fails))
            );
        }
    }
    if !data.checks.is_empty() {
        let _ = writeln!(out);
    }

    let width = data.metrics.keys().map(|k| k.chars().count()).max().unwrap_or(0) + 3;
    for (name, metric) in &data.metrics {
        let mark = match metric.thresholds_ok() {
            Some(true) => paint.green("✓ "),
            Some(false) => paint.red("✗ "),
            None => "  ".to_string(),
        };
        let dots = ".".repeat(width.saturating_sub(name.chars().count()));
        let cells = metric_cells(metric);

        let value = match metric.kind {
            MetricKind::Trend => cells
                .iter()
                .map(|(k, v)| format!("{}={}", k, paint.cyan(v)))
                .collect::<Vec<_>>()
                .join(" "),
            MetricKind::Counter => format!(
                "{} {}",
                paint.cyan(&cells[0].1),
                paint.dim(&cells[1].1)
            ),
            MetricKind::Rate => format!(
                "{} {} {}",
                paint.cyan(&cells[0].1),
                paint.green(&format!("✓ {}", cells[1].1)),
                paint.red(&format!("✗ {}", cells[2].1))
            ),
            MetricKind::Gauge => format!(
                "{} min={} max={}",
                paint.cyan(&cells[0].1),
                paint.cyan(&cells[1].1),
                paint.cyan(&cells[2].1)
            ),
        };

        let _ = writeln!(out, "{indent}{mark}{name}{}: {value}", paint.dim(&dots));
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{indent}  running ({}), {} max VUs, {} complete and {} interrupted iterations",
        format_millis(data.test_run_duration_ms),
        data.max_vus(),
        data.completed_iterations(),
        data.interrupted_iterations
    );

    match data.stop_reason {
        StopReason::ThresholdAbort => {
            let _ = writeln!(
                out,
                "{indent}  {}",
                paint.red("run aborted: a threshold marked abort_on_fail was crossed")
            );
        }
        StopReason::Interrupted => {
            let _ = writeln!(out, "{indent}  {}", paint.red("run interrupted by user"));
        }
        StopReason::ScheduleComplete => {}
    }

    if !data.thresholds_passed {
        let _ = writeln!(
            out,
            "{indent}  {}",
            paint.red(&format!(
                "thresholds on metrics '{}' have been crossed",
                data.failed_threshold_metrics().join("', '")
            ))
        );
    }

    out
}

#[derive(Debug, Serialize)]
struct HtmlMetricRow {
    name: String,
    kind: String,
    cells: Vec<HtmlCell>,
    state: &'static str,
    thresholds: Vec<ThresholdSummary>,
}

#[derive(Debug, Serialize)]
struct HtmlCell {
    label: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct HtmlCheckRow {
    name: String,
    passes: u64,
    fails: u64,
    percent: String,
}

/// Renders the standalone HTML report.
pub fn html_report(data: &SummaryData) -> Result<String> {
    use tera::{Context as TeraContext, Tera};

    let mut tera = Tera::default();
    tera.add_raw_template("summary.html", include_str!("../templates/summary.html"))
        .map_err(|e| anyhow::anyhow!("Failed to add template: {}", e))?;

    let to_row = |(name, metric): (&String, &MetricSummary)| HtmlMetricRow {
        name: name.clone(),
        kind: metric.kind.to_string(),
        cells: metric_cells(metric)
            .into_iter()
            .map(|(label, value)| HtmlCell { label, value })
            .collect(),
        state: match metric.thresholds_ok() {
            Some(true) => "pass",
            Some(false) => "fail",
            None => "none",
        },
        thresholds: metric.thresholds.clone(),
    };

    let trend_rows: Vec<HtmlMetricRow> = data
        .metrics
        .iter()
        .filter(|(_, m)| m.kind == MetricKind::Trend)
        .map(to_row)
        .collect();
    let other_rows: Vec<HtmlMetricRow> = data
        .metrics
        .iter()
        .filter(|(_, m)| m.kind != MetricKind::Trend)
        .map(to_row)
        .collect();
    let checks: Vec<HtmlCheckRow> = data
        .checks
        .iter()
        .map(|c| HtmlCheckRow {
            name: c.name.clone(),
            passes: c.passes,
            fails: c.fails,
            percent: format!("{:.2}", c.pass_percent()),
        })
        .collect();
    let stages: Vec<String> = data
        .stages
        .iter()
        .map(|s| format!("{} → {} VUs", format_duration(s.duration), s.target))
        .collect();

    let mut context = TeraContext::new();
    context.insert("data", data);
    context.insert(
        "timestamp",
        &data.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    context.insert("duration", &format_millis(data.test_run_duration_ms));
    context.insert("iterations", &data.completed_iterations());
    context.insert("max_vus", &data.max_vus());
    context.insert("trend_rows", &trend_rows);
    context.insert("other_rows", &other_rows);
    context.insert("checks", &checks);
    context.insert("stages", &stages);
    context.insert(
        "checks_failed",
        &data.checks.iter().map(|c| c.fails).sum::<u64>(),
    );

    let html = tera.render("summary.html", &context)?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdSpec;
    use crate::performance::metrics::HttpSample;

    fn sample_run() -> (MetricsRegistry, ThresholdSet, ScenarioConfig) {
        let config = ScenarioConfig::default();
        let mut registry = MetricsRegistry::new();
        registry
            .register("get_request_duration", MetricKind::Trend, ValueType::Time)
            .unwrap();
        registry
            .register("success_rate", MetricKind::Rate, ValueType::Default)
            .unwrap();

        for (ms, status_ok) in [(120u64, true), (180, true), (7400, false), (90, true)] {
            registry
                .record_http(&HttpSample {
                    duration: Duration::from_millis(ms),
                    waiting: Duration::from_millis(ms / 2),
                    failed: !status_ok,
                    bytes_sent: 100,
                    bytes_received: 27_520,
                })
                .unwrap();
            registry
                .add_trend("get_request_duration", ms as f64)
                .unwrap();
            registry.add_rate("success_rate", status_ok).unwrap();
            registry.record_check("Status code é 200", status_ok).unwrap();
            registry
                .record_check("Tempo de resposta aceitável", ms < 7000)
                .unwrap();
            registry
                .record_iteration(Duration::from_millis(ms + 1000))
                .unwrap();
        }
        registry.add_gauge(VUS_MAX, 7.0).unwrap();

        let thresholds = ThresholdSet::from_config(&config.thresholds).unwrap();
        (registry, thresholds, config)
    }

    fn collect(stop: StopReason) -> SummaryData {
        let (registry, thresholds, config) = sample_run();
        let elapsed = Duration::from_secs(10);
        let report = thresholds.evaluate(&registry, elapsed);
        SummaryData::collect(&registry, &thresholds, &report, &config, stop, 0, elapsed)
    }

    #[test]
    fn test_collect_metric_values() {
        let data = collect(StopReason::ScheduleComplete);

        let trend = &data.metrics["get_request_duration"];
        assert_eq!(trend.kind, MetricKind::Trend);
        assert_eq!(
            trend.values.keys().collect::<Vec<_>>(),
            vec!["avg", "min", "med", "max", "p(90)", "p(95)"]
        );
        assert_eq!(trend.values["min"], 90.0);
        assert_eq!(trend.values["max"], 7400.0);

        let rate = &data.metrics["success_rate"];
        assert_eq!(rate.values["rate"], 0.75);
        assert_eq!(rate.values["passes"], 3.0);
        assert_eq!(rate.values["fails"], 1.0);

        assert_eq!(data.metrics["http_reqs"].values["count"], 4.0);
        assert_eq!(data.metrics["http_reqs"].values["rate"], 0.4);
        assert_eq!(data.completed_iterations(), 4);
        assert_eq!(data.max_vus(), 7);

        // Metrics are listed alphabetically
        let names: Vec<&String> = data.metrics.keys().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_collect_thresholds() {
        let data = collect(StopReason::ScheduleComplete);
        // 1 failure in 4: 0.25 is neither < 0.25 nor is 0.75 > 0.75
        assert!(!data.thresholds_passed);
        assert_eq!(
            data.failed_threshold_metrics(),
            vec!["http_req_failed", "success_rate"]
        );
        assert_eq!(
            data.metrics["http_req_failed"].thresholds,
            vec![ThresholdSummary {
                expression: "rate<0.25".to_string(),
                ok: false
            }]
        );
        // p(90) of [90, 120, 180, 7400] is 5234
        assert_eq!(data.metrics["get_request_duration"].thresholds_ok(), Some(true));
    }

    #[test]
    fn test_threshold_percentile_added_to_trend_values() {
        let (registry, _, mut config) = sample_run();
        config.thresholds.insert(
            "get_request_duration".to_string(),
            vec![ThresholdSpec::Expression("p(99)<8000".to_string())],
        );
        let thresholds = ThresholdSet::from_config(&config.thresholds).unwrap();
        let report = thresholds.evaluate(&registry, Duration::from_secs(1));
        let data = SummaryData::collect(
            &registry,
            &thresholds,
            &report,
            &config,
            StopReason::ScheduleComplete,
            0,
            Duration::from_secs(1),
        );
        assert!(data.metrics["get_request_duration"]
            .values
            .contains_key("p(99)"));
    }

    #[test]
    fn test_text_summary_plain() {
        let data = collect(StopReason::ScheduleComplete);
        let text = text_summary(
            &data,
            &TextSummaryOptions {
                indent: " ".to_string(),
                enable_colors: false,
            },
        );

        assert!(text.contains("✓ Status code é 200") || text.contains("✗ Status code é 200"));
        assert!(text.contains("✗ Tempo de resposta aceitável"));
        assert!(text.contains("↳  75% — ✓ 3 / ✗ 1"));
        assert!(text.contains("✗ success_rate"));
        assert!(text.contains("✗ http_req_failed"));
        assert!(text.contains("✓ get_request_duration"));
        assert!(text.contains("http_reqs"));
        assert!(text.contains("p(90)="));
        assert!(text.contains("4 complete and 0 interrupted iterations"));
        assert!(text.contains("thresholds on metrics 'http_req_failed', 'success_rate' have been crossed"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_text_summary_colors_and_indent() {
        let data = collect(StopReason::ThresholdAbort);
        let text = text_summary(
            &data,
            &TextSummaryOptions {
                indent: ">>".to_string(),
                enable_colors: true,
            },
        );
        assert!(text.contains('\u{1b}'));
        assert!(text.contains("run aborted"));
        assert!(text
            .lines()
            .filter(|l| !l.is_empty())
            .all(|l| l.starts_with(">>")));
    }

    #[test]
    fn test_painter_styles_only_when_enabled() {
        let on = Painter { enabled: true };
        let off = Painter { enabled: false };
        let green = on.green("ok");
        assert!(green.starts_with('\u{1b}'));
        assert!(green.contains("ok"));
        assert_ne!(on.dim("…"), "…");
        assert_eq!(off.red("fail"), "fail");
        assert_eq!(off.cyan("1.2ms"), "1.2ms");
    }

    #[test]
    fn test_html_report_renders() {
        let data = collect(StopReason::ScheduleComplete);
        let html = html_report(&data).unwrap();
        assert!(html.contains("<html"));
        assert!(html.contains("get_request_duration"));
        assert!(html.contains("Resposta") || html.contains("Status code"));
        // Tera escapes the comparison operator
        assert!(html.contains("p(90)&lt;6800"));
    }

    #[test]
    fn test_json_summary() {
        let data = collect(StopReason::ScheduleComplete);
        let json = json_summary(&data).unwrap();
        let parsed: SummaryData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.checks, data.checks);
        assert!(json.contains("\"type\": \"trend\""));
    }

    #[test]
    fn test_write_outputs_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("index.html");

        let mut outputs = SummaryOutputs::new();
        outputs.insert(SummaryTarget::File(path.clone()), "<html></html>".to_string());
        outputs.insert(SummaryTarget::Stdout, String::new());

        let written = write_outputs(&outputs).unwrap();
        assert_eq!(written, vec![path.clone()]);
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_summary_target_parse() {
        assert_eq!(SummaryTarget::from("stdout"), SummaryTarget::Stdout);
        assert_eq!(SummaryTarget::from("stderr"), SummaryTarget::Stderr);
        assert_eq!(
            SummaryTarget::from("./src/output/index.html"),
            SummaryTarget::File(PathBuf::from("./src/output/index.html"))
        );
        assert_eq!(SummaryTarget::Stdout.to_string(), "stdout");
    }

    #[test]
    fn test_empty_summary() {
        let data = SummaryData::empty(&ScenarioConfig::default(), &ThresholdReport::default());
        assert!(data.metrics.is_empty());
        assert!(data.checks.is_empty());
        assert!(data.thresholds_passed);
        assert!(html_report(&data).is_ok());
    }
}
