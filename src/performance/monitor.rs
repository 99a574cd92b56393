use crate::performance::metrics::{Aggregation, MetricsRegistry, ITERATIONS, VUS};
use crate::performance::runner::{request_stop, StopReason};
use crate::performance::stages::LoadProfile;
use crate::performance::thresholds::ThresholdSet;
use crate::ui::progress::create_run_spinner;
use crate::utils::format_duration;
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// How often thresholds are re-evaluated while the run is in progress.
pub const THRESHOLD_EVAL_INTERVAL: Duration = Duration::from_secs(2);

const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

pub struct PerformanceMonitor {
    start_time: Instant,
    last_report: Instant,
    report_interval: Duration,
    interactive: bool,
    profile: LoadProfile,
}

impl PerformanceMonitor {
    pub fn new(profile: LoadProfile, report_interval: Duration, interactive: bool) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_report: now,
            report_interval,
            interactive,
            profile,
        }
    }

    /// Check if it's time to generate a progress report
    pub fn should_report(&self) -> bool {
        self.last_report.elapsed() >= self.report_interval
    }

    pub fn status_line(&self, registry: &MetricsRegistry) -> String {
        let elapsed = self.start_time.elapsed();
        let active_vus = registry
            .get(VUS)
            .and_then(|m| m.aggregate(Aggregation::Value, elapsed))
            .unwrap_or(0.0) as u32;

        format!(
            "running ({}), {:>3}/{} VUs, {} complete iterations · {}",
            format_duration(Duration::from_secs(elapsed.as_secs())),
            active_vus,
            self.profile.max_target(),
            registry.counter_value(ITERATIONS),
            self.profile.phase_description(elapsed)
        )
    }

    /// Plain periodic report for non-interactive output.
    fn print_progress_report(&mut self, registry: &MetricsRegistry) {
        let elapsed = self.start_time.elapsed();
        let total = self.profile.total_duration();
        let progress_percent = if total > Duration::ZERO {
            (elapsed.as_secs_f64() / total.as_secs_f64() * 100.0).min(100.0)
        } else {
            0.0
        };

        println!(
            "{} [{:>5.1}%] {}",
            "→".cyan(),
            progress_percent,
            self.status_line(registry)
        );

        self.last_report = Instant::now();
    }

    /// Runs until a stop reason is published. Refreshes the status line and
    /// publishes `ThresholdAbort` when an abort-on-fail threshold is crossed.
    pub fn spawn(
        mut self,
        metrics: Arc<Mutex<MetricsRegistry>>,
        thresholds: Arc<ThresholdSet>,
        stop: Arc<watch::Sender<Option<StopReason>>>,
    ) -> JoinHandle<()> {
        let mut stop_rx = stop.subscribe();
        tokio::spawn(async move {
            let spinner = create_run_spinner(self.interactive);
            let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
            let mut last_eval = Instant::now();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                if stop_rx.borrow().is_some() {
                    break;
                }

                let registry = metrics.lock().await;
                spinner.set_message(self.status_line(&registry));
                if !self.interactive && self.should_report() {
                    self.print_progress_report(&registry);
                }

                if thresholds.is_empty() || last_eval.elapsed() < THRESHOLD_EVAL_INTERVAL {
                    continue;
                }
                last_eval = Instant::now();

                let report = thresholds.evaluate(&registry, self.start_time.elapsed());
                if report.should_abort {
                    tracing::warn!(
                        metrics = ?report.failed_metrics(),
                        "abort-on-fail threshold crossed, stopping run"
                    );
                    request_stop(&stop, StopReason::ThresholdAbort);
                    break;
                }
            }

            spinner.finish_and_clear();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;

    fn profile() -> LoadProfile {
        LoadProfile::new(vec![
            Stage::new(Duration::from_secs(30), 7),
            Stage::new(Duration::from_secs(120), 92),
        ])
    }

    #[test]
    fn test_status_line() {
        let monitor = PerformanceMonitor::new(profile(), Duration::from_secs(10), false);
        let mut registry = MetricsRegistry::new();
        registry.add_gauge(VUS, 4.0).unwrap();
        registry.add_counter(ITERATIONS, 12.0).unwrap();

        let line = monitor.status_line(&registry);
        assert!(line.starts_with("running ("));
        assert!(line.contains("  4/92 VUs"));
        assert!(line.contains("12 complete iterations"));
        assert!(line.contains("Ramping up 0→7 VUs"));
    }

    #[test]
    fn test_should_report_respects_interval() {
        let monitor = PerformanceMonitor::new(profile(), Duration::from_secs(3600), false);
        assert!(!monitor.should_report());
        let monitor = PerformanceMonitor::new(profile(), Duration::ZERO, false);
        assert!(monitor.should_report());
    }

    #[tokio::test]
    async fn test_monitor_aborts_on_crossed_threshold() {
        use crate::config::ThresholdSpec;
        use indexmap::IndexMap;

        let mut config = IndexMap::new();
        config.insert(
            "http_req_failed".to_string(),
            vec![ThresholdSpec::Detailed {
                threshold: "rate<0.25".to_string(),
                abort_on_fail: true,
                delay_abort_eval: None,
            }],
        );
        let thresholds = Arc::new(ThresholdSet::from_config(&config).unwrap());

        let mut registry = MetricsRegistry::new();
        registry.add_rate("http_req_failed", true).unwrap();
        let metrics = Arc::new(Mutex::new(registry));

        let (stop_tx, stop_rx) = watch::channel(None);
        let stop = Arc::new(stop_tx);
        let monitor = PerformanceMonitor::new(profile(), Duration::from_secs(3600), false);
        let handle = monitor.spawn(metrics, thresholds, Arc::clone(&stop));

        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("monitor should stop on its own")
            .unwrap();
        assert_eq!(*stop_rx.borrow(), Some(StopReason::ThresholdAbort));
    }

    #[tokio::test]
    async fn test_monitor_exits_when_stopped() {
        let metrics = Arc::new(Mutex::new(MetricsRegistry::new()));
        let (stop_tx, _stop_rx) = watch::channel(None);
        let stop = Arc::new(stop_tx);
        let monitor = PerformanceMonitor::new(profile(), Duration::from_secs(3600), false);
        let handle = monitor.spawn(metrics, Arc::new(ThresholdSet::default()), Arc::clone(&stop));

        request_stop(&stop, StopReason::ScheduleComplete);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("monitor should exit after stop")
            .unwrap();
    }
}
