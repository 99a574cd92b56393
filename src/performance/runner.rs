use crate::http::HttpClient;
use crate::performance::metrics::{MetricsRegistry, VUS, VUS_MAX};
use crate::performance::monitor::PerformanceMonitor;
use crate::performance::stages::LoadProfile;
use crate::performance::thresholds::ThresholdSet;
use crate::performance::vu::VuContext;
use crate::report::SummaryData;
use crate::scenario::Scenario;
use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// How often the scheduler re-reads the stage schedule.
const CONTROL_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ScheduleComplete,
    ThresholdAbort,
    Interrupted,
}

/// Publishes a stop reason unless one is already set. Returns whether this
/// call was the one that stopped the run.
pub fn request_stop(stop: &watch::Sender<Option<StopReason>>, reason: StopReason) -> bool {
    stop.send_if_modified(|current| {
        if current.is_none() {
            *current = Some(reason);
            true
        } else {
            false
        }
    })
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Show the live spinner instead of periodic plain-text reports.
    pub interactive: bool,
    pub report_interval: Duration,
    /// Skip threshold evaluation entirely.
    pub no_thresholds: bool,
    /// Stop on Ctrl-C.
    pub handle_signals: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            interactive: false,
            report_interval: Duration::from_secs(10),
            no_thresholds: false,
            handle_signals: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: SummaryData,
    pub stop_reason: StopReason,
    pub interrupted_iterations: u64,
}

impl RunOutcome {
    pub fn thresholds_passed(&self) -> bool {
        self.summary.thresholds_passed
    }
}

/// Schedules virtual users for a scenario according to its stages and
/// collects everything they record.
pub struct PerformanceTestRunner {
    scenario: Arc<dyn Scenario>,
    options: RunnerOptions,
    client: HttpClient,
}

impl PerformanceTestRunner {
    pub fn new(scenario: Arc<dyn Scenario>, options: RunnerOptions) -> Result<Self> {
        let config = scenario.options();
        config.validate()?;
        let client = HttpClient::new(config.request_timeout, config.insecure)?;

        Ok(Self {
            scenario,
            options,
            client,
        })
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let config = self.scenario.options();
        let profile = LoadProfile::new(config.stages.clone());

        let mut registry = MetricsRegistry::new();
        self.scenario
            .init_metrics(&mut registry)
            .context("Failed to register scenario metrics")?;

        let thresholds = if self.options.no_thresholds {
            ThresholdSet::default()
        } else {
            ThresholdSet::from_config(&config.thresholds)?
        };
        thresholds.validate_against(&registry)?;

        let metrics = Arc::new(Mutex::new(registry));
        let thresholds = Arc::new(thresholds);
        let (target_tx, _) = watch::channel(0u32);
        let (stop_tx, _) = watch::channel(None);
        let stop_tx = Arc::new(stop_tx);

        let monitor = PerformanceMonitor::new(
            profile.clone(),
            self.options.report_interval,
            self.options.interactive,
        )
        .spawn(
            Arc::clone(&metrics),
            Arc::clone(&thresholds),
            Arc::clone(&stop_tx),
        );

        let start = Instant::now();
        let vus = self
            .schedule(&profile, &metrics, &target_tx, &stop_tx, start)
            .await;
        let interrupted = drain(
            vus,
            config.graceful_stop,
            interrupt_signal(self.options.handle_signals),
        )
        .await;
        let elapsed = start.elapsed();

        if let Err(e) = monitor.await {
            tracing::warn!(error = %e, "monitor task failed");
        }

        let stop_reason = (*stop_tx.borrow()).unwrap_or(StopReason::ScheduleComplete);
        let registry = metrics.lock().await;
        let report = thresholds.evaluate(&registry, elapsed);
        for outcome in report.outcomes.iter().filter(|o| !o.ok) {
            tracing::info!(metric = %outcome.metric, threshold = %outcome.expression, "threshold crossed");
        }

        let summary = SummaryData::collect(
            &registry,
            &thresholds,
            &report,
            config,
            stop_reason,
            interrupted,
            elapsed,
        );

        Ok(RunOutcome {
            summary,
            stop_reason,
            interrupted_iterations: interrupted,
        })
    }

    /// Follows the stage schedule until it is exhausted or something else
    /// stops the run. Returns the handles of every VU that was started.
    async fn schedule(
        &self,
        profile: &LoadProfile,
        metrics: &Arc<Mutex<MetricsRegistry>>,
        target_tx: &watch::Sender<u32>,
        stop_tx: &Arc<watch::Sender<Option<StopReason>>>,
        start: Instant,
    ) -> Vec<JoinHandle<()>> {
        let mut vus: Vec<JoinHandle<()>> = Vec::new();
        let mut stop_rx = stop_tx.subscribe();
        let mut ticker = tokio::time::interval(CONTROL_TICK);
        let ctrl_c = interrupt_signal(self.options.handle_signals);
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut ctrl_c => {
                    println!("\n⏹  Interrupted, stopping load generation...");
                    request_stop(stop_tx, StopReason::Interrupted);
                    break;
                }
                _ = stop_rx.changed() => break,
            }
            if stop_rx.borrow().is_some() {
                break;
            }

            let elapsed = start.elapsed();
            if elapsed >= profile.total_duration() {
                request_stop(stop_tx, StopReason::ScheduleComplete);
                break;
            }

            let target = profile.target_at(elapsed);
            while (vus.len() as u32) < target {
                let id = vus.len() as u32;
                tracing::debug!(vu = id, "starting VU");
                let context = VuContext::new(id, self.client.clone(), Arc::clone(metrics));
                vus.push(tokio::spawn(vu_loop(
                    Arc::clone(&self.scenario),
                    context,
                    target_tx.subscribe(),
                    stop_tx.subscribe(),
                )));
            }
            target_tx.send_if_modified(|current| {
                if *current != target {
                    tracing::debug!(from = *current, to = target, "target VUs changed");
                    *current = target;
                    true
                } else {
                    false
                }
            });

            let mut registry = metrics.lock().await;
            if let Err(e) = registry.add_gauge(VUS, target as f64) {
                tracing::warn!(error = %e, metric = VUS, "failed to record metric");
            }
            if let Err(e) = registry.add_gauge(VUS_MAX, vus.len() as f64) {
                tracing::warn!(error = %e, metric = VUS_MAX, "failed to record metric");
            }
        }

        vus
    }
}

/// Resolves on Ctrl-C when `enabled`, never otherwise.
async fn interrupt_signal(enabled: bool) {
    if enabled && tokio::signal::ctrl_c().await.is_ok() {
        return;
    }
    std::future::pending::<()>().await
}

/// Waits up to `graceful_stop` for in-flight iterations, then aborts the
/// rest. `interrupt` cuts the wait short. Returns how many VUs had to be
/// aborted.
async fn drain(
    vus: Vec<JoinHandle<()>>,
    graceful_stop: Duration,
    interrupt: impl Future<Output = ()>,
) -> u64 {
    let mut pending: FuturesUnordered<JoinHandle<()>> = vus.into_iter().collect();

    let finished = async {
        while let Some(result) = pending.next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "VU task failed");
            }
        }
    };

    tokio::select! {
        _ = tokio::time::timeout(graceful_stop, finished) => {}
        _ = interrupt => {
            println!("\n⏹  Interrupted, aborting in-flight iterations...");
        }
    }

    if pending.is_empty() {
        return 0;
    }

    let interrupted = pending.len() as u64;
    tracing::warn!(interrupted, "graceful stop ended, interrupting in-flight iterations");
    for handle in pending.iter() {
        handle.abort();
    }
    while pending.next().await.is_some() {}
    interrupted
}

/// Body of one VU: iterate while its index is below the current target,
/// park otherwise, exit once the run is stopped.
async fn vu_loop(
    scenario: Arc<dyn Scenario>,
    mut context: VuContext,
    mut target_rx: watch::Receiver<u32>,
    mut stop_rx: watch::Receiver<Option<StopReason>>,
) {
    loop {
        if stop_rx.borrow().is_some() {
            break;
        }

        let target = *target_rx.borrow_and_update();
        if context.id() >= target {
            tokio::select! {
                changed = target_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            continue;
        }

        let started = Instant::now();
        scenario.iteration(&mut context).await;
        context.finish_iteration(started.elapsed()).await;
    }

    tracing::debug!(vu = context.id(), iterations = context.iteration(), "VU finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScenarioConfig, Stage};
    use crate::report::SummaryOutputs;
    use async_trait::async_trait;
    use indexmap::IndexMap;

    /// Sleeps instead of doing I/O so scheduling can be observed in isolation.
    struct IdleScenario {
        config: ScenarioConfig,
        pause: Duration,
    }

    #[async_trait]
    impl Scenario for IdleScenario {
        fn options(&self) -> &ScenarioConfig {
            &self.config
        }

        async fn iteration(&self, vu: &mut VuContext) {
            vu.add_rate("idle_ok", true).await;
            vu.sleep(self.pause).await;
        }

        fn handle_summary(&self, _data: &SummaryData) -> SummaryOutputs {
            SummaryOutputs::new()
        }
    }

    fn idle(stages: Vec<Stage>, pause: Duration, graceful_stop: Duration) -> Arc<IdleScenario> {
        let config = ScenarioConfig {
            stages,
            thresholds: IndexMap::new(),
            graceful_stop,
            ..ScenarioConfig::default()
        };
        Arc::new(IdleScenario { config, pause })
    }

    fn options() -> RunnerOptions {
        RunnerOptions {
            handle_signals: false,
            report_interval: Duration::from_secs(3600),
            ..RunnerOptions::default()
        }
    }

    #[test]
    fn test_request_stop_first_reason_wins() {
        let (tx, rx) = watch::channel(None);
        assert!(request_stop(&tx, StopReason::ThresholdAbort));
        assert!(!request_stop(&tx, StopReason::ScheduleComplete));
        assert_eq!(*rx.borrow(), Some(StopReason::ThresholdAbort));
    }

    #[tokio::test]
    async fn test_runs_schedule_and_ramps_vus() -> Result<()> {
        let scenario = idle(
            vec![
                Stage::new(Duration::from_millis(500), 4),
                Stage::new(Duration::from_millis(500), 4),
            ],
            Duration::from_millis(50),
            Duration::from_secs(5),
        );
        let runner = PerformanceTestRunner::new(scenario, options())?;
        let outcome = runner.run().await?;

        assert_eq!(outcome.stop_reason, StopReason::ScheduleComplete);
        assert_eq!(outcome.interrupted_iterations, 0);
        assert_eq!(outcome.summary.max_vus(), 4);

        let iterations = outcome.summary.completed_iterations();
        assert!(iterations > 0);
        // One rate sample per completed iteration
        assert_eq!(
            outcome.summary.metrics["idle_ok"].values["passes"] as u64,
            iterations
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_graceful_stop_interrupts_long_iterations() -> Result<()> {
        let scenario = idle(
            vec![
                Stage::new(Duration::ZERO, 2),
                Stage::new(Duration::from_millis(300), 2),
            ],
            Duration::from_secs(30),
            Duration::from_millis(200),
        );
        let runner = PerformanceTestRunner::new(scenario, options())?;
        let started = Instant::now();
        let outcome = runner.run().await?;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(outcome.interrupted_iterations, 2);
        assert_eq!(outcome.summary.completed_iterations(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_drain_waits_for_finishing_vus() {
        let vus: Vec<JoinHandle<()>> = (0..3)
            .map(|_| tokio::spawn(tokio::time::sleep(Duration::from_millis(50))))
            .collect();
        let interrupted = drain(vus, Duration::from_secs(5), std::future::pending()).await;
        assert_eq!(interrupted, 0);
    }

    #[tokio::test]
    async fn test_drain_interrupt_aborts_without_waiting() {
        let vus: Vec<JoinHandle<()>> = (0..2)
            .map(|_| tokio::spawn(tokio::time::sleep(Duration::from_secs(60))))
            .collect();
        let started = Instant::now();
        let interrupted = drain(
            vus,
            Duration::from_secs(30),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;

        assert_eq!(interrupted, 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_interrupt_signal_disabled_never_fires() {
        let waited = tokio::time::timeout(Duration::from_millis(100), interrupt_signal(false)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_threshold_on_unknown_metric_fails_before_run() {
        let mut config = ScenarioConfig::default();
        config.stages = vec![Stage::new(Duration::from_millis(100), 1)];
        config.thresholds.insert(
            "not_a_metric".to_string(),
            vec![crate::config::ThresholdSpec::Expression("rate<1".to_string())],
        );
        let scenario = Arc::new(IdleScenario {
            config,
            pause: Duration::ZERO,
        });
        let runner = PerformanceTestRunner::new(scenario, options()).unwrap();
        assert!(runner.run().await.is_err());
    }
}
