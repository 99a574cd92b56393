use crate::http::{HttpClient, HttpResponse};
use crate::performance::metrics::{HttpSample, MetricsRegistry};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A named predicate evaluated by [`VuContext::check`].
pub type Check<'a, T> = (&'a str, &'a (dyn Fn(&T) -> bool + Sync));

/// Everything one virtual user can touch while running iterations: its
/// identity, the shared HTTP client and the run's metric registry.
pub struct VuContext {
    id: u32,
    iteration: u64,
    client: HttpClient,
    metrics: Arc<Mutex<MetricsRegistry>>,
}

impl VuContext {
    pub fn new(id: u32, client: HttpClient, metrics: Arc<Mutex<MetricsRegistry>>) -> Self {
        Self {
            id,
            iteration: 0,
            client,
            metrics,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Zero-based count of iterations this VU has completed.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn metrics(&self) -> &Arc<Mutex<MetricsRegistry>> {
        &self.metrics
    }

    /// Issues a GET and records the built-in HTTP metrics for it.
    pub async fn http_get(&self, url: &str, headers: &IndexMap<String, String>) -> HttpResponse {
        let response = self.client.get(url, headers).await;

        let sample = HttpSample {
            duration: response.timings.duration,
            waiting: response.timings.waiting,
            failed: response.is_failed(),
            bytes_sent: response.bytes_sent,
            bytes_received: response.bytes_received,
        };
        if let Err(e) = self.metrics.lock().await.record_http(&sample) {
            tracing::warn!(vu = self.id, error = %e, "failed to record http metrics");
        }

        response
    }

    /// Evaluates every check against `value` and tallies the outcomes.
    /// Returns whether all of them passed; a failure never interrupts the caller.
    pub async fn check<T: Sync>(&self, value: &T, checks: &[Check<'_, T>]) -> bool {
        let outcomes: Vec<(&str, bool)> = checks
            .iter()
            .map(|(name, predicate)| (*name, predicate(value)))
            .collect();

        let mut metrics = self.metrics.lock().await;
        for (name, passed) in &outcomes {
            if let Err(e) = metrics.record_check(name, *passed) {
                tracing::warn!(vu = self.id, check = name, error = %e, "failed to record check");
            }
        }

        outcomes.iter().all(|(_, passed)| *passed)
    }

    pub async fn add_trend(&self, name: &str, value: f64) {
        if let Err(e) = self.metrics.lock().await.add_trend(name, value) {
            tracing::warn!(vu = self.id, error = %e, "failed to record trend sample");
        }
    }

    pub async fn add_rate(&self, name: &str, passed: bool) {
        if let Err(e) = self.metrics.lock().await.add_rate(name, passed) {
            tracing::warn!(vu = self.id, error = %e, "failed to record rate sample");
        }
    }

    pub async fn add_counter(&self, name: &str, value: f64) {
        if let Err(e) = self.metrics.lock().await.add_counter(name, value) {
            tracing::warn!(vu = self.id, error = %e, "failed to record counter sample");
        }
    }

    /// Think time between iterations.
    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub(crate) async fn finish_iteration(&mut self, duration: Duration) {
        self.iteration += 1;
        if let Err(e) = self.metrics.lock().await.record_iteration(duration) {
            tracing::warn!(vu = self.id, error = %e, "failed to record iteration");
        }
    }
}
