//! The load scenario: what each virtual user does per iteration, which
//! metrics it feeds, and how the end-of-run summary is emitted.

use crate::config::ScenarioConfig;
use crate::http::HttpResponse;
use crate::performance::metrics::{MetricKind, MetricsRegistry, ValueType};
use crate::performance::vu::VuContext;
use crate::report::{html_report, text_summary, SummaryData, SummaryOutputs, SummaryTarget, TextSummaryOptions};
use anyhow::Result;
use async_trait::async_trait;

pub const GET_REQUEST_DURATION: &str = "get_request_duration";
pub const SUCCESS_RATE: &str = "success_rate";

pub const CHECK_STATUS: &str = "Status code é 200";
pub const CHECK_HAS_DATA: &str = "Resposta contém dados";
pub const CHECK_RESPONSE_TIME: &str = "Tempo de resposta aceitável";

/// Contract between a load scenario and the engine that runs it.
#[async_trait]
pub trait Scenario: Send + Sync + 'static {
    /// Load profile, thresholds and request settings, read once before the run.
    fn options(&self) -> &ScenarioConfig;

    /// Declares custom metrics so thresholds on them can be validated up front.
    fn init_metrics(&self, _registry: &mut MetricsRegistry) -> Result<()> {
        Ok(())
    }

    /// One iteration on one VU. Called repeatedly and concurrently.
    async fn iteration(&self, vu: &mut VuContext);

    /// Called once after the run with the aggregated results.
    fn handle_summary(&self, data: &SummaryData) -> SummaryOutputs;
}

/// GETs a JSON collection endpoint, tracks its latency and success rate,
/// and checks status, payload and response time.
#[derive(Debug, Clone)]
pub struct PostsScenario {
    config: ScenarioConfig,
}

impl Default for PostsScenario {
    fn default() -> Self {
        Self::new(ScenarioConfig::default())
    }
}

impl PostsScenario {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Scenario for PostsScenario {
    fn options(&self) -> &ScenarioConfig {
        &self.config
    }

    fn init_metrics(&self, registry: &mut MetricsRegistry) -> Result<()> {
        registry.register(GET_REQUEST_DURATION, MetricKind::Trend, ValueType::Time)?;
        registry.register(SUCCESS_RATE, MetricKind::Rate, ValueType::Default)?;
        Ok(())
    }

    async fn iteration(&self, vu: &mut VuContext) {
        let expected_status = self.config.expected_status;
        let max_response_ms = self.config.max_response_time.as_secs_f64() * 1000.0;

        let response = vu.http_get(&self.config.url, &self.config.headers).await;

        vu.add_trend(GET_REQUEST_DURATION, response.timings.duration_ms())
            .await;
        vu.add_rate(SUCCESS_RATE, response.status == expected_status)
            .await;

        let status_ok = |r: &HttpResponse| r.status == expected_status;
        let has_data = |r: &HttpResponse| {
            r.json()
                .and_then(|body| body.as_array().map(|items| !items.is_empty()))
                .unwrap_or(false)
        };
        let fast_enough = |r: &HttpResponse| r.timings.duration_ms() < max_response_ms;

        vu.check(
            &response,
            &[
                (CHECK_STATUS, &status_ok),
                (CHECK_HAS_DATA, &has_data),
                (CHECK_RESPONSE_TIME, &fast_enough),
            ],
        )
        .await;

        vu.sleep(self.config.think_time).await;
    }

    fn handle_summary(&self, data: &SummaryData) -> SummaryOutputs {
        let mut outputs = SummaryOutputs::new();

        let html = html_report(data).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "html report rendering failed");
            format!(
                "<!DOCTYPE html><html><body><h1>Report unavailable</h1><pre>{}</pre></body></html>",
                e.to_string().replace('&', "&amp;").replace('<', "&lt;")
            )
        });
        outputs.insert(
            SummaryTarget::File(self.config.summary.html_path.clone()),
            html,
        );
        outputs.insert(
            SummaryTarget::Stdout,
            text_summary(
                data,
                &TextSummaryOptions {
                    indent: " ".to_string(),
                    enable_colors: true,
                },
            ),
        );

        outputs
    }
}
