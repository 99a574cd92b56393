use crate::config::{ScenarioConfig, Stage, UserConfig};
use crate::performance::{PerformanceTestRunner, RunnerOptions, StopReason};
use crate::report::{json_summary, text_summary, write_outputs, SummaryTarget, TextSummaryOptions};
use crate::scenario::{PostsScenario, Scenario};
use crate::ui::request_box::print_request_box;
use crate::utils::{format_duration, parse_duration};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Returned when the run finished but one or more thresholds failed.
#[derive(Debug, Error)]
#[error("thresholds on metrics '{}' have been crossed", .metrics.join("', '"))]
pub struct ThresholdsCrossed {
    pub metrics: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub stages: Vec<String>,
    pub url: Option<String>,
    pub html: Option<PathBuf>,
    pub summary_export: Option<PathBuf>,
    pub report_interval: String,
    pub no_thresholds: bool,
    pub no_color: bool,
    pub ci: bool,
    pub insecure: bool,
}

/// Scenario file (or the built-in posts scenario) with CLI overrides applied.
pub fn resolve_config(options: &RunOptions, user: &UserConfig) -> Result<ScenarioConfig> {
    let mut config = match &options.config {
        Some(path) => ScenarioConfig::load(path)?,
        None => {
            let mut config = ScenarioConfig::default();
            if let Some(stats) = &user.summary.trend_stats {
                config.summary.trend_stats = stats.clone();
            }
            config
        }
    };

    if !options.stages.is_empty() {
        config.stages = options
            .stages
            .iter()
            .map(|s| Stage::parse(s))
            .collect::<Result<Vec<_>>>()?;
    }
    if let Some(url) = &options.url {
        config.url = url.clone();
    }
    if let Some(html) = &options.html {
        config.summary.html_path = html.clone();
    }
    if let Some(export) = &options.summary_export {
        config.summary.export_path = Some(export.clone());
    }
    if options.insecure {
        config.insecure = true;
    }

    config.validate()?;
    Ok(config)
}

fn print_plan(config: &ScenarioConfig, no_thresholds: bool) {
    println!("{} Starting load test", "→".cyan());
    println!("Scenario: {}", config.name.bright_white());
    println!();
    print_request_box("GET", &config.url, &config.headers);

    let total: std::time::Duration = config.stages.iter().map(|s| s.duration).sum();
    println!(
        "Stages ({} total, think time {}):",
        format_duration(total).bright_white(),
        format_duration(config.think_time)
    );
    let mut previous = 0;
    for stage in &config.stages {
        println!(
            "  {:>6}  {} → {} VUs",
            format_duration(stage.duration),
            previous,
            stage.target.to_string().bright_white()
        );
        previous = stage.target;
    }

    if no_thresholds {
        println!("Thresholds: {}", "disabled".yellow());
    } else if !config.thresholds.is_empty() {
        println!("Thresholds:");
        for (metric, specs) in &config.thresholds {
            for spec in specs {
                let abort = if spec.abort_on_fail() {
                    " (abort on fail)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!("  {} {}{}", metric, spec.expression().bright_white(), abort);
            }
        }
    }
    println!();
}

pub async fn handle_run(options: RunOptions) -> Result<()> {
    let user = UserConfig::load().unwrap_or_else(|e| {
        tracing::debug!(error = %e, "user config unavailable, using defaults");
        UserConfig::default()
    });
    let config = resolve_config(&options, &user)?;
    let report_interval = parse_duration(&options.report_interval)?;
    let stdout_tty = atty::is(atty::Stream::Stdout);

    print_plan(&config, options.no_thresholds);

    let scenario = Arc::new(PostsScenario::new(config.clone()));
    let runner = PerformanceTestRunner::new(
        Arc::clone(&scenario) as Arc<dyn Scenario>,
        RunnerOptions {
            interactive: stdout_tty && !options.ci,
            report_interval,
            no_thresholds: options.no_thresholds,
            handle_signals: true,
        },
    )?;

    let outcome = runner.run().await?;

    let mut outputs = scenario.handle_summary(&outcome.summary);
    if options.no_color || user.no_color || !stdout_tty {
        outputs.insert(
            SummaryTarget::Stdout,
            text_summary(
                &outcome.summary,
                &TextSummaryOptions {
                    indent: " ".to_string(),
                    enable_colors: false,
                },
            ),
        );
    }
    if let Some(export) = &config.summary.export_path {
        outputs.insert(
            SummaryTarget::File(export.clone()),
            json_summary(&outcome.summary)?,
        );
    }

    let written = write_outputs(&outputs)?;
    println!();
    for path in &written {
        println!("{} Report written to {}", "✔".green(), path.display());
    }

    match outcome.stop_reason {
        StopReason::ThresholdAbort => {
            println!("{} Run aborted by an abort-on-fail threshold", "✖".red().bold())
        }
        StopReason::Interrupted => println!("{} Run interrupted", "⚠".yellow()),
        StopReason::ScheduleComplete => {}
    }

    if !outcome.thresholds_passed() {
        return Err(ThresholdsCrossed {
            metrics: outcome
                .summary
                .failed_threshold_metrics()
                .into_iter()
                .map(String::from)
                .collect(),
        }
        .into());
    }

    println!("{} Load test completed, all thresholds passed", "✔".green().bold());
    Ok(())
}
