use crate::commands::run::{resolve_config, RunOptions};
use crate::config::UserConfig;
use crate::performance::{LoadProfile, MetricsRegistry, ThresholdSet};
use crate::scenario::{PostsScenario, Scenario};
use crate::utils::format_duration;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Prints the fully resolved scenario as JSON after validating its thresholds.
pub async fn handle_inspect(config: Option<PathBuf>, stages: Vec<String>) -> Result<()> {
    let user = UserConfig::load().unwrap_or_default();
    let config = resolve_config(
        &RunOptions {
            config,
            stages,
            ..RunOptions::default()
        },
        &user,
    )?;
    let thresholds = ThresholdSet::from_config(&config.thresholds)?;
    let mut registry = MetricsRegistry::new();
    PostsScenario::new(config.clone()).init_metrics(&mut registry)?;
    thresholds.validate_against(&registry)?;

    let profile = LoadProfile::new(config.stages.clone());
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!();
    println!(
        "{} Valid scenario: {} stages, {} total, peak {} VUs",
        "✔".green().bold(),
        profile.stages().len(),
        format_duration(profile.total_duration()),
        profile.max_target()
    );
    Ok(())
}
