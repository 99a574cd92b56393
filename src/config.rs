use crate::performance::thresholds::Threshold;
use crate::utils::parse_duration;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_HTML_PATH: &str = "./src/output/index.html";

/// Per-user preferences stored in `~/.surge/config.json`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct UserConfig {
    pub no_color: bool,
    pub summary: UserSummaryConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct UserSummaryConfig {
    pub trend_stats: Option<Vec<String>>,
}

impl UserConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("config.json");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            // Fall back to defaults if the file is unreadable JSON
            let config: UserConfig = serde_json::from_str(&content).unwrap_or_default();
            Ok(config)
        } else {
            Ok(UserConfig::default())
        }
    }

    fn get_config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Unable to find home directory"))?;

        Ok(PathBuf::from(home).join(".surge"))
    }
}

/// One segment of the VU ramp: move linearly to `target` over `duration`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Stage {
    #[serde(with = "duration_str")]
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }

    /// Parses the `--stage` CLI form, `30s:7`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (duration, target) = spec
            .split_once(':')
            .with_context(|| format!("Invalid stage '{}', expected DURATION:TARGET", spec))?;
        let duration = parse_duration(duration)
            .with_context(|| format!("Invalid stage duration in '{}'", spec))?;
        let target = target
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid stage target in '{}'", spec))?;
        Ok(Self { duration, target })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ThresholdSpec {
    Expression(String),
    Detailed {
        threshold: String,
        #[serde(default)]
        abort_on_fail: bool,
        #[serde(default, with = "duration_str::option")]
        delay_abort_eval: Option<Duration>,
    },
}

impl ThresholdSpec {
    pub fn expression(&self) -> &str {
        match self {
            ThresholdSpec::Expression(expr) => expr,
            ThresholdSpec::Detailed { threshold, .. } => threshold,
        }
    }

    pub fn abort_on_fail(&self) -> bool {
        matches!(
            self,
            ThresholdSpec::Detailed {
                abort_on_fail: true,
                ..
            }
        )
    }

    pub fn delay_abort_eval(&self) -> Duration {
        match self {
            ThresholdSpec::Detailed {
                delay_abort_eval: Some(delay),
                ..
            } => *delay,
            _ => Duration::ZERO,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SummaryConfig {
    pub html_path: PathBuf,
    pub export_path: Option<PathBuf>,
    pub trend_stats: Vec<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            html_path: PathBuf::from(DEFAULT_HTML_PATH),
            export_path: None,
            trend_stats: ["avg", "min", "med", "max", "p(90)", "p(95)"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Everything a run needs: target request, load profile, thresholds and
/// summary destinations.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub expected_status: u16,
    #[serde(with = "duration_str")]
    pub max_response_time: Duration,
    #[serde(with = "duration_str")]
    pub think_time: Duration,
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,
    #[serde(with = "duration_str")]
    pub graceful_stop: Duration,
    pub insecure: bool,
    pub stages: Vec<Stage>,
    pub thresholds: IndexMap<String, Vec<ThresholdSpec>>,
    pub summary: SummaryConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        let mut thresholds = IndexMap::new();
        thresholds.insert(
            "http_req_failed".to_string(),
            vec![ThresholdSpec::Expression("rate<0.25".to_string())],
        );
        thresholds.insert(
            "get_request_duration".to_string(),
            vec![ThresholdSpec::Expression("p(90)<6800".to_string())],
        );
        thresholds.insert(
            "success_rate".to_string(),
            vec![ThresholdSpec::Expression("rate>0.75".to_string())],
        );

        Self {
            name: "posts".to_string(),
            url: DEFAULT_URL.to_string(),
            headers,
            expected_status: 200,
            max_response_time: Duration::from_millis(7000),
            think_time: Duration::from_secs(1),
            // Longer than the check limit so slow responses are measured, not cut off
            request_timeout: Duration::from_secs(60),
            graceful_stop: Duration::from_secs(30),
            insecure: false,
            stages: vec![
                Stage::new(Duration::from_secs(30), 7),
                Stage::new(Duration::from_secs(120), 92),
                Stage::new(Duration::from_secs(60), 92),
            ],
            thresholds,
            summary: SummaryConfig::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        let config: ScenarioConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.url).with_context(|| format!("Invalid URL: {}", self.url))?;

        if self.stages.is_empty() {
            anyhow::bail!("Scenario '{}' declares no stages", self.name);
        }
        if self.stages.iter().all(|s| s.target == 0) {
            anyhow::bail!("Scenario '{}' never ramps above 0 VUs", self.name);
        }

        for (metric, specs) in &self.thresholds {
            for spec in specs {
                Threshold::parse(spec.expression()).with_context(|| {
                    format!("Invalid threshold on metric '{}'", metric)
                })?;
            }
        }

        Ok(())
    }
}

/// Serializes durations as the strings users write in scenario files.
mod duration_str {
    use crate::utils::{duration_string, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&duration_string(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&duration_string(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
