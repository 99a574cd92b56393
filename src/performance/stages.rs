use crate::config::Stage;
use crate::utils::format_duration;
use std::time::Duration;

/// Ramping VU schedule. Each stage moves linearly from the previous stage's
/// target (0 for the first) to its own target.
#[derive(Debug, Clone)]
pub struct LoadProfile {
    stages: Vec<Stage>,
}

impl LoadProfile {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn max_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Index of the stage active at `elapsed`, `None` once the schedule is over.
    pub fn stage_index_at(&self, elapsed: Duration) -> Option<usize> {
        let mut stage_end = Duration::ZERO;
        for (index, stage) in self.stages.iter().enumerate() {
            stage_end += stage.duration;
            if elapsed < stage_end {
                return Some(index);
            }
        }
        None
    }

    /// Target VU count at `elapsed`, rounded down. Past the end of the
    /// schedule this is the final stage's target.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut stage_start = Duration::ZERO;
        let mut previous = 0u32;

        for stage in &self.stages {
            if elapsed < stage_start + stage.duration {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let diff = stage.target as f64 - previous as f64;
                return (previous as f64 + diff * progress).floor() as u32;
            }
            stage_start += stage.duration;
            previous = stage.target;
        }

        previous
    }

    pub fn phase_description(&self, elapsed: Duration) -> String {
        let Some(index) = self.stage_index_at(elapsed) else {
            return "Schedule complete".to_string();
        };
        let stage = &self.stages[index];
        let from = if index == 0 {
            0
        } else {
            self.stages[index - 1].target
        };

        let verb = match from.cmp(&stage.target) {
            std::cmp::Ordering::Less => "Ramping up",
            std::cmp::Ordering::Greater => "Ramping down",
            std::cmp::Ordering::Equal => "Holding",
        };
        format!(
            "{} {}→{} VUs (stage {}/{}, {})",
            verb,
            from,
            stage.target,
            index + 1,
            self.stages.len(),
            format_duration(stage.duration)
        )
    }
}
