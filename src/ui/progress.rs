use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Live status line for a running load test. Hidden when `visible` is false
/// so CI logs only get the periodic plain-text reports.
pub fn create_run_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓", "✔"])
            .template("{spinner:.cyan} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner() {
        let pb = create_run_spinner(false);
        assert!(pb.is_hidden());
        pb.set_message("running");
        pb.finish_and_clear();
    }
}
