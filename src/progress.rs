//! Terminal progress for the generation phases.
//!
//! Bars and spinners are drawn on stderr unless log-only mode is on, in which
//! case they stay hidden and `log_progress` lines carry the progress instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} [{elapsed_precise}]";
const SPINNER_TICK: Duration = Duration::from_millis(100);

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Hide bars and spinners for the rest of the process (`--log-only`).
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Seconds below a minute, minutes above, one decimal.
pub fn format_duration(d: Duration) -> String {
    match d.as_secs_f64() {
        secs if secs < 60.0 => format!("{:.1}s", secs),
        secs => format!("{:.1}m", secs / 60.0),
    }
}

/// Attach `style`, or hide the indicator entirely in log-only mode.
fn styled(pb: ProgressBar, style: ProgressStyle, msg: &str) -> ProgressBar {
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

/// Bar over `len` units of work.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    styled(ProgressBar::new(len), style, msg)
}

/// Spinner for phases with no known length, such as reading the catalog.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = styled(ProgressBar::new_spinner(), style, msg);
    if !is_log_only() {
        pb.enable_steady_tick(SPINNER_TICK);
    }
    pb
}

/// Whether a simulated day closes a reporting interval: every `interval`
/// days and always on the last day.
pub fn is_report_point(completed: u64, total: u64, interval: u64) -> bool {
    completed > 0 && (completed % interval == 0 || completed == total)
}

/// Emit a progress line at each report point.
pub fn log_progress(phase: &str, completed: u64, total: u64, interval: u64) {
    if is_report_point(completed, total, interval) {
        let pct = 100.0 * completed as f64 / total as f64;
        tracing::info!(phase, "{}/{} days simulated ({:.1}%)", completed, total, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_report_points() {
        assert!(!is_report_point(0, 90, 30));
        assert!(!is_report_point(29, 90, 30));
        assert!(is_report_point(30, 90, 30));
        assert!(is_report_point(60, 90, 30));
        // Last day always reports even off-interval
        assert!(is_report_point(7, 7, 30));
    }

    #[test]
    fn test_bars_hidden_in_log_only_mode() {
        set_log_only(true);
        let pb = create_progress_bar(10, "Writing records");
        assert!(pb.is_hidden());
        assert_eq!(pb.message(), "Writing records");
        assert!(create_spinner("Reading catalog").is_hidden());
        set_log_only(false);
    }
}
