//! Progress bar utilities for CLI downloads

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for one download
///
/// A `total` of 0 means the size is unknown and a spinner is shown instead.
pub fn download_bar(total: u64, name: &str) -> ProgressBar {
    let pb = if total > 0 {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} {bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    };

    pb.set_message(name.to_string());
    pb
}

pub fn finish_ok(pb: &ProgressBar) {
    pb.finish_with_message(format!("{} Download complete", style("✓").green().bold()));
}

pub fn finish_failed(pb: &ProgressBar, error: &str) {
    pb.abandon_with_message(format!("{} Failed: {}", style("✗").red().bold(), error));
}
