//! Progress bars for long-running commands.

use indicatif::{ProgressBar, ProgressStyle};

/// A bar counting hunks.
pub(crate) fn hunk_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("  {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} hunks {msg}")
            .expect("static pattern")
            .tick_chars("/-\\|")
            .progress_chars("=> "),
    );
    pb
}

/// A bar counting bytes, with throughput.
pub(crate) fn byte_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "  {spinner:.cyan} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        )
        .expect("static pattern")
        .tick_chars("/-\\|")
        .progress_chars("=> "),
    );
    pb.set_message(msg.to_string());
    pb
}
