use super::monitored_stream::Monitor;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

/// A single transfer's progress bar, drawn on stderr.
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Without a known total the bar degrades to a spinner with a byte counter.
    pub fn new(label: &str, total: Option<u64>) -> Self {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] {prefix} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} | {bytes_per_sec} (finishes in {eta})",
                        )
                        .progress_chars("=>-"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {prefix} {bytes} | {bytes_per_sec}"),
                );
                bar
            }
        };

        bar.set_prefix(label);
        Self { bar }
    }

    /// Advances the bar for every report until the monitored stream is dropped.
    pub fn spawn(self, mut monitor: Monitor) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(bytes) = monitor.recv().await {
                self.bar.inc(bytes);
            }
            self.bar.finish();
        })
    }
}
