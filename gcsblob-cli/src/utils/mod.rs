pub mod monitored_stream;
pub mod progress_tracker;

pub use monitored_stream::MonitoredStream;
pub use progress_tracker::ProgressTracker;

use futures::Stream;
use tokio::task::JoinHandle;

/// Wraps `stream` for byte counting and, when `show` is set, starts a progress
/// bar fed by it. Await the handle after dropping the stream.
pub fn track<S: Stream>(
    stream: S,
    label: &str,
    total: Option<u64>,
    show: bool,
) -> (MonitoredStream<S>, Option<JoinHandle<()>>) {
    let (stream, monitor) = MonitoredStream::new(stream);
    let tracking = show.then(|| ProgressTracker::new(label, total).spawn(monitor));
    (stream, tracking)
}

/// Waits for the progress bar started by [`track`] to finish drawing.
pub async fn finish_tracking(tracking: Option<JoinHandle<()>>) {
    if let Some(tracking) = tracking {
        if let Err(e) = tracking.await {
            log::warn!("progress reporting failed: {}", e);
        }
    }
}
